//! Canonical cache keys for raw component names

use regex::Regex;
use std::sync::OnceLock;

use super::tokens::split_quantity;

/// Key for empty or meaningless names
pub const UNKNOWN_KEY: &str = "unknown";

/// Vendor prefixes and filler words that never change identity
const DROPPED_TOKENS: &[&str] = &["amd", "intel", "nvidia", "with", "avec", "and", "et"];

/// Units whose `<number><unit>` tokens describe size or quantity
const SIZE_UNITS: &[&str] = &["gb", "tb", "mb", "w", "mhz", "ghz"];

/// Spelling variants folded onto a single vendor token
const VENDOR_ALIASES: &[(&str, &str)] = &[
    (r"\bas rock\b", "asrock"),
    (r"\bg skill\b", "gskill"),
    (r"\bwestern digital\b", "wd"),
    (r"\bcooler master\b", "coolermaster"),
    (r"\blian li\b", "lianli"),
    (r"\bbe quiet\b", "bequiet"),
    (r"\bgiga byte\b", "gigabyte"),
];

fn vendor_aliases() -> &'static [(Regex, &'static str)] {
    static ALIASES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        VENDOR_ALIASES
            .iter()
            .map(|(pattern, replacement)| {
                (Regex::new(pattern).expect("vendor alias pattern"), *replacement)
            })
            .collect()
    })
}

fn rewrite_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // 2x1tb, 2 x 16gb → "2x 1tb", "2x 16gb"
            (r"\b(\d{1,2})\s*x\s*(\d)", "${1}x ${2}"),
            // French octets
            (r"\b(\d+)\s*go\b", "${1}gb"),
            (r"\b(\d+)to\b", "${1}tb"),
            // 16 gb → 16gb, 850 w → 850w
            (r"\b(\d+)\s+(gb|tb|mb|w|mhz|ghz)\b", "${1}${2}"),
            // 6800 xt → 6800xt, 3060 ti → 3060ti
            (r"\b(\d+)\s+(xtx|xt|ti|x3d|kf|ks)\b", "${1}${2}"),
        ]
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("rewrite pattern"), *replacement))
        .collect()
    })
}

fn is_size_token(token: &str) -> bool {
    match split_quantity(token) {
        Some((_, "x")) => token.len() <= 3,
        Some((_, unit)) => SIZE_UNITS.contains(&unit),
        None => false,
    }
}

/// Passes until the rewrite rules stop finding new neighbours
const MAX_PASSES: usize = 4;

/// Normalize a raw component name into a stable cache key.
///
/// Folds case, punctuation and whitespace, merges vendor spelling variants,
/// glues numbers to their units/suffixes, drops vendor prefixes, and moves
/// size/quantity tokens to the end so `2x1TB SSD` and `SSD 2x1TB` share a key.
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut key = normalize_pass(raw);
    for _ in 1..MAX_PASSES {
        let next = normalize_pass(&key);
        if next == key {
            break;
        }
        key = next;
    }
    key
}

/// One rewrite round. Dropping or reordering tokens can leave new
/// neighbours (`6800 16gb xt` → `6800 xt 16gb`), so `normalize` repeats it.
fn normalize_pass(raw: &str) -> String {
    let spaced: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut s = spaced
        .split_whitespace()
        .filter(|token| !DROPPED_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");

    for (re, replacement) in vendor_aliases() {
        s = re.replace_all(&s, *replacement).into_owned();
    }
    for (re, replacement) in rewrite_rules() {
        s = re.replace_all(&s, *replacement).into_owned();
    }

    let mut identity: Vec<&str> = Vec::new();
    let mut sizes: Vec<&str> = Vec::new();
    for token in s.split_whitespace() {
        let bucket = if is_size_token(token) {
            &mut sizes
        } else {
            &mut identity
        };
        if !bucket.contains(&token) {
            bucket.push(token);
        }
    }

    if identity.is_empty() && sizes.is_empty() {
        return UNKNOWN_KEY.to_string();
    }
    identity.extend(sizes);
    identity.join(" ")
}

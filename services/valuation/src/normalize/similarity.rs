//! Fuzzy fallback for keys that drift in spelling between listings

use strsim::jaro_winkler;

use super::name::UNKNOWN_KEY;

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub key: String,
    pub score: f64,
}

/// Tokens carrying digits, sorted. Two keys are only comparable when these
/// agree exactly, so `rtx 3060` never matches `rtx 3070`.
fn numeric_signature(key: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = key
        .split_whitespace()
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .collect();
    tokens.sort_unstable();
    tokens
}

/// Jaro-Winkler similarity between two normalized keys, 0.0 when their
/// model/capacity numbers differ.
pub fn similarity(a: &str, b: &str) -> f64 {
    if numeric_signature(a) != numeric_signature(b) {
        return 0.0;
    }
    jaro_winkler(a, b)
}

/// Best candidate at or above `threshold`; ties go to the smallest key.
pub fn best_match<I, S>(key: &str, candidates: I, threshold: f64) -> Option<FuzzyMatch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if key == UNKNOWN_KEY {
        return None;
    }

    let mut best: Option<FuzzyMatch> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate == UNKNOWN_KEY {
            continue;
        }
        let score = similarity(key, candidate);
        if score < threshold {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => {
                score > current.score || (score == current.score && candidate < current.key.as_str())
            }
        };
        if better {
            best = Some(FuzzyMatch {
                key: candidate.to_string(),
                score,
            });
        }
    }
    best
}

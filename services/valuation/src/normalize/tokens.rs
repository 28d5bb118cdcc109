/// Whitespace tokens of a normalized key, with the predicates the
/// categoriser and the heuristic price table are written in.
#[derive(Debug, Clone)]
pub struct KeyTokens<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> KeyTokens<'a> {
    pub fn new(key: &'a str) -> Self {
        Self {
            tokens: key.split_whitespace().collect(),
        }
    }

    pub fn has(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| *t == token)
    }

    pub fn has_any(&self, tokens: &[&str]) -> bool {
        tokens.iter().any(|t| self.has(t))
    }

    pub fn has_all(&self, tokens: &[&str]) -> bool {
        tokens.iter().all(|t| self.has(t))
    }

    /// A token starting with `prefix` (e.g. `rx` matches `rx6800`)
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.tokens.iter().any(|t| t.starts_with(prefix))
    }

    /// A token made of digits followed by `unit` (e.g. `850w`, `16gb`)
    pub fn has_quantity(&self, unit: &str) -> bool {
        self.tokens.iter().any(|t| split_quantity(t).map_or(false, |(_, u)| u == unit))
    }

    /// Numeric value of the first `<digits><unit>` token
    pub fn quantity(&self, unit: &str) -> Option<u32> {
        self.tokens.iter().find_map(|t| match split_quantity(t) {
            Some((value, u)) if u == unit => Some(value),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &&'a str> {
        self.tokens.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `850w` → (850, "w"); tokens without a leading number or unit yield None.
pub fn split_quantity(token: &str) -> Option<(u32, &str)> {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits == token.len() {
        return None;
    }
    let value = token[..digits].parse().ok()?;
    Some((value, &token[digits..]))
}

//! Verdict Engine: a pure mapping from (price, estimated, margin) to BUY/PASS

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::VerdictConfig;

pub const DEFAULT_MARGIN_THRESHOLD: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Pass,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Buy => "BUY",
            Verdict::Pass => "PASS",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictRule {
    MarginMet,
    BelowThreshold,
    NoProfit,
    UnpricedFavorable,
    UnpricedDisfavored,
    NoSignal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerdictPolicy {
    pub margin_threshold: f64,
    /// BUY a listing without a usable price when its parts are worth something
    pub favor_unpriced: bool,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            margin_threshold: DEFAULT_MARGIN_THRESHOLD,
            favor_unpriced: true,
        }
    }
}

impl From<&VerdictConfig> for VerdictPolicy {
    fn from(config: &VerdictConfig) -> Self {
        Self {
            margin_threshold: config.margin_threshold,
            favor_unpriced: config.favor_unpriced,
        }
    }
}

impl VerdictPolicy {
    pub fn decide(&self, price: f64, estimated: f64, margin: f64) -> Verdict {
        self.decide_with_rule(price, estimated, margin).0
    }

    /// `price` ≤ 0 (or not finite) is the unspecified-price branch.
    pub fn decide_with_rule(&self, price: f64, estimated: f64, margin: f64) -> (Verdict, VerdictRule) {
        let priced = price.is_finite() && price > 0.0;

        if !priced {
            return if estimated <= 0.0 {
                (Verdict::Pass, VerdictRule::NoSignal)
            } else if self.favor_unpriced {
                (Verdict::Buy, VerdictRule::UnpricedFavorable)
            } else {
                (Verdict::Pass, VerdictRule::UnpricedDisfavored)
            };
        }

        if estimated <= price {
            (Verdict::Pass, VerdictRule::NoProfit)
        } else if margin >= self.margin_threshold {
            (Verdict::Buy, VerdictRule::MarginMet)
        } else {
            (Verdict::Pass, VerdictRule::BelowThreshold)
        }
    }
}

/// Decide under the default policy
pub fn decide(price: f64, estimated: f64, margin: f64) -> Verdict {
    VerdictPolicy::default().decide(price, estimated, margin)
}

//! Valuation and decision engine for secondhand PC listings.
//!
//! Raw parts list → name normalisation → price cache → component estimator
//! → listing aggregate → verdict → append-only history.

pub mod cache;
pub mod component;
pub mod config;
pub mod error;
pub mod estimator;
pub mod history;
pub mod normalize;
pub mod pipeline;
pub mod pricing;
pub mod reasoning;
pub mod valuation;

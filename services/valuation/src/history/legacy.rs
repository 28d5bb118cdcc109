//! The dashboard's `window.SCRAP_HISTORY = [...];` script file

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use super::store::HistoryStore;
use crate::normalize::normalize;
use crate::valuation::ListingEvaluation;

const PREAMBLE: &str = "window.SCRAP_HISTORY = ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Already present (id not after the store's last id)
    pub skipped: usize,
    /// Stored totals disagreed with their parts and were recomputed
    pub repaired: usize,
}

/// Parse the script body into records, filling keys older entries lack.
pub fn parse_legacy(content: &str) -> Result<Vec<ListingEvaluation>> {
    let start = content
        .find('[')
        .context("Legacy history has no opening '['")?;
    let end = content
        .rfind(']')
        .filter(|end| *end > start)
        .context("Legacy history has no closing ']'")?;

    let mut records: Vec<ListingEvaluation> =
        serde_json::from_str(&content[start..=end]).context("Failed to parse legacy history array")?;

    for record in &mut records {
        for part in &mut record.parts {
            if part.normalized_key.is_empty() {
                part.normalized_key = normalize(&part.component);
            }
        }
    }
    Ok(records)
}

/// Render records in the dashboard's format, 4-space indented.
pub fn render_legacy(records: &[ListingEvaluation]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    let body = String::from_utf8(buf).context("Rendered history is not UTF-8")?;
    Ok(format!("{}{};\n", PREAMBLE, body))
}

pub fn import_legacy(path: &Path, store: &dyn HistoryStore) -> Result<ImportSummary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read legacy history: {:?}", path))?;
    let mut records = parse_legacy(&content)?;
    records.sort_by(|a, b| a.id.cmp(&b.id));

    let mut summary = ImportSummary::default();
    for mut record in records {
        if let Some(last) = store.last_id() {
            if record.id <= last {
                tracing::warn!("Skipping legacy record {}: not after {}", record.id, last);
                summary.skipped += 1;
                continue;
            }
        }
        if record.recompute() {
            tracing::warn!(
                "Legacy record {} had inconsistent totals, recomputed (margin {})",
                record.id,
                record.margin
            );
            summary.repaired += 1;
        }
        store.append(&record)?;
        summary.imported += 1;
    }

    tracing::info!(
        "Imported {} legacy records from {:?}, skipped {}, repaired {}",
        summary.imported,
        path,
        summary.skipped,
        summary.repaired
    );
    Ok(summary)
}

pub fn export_legacy(store: &dyn HistoryStore, path: &Path) -> Result<usize> {
    let records = store.list_all()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, render_legacy(&records)?)
        .with_context(|| format!("Failed to write legacy history: {:?}", path))?;
    tracing::info!("Exported {} records to {:?}", records.len(), path);
    Ok(records.len())
}

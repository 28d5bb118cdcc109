//! Append-only evaluation history

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::valuation::{canonical_url, EvaluationId, ListingEvaluation};

/// Append-only log of evaluations. Records are never edited or removed;
/// re-evaluating a URL adds a new record.
pub trait HistoryStore: Send + Sync {
    /// Fails if `evaluation.id` does not sort after every stored id.
    fn append(&self, evaluation: &ListingEvaluation) -> Result<()>;

    /// Every record in append order
    fn list_all(&self) -> Result<Vec<ListingEvaluation>>;

    fn last_id(&self) -> Option<EvaluationId>;

    /// Records for one ad, oldest first. URLs are compared in canonical form.
    fn list_by_url(&self, url: &str) -> Result<Vec<ListingEvaluation>> {
        let wanted = canonical_url(url);
        let mut matching: Vec<ListingEvaluation> = self
            .list_all()?
            .into_iter()
            .filter(|e| canonical_url(&e.url) == wanted)
            .collect();
        sort_by_date(&mut matching);
        Ok(matching)
    }

    /// Most recent record for one ad
    fn latest_for_url(&self, url: &str) -> Result<Option<ListingEvaluation>> {
        Ok(self.list_by_url(url)?.pop())
    }
}

pub fn sort_by_date(evaluations: &mut [ListingEvaluation]) {
    evaluations.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

fn check_order(last: Option<&EvaluationId>, id: &EvaluationId) -> Result<()> {
    if let Some(last) = last {
        if id <= last {
            anyhow::bail!("Evaluation id {} does not follow last stored id {}", id, last);
        }
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// One JSON record per line, opened in append mode for every write.
pub struct JsonlHistoryStore {
    path: PathBuf,
    last_id: Mutex<Option<EvaluationId>>,
}

impl JsonlHistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let last_id = read_records(&path)?.into_iter().map(|e| e.id).max();
        tracing::info!("Opened history {:?} (last id {:?})", path, last_id);
        Ok(Self {
            path,
            last_id: Mutex::new(last_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_records(path: &Path) -> Result<Vec<ListingEvaluation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open history file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut skipped = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ListingEvaluation>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping history line {} in {:?}: {}", lineno + 1, path, e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        tracing::warn!("Skipped {} unreadable history lines in {:?}", skipped, path);
    }
    Ok(records)
}

/// True when the file's last byte is not a newline
fn ends_mid_line(path: &Path) -> Result<bool> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("Failed to open history file: {:?}", path)),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl HistoryStore for JsonlHistoryStore {
    fn append(&self, evaluation: &ListingEvaluation) -> Result<()> {
        let mut last = lock(&self.last_id);
        check_order(last.as_ref(), &evaluation.id)?;

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let torn = ends_mid_line(&self.path)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file: {:?}", self.path))?;
        if torn {
            // Terminate an interrupted write so this record keeps its own line
            writeln!(file)?;
        }
        let json = serde_json::to_string(evaluation)?;
        writeln!(file, "{}", json)?;

        *last = Some(evaluation.id.clone());
        tracing::debug!("Appended evaluation {} for {}", evaluation.id, evaluation.url);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ListingEvaluation>> {
        // Hold the append lock so a half-written line is never read
        let _guard = lock(&self.last_id);
        read_records(&self.path)
    }

    fn last_id(&self) -> Option<EvaluationId> {
        lock(&self.last_id).clone()
    }
}

/// In-process history, for tests and dry runs.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<ListingEvaluation>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, evaluation: &ListingEvaluation) -> Result<()> {
        let mut records = lock(&self.records);
        check_order(records.last().map(|e| &e.id), &evaluation.id)?;
        records.push(evaluation.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ListingEvaluation>> {
        Ok(lock(&self.records).clone())
    }

    fn last_id(&self) -> Option<EvaluationId> {
        lock(&self.records).last().map(|e| e.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::PartEstimate;
    use crate::history::IdGenerator;
    use crate::valuation::VerdictPolicy;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, day)
            .unwrap()
            .and_hms_micro_opt(h, 0, 0, 0)
            .unwrap()
    }

    fn evaluation(ids: &IdGenerator, when: NaiveDateTime, url: &str, used: f64) -> ListingEvaluation {
        let (_, at) = ids.next_at(when);
        ListingEvaluation::assemble(
            at,
            url,
            "PC",
            Some(300.0),
            vec![PartEstimate::new("RTX 3060", "rtx 3060").with_prices(used, Some(350.0))],
            &VerdictPolicy::default(),
        )
    }

    #[test]
    fn test_jsonl_append_and_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history").join("evaluations.jsonl");
        let store = JsonlHistoryStore::open(&path).unwrap();
        assert!(store.last_id().is_none());

        let ids = IdGenerator::new();
        let url = "https://www.leboncoin.fr/ad/ordinateurs/3096529537";
        let first = evaluation(&ids, at(5, 16), url, 200.0);
        let other = evaluation(&ids, at(5, 17), "https://www.leboncoin.fr/ad/ordinateurs/1", 100.0);
        let second = evaluation(&ids, at(6, 9), &format!("{}?utm=x", url), 227.5);
        store.append(&first).unwrap();
        store.append(&other).unwrap();
        store.append(&second).unwrap();

        let for_url = store.list_by_url(url).unwrap();
        assert_eq!(for_url.len(), 2);
        assert_eq!(for_url[0], first);
        assert_eq!(for_url[1], second);
        assert_eq!(store.latest_for_url(url).unwrap(), Some(second.clone()));

        // Reopening picks up where the file left off
        let reopened = JsonlHistoryStore::open(&path).unwrap();
        assert_eq!(reopened.last_id(), Some(second.id.clone()));
        assert_eq!(reopened.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_out_of_order_ids() {
        let dir = TempDir::new().unwrap();
        let store = JsonlHistoryStore::open(dir.path().join("evaluations.jsonl")).unwrap();
        let ids = IdGenerator::new();
        let first = evaluation(&ids, at(5, 16), "https://example.com/ad/1", 200.0);
        store.append(&first).unwrap();

        assert!(store.append(&first).is_err());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_truncated_line_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluations.jsonl");
        let ids = IdGenerator::new();
        let kept = evaluation(&ids, at(4, 19), "https://example.com/ad/3", 200.0);
        let content = format!(
            "{}\n{{\"id\": \"2025-12-04T19:15:35.150602\", \"date\": \"2025-12",
            serde_json::to_string(&kept).unwrap()
        );
        std::fs::write(&path, content).unwrap();

        let store = JsonlHistoryStore::open(&path).unwrap();
        assert_eq!(store.last_id(), Some(kept.id.clone()));
        assert_eq!(store.list_all().unwrap(), vec![kept.clone()]);

        let next = evaluation(&ids, at(5, 9), "https://example.com/ad/3", 227.5);
        store.append(&next).unwrap();
        assert_eq!(store.list_all().unwrap(), vec![kept, next]);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryHistoryStore::new();
        let ids = IdGenerator::new();
        let url = "https://example.com/ad/7";
        // Same URL evaluated twice is kept twice
        store.append(&evaluation(&ids, at(5, 10), url, 200.0)).unwrap();
        store.append(&evaluation(&ids, at(5, 11), url, 227.5)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.list_by_url(url).unwrap().len(), 2);

        let stale = evaluation(&IdGenerator::new(), at(1, 0), url, 1.0);
        assert!(store.append(&stale).is_err());
    }
}

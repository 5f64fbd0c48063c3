use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::ProvenanceRecord;
use crate::error::HarvestError;

pub const LEDGER_HEADER: [&str; 3] = ["Search Term", "Image URL", "Source Page"];

/// Append-only CSV of every image saved during a run.
///
/// Opening truncates the file and writes the header; each row is flushed as
/// soon as it is recorded so an interrupted run keeps what it downloaded.
pub struct ProvenanceLedger {
    path: Utf8PathBuf,
    writer: BufWriter<File>,
    recorded: HashSet<(String, String)>,
    rows: usize,
}

impl ProvenanceLedger {
    pub fn create(path: &Utf8Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| HarvestError::Ledger(format!("create {parent}: {err}")))?;
        }
        let file = File::create(path.as_std_path())
            .map_err(|err| HarvestError::Ledger(format!("open {path}: {err}")))?;
        let mut ledger = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            recorded: HashSet::new(),
            rows: 0,
        };
        ledger.write_row(&LEDGER_HEADER)?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn contains(&self, query_label: &str, url: &str) -> bool {
        self.recorded
            .contains(&(query_label.to_string(), url.to_string()))
    }

    /// Appends one row. A `(query_label, url)` pair already in the ledger is
    /// skipped and reported as `false`.
    pub fn record(&mut self, record: &ProvenanceRecord) -> Result<bool, HarvestError> {
        let key = (record.query_label.clone(), record.url.clone());
        if self.recorded.contains(&key) {
            return Ok(false);
        }
        self.write_row(&[
            record.query_label.as_str(),
            record.url.as_str(),
            record.source_page.as_str(),
        ])?;
        self.recorded.insert(key);
        self.rows += 1;
        Ok(true)
    }

    /// Flushes and closes the file. No writes are possible afterwards.
    pub fn finalize(mut self) -> Result<Utf8PathBuf, HarvestError> {
        self.writer
            .flush()
            .map_err(|err| HarvestError::Ledger(err.to_string()))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|err| HarvestError::Ledger(err.to_string()))?;
        Ok(self.path)
    }

    fn write_row(&mut self, fields: &[&str]) -> Result<(), HarvestError> {
        let line = fields
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|err| HarvestError::Ledger(format!("write {}: {err}", self.path)))
    }
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageReference;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("Leaf Spot plante"), "Leaf Spot plante");
        assert_eq!(
            escape_field("https://x.example/?a=1,2"),
            "\"https://x.example/?a=1,2\""
        );
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn records_each_label_url_pair_once() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let mut ledger = ProvenanceLedger::create(&root.join("sources.csv")).unwrap();
        let reference = ImageReference::new("https://img.example/1.jpg", "https://search.example/r");

        assert!(!ledger.contains("Leaf Spot plante", &reference.url));
        assert!(ledger.record(&ProvenanceRecord::new("Leaf Spot plante", &reference)).unwrap());
        assert!(ledger.contains("Leaf Spot plante", &reference.url));
        assert!(!ledger.record(&ProvenanceRecord::new("Leaf Spot plante", &reference)).unwrap());
        assert!(ledger.record(&ProvenanceRecord::new("Blight plante", &reference)).unwrap());
        assert_eq!(ledger.rows(), 2);

        let path = ledger.finalize().unwrap();
        let content = fs::read_to_string(path.as_std_path()).unwrap();
        let rows: Vec<_> = content.lines().skip(1).collect();
        assert_eq!(
            rows,
            vec![
                "Leaf Spot plante,https://img.example/1.jpg,https://search.example/r",
                "Blight plante,https://img.example/1.jpg,https://search.example/r",
            ]
        );
    }
}

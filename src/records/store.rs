//! Case log persistence
//!
//! The log is a single JSON array rewritten whole on every append. There
//! is no locking: one writer at a time is assumed. The rewrite goes to a
//! sibling temp file that is then renamed over the log, so a crash leaves
//! either the old or the new list on disk, never half of one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HeartestError, Result};
use crate::records::case::CaseRecord;

/// Suffix of the temp file used during a rewrite
const TEMP_SUFFIX: &str = ".tmp";

/// JSON-file backed, append-only list of case records
#[derive(Debug, Clone)]
pub struct CaseStore {
    path: PathBuf,
}

impl CaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in the order they were saved
    ///
    /// A missing or blank file is an empty log.
    ///
    /// # Errors
    /// * `CorruptStore` - If the file is not a JSON array of case records
    pub fn load(&self) -> Result<Vec<CaseRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| HeartestError::CorruptStore {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// All records, newest first, for display
    pub fn list_all(&self) -> Result<Vec<CaseRecord>> {
        let mut records = self.load()?;
        records.reverse();
        Ok(records)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append a record and rewrite the log
    ///
    /// # Errors
    /// * `IncompleteValveSet` - If the record lacks a valve recording; nothing is written
    /// * `CorruptStore` - If the existing log cannot be read; nothing is written
    pub fn append(&self, record: CaseRecord) -> Result<()> {
        record.check_valves()?;

        let mut records = self.load()?;
        records.push(record);
        self.write_all(&records)?;

        log::info!(
            "Saved case #{} to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_all(&self, records: &[CaseRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(records)?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(TEMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::case::{ValveSite, DATE_FORMAT};
    use crate::records::upload::UploadDirectory;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(name: &str, date: &str) -> CaseRecord {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "age": 40,
            "file": "A_x.wav, P_x.wav, T_x.wav, M_x.wav",
            "date": date,
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("patient_data.json"));
        assert!(store.list_all().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_append_to_empty_store() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("patient_data.json"));
        let test_record = record("Test", "2024-01-01 00:00:00");

        store.append(test_record.clone()).unwrap();

        assert_eq!(store.list_all().unwrap(), vec![test_record]);
    }

    #[test]
    fn test_list_all_is_newest_first() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("cases.json"));

        for i in 0..5 {
            store
                .append(record(&format!("P{}", i), &format!("2024-01-0{} 09:00:00", i + 1)))
                .unwrap();
        }

        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 5);
        let names: Vec<_> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["P4", "P3", "P2", "P1", "P0"]);
        assert!(listed.windows(2).all(|w| w[0].date >= w[1].date));

        let loaded = store.load().unwrap();
        assert_eq!(loaded[0].name, "P0");
    }

    #[test]
    fn test_incomplete_record_rejected_and_store_unchanged() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("cases.json"));
        store.append(record("Full", "2024-01-01 00:00:00")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let mut partial = record("Partial", "2024-01-02 00:00:00");
        partial.files.truncate(3);

        let err = store.append(partial).unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_VALVE_SET");
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_comma_in_file_name_rejected_before_write() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("cases.json"));
        store.append(record("Full", "2024-01-01 00:00:00")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let mut record = record("Comma", "2024-01-02 00:00:00");
        record.files[0] = "Aortic_visit 2, left.wav".to_string();

        let err = store.append(record).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_every_stored_name_round_trips() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("cases.json"));

        let mut record = record("Names", "2024-01-03 00:00:00");
        for (i, site) in ValveSite::ALL.into_iter().enumerate() {
            record.files[i] = UploadDirectory::stored_name(site, "visit 2, left.wav").unwrap();
        }
        store.append(record.clone()).unwrap();

        assert_eq!(store.list_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_corrupt_store_is_reported_not_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cases.json");
        fs::write(&path, "[{\"name\": \"Trunc").unwrap();
        let store = CaseStore::new(&path);

        assert!(matches!(store.load(), Err(HeartestError::CorruptStore { .. })));
        assert!(store.append(record("New", "2024-01-01 00:00:00")).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"name\": \"Trunc");
    }

    #[test]
    fn test_file_layout_matches_log_format() {
        let dir = tempdir().unwrap();
        let store = CaseStore::new(dir.path().join("nested").join("cases.json"));
        store.append(record("Test", "2024-01-01 00:00:00")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw.is_array());
        assert_eq!(raw[0]["file"], "A_x.wav, P_x.wav, T_x.wav, M_x.wav");
        assert_eq!(raw[0]["date"], "2024-01-01 00:00:00");
        assert!(raw[0].get("bmi").is_none());

        let parsed = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", DATE_FORMAT).unwrap();
        assert_eq!(store.load().unwrap()[0].date, parsed);
        assert!(!dir.path().join("nested").join("cases.json.tmp").exists());
    }
}

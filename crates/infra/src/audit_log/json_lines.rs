use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clinicledger_events::AuditEntry;

use super::{AuditError, AuditLog};

/// Audit log persisted as JSON Lines: one entry per line, appended and
/// flushed per call.
#[derive(Debug)]
pub struct JsonLinesAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonLinesAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_string(&entry).map_err(|e| AuditError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| AuditError::Poisoned)?;
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditError::Io(e)),
        };

        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| {
                AuditError::Serialization(format!("line {}: {e}", idx + 1))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clinicledger_core::UserId;
    use clinicledger_events::AuditCategory;

    fn entry(action: &str) -> AuditEntry {
        AuditEntry {
            action: action.to_string(),
            category: AuditCategory::Financial,
            user_id: UserId::new("u-1"),
            user_name: "Front Desk".to_string(),
            timestamp: Utc::now(),
            details: format!("{action} details"),
        }
    }

    #[test]
    fn entries_round_trip_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonLinesAuditLog::new(dir.path().join("logs").join("audit.log"));

        assert!(log.entries().unwrap().is_empty());
        log.append(entry("Invoice Created")).unwrap();
        log.append(entry("Receipt Recorded")).unwrap();

        let actions: Vec<String> = log.entries().unwrap().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["Invoice Created", "Receipt Recorded"]);
    }

    #[test]
    fn each_entry_is_one_camel_case_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonLinesAuditLog::new(dir.path().join("audit.log"));
        log.append(entry("Record Voided")).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["userName"], "Front Desk");
        assert_eq!(value["category"], "Financial");
    }

    #[test]
    fn garbage_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        fs::write(&path, "not json\n").unwrap();

        assert!(matches!(
            JsonLinesAuditLog::new(path).entries(),
            Err(AuditError::Serialization(msg)) if msg.starts_with("line 1")
        ));
    }
}

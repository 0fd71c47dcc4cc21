//! Append-only request audit log
//!
//! One CSV line per screened comment. The log is an observability
//! collaborator, not a correctness dependency: any write failure is logged
//! and swallowed so a full disk can never fail a detection request.

use chrono::Utc;
use nameguard_core::DetectionResult;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: &str = "timestamp,request_id,original_comment,processed_comment,has_name,category,\
    detected_name,confidence,tier_used,tier_detail,processing_time_ms,sanctions_checked,\
    sanctions_found,sanctions_matched_name,sanctions_status";

/// Append-only audit log shared across request handlers
pub struct RequestAuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl RequestAuditLog {
    /// Open (or create) the log file, writing the header on first use
    ///
    /// An unopenable path yields a disabled log that drops records.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match open_append(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "audit log disabled");
                None
            }
        };
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    /// A log that records nothing
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            file: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.lock().is_some()
    }

    /// Append one request record; failures are logged and ignored
    pub fn record(
        &self,
        request_id: &str,
        original_comment: &str,
        processed_comment: &str,
        result: &DetectionResult,
    ) {
        let mut guard = self.file.lock();
        let Some(file) = guard.as_mut() else {
            return;
        };

        let sanctions = result.sanctions_check.as_ref();
        let line = [
            Utc::now().to_rfc3339(),
            request_id.to_string(),
            escape(original_comment),
            escape(processed_comment),
            result.has_name.to_string(),
            result.category.as_str().to_string(),
            escape(result.detected_name.as_deref().unwrap_or("")),
            format!("{:.3}", result.confidence),
            result.tier_used.to_string(),
            escape(result.tier_detail.as_deref().unwrap_or("")),
            result
                .processing_time_ms
                .map(|ms| format!("{:.2}", ms))
                .unwrap_or_default(),
            sanctions.map(|s| s.checked.to_string()).unwrap_or_default(),
            sanctions.map(|s| s.found.to_string()).unwrap_or_default(),
            escape(
                sanctions
                    .and_then(|s| s.matched_name.as_deref())
                    .unwrap_or(""),
            ),
            sanctions
                .and_then(|s| s.status)
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        ]
        .join(",");

        if let Err(e) = writeln!(file, "{}", line) {
            tracing::warn!(path = %self.path.display(), error = %e, "audit write failed");
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        writeln!(file, "{}", HEADER)?;
    }
    Ok(file)
}

/// Quote a CSV field when it carries a delimiter, quote, or newline
fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

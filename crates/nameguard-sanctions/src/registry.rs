//! Sanctions registry loading and hot reload
//!
//! Parses the tab-delimited registry table into records, builds the
//! [`SanctionsIndex`], and publishes it behind a swap lock. Reload builds a
//! complete replacement off to the side and swaps it in, so concurrent
//! lookups never see a half-built index.

use crate::matcher::SanctionsIndex;
use nameguard_core::{Error, NameCategory, Result, SanctionsCheckResult, SanctionsRecord,
    SanctionsStatus};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared handle to the current sanctions index
pub struct SanctionsRegistry {
    path: PathBuf,
    index: RwLock<Arc<SanctionsIndex>>,
    loaded: RwLock<bool>,
}

/// Registry summary for health and stats endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub loaded: bool,
    pub total_names: usize,
    pub unique_parts: usize,
    pub file: String,
}

impl SanctionsRegistry {
    /// Create a registry handle and attempt the initial load
    ///
    /// A missing or unreadable table leaves the registry empty rather than
    /// failing startup; screening then reports not-checked.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let registry = Self {
            path: path.into(),
            index: RwLock::new(Arc::new(SanctionsIndex::empty())),
            loaded: RwLock::new(false),
        };

        match registry.reload() {
            Ok(count) => tracing::info!(records = count, "sanctions registry loaded"),
            Err(e) => tracing::warn!(
                path = %registry.path.display(),
                error = %e,
                "sanctions registry unavailable"
            ),
        }
        registry
    }

    /// Rebuild the index from the table and swap it in; returns record count
    pub fn reload(&self) -> Result<usize> {
        let records = parse_table(&self.path)?;
        let count = records.len();
        let fresh = Arc::new(SanctionsIndex::build(records));

        *self.index.write() = fresh;
        *self.loaded.write() = true;
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        *self.loaded.read()
    }

    /// Screen a detected name; not-checked when the registry never loaded
    pub fn check(&self, name: &str, category: NameCategory) -> SanctionsCheckResult {
        if !self.is_loaded() {
            return SanctionsCheckResult::not_checked();
        }
        let index = Arc::clone(&self.index.read());
        index.check(name, category)
    }

    pub fn stats(&self) -> RegistryStats {
        let index = Arc::clone(&self.index.read());
        RegistryStats {
            loaded: self.is_loaded(),
            total_names: index.name_count(),
            unique_parts: index.part_count(),
            file: self.path.display().to_string(),
        }
    }
}

/// Parse the tab-delimited registry table
///
/// Expected header: `sid  name  translit_name  aliases  status`. Rows with
/// an empty name are skipped. Aliases are semicolon-delimited in one column.
fn parse_table(path: &Path) -> Result<Vec<SanctionsRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::sanctions(format!("failed to read {}: {}", path.display(), e)))?;

    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| Error::sanctions("registry table is empty"))?;
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    let col = |name: &str| columns.iter().position(|c| *c == name);
    let sid_col = col("sid").ok_or_else(|| Error::sanctions("missing 'sid' column"))?;
    let name_col = col("name").ok_or_else(|| Error::sanctions("missing 'name' column"))?;
    let translit_col = col("translit_name");
    let aliases_col = col("aliases");
    let status_col = col("status");

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |idx: Option<usize>| {
            idx.and_then(|i| fields.get(i))
                .map(|f| f.trim())
                .unwrap_or("")
        };

        let name = field(Some(name_col));
        if name.is_empty() {
            continue;
        }

        let aliases = field(aliases_col)
            .split(';')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        records.push(SanctionsRecord {
            sid: field(Some(sid_col)).to_string(),
            name: name.to_string(),
            translit_name: field(translit_col).to_string(),
            aliases,
            status: SanctionsStatus::parse(field(status_col)),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TABLE: &str = "sid\tname\ttranslit_name\taliases\tstatus\n\
        101\tВітченко Ігор Петрович\tVitchenko Ihor\tVitchenko Igor; Витченко Игорь\tactive\n\
        102\tІванов Олег Олександрович\t\t\texpired\n\
        \n\
        103\t\t\t\tactive\n";

    fn write_table(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_check() {
        let file = write_table(TABLE);
        let registry = SanctionsRegistry::open(file.path());

        assert!(registry.is_loaded());
        let result = registry.check("Вітченко Ігор Петрович", NameCategory::FullName);
        assert!(result.found);

        let stats = registry.stats();
        assert!(stats.loaded);
        // Two primary names plus two aliases
        assert_eq!(stats.total_names, 4);
    }

    #[test]
    fn test_rows_without_name_are_skipped() {
        let file = write_table(TABLE);
        let records = parse_table(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].aliases.len(), 2);
        assert_eq!(records[1].status, SanctionsStatus::Expired);
    }

    #[test]
    fn test_missing_file_reports_not_checked() {
        let registry = SanctionsRegistry::open("/nonexistent/sanctions.tsv");

        assert!(!registry.is_loaded());
        let result = registry.check("Іванов Петро", NameCategory::SurnameName);
        assert!(!result.checked);
    }

    #[test]
    fn test_reload_swaps_in_new_table() {
        let mut file = write_table(TABLE);
        let registry = SanctionsRegistry::open(file.path());
        assert!(registry
            .check("Іванов Олег Олександрович", NameCategory::FullName)
            .found);

        // Rewrite the table with one record gone
        use std::io::Seek;
        file.as_file_mut().set_len(0).unwrap();
        file.as_file_mut().rewind().unwrap();
        let smaller = "sid\tname\ttranslit_name\taliases\tstatus\n\
            101\tВітченко Ігор Петрович\t\t\tactive\n";
        file.write_all(smaller.as_bytes()).unwrap();
        file.flush().unwrap();

        let count = registry.reload().unwrap();
        assert_eq!(count, 1);
        assert!(!registry
            .check("Іванов Олег Олександрович", NameCategory::FullName)
            .found);
    }

    #[test]
    fn test_bad_header_is_an_error() {
        let file = write_table("id\tfull_name\n1\tІванов\n");
        assert!(parse_table(file.path()).is_err());
    }
}

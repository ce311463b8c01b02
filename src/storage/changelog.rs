use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::DatasetError;

/// Run history, newest entry first
#[derive(Debug, Clone)]
pub struct Changelog {
    path: PathBuf,
}

impl Changelog {
    /// Open the changelog at `path`, creating an empty file if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let changelog = Self { path: path.into() };

        if let Some(parent) = changelog.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }

        if !changelog.path.exists() {
            fs::write(&changelog.path, "").map_err(|e| DatasetError::io(&changelog.path, e))?;
        }

        Ok(changelog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format one dated entry
    pub fn entry(counts: &[(String, usize)], date: NaiveDate) -> String {
        let mut entry = format!("\n### {} ###\n", date.format("%Y-%m-%d"));
        for (source, count) in counts {
            entry.push_str(&format!("{}: {}\n", source, count));
        }
        entry
    }

    /// Put a new entry in front of the existing content
    pub fn prepend(&self, counts: &[(String, usize)], date: NaiveDate) -> Result<(), DatasetError> {
        let existing = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(DatasetError::io(&self.path, e)),
        };

        let content = Self::entry(counts, date) + &existing;
        fs::write(&self.path, content).map_err(|e| DatasetError::io(&self.path, e))?;

        tracing::debug!("Prepended changelog entry to {}", self.path.display());
        Ok(())
    }
}

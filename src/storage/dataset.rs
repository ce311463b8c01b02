use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::DatasetError;
use crate::models::DatasetRow;

/// The persisted CSV dump of enriched papers
#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    /// Open the dump at `path`, creating its directory and a header-only file if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.parent() {
            fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
        }

        if !store.path.exists() {
            tracing::info!("Creating empty dump at {}", store.path.display());
            store.save(&[])?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// Read every row of the dump
    pub fn load(&self) -> Result<Vec<DatasetRow>, DatasetError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<DatasetRow>, csv::Error>>()?;

        tracing::debug!("Read {} rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    /// Replace the dump with `rows`
    ///
    /// The table is written to a temporary file next to the dump and renamed
    /// over it, so readers never see a partially written file.
    pub fn save(&self, rows: &[DatasetRow]) -> Result<(), DatasetError> {
        let dir = self.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DatasetError::io(dir, e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut tmp);
            writer.write_record(DatasetRow::HEADERS)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush().map_err(|e| DatasetError::io(&self.path, e))?;
        }

        if let Some(permissions) = self.dump_permissions() {
            tmp.as_file()
                .set_permissions(permissions)
                .map_err(|e| DatasetError::io(&self.path, e))?;
        }
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| DatasetError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| DatasetError::Persist {
                path: self.path.display().to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Permissions the rewritten dump gets: those of the current dump, or
    /// world-readable for a new one (temporary files start out owner-only)
    fn dump_permissions(&self) -> Option<fs::Permissions> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => new_dump_permissions(),
        }
    }
}

#[cfg(unix)]
fn new_dump_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_dump_permissions() -> Option<fs::Permissions> {
    None
}

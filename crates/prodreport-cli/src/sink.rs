//! Atomic workbook output
//!
//! The workbook is written to a temporary file beside the destination and
//! renamed over it, so a failed save never leaves a truncated report.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use prodreport_core::{PersistError, ReportSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, source: io::Error) -> PersistError {
        let path = self.destination();
        if source.kind() == io::ErrorKind::PermissionDenied {
            PersistError::Locked { path }
        } else {
            PersistError::Io { path, source }
        }
    }
}

impl ReportSink for FileSink {
    fn destination(&self) -> String {
        self.path.display().to_string()
    }

    fn persist(&mut self, workbook: &[u8]) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.error(e))?;
        tmp.write_all(workbook).map_err(|e| self.error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.error(e))?;
        debug!(temp = %tmp.path().display(), "workbook staged");
        tmp.persist(&self.path).map_err(|e| self.error(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(&path, b"old").unwrap();

        let mut sink = FileSink::new(&path);
        sink.persist(b"new workbook").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new workbook");
        // Only the report is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("missing").join("report.xlsx"));
        let err = sink.persist(b"data").unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
        assert!(err.to_string().contains("report.xlsx"));
    }

    #[test]
    fn permission_denied_reads_as_locked() {
        let sink = FileSink::new("Production_Performance_Report.xlsx");
        let err = sink.error(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(
            err.to_string(),
            "Could not save Production_Performance_Report.xlsx. \
             The file may be open in another program"
        );
    }
}

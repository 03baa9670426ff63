use std::path::{Path, PathBuf};

const LEDGER_FILE: &str = "ledger.json";
const SNAPSHOT_FILE: &str = "market_snapshot.json";
const REPORT_FILE: &str = "cycle_report.json";

/// Manages the standard file locations inside the data directory.
pub struct PathManager {
    data_dir: PathBuf,
}

impl PathManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The append-only trade ledger.
    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    /// The market snapshot consumed by the file feed.
    pub fn snapshot_file(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// The latest cycle summary.
    pub fn report_file(&self) -> PathBuf {
        self.data_dir.join(REPORT_FILE)
    }

    /// Ensures the data directory exists, creating it if necessary.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the directory exists or was created.
    /// * `Err` if creation fails.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

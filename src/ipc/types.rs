use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything a handler may touch. Passed explicitly into every call; there
/// is no ambient session.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
}

impl AppState {
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let store = SqliteStore::open(path)?;
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(())
    }
}

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::server::ServerHandle;
use crate::storage;
use crate::updater::UpdateRelay;

/// Everything the command handlers and the run loop need, built once at
/// startup and handed to Tauri's managed state. There is no other shared
/// mutable state in the application.
pub struct AppContext {
    projects_path: PathBuf,
    /// Serializes writers so concurrent saves cannot interleave on disk.
    write_lock: Mutex<()>,
    pub server: Mutex<Option<ServerHandle>>,
    pub updates: UpdateRelay,
}

/// Result of a save as seen by the UI: `ok` plus an optional message.
/// Write failures are reported here rather than raised.
#[derive(Debug, Serialize)]
pub struct SaveOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppContext {
    pub fn new(data_dir: PathBuf, updates: UpdateRelay) -> Self {
        Self {
            projects_path: data_dir.join("projects.json"),
            write_lock: Mutex::new(()),
            server: Mutex::new(None),
            updates,
        }
    }

    /// Read failures are swallowed by design: the UI treats corrupt or
    /// missing storage as an empty collection.
    pub fn load_projects(&self) -> Vec<Value> {
        storage::read_projects(&self.projects_path)
    }

    /// Whole-collection replace. Non-array input is coerced to an empty list
    /// before writing, not rejected.
    pub async fn save_projects(&self, items: Value) -> SaveOutcome {
        let items = match items {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let _guard = self.write_lock.lock().await;
        match storage::write_projects(&self.projects_path, &items) {
            Ok(()) => SaveOutcome {
                ok: true,
                error: None,
            },
            Err(error) => {
                tracing::warn!(%error, "failed to persist projects");
                SaveOutcome {
                    ok: false,
                    error: Some(error),
                }
            }
        }
    }
}

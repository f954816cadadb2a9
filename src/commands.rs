use serde_json::Value;
use tauri::State;

use crate::launcher;
use crate::state::{AppContext, SaveOutcome};

/// Fire-and-forget: a failed launch is logged, never surfaced to the UI.
#[tauri::command]
pub fn launch_exe(exe_path: Option<String>) {
    launcher::launch_detached(exe_path.as_deref().unwrap_or(""));
}

#[tauri::command]
pub fn open_in_vlc(file_path: Option<String>) {
    launcher::open_in_vlc(file_path.as_deref().unwrap_or(""));
}

/// Always succeeds; corrupt or missing storage reads as an empty list.
#[tauri::command]
pub fn load_projects(context: State<'_, AppContext>) -> Vec<Value> {
    context.load_projects()
}

/// Replaces the whole collection. The outer Result is always `Ok`; write
/// failures are reported inside `SaveOutcome`.
#[tauri::command]
pub async fn save_projects(
    context: State<'_, AppContext>,
    items: Value,
) -> Result<SaveOutcome, String> {
    Ok(context.save_projects(items).await)
}

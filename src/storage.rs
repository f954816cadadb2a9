use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;

/// Reads the persisted project collection.
///
/// Any read failure — missing file, unreadable file, invalid JSON, or a JSON
/// document that is not an array — yields an empty collection. The UI is
/// never blocked on storage corruption.
pub fn read_projects(path: &Path) -> Vec<Value> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return Vec::new(),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!(
                path = %path.display(),
                "projects file is not a JSON array, treating as empty"
            );
            Vec::new()
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "projects file is not valid JSON, treating as empty"
            );
            Vec::new()
        }
    }
}

/// Replaces the persisted project collection with `items`.
///
/// The contents are written to a sibling temp file and renamed over the
/// target, so a crash or a racing reader never observes a half-written file.
pub fn write_projects(path: &Path, items: &[Value]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create data directory: {err}"))?;
    }

    let payload = serde_json::to_vec_pretty(items)
        .map_err(|err| format!("Failed to serialize projects: {err}"))?;

    let tmp = path.with_extension("json.tmp");
    let mut file =
        fs::File::create(&tmp).map_err(|err| format!("Failed to write projects file: {err}"))?;
    file.write_all(&payload)
        .map_err(|err| format!("Failed to write projects file: {err}"))?;
    file.sync_all()
        .map_err(|err| format!("Failed to flush projects file: {err}"))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|err| format!("Failed to replace projects file: {err}"))?;
    Ok(())
}

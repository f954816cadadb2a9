use std::process::{Command, Stdio};

/// Fire-and-forget launch of an external program.
///
/// An empty or blank path is a no-op. A spawn failure is logged and
/// swallowed; by design the caller never learns whether the launch worked.
pub fn launch_detached(path: &str) {
    let path = path.trim();
    if path.is_empty() {
        return;
    }

    let mut command = Command::new(path);
    match spawn_detached(&mut command) {
        Ok(pid) => {
            tracing::debug!(path, pid, "launched external program");
        }
        Err(error) => {
            tracing::warn!(path, %error, "failed to launch external program");
        }
    }
}

/// Best-effort handoff of a media file to VLC. Same policy as
/// `launch_detached`: blank input is a no-op, failures are only logged.
pub fn open_in_vlc(file_path: &str) {
    let file_path = file_path.trim();
    if file_path.is_empty() {
        return;
    }

    let mut command = Command::new(vlc_binary());
    command.arg(file_path);
    match spawn_detached(&mut command) {
        Ok(pid) => {
            tracing::debug!(file_path, pid, "opened file in VLC");
        }
        Err(error) => {
            tracing::warn!(file_path, %error, "failed to open file in VLC");
        }
    }
}

/// Spawns with no connected stdio and no lifetime linkage to this process:
/// the child must outlive the application.
fn spawn_detached(command: &mut Command) -> std::io::Result<u32> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group so the child survives this process.
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    let child = command.spawn()?;
    Ok(child.id())
}

fn vlc_binary() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/VLC.app/Contents/MacOS/VLC"
    } else if cfg!(target_os = "windows") {
        r"C:\Program Files\VideoLAN\VLC\vlc.exe"
    } else {
        "vlc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_a_no_op() {
        launch_detached("");
        launch_detached("   ");
        open_in_vlc("");
    }

    #[test]
    fn missing_binary_does_not_surface_an_error() {
        launch_detached("/no/such/binary");
    }

    #[cfg(unix)]
    #[test]
    fn real_binary_launches_without_error() {
        launch_detached("/bin/true");
    }
}

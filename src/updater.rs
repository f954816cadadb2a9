use serde_json::{json, Value};
use tokio::sync::broadcast;

/// One phase of the update-check lifecycle. The external facility drives all
/// transitions; this module only observes and forwards.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    Checking,
    Available(Value),
    NotAvailable,
    Progress(Value),
    Downloaded(Value),
    Error(String),
}

impl UpdateEvent {
    /// Event channel name the UI subscribes to.
    pub fn channel(&self) -> &'static str {
        match self {
            UpdateEvent::Checking => "update-checking",
            UpdateEvent::Available(_) => "update-available",
            UpdateEvent::NotAvailable => "update-not-available",
            UpdateEvent::Progress(_) => "download-progress",
            UpdateEvent::Downloaded(_) => "update-downloaded",
            UpdateEvent::Error(_) => "update-error",
        }
    }

    /// Payload forwarded to the UI, verbatim from the facility.
    pub fn payload(&self) -> Value {
        match self {
            UpdateEvent::Checking | UpdateEvent::NotAvailable => Value::Null,
            UpdateEvent::Available(info)
            | UpdateEvent::Progress(info)
            | UpdateEvent::Downloaded(info) => info.clone(),
            UpdateEvent::Error(message) => json!({ "message": message }),
        }
    }
}

/// Fan-out channel between the update check task and the window forwarder.
/// Events are delivered in emission order; there is one check per session.
#[derive(Clone)]
pub struct UpdateRelay {
    tx: broadcast::Sender<UpdateEvent>,
}

impl UpdateRelay {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }

    pub fn emit(&self, event: UpdateEvent) {
        // No subscriber yet means the window is not up; those events drop.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }
}

impl Default for UpdateRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Replays relay events onto the window event channels until the relay
/// closes.
pub async fn forward_update_events(
    mut rx: broadcast::Receiver<UpdateEvent>,
    app: tauri::AppHandle,
) {
    use tauri::Emitter;

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(error) = app.emit(event.channel(), event.payload()) {
            tracing::warn!(%error, channel = event.channel(), "failed to forward update event");
        }
    }
}

/// A downloaded update parked until the application quits. Installation is
/// triggered from the run loop's exit path, never from the notifier.
#[cfg(desktop)]
#[derive(Default)]
pub struct PendingInstall(pub std::sync::Mutex<Option<(tauri_plugin_updater::Update, Vec<u8>)>>);

/// Runs the single update check for this session and forwards each phase
/// through the relay. Errors from the facility become `update-error` events;
/// nothing is retried.
#[cfg(desktop)]
pub async fn run_update_check(app: tauri::AppHandle, relay: UpdateRelay) {
    use tauri::Manager;
    use tauri_plugin_updater::UpdaterExt;

    let updater = match app.updater() {
        Ok(updater) => updater,
        Err(error) => {
            relay.emit(UpdateEvent::Error(error.to_string()));
            return;
        }
    };

    relay.emit(UpdateEvent::Checking);
    let update = match updater.check().await {
        Ok(Some(update)) => update,
        Ok(None) => {
            relay.emit(UpdateEvent::NotAvailable);
            return;
        }
        Err(error) => {
            tracing::warn!(%error, "update check failed");
            relay.emit(UpdateEvent::Error(error.to_string()));
            return;
        }
    };

    tracing::info!(version = %update.version, "update available");
    relay.emit(UpdateEvent::Available(json!({
        "version": update.version.clone(),
        "currentVersion": update.current_version.clone(),
        "notes": update.body.clone(),
    })));

    let mut transferred: u64 = 0;
    let progress_relay = relay.clone();
    let bytes = match update
        .download(
            move |chunk, total| {
                transferred += chunk as u64;
                let percent = total.map(|total| {
                    if total == 0 {
                        0.0
                    } else {
                        transferred as f64 * 100.0 / total as f64
                    }
                });
                progress_relay.emit(UpdateEvent::Progress(json!({
                    "percent": percent,
                    "transferred": transferred,
                    "total": total,
                })));
            },
            || {},
        )
        .await
    {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "update download failed");
            relay.emit(UpdateEvent::Error(error.to_string()));
            return;
        }
    };

    relay.emit(UpdateEvent::Downloaded(json!({
        "version": update.version.clone(),
    })));

    let pending = app.state::<PendingInstall>();
    if let Ok(mut slot) = pending.0.lock() {
        *slot = Some((update, bytes));
    };
}

/// Installs a previously downloaded update, if any. Called once on quit.
#[cfg(desktop)]
pub fn install_pending(app: &tauri::AppHandle) {
    use tauri::Manager;

    let pending = app.state::<PendingInstall>();
    let parked = pending.0.lock().ok().and_then(|mut slot| slot.take());
    let Some((update, bytes)) = parked else {
        return;
    };

    match update.install(bytes) {
        Ok(()) => tracing::info!(version = %update.version, "installed update on quit"),
        Err(error) => tracing::warn!(%error, "failed to install downloaded update"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn relay_delivers_lifecycle_in_emission_order() {
        let relay = UpdateRelay::new();
        let mut rx = relay.subscribe();

        relay.emit(UpdateEvent::Checking);
        relay.emit(UpdateEvent::Available(json!({ "version": "1.2.0" })));
        relay.emit(UpdateEvent::Progress(json!({
            "percent": 50.0,
            "transferred": 512,
            "total": 1024,
        })));
        relay.emit(UpdateEvent::Downloaded(json!({ "version": "1.2.0" })));

        let mut received = Vec::new();
        for _ in 0..4 {
            let event = rx.recv().await.unwrap();
            received.push((event.channel(), event.payload()));
        }

        assert_eq!(
            received,
            vec![
                ("update-checking", Value::Null),
                ("update-available", json!({ "version": "1.2.0" })),
                (
                    "download-progress",
                    json!({ "percent": 50.0, "transferred": 512, "total": 1024 })
                ),
                ("update-downloaded", json!({ "version": "1.2.0" })),
            ]
        );
    }

    #[tokio::test]
    async fn not_available_and_error_phases_forward() {
        let relay = UpdateRelay::new();
        let mut rx = relay.subscribe();

        relay.emit(UpdateEvent::NotAvailable);
        relay.emit(UpdateEvent::Error("feed unreachable".to_string()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.channel(), "update-not-available");
        assert_eq!(first.payload(), Value::Null);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.channel(), "update-error");
        assert_eq!(second.payload(), json!({ "message": "feed unreachable" }));
    }

    #[test]
    fn emitting_without_subscribers_does_not_panic() {
        let relay = UpdateRelay::new();
        relay.emit(UpdateEvent::Checking);
    }
}

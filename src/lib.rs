mod commands;
mod launcher;
mod server;
mod state;
mod storage;
mod updater;

use std::path::PathBuf;

use tauri::{AppHandle, Manager, RunEvent, WebviewUrl, WebviewWindowBuilder};

use state::AppContext;
use updater::UpdateRelay;

const WINDOW_LABEL: &str = "main";

/// Locates the prebuilt web bundle: next to the sources in dev, inside the
/// bundled resources in release.
fn bundle_dir(app: &AppHandle) -> PathBuf {
    if cfg!(debug_assertions) {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("app-build")
    } else {
        match app.path().resource_dir() {
            Ok(dir) => dir.join("app-build"),
            Err(error) => {
                tracing::warn!(%error, "no resource dir, serving bundle from working dir");
                PathBuf::from("app-build")
            }
        }
    }
}

fn open_window(app: &AppHandle, url: &str) -> Result<(), String> {
    let url = url
        .parse()
        .map_err(|err| format!("Invalid server url: {err}"))?;
    WebviewWindowBuilder::new(app, WINDOW_LABEL, WebviewUrl::External(url))
        .title("Vizwalk")
        .inner_size(1400.0, 800.0)
        .build()
        .map_err(|err| format!("Failed to open window: {err}"))?;
    Ok(())
}

/// Starts the static server if none is running, then points a fresh window
/// at its root URL. Reactivation reuses a live server's URL.
async fn start_shell(app: AppHandle) -> Result<(), String> {
    let context = app.state::<AppContext>();
    let url = {
        let mut server = context.server.lock().await;
        match server.as_ref() {
            Some(handle) => handle.url().to_string(),
            None => {
                let handle = server::start(bundle_dir(&app)).await?;
                let url = handle.url().to_string();
                *server = Some(handle);
                url
            }
        }
    };
    open_window(&app, &url)
}

async fn stop_server(app: &AppHandle) {
    let context = app.state::<AppContext>();
    if let Some(handle) = context.server.lock().await.take() {
        handle.shutdown();
        tracing::info!("static server stopped");
    };
}

pub fn run() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let relay = UpdateRelay::new();

    let builder = tauri::Builder::default();
    #[cfg(desktop)]
    let builder = builder.plugin(tauri_plugin_updater::Builder::new().build());

    let app = builder
        .invoke_handler(tauri::generate_handler![
            commands::launch_exe,
            commands::open_in_vlc,
            commands::load_projects,
            commands::save_projects,
        ])
        .setup(move |app| {
            let handle = app.handle().clone();
            let data_dir = handle
                .path()
                .app_data_dir()
                .map_err(|err| format!("Failed to resolve app data dir: {err}"))?;
            app.manage(AppContext::new(data_dir, relay.clone()));
            #[cfg(desktop)]
            app.manage(updater::PendingInstall::default());

            tauri::async_runtime::spawn(updater::forward_update_events(
                relay.subscribe(),
                handle.clone(),
            ));

            let startup = handle.clone();
            tauri::async_runtime::spawn(async move {
                if let Err(error) = start_shell(startup.clone()).await {
                    tracing::error!(%error, "failed to start application shell");
                    startup.exit(1);
                    return;
                }
                #[cfg(desktop)]
                {
                    let relay = startup.state::<AppContext>().updates.clone();
                    updater::run_update_check(startup.clone(), relay).await;
                }
            });
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(move |app, event| match event {
        #[cfg_attr(not(target_os = "macos"), allow(unused_variables))]
        RunEvent::ExitRequested { api, code, .. } => {
            // All windows closed: the server goes down with them. macOS keeps
            // the process alive in the dock, every other platform exits.
            if code.is_none() {
                let handle = app.clone();
                tauri::async_runtime::spawn(async move { stop_server(&handle).await });
                #[cfg(target_os = "macos")]
                api.prevent_exit();
            }
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows,
            ..
        } => {
            if !has_visible_windows {
                let handle = app.clone();
                tauri::async_runtime::spawn(async move {
                    if let Err(error) = start_shell(handle).await {
                        tracing::error!(%error, "failed to reopen window");
                    }
                });
            }
        }
        RunEvent::Exit => {
            #[cfg(desktop)]
            updater::install_pending(app);
        }
        _ => {}
    });
}

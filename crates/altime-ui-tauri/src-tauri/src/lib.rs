use altime_core::{Commands, Settings, SettingsStore, Watcher, WatcherOptions};
use altime_core::{ImeFailure, JsonFile, RELOAD_SETTING_EVENT};
use crossbeam_channel::{select, Receiver};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::{MouseButton, TrayIconBuilder, TrayIconEvent};
use tauri::{Emitter, Manager, RunEvent, WindowEvent};
use tauri_plugin_autostart::MacosLauncher;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

const TRAY_ID: &str = "altime-tray";
const IME_ERROR_EVENT: &str = "ime_error";

struct AppState {
    commands: Commands,
    watcher: Mutex<Watcher>,
}

#[derive(Clone, serde::Serialize)]
struct ImeErrorPayload {
    enabled: bool,
    message: String,
}

fn get_settings_path(app: &tauri::AppHandle) -> tauri::Result<PathBuf> {
    Ok(app.path().app_config_dir()?.join("settings.json"))
}

fn show_main_window(app: &tauri::AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.unminimize();
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn update_tray_menu(app: &tauri::AppHandle) -> tauri::Result<()> {
    let setting = app.state::<AppState>().commands.get_setting();

    let item_open = MenuItem::with_id(app, "open", "Open", true, None::<&str>)?;
    let item_running = CheckMenuItem::with_id(
        app,
        "is_running",
        "Active",
        true,
        setting.is_running,
        None::<&str>,
    )?;
    let sep = PredefinedMenuItem::separator(app)?;
    let item_quit = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;

    let menu = Menu::with_items(app, &[&item_open, &item_running, &sep, &item_quit])?;

    if let Some(tray) = app.tray_by_id(TRAY_ID) {
        tray.set_menu(Some(menu))?;
        let state = if setting.is_running { "active" } else { "paused" };
        tray.set_tooltip(Some(format!(
            "altime ({}): {} ON / {} OFF",
            state, setting.activate_key, setting.deactivate_key
        )))?;
    }

    Ok(())
}

#[tauri::command]
fn get_setting(state: tauri::State<AppState>) -> Settings {
    state.commands.get_setting()
}

#[tauri::command]
fn set_is_running(state: tauri::State<AppState>, is_running: bool) -> Result<(), String> {
    state
        .commands
        .set_is_running(is_running)
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn set_activate_key(state: tauri::State<AppState>, key: String) -> Result<(), String> {
    state
        .commands
        .set_activate_key(&key)
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn set_deactivate_key(state: tauri::State<AppState>, key: String) -> Result<(), String> {
    state
        .commands
        .set_deactivate_key(&key)
        .map_err(|e| e.to_string())
}

#[cfg(windows)]
fn start_watcher(store: Arc<SettingsStore>) -> altime_core::Result<Watcher> {
    use altime_core::ime::WindowsIme;
    use altime_core::keyboard_hook::{LowLevelHook, SendInputKeyboard};

    let mut watcher = Watcher::new(
        store,
        Arc::new(WindowsIme),
        Arc::new(SendInputKeyboard),
        WatcherOptions::default(),
    );
    watcher.start(&LowLevelHook)?;
    Ok(watcher)
}

#[cfg(not(windows))]
fn start_watcher(_store: Arc<SettingsStore>) -> altime_core::Result<Watcher> {
    Err(altime_core::Error::HookInstall(
        "global keyboard hooks are only supported on Windows".to_string(),
    ))
}

/// Forwards store changes and IME failures to the webview until both
/// channels are closed.
fn spawn_notification_bridge(
    app: tauri::AppHandle,
    reload: Receiver<Arc<Settings>>,
    failures: Receiver<ImeFailure>,
) {
    std::thread::Builder::new()
        .name("ui-notify".to_string())
        .spawn(move || loop {
            select! {
                recv(reload) -> msg => match msg {
                    Ok(_) => {
                        let _ = app.emit(RELOAD_SETTING_EVENT, ());
                        if let Err(e) = update_tray_menu(&app) {
                            tracing::warn!("Failed to update tray: {}", e);
                        }
                    }
                    Err(_) => break,
                },
                recv(failures) -> msg => match msg {
                    Ok(f) => {
                        let _ = app.emit(
                            IME_ERROR_EVENT,
                            ImeErrorPayload {
                                enabled: f.enabled,
                                message: f.error.to_string(),
                            },
                        );
                    }
                    Err(_) => break,
                },
            }
        })
        .expect("failed to spawn notification thread");
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt::init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _args, _cwd| {
            show_main_window(app);
        }))
        .plugin(tauri_plugin_autostart::init(
            MacosLauncher::LaunchAgent,
            None,
        ))
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            get_setting,
            set_is_running,
            set_activate_key,
            set_deactivate_key
        ])
        .setup(|app| {
            let path = get_settings_path(app.handle())?;
            tracing::info!("Settings file: {}", path.display());
            let store = Arc::new(SettingsStore::load(JsonFile::new(path)));
            let commands = Commands::new(store.clone());
            let reload = commands.reload_events();

            let watcher = match start_watcher(store) {
                Ok(w) => w,
                Err(e) => {
                    tracing::error!("Failed to start key watcher: {}", e);
                    app.dialog()
                        .message(e.to_string())
                        .title("altime")
                        .kind(MessageDialogKind::Error)
                        .blocking_show();
                    return Err(e.into());
                }
            };
            let failures = watcher.subscribe_failures();

            app.manage(AppState {
                commands,
                watcher: Mutex::new(watcher),
            });

            let quit_i = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
            let menu = Menu::with_items(app, &[&quit_i])?;

            let _tray = TrayIconBuilder::with_id(TRAY_ID)
                .menu(&menu)
                .on_menu_event(|app, event| match event.id.as_ref() {
                    "quit" => app.exit(0),
                    "open" => show_main_window(app),
                    "is_running" => {
                        let state = app.state::<AppState>();
                        if let Err(e) = state.commands.toggle_is_running() {
                            tracing::error!("Failed to toggle running state: {}", e);
                        }
                    }
                    _ => {}
                })
                .on_tray_icon_event(|tray, event| {
                    if let TrayIconEvent::DoubleClick {
                        button: MouseButton::Left,
                        ..
                    } = event
                    {
                        show_main_window(tray.app_handle());
                    }
                })
                .icon(
                    app.default_window_icon()
                        .cloned()
                        .ok_or("missing default window icon")?,
                )
                .build(app)?;

            update_tray_menu(app.handle())?;

            // Closing the window only hides it; the watcher keeps running.
            if let Some(window) = app.get_webview_window("main") {
                let window_clone = window.clone();
                window.on_window_event(move |event| {
                    if let WindowEvent::CloseRequested { api, .. } = event {
                        api.prevent_close();
                        let _ = window_clone.hide();
                    }
                });
            }

            spawn_notification_bridge(app.handle().clone(), reload, failures);

            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            // Unhook before anything else is torn down.
            if let Some(state) = app.try_state::<AppState>() {
                state.watcher.lock().stop();
            }
        }
    });
}

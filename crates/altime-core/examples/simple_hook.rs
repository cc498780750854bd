//! Headless watcher: `cargo run --example simple_hook -- [settings.json]`

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use altime_core::ime::WindowsIme;
    use altime_core::keyboard_hook::{LowLevelHook, SendInputKeyboard};
    use altime_core::{JsonFile, SettingsStore, Watcher, WatcherOptions};
    use std::sync::Arc;

    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "altime-settings.json".to_string());
    println!("Using settings file {}", path);

    let store = Arc::new(SettingsStore::load(JsonFile::new(path)));
    if !store.snapshot().is_running {
        println!("Monitoring is disabled in the settings file; enabling for this run.");
        store.set_is_running(true)?;
    }
    let s = store.snapshot();
    println!(
        "Activate: {}  Deactivate: {}",
        s.activate_key, s.deactivate_key
    );

    let mut watcher = Watcher::new(
        store,
        Arc::new(WindowsIme),
        Arc::new(SendInputKeyboard),
        WatcherOptions::default(),
    );
    let failures = watcher.subscribe_failures();
    watcher.start(&LowLevelHook)?;

    for f in failures.iter() {
        println!("IME call failed (enable={}): {}", f.enabled, f.error);
    }
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("simple_hook needs a Windows low-level keyboard hook.");
}

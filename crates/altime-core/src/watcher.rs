use crate::engine::Engine;
use crate::error::{Error, ImeError, Result};
use crate::ime::{ImeController, Keyboard};
use crate::notify::Broadcaster;
use crate::settings::SettingsStore;
use crate::source::{KeyEventSource, Subscription};
use crate::types::{Action, RawKeyEvent};
use crate::vk_map;
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct WatcherOptions {
    /// Inject a dummy key when a trigger key is released.
    pub mask_menu: bool,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self { mask_menu: true }
    }
}

/// A failed IME call, as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImeFailure {
    pub enabled: bool,
    pub error: ImeError,
}

/// Single-threaded event processing: match, decide, act. One event at a time.
pub struct EventLoop {
    engine: Engine,
    store: Arc<SettingsStore>,
    ime: Arc<dyn ImeController>,
    keyboard: Arc<dyn Keyboard>,
    options: WatcherOptions,
    failures: Arc<Broadcaster<ImeFailure>>,
}

impl EventLoop {
    pub fn new(
        store: Arc<SettingsStore>,
        ime: Arc<dyn ImeController>,
        keyboard: Arc<dyn Keyboard>,
        options: WatcherOptions,
    ) -> Self {
        Self {
            engine: Engine::new(),
            store,
            ime,
            keyboard,
            options,
            failures: Arc::new(Broadcaster::new()),
        }
    }

    pub fn subscribe_failures(&self) -> Receiver<ImeFailure> {
        self.failures.subscribe()
    }

    /// Processes one raw event and returns the action taken.
    /// Failures are logged and published; they never propagate.
    pub fn handle(&mut self, raw: &RawKeyEvent) -> Action {
        let Some(event) = vk_map::match_event(raw) else {
            return Action::Ignore;
        };

        let settings = self.store.snapshot();
        let action = self.engine.process(&event, &settings);

        match action {
            Action::Ignore => {}
            Action::SetIme(enabled) => {
                debug!("{} pressed, setting IME {}", event.key, if enabled { "ON" } else { "OFF" });
                if let Err(e) = self.ime.set_enabled(enabled) {
                    warn!("IME call failed ({}): {}", enabled, e);
                    self.failures.publish(ImeFailure { enabled, error: e });
                }
            }
            Action::MaskMenu => {
                if self.options.mask_menu {
                    if let Err(e) = self.keyboard.send_dummy_key() {
                        debug!("Menu mask failed: {}", e);
                    }
                }
            }
        }
        action
    }

    /// Drains `rx` until every sender is gone.
    pub fn run(mut self, rx: Receiver<RawKeyEvent>) {
        info!("Event loop started");
        for raw in rx.iter() {
            self.handle(&raw);
        }
        info!("Event loop stopped");
    }
}

/// Owns the installed source and the processing thread.
///
/// Stopping (explicitly or on drop) uninstalls the source first, lets the
/// processing thread drain whatever was already delivered, joins it, and
/// finally flushes the settings store.
pub struct Watcher {
    store: Arc<SettingsStore>,
    ime: Arc<dyn ImeController>,
    keyboard: Arc<dyn Keyboard>,
    options: WatcherOptions,
    failures: Arc<Broadcaster<ImeFailure>>,
    subscription: Option<Subscription>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    pub fn new(
        store: Arc<SettingsStore>,
        ime: Arc<dyn ImeController>,
        keyboard: Arc<dyn Keyboard>,
        options: WatcherOptions,
    ) -> Self {
        Self {
            store,
            ime,
            keyboard,
            options,
            failures: Arc::new(Broadcaster::new()),
            subscription: None,
            thread: None,
        }
    }

    pub fn subscribe_failures(&self) -> Receiver<ImeFailure> {
        self.failures.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_some()
    }

    /// Installs `source` and starts processing. Fails fast if the source
    /// cannot be installed; nothing is left running in that case.
    pub fn start(&mut self, source: &dyn KeyEventSource) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        info!("Starting watcher");

        let (tx, rx) = unbounded();
        let subscription = source.install(tx).map_err(|e| {
            error!("Failed to install key event source: {}", e);
            e
        })?;

        let mut event_loop = EventLoop::new(
            self.store.clone(),
            self.ime.clone(),
            self.keyboard.clone(),
            self.options,
        );
        event_loop.failures = self.failures.clone();

        let thread = thread::Builder::new()
            .name("key-watcher".to_string())
            .spawn(move || event_loop.run(rx))
            .map_err(|e| Error::HookInstall(e.to_string()))?;

        self.subscription = Some(subscription);
        self.thread = Some(thread);
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        info!("Stopping watcher");

        subscription.uninstall();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Event loop thread panicked");
            }
        }
        if let Err(e) = self.store.flush() {
            warn!("Failed to flush settings: {}", e);
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

use crate::error::Result;
use crate::settings::{Settings, SettingsStore};
use crate::types::KeyId;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use tracing::info;

/// Name of the payload-less event telling the UI to call `get_setting` again.
pub const RELOAD_SETTING_EVENT: &str = "reload_setting";

/// Command surface consumed by the settings UI.
///
/// Key arguments arrive as wire tokens (`"left_alt"`, ...). A malformed token
/// is rejected before the store is touched.
#[derive(Clone)]
pub struct Commands {
    store: Arc<SettingsStore>,
}

impl Commands {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self { store }
    }

    pub fn get_setting(&self) -> Settings {
        (*self.store.snapshot()).clone()
    }

    pub fn set_is_running(&self, is_running: bool) -> Result<()> {
        info!("set_is_running({})", is_running);
        self.store.set_is_running(is_running)?;
        Ok(())
    }

    /// Flips the running flag; returns the new value.
    pub fn toggle_is_running(&self) -> Result<bool> {
        let is_running = self.store.toggle_is_running()?.is_running;
        info!("toggle_is_running -> {}", is_running);
        Ok(is_running)
    }

    pub fn set_activate_key(&self, token: &str) -> Result<()> {
        let key: KeyId = token.parse()?;
        info!("set_activate_key({})", key);
        self.store.set_activate_key(key)?;
        Ok(())
    }

    pub fn set_deactivate_key(&self, token: &str) -> Result<()> {
        let key: KeyId = token.parse()?;
        info!("set_deactivate_key({})", key);
        self.store.set_deactivate_key(key)?;
        Ok(())
    }

    /// One message per committed settings change; forward each as
    /// [`RELOAD_SETTING_EVENT`].
    pub fn reload_events(&self) -> Receiver<Arc<Settings>> {
        self.store.subscribe()
    }
}

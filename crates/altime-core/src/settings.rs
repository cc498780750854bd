use crate::error::Result;
use crate::notify::Broadcaster;
use crate::types::KeyId;
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "isRunning")]
    pub is_running: bool,

    #[serde(rename = "activateKey")]
    pub activate_key: KeyId,

    #[serde(rename = "deactivateKey")]
    pub deactivate_key: KeyId,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_running: false,
            activate_key: KeyId::RightAlt,
            deactivate_key: KeyId::LeftAlt,
        }
    }
}

/// Storage backend for the settings snapshot.
pub trait SettingsPersist: Send + Sync + 'static {
    /// `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> Result<Option<Settings>>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Pretty-printed JSON file, e.g. `<app config dir>/settings.json`.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsPersist for JsonFile {
    fn load(&self) -> Result<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Process-wide settings holder.
///
/// The current value lives behind `RwLock<Arc<Settings>>`: readers clone the
/// `Arc` and drop the lock immediately, writers build a fresh `Settings` and
/// swap it in. Writers are serialized by `write_gate`, which is also held
/// while persisting and notifying so that subscribers observe snapshots in
/// the order they were committed. The snapshot lock itself is never held
/// across file I/O.
pub struct SettingsStore {
    current: RwLock<Arc<Settings>>,
    write_gate: Mutex<()>,
    persist: Option<Box<dyn SettingsPersist>>,
    changes: Broadcaster<Arc<Settings>>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore {
    /// In-memory store, nothing is written anywhere.
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
            write_gate: Mutex::new(()),
            persist: None,
            changes: Broadcaster::new(),
        }
    }

    /// Loads from `persist`, falling back to defaults when nothing is stored
    /// or the stored data cannot be read.
    pub fn load(persist: impl SettingsPersist) -> Self {
        let settings = match persist.load() {
            Ok(Some(s)) => {
                info!("Settings loaded: {:?}", s);
                s
            }
            Ok(None) => {
                info!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };
        Self {
            current: RwLock::new(Arc::new(settings)),
            write_gate: Mutex::new(()),
            persist: Some(Box::new(persist)),
            changes: Broadcaster::new(),
        }
    }

    /// Current snapshot. Never torn: either fully before or fully after any update.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.current.read().clone()
    }

    /// Receives every committed snapshot, in commit order.
    pub fn subscribe(&self) -> Receiver<Arc<Settings>> {
        self.changes.subscribe()
    }

    pub fn set_is_running(&self, is_running: bool) -> Result<Arc<Settings>> {
        self.update(|s| s.is_running = is_running)
    }

    pub fn set_activate_key(&self, key: KeyId) -> Result<Arc<Settings>> {
        self.update(|s| s.activate_key = key)
    }

    pub fn set_deactivate_key(&self, key: KeyId) -> Result<Arc<Settings>> {
        self.update(|s| s.deactivate_key = key)
    }

    /// Flips `is_running` in a single read-modify-write.
    pub fn toggle_is_running(&self) -> Result<Arc<Settings>> {
        self.update(|s| s.is_running = !s.is_running)
    }

    /// Writes the current snapshot to storage.
    pub fn flush(&self) -> Result<()> {
        let _gate = self.write_gate.lock();
        match &self.persist {
            Some(p) => p.save(&self.snapshot()),
            None => Ok(()),
        }
    }

    /// Read-modify-write. The new snapshot is committed and published even if
    /// persisting it fails; the persistence error is returned afterwards.
    fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Arc<Settings>> {
        let _gate = self.write_gate.lock();

        let mut next = (*self.snapshot()).clone();
        f(&mut next);
        let next = Arc::new(next);
        *self.current.write() = next.clone();

        self.changes.publish(next.clone());

        if let Some(p) = &self.persist {
            if let Err(e) = p.save(&next) {
                warn!("Failed to save settings: {}", e);
                return Err(e);
            }
        }
        Ok(next)
    }
}

impl Drop for SettingsStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush settings on shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Keeps the last saved value in memory.
    #[derive(Default, Clone)]
    struct MemPersist {
        saved: Arc<Mutex<Option<Settings>>>,
        saves: Arc<AtomicUsize>,
        fail: bool,
    }

    impl SettingsPersist for MemPersist {
        fn load(&self) -> Result<Option<Settings>> {
            Ok(self.saved.lock().clone())
        }

        fn save(&self, settings: &Settings) -> Result<()> {
            if self.fail {
                return Err(Error::Persist("disk full".into()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.saved.lock() = Some(settings.clone());
            Ok(())
        }
    }

    #[test]
    fn test_default_settings() {
        assert_eq!(
            Settings::default(),
            Settings {
                is_running: false,
                activate_key: KeyId::RightAlt,
                deactivate_key: KeyId::LeftAlt,
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let s = Settings {
            is_running: true,
            activate_key: KeyId::LeftCtrl,
            deactivate_key: KeyId::RightShift,
        };
        let v: serde_json::Value = serde_json::to_value(&s).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "isRunning": true,
                "activateKey": "left_ctrl",
                "deactivateKey": "right_shift",
            })
        );
    }

    #[test]
    fn test_setters_update_snapshot() {
        let store = SettingsStore::default();

        store.set_is_running(true).unwrap();
        assert!(store.snapshot().is_running);

        store.set_activate_key(KeyId::LeftCtrl).unwrap();
        assert_eq!(store.snapshot().activate_key, KeyId::LeftCtrl);

        store.set_deactivate_key(KeyId::RightShift).unwrap();
        assert_eq!(store.snapshot().deactivate_key, KeyId::RightShift);

        store.set_is_running(false).unwrap();
        assert!(!store.snapshot().is_running);
    }

    #[test]
    fn test_toggle_is_running() {
        let store = SettingsStore::default();
        let rx = store.subscribe();
        assert!(store.toggle_is_running().unwrap().is_running);
        assert!(!store.toggle_is_running().unwrap().is_running);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_equal_keys_are_allowed() {
        let store = SettingsStore::default();
        store.set_activate_key(KeyId::LeftAlt).unwrap();
        let s = store.snapshot();
        assert_eq!(s.activate_key, KeyId::LeftAlt);
        assert_eq!(s.deactivate_key, KeyId::LeftAlt);
    }

    #[test]
    fn test_old_snapshot_is_immutable() {
        let store = SettingsStore::default();
        let before = store.snapshot();
        store.set_activate_key(KeyId::RightCtrl).unwrap();
        assert_eq!(before.activate_key, KeyId::RightAlt);
        assert_eq!(store.snapshot().activate_key, KeyId::RightCtrl);
    }

    #[test]
    fn test_every_setter_notifies() {
        let store = SettingsStore::default();
        let rx = store.subscribe();

        store.set_is_running(true).unwrap();
        store.set_activate_key(KeyId::LeftShift).unwrap();
        store.set_deactivate_key(KeyId::RightShift).unwrap();
        // Unchanged value still notifies.
        store.set_is_running(true).unwrap();

        let got: Vec<Arc<Settings>> = rx.try_iter().collect();
        assert_eq!(got.len(), 4);
        assert_eq!(got[1].activate_key, KeyId::LeftShift);
        assert_eq!(*got[3], *store.snapshot());
    }

    #[test]
    fn test_load_and_persist() {
        let mem = MemPersist::default();
        {
            let store = SettingsStore::load(mem.clone());
            assert_eq!(*store.snapshot(), Settings::default());
            store.set_activate_key(KeyId::LeftCtrl).unwrap();
        }
        let store = SettingsStore::load(mem.clone());
        assert_eq!(store.snapshot().activate_key, KeyId::LeftCtrl);
        // One save from the setter, one flush on drop.
        assert_eq!(mem.saves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_persist_failure_keeps_change() {
        let mem = MemPersist {
            fail: true,
            ..Default::default()
        };
        let store = SettingsStore::load(mem);
        let rx = store.subscribe();

        let res = store.set_is_running(true);
        assert!(matches!(res, Err(Error::Persist(_))));
        assert!(store.snapshot().is_running);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("altime-settings-{}", std::process::id()));
        let file = JsonFile::new(dir.join("nested").join("settings.json"));
        assert!(file.load().unwrap().is_none());

        let s = Settings {
            is_running: true,
            activate_key: KeyId::RightCtrl,
            deactivate_key: KeyId::LeftShift,
        };
        file.save(&s).unwrap();
        assert_eq!(file.load().unwrap(), Some(s));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("altime-corrupt-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"isRunning": true, "activateKey": "hyper"}"#).unwrap();

        let file = JsonFile::new(&path);
        assert!(file.load().is_err());

        let store = SettingsStore::load(file);
        assert_eq!(*store.snapshot(), Settings::default());
        drop(store);

        let _ = fs::remove_dir_all(dir);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

// Flags the surrounding screens consume. Any key absent from the file
// means off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub dark_mode: bool,
    pub show_crypto_prices: bool,
    pub enable_assistant: bool,
}

pub type SettingsObserver = Box<dyn Fn(&Settings)>;

pub struct SettingsStore {
    path: PathBuf,
    current: Settings,
    observers: Vec<SettingsObserver>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SettingsStore {
    pub fn load(path: &Path) -> Result<Self> {
        let current = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("unable to read settings file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid settings file {}", path.display()))?
        } else {
            Settings::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            current,
            observers: Vec::new(),
        })
    }

    pub fn current(&self) -> Settings {
        self.current
    }

    pub fn subscribe(&mut self, observer: SettingsObserver) {
        self.observers.push(observer);
    }

    pub fn update(&mut self, apply: impl FnOnce(&mut Settings)) -> Result<Settings> {
        apply(&mut self.current);
        self.save()?;
        debug!(
            "settings updated: darkMode={} showCryptoPrices={} enableAssistant={}",
            self.current.dark_mode, self.current.show_crypto_prices, self.current.enable_assistant
        );
        for observer in &self.observers {
            observer(&self.current);
        }
        Ok(self.current)
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.current)?;
        fs::write(&self.path, format!("{text}\n"))
            .with_context(|| format!("unable to write settings file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn missing_file_means_every_flag_is_off() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SettingsStore::load(&dir.path().join("settings.json")).expect("load");
        assert_eq!(store.current(), Settings::default());
        assert!(!store.current().dark_mode);
        assert!(!store.current().show_crypto_prices);
        assert!(!store.current().enable_assistant);
    }

    #[test]
    fn partial_file_leaves_unnamed_flags_off() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "darkMode": true }"#).expect("write settings");

        let store = SettingsStore::load(&path).expect("load");
        assert!(store.current().dark_mode);
        assert!(!store.current().show_crypto_prices);
        assert!(!store.current().enable_assistant);
    }

    #[test]
    fn update_persists_with_camel_case_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let mut store = SettingsStore::load(&path).expect("load");
        store
            .update(|settings| settings.show_crypto_prices = true)
            .expect("update");

        let written = fs::read_to_string(&path).expect("file written");
        assert!(written.contains("\"showCryptoPrices\": true"));
        assert!(written.contains("\"darkMode\": false"));

        let reloaded = SettingsStore::load(&path).expect("reload");
        assert!(reloaded.current().show_crypto_prices);
        assert!(!reloaded.current().dark_mode);
    }

    #[test]
    fn observers_see_each_update_exactly_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SettingsStore::load(&dir.path().join("settings.json")).expect("load");

        let seen: Rc<RefCell<Vec<Settings>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Box::new(move |settings| sink.borrow_mut().push(*settings)));

        store
            .update(|settings| settings.enable_assistant = true)
            .expect("update");
        store
            .update(|settings| settings.enable_assistant = false)
            .expect("update");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].enable_assistant);
        assert!(!seen[1].enable_assistant);
    }

    #[test]
    fn corrupt_file_is_a_loud_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write settings");

        let err = SettingsStore::load(&path).expect_err("corrupt settings should fail");
        assert!(format!("{err:#}").contains("invalid settings file"));
    }
}

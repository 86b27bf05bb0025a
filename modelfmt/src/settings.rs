use crate::types::{SplitLevel, clamp_split_level};
use fs2::FileExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key of this extension's entry in the shared settings file.
pub const EXTENSION_ID: &str = "model_name_formatter";

/// Pre-`showModelName` toggle. Read once, then dropped from the stored entry.
const LEGACY_ENABLED_KEY: &str = "enabled";

const DEFAULT_SHOW_MODEL_NAME: bool = true;
const DEFAULT_SHOW_CH_NAME: bool = true;

/// User-facing options, always complete and clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Show the normalized model label in message headers.
    pub show_model_name: bool,
    /// Show the host's character name label next to it.
    pub show_ch_name: bool,
    pub split_level: SplitLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_model_name: DEFAULT_SHOW_MODEL_NAME,
            show_ch_name: DEFAULT_SHOW_CH_NAME,
            split_level: SplitLevel::default(),
        }
    }
}

impl Settings {
    /// Build a settings record from whatever is stored under [`EXTENSION_ID`].
    ///
    /// Wrong types are coerced or replaced by defaults, the split level is
    /// clamped, and a legacy `enabled` flag fills `showModelName` when that is
    /// missing. The flag tells whether the stored entry differs from the
    /// canonical form and should be written back.
    pub fn from_stored(entry: Option<&Value>) -> (Settings, bool) {
        let Some(Value::Object(map)) = entry else {
            return (Settings::default(), true);
        };

        let show_model_name = match map.get("showModelName") {
            Some(v) => coerce_bool(v).unwrap_or(DEFAULT_SHOW_MODEL_NAME),
            None => map
                .get(LEGACY_ENABLED_KEY)
                .and_then(coerce_bool)
                .unwrap_or(DEFAULT_SHOW_MODEL_NAME),
        };
        let show_ch_name = map
            .get("showChName")
            .and_then(coerce_bool)
            .unwrap_or(DEFAULT_SHOW_CH_NAME);
        let split_level = map
            .get("splitLevel")
            .map(clamp_split_level)
            .unwrap_or_default();

        let settings = Settings {
            show_model_name,
            show_ch_name,
            split_level,
        };
        let stale = settings.to_entry() != Value::Object(map.clone());
        (settings, stale)
    }

    /// Canonical stored form.
    pub fn to_entry(&self) -> Value {
        json!({
            "showModelName": self.show_model_name,
            "showChName": self.show_ch_name,
            "splitLevel": self.split_level.as_u8(),
        })
    }
}

/// Same coercion as [`Settings::from_stored`]; never rejects an entry.
impl<'de> Deserialize<'de> for Settings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Settings::from_stored(Some(&value)).0)
    }
}

fn coerce_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Host-style settings file: one JSON object keyed by extension id.
///
/// Only the [`EXTENSION_ID`] entry is ever touched; other entries are carried
/// through every write unchanged.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.modelfmt/settings.json`
    pub fn default_path() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".modelfmt").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn with_exclusive_lock<T>(&self, f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
        ensure_private_dir(&self.path)?;

        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;

        lock_file.lock_exclusive()?;
        let out = f();
        let _ = lock_file.unlock();
        out
    }

    /// Load settings, migrating and clamping the stored entry.
    ///
    /// If an entry exists and was not already canonical, the fixed entry is
    /// persisted so the migration only ever happens once. A missing entry
    /// yields defaults without creating anything on disk.
    pub fn load(&self) -> anyhow::Result<Settings> {
        self.with_exclusive_lock(|| {
            let mut all = self.read_unlocked()?;
            let entry = all.get(EXTENSION_ID);
            let existed = entry.is_some();
            let (settings, stale) = Settings::from_stored(entry);

            if existed && stale {
                tracing::info!(
                    "Rewriting {} settings in {} (migrated or coerced)",
                    EXTENSION_ID,
                    self.path.display()
                );
                all.insert(EXTENSION_ID.to_string(), settings.to_entry());
                self.write_unlocked(&all)?;
            }
            Ok(settings)
        })
    }

    /// Persist `settings` as this extension's entry.
    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        self.with_exclusive_lock(|| {
            let mut all = self.read_unlocked()?;
            all.insert(EXTENSION_ID.to_string(), settings.to_entry());
            self.write_unlocked(&all)
        })
    }

    /// Read-modify-write under one lock. Returns the stored result.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> anyhow::Result<Settings> {
        self.with_exclusive_lock(|| {
            let mut all = self.read_unlocked()?;
            let (mut settings, _) = Settings::from_stored(all.get(EXTENSION_ID));
            f(&mut settings);
            all.insert(EXTENSION_ID.to_string(), settings.to_entry());
            self.write_unlocked(&all)?;
            Ok(settings)
        })
    }

    fn read_unlocked(&self) -> anyhow::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "settings file {} must hold a JSON object, found {}",
                self.path.display(),
                json_kind(&other)
            ),
        }
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn write_unlocked(&self, all: &Map<String, Value>) -> anyhow::Result<()> {
        ensure_private_dir(&self.path)?;

        let json = serde_json::to_string_pretty(all)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn ensure_private_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        (dir, SettingsStore::new(path))
    }

    fn read_raw(store: &SettingsStore) -> Value {
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_gives_defaults_without_writing() {
        let (_dir, store) = tmp_store();
        let settings = store.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.show_model_name);
        assert!(settings.show_ch_name);
        assert_eq!(settings.split_level, SplitLevel::Suffixes);
        assert!(!store.path().exists());
    }

    #[test]
    fn legacy_enabled_flag_migrates_once() {
        let (_dir, store) = tmp_store();
        fs::write(
            store.path(),
            r#"{"model_name_formatter":{"enabled":false},"other_ext":{"x":1}}"#,
        )
        .unwrap();

        let settings = store.load().unwrap();
        assert!(!settings.show_model_name);

        let raw = read_raw(&store);
        assert!(raw[EXTENSION_ID].get("enabled").is_none());
        assert_eq!(raw[EXTENSION_ID]["showModelName"], json!(false));
        assert_eq!(raw["other_ext"], json!({"x": 1}));

        // Already canonical: a second load leaves the entry as it is.
        let (again, stale) = Settings::from_stored(raw.get(EXTENSION_ID));
        assert_eq!(again, settings);
        assert!(!stale);
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn explicit_show_model_name_beats_legacy_flag() {
        let entry = json!({"enabled": false, "showModelName": true});
        let (settings, stale) = Settings::from_stored(Some(&entry));
        assert!(settings.show_model_name);
        assert!(stale);
    }

    #[test]
    fn malformed_values_are_coerced_and_persisted() {
        let (_dir, store) = tmp_store();
        fs::write(
            store.path(),
            r#"{"model_name_formatter":{"showModelName":"false","showChName":7,"splitLevel":99}}"#,
        )
        .unwrap();

        let settings = store.load().unwrap();
        assert!(!settings.show_model_name);
        assert!(settings.show_ch_name);
        assert_eq!(settings.split_level, SplitLevel::Suffixes);
        assert_eq!(read_raw(&store)[EXTENSION_ID]["splitLevel"], json!(3));
    }

    #[test]
    fn garbage_split_level_falls_back_to_default() {
        let entry = json!({"showModelName": true, "showChName": true, "splitLevel": "abc"});
        let (settings, stale) = Settings::from_stored(Some(&entry));
        assert_eq!(settings.split_level, SplitLevel::default());
        assert!(stale);
    }

    #[test]
    fn deserialize_coerces_like_stored_entries() {
        let settings: Settings = serde_json::from_str(
            r#"{"showModelName":"true","showChName":0,"splitLevel":"9"}"#,
        )
        .unwrap();
        assert!(settings.show_model_name);
        assert!(!settings.show_ch_name);
        assert_eq!(settings.split_level, SplitLevel::Suffixes);

        let legacy: Settings = serde_json::from_str(r#"{"enabled":false}"#).unwrap();
        assert!(!legacy.show_model_name);
    }

    #[test]
    fn update_preserves_other_extensions() {
        let (_dir, store) = tmp_store();
        fs::write(store.path(), r#"{"quick_reply":{"enabled":true}}"#).unwrap();

        let updated = store
            .update(|s| {
                s.split_level = SplitLevel::Provider;
                s.show_ch_name = false;
            })
            .unwrap();
        assert_eq!(updated.split_level, SplitLevel::Provider);

        let loaded = store.load().unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(read_raw(&store)["quick_reply"], json!({"enabled": true}));
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = tmp_store();
        let settings = Settings {
            show_model_name: false,
            show_ch_name: false,
            split_level: SplitLevel::Vendor,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn non_object_file_is_an_error() {
        let (_dir, store) = tmp_store();
        fs::write(store.path(), "[1, 2]").unwrap();
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}

// Operator defaults: named string values kept in a small JSON object file.
// The file is parsed strictly: it must be one object whose values are all strings.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::files::FileStore;
use crate::model::{FieldSet, Flag, ScalarField};

pub trait Settings {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: &str, value: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonSettings {
    values: BTreeMap<String, String>,
}

impl JsonSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let values: BTreeMap<String, String> = serde_json::from_slice(data)
            .map_err(|e| Error::MalformedDocument(format!("settings: {e}")))?;
        Ok(Self { values })
    }

    /// A missing file yields empty settings.
    pub fn load<F: FileStore + ?Sized>(files: &F, path: &Path) -> Result<Self> {
        if !files.exists(path) {
            debug!(path = %path.display(), "no settings file");
            return Ok(Self::new());
        }
        let data = files.read(path).map_err(|e| Error::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&data)
    }

    pub fn save<F: FileStore + ?Sized>(&self, files: &F, path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| Error::Io {
            path: PathBuf::from(path),
            source,
        };
        let json = serde_json::to_string_pretty(&self.values).map_err(|e| io_err(e.into()))?;
        files.write(path, json.as_bytes()).map_err(io_err)?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Settings for JsonSettings {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

impl FieldSet {
    /// Overwrites scalars and flags from `settings`. Absent scalars become
    /// empty, absent flags "0". Collections are not part of the settings.
    pub fn load_settings(&mut self, settings: &impl Settings) {
        for field in ScalarField::ALL {
            self.set_scalar(field, settings.get(field.label()).unwrap_or(""));
        }
        for flag in Flag::ALL {
            self.set_flag(flag, settings.get(flag.name()).unwrap_or("0"));
        }
    }

    pub fn store_settings(&self, settings: &mut impl Settings) {
        for field in ScalarField::ALL {
            settings.set(field.label(), self.scalar(field));
        }
        for flag in Flag::ALL {
            settings.set(flag.name(), self.flag(flag));
        }
    }
}

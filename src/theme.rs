// Light/dark preference stored beside the task collections

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::kv::{KeyValueStore, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Stored preference, `Light` when absent or unreadable
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        let raw = match kv.get(THEME_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Theme::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read theme, using default");
                return Theme::default();
            }
        };

        // Accept both a JSON string and the bare word
        serde_json::from_str(&raw)
            .ok()
            .or_else(|| Theme::from_str(raw.trim(), true).ok())
            .unwrap_or_else(|| {
                warn!(value = %raw, "Unrecognized theme value, using default");
                Theme::default()
            })
    }

    pub fn save(self, kv: &mut dyn KeyValueStore) -> Result<()> {
        kv.set(THEME_KEY, &serde_json::to_string(&self)?)
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    #[test]
    fn test_default_is_light() {
        let kv = MemoryKv::new();
        assert_eq!(Theme::load(&kv), Theme::Light);
    }

    #[test]
    fn test_save_and_load() {
        let mut kv = MemoryKv::new();
        Theme::Dark.save(&mut kv).unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(Theme::load(&kv), Theme::Dark);
    }

    #[test]
    fn test_bare_and_garbage_values() {
        let mut kv = MemoryKv::new();
        kv.set(THEME_KEY, "dark").unwrap();
        assert_eq!(Theme::load(&kv), Theme::Dark);

        kv.set(THEME_KEY, "\"sepia\"").unwrap();
        assert_eq!(Theme::load(&kv), Theme::Light);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }
}

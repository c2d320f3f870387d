//! Persistence of the last-used tool and its parameters.
//!
//! Everything lives in one versioned JSON document under [`STORE_KEY`]. Older
//! builds kept three unversioned keys (`ptools.tool`, `ptools.afParams`,
//! `ptools.mpnnParams`); they are folded into the document the first time the
//! store is opened and then removed.
//!
//! Reads never fail: a missing, unparsable or foreign-version document yields
//! the descriptor defaults. The store is only ever a source of defaults for
//! the form, it is not consulted by submission or polling.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use common::model::params::ParamBag;
use common::model::tool::Tool;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STORE_KEY: &str = "ptools.parameters";
pub const STORE_VERSION: u32 = 1;

const LEGACY_TOOL_KEY: &str = "ptools.tool";
const LEGACY_PARAM_KEYS: [(Tool, &str); 2] = [
    (Tool::AlphaFold, "ptools.afParams"),
    (Tool::ProteinMpnn, "ptools.mpnnParams"),
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not encode parameters: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage rejected write of {key}: {reason}")]
    Write { key: String, reason: String },
}

/// Minimal key/value surface of `window.localStorage`.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

pub struct LocalStorageBackend {
    storage: web_sys::Storage,
}

impl LocalStorageBackend {
    /// `None` when the page has no usable `localStorage` (privacy modes, sandboxed frames).
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl StorageBackend for LocalStorageBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage
            .set_item(key, value)
            .map_err(|err| StoreError::Write {
                key: key.to_string(),
                reason: err.as_string().unwrap_or_else(|| "quota exceeded".to_string()),
            })
    }

    fn remove(&self, key: &str) {
        let _ = self.storage.remove_item(key);
    }
}

/// In-memory backend, used when `localStorage` is unavailable.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `localStorage` when available, memory otherwise.
pub fn browser_storage() -> Box<dyn StorageBackend> {
    match LocalStorageBackend::open() {
        Some(local) => Box::new(local),
        None => {
            warn!("localStorage unavailable, parameters will not survive a reload");
            Box::new(MemoryStorage::default())
        }
    }
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredParameters {
    pub version: u32,
    #[serde(default)]
    pub last_tool: Option<String>,
    #[serde(default)]
    pub tools: BTreeMap<String, ParamBag>,
}

impl Default for StoredParameters {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            last_tool: None,
            tools: BTreeMap::new(),
        }
    }
}

pub struct ParameterStore<B> {
    backend: B,
}

impl<B: StorageBackend> ParameterStore<B> {
    /// Opens the store, migrating legacy keys if no document exists yet.
    pub fn open(backend: B) -> Self {
        let store = Self { backend };
        if store.backend.get(STORE_KEY).is_none() {
            store.migrate_legacy();
        }
        store
    }

    /// Stored values for `tool` laid over the descriptor defaults.
    /// Keys the descriptor does not know are dropped; the rest are re-read
    /// through their field so each takes the kind the form expects.
    pub fn load(&self, tool: Tool) -> ParamBag {
        let descriptor = tool.descriptor();
        let defaults = descriptor.defaults();
        match self.document().tools.get(tool.key()) {
            Some(stored) => {
                let known: ParamBag = stored
                    .iter()
                    .filter_map(|(name, value)| {
                        let field = descriptor.field(name)?;
                        Some((name.clone(), field.parse_input(&value.to_form_value())))
                    })
                    .collect();
                defaults.overlaid_with(&known)
            }
            None => defaults,
        }
    }

    pub fn save(&self, tool: Tool, params: &ParamBag) -> Result<(), StoreError> {
        let mut document = self.document();
        document.tools.insert(tool.key().to_string(), params.clone());
        self.write(&document)
    }

    /// Last tool the user selected, AlphaFold when none was recorded.
    pub fn load_tool(&self) -> Tool {
        self.document()
            .last_tool
            .as_deref()
            .and_then(Tool::from_key)
            .unwrap_or(Tool::AlphaFold)
    }

    pub fn save_tool(&self, tool: Tool) -> Result<(), StoreError> {
        let mut document = self.document();
        document.last_tool = Some(tool.key().to_string());
        self.write(&document)
    }

    fn document(&self) -> StoredParameters {
        let Some(raw) = self.backend.get(STORE_KEY) else {
            return StoredParameters::default();
        };
        match serde_json::from_str::<StoredParameters>(&raw) {
            Ok(document) if document.version == STORE_VERSION => document,
            Ok(document) => {
                warn!(
                    "ignoring stored parameters of version {} (expected {})",
                    document.version, STORE_VERSION
                );
                StoredParameters::default()
            }
            Err(err) => {
                warn!("ignoring unreadable stored parameters: {}", err);
                StoredParameters::default()
            }
        }
    }

    fn write(&self, document: &StoredParameters) -> Result<(), StoreError> {
        let json = serde_json::to_string(document)?;
        self.backend.set(STORE_KEY, &json)?;
        debug!("stored parameters ({} bytes)", json.len());
        Ok(())
    }

    fn migrate_legacy(&self) {
        let mut document = StoredParameters::default();
        let mut found = false;

        if let Some(tool) = self.backend.get(LEGACY_TOOL_KEY) {
            found = true;
            document.last_tool = Tool::from_key(tool.trim()).map(|tool| tool.key().to_string());
        }
        for (tool, key) in LEGACY_PARAM_KEYS {
            let Some(raw) = self.backend.get(key) else {
                continue;
            };
            found = true;
            match serde_json::from_str::<ParamBag>(&raw) {
                Ok(params) => {
                    document.tools.insert(tool.key().to_string(), params);
                }
                Err(err) => warn!("dropping unreadable legacy {}: {}", key, err),
            }
        }

        if !found {
            return;
        }
        match self.write(&document) {
            Ok(()) => {
                self.backend.remove(LEGACY_TOOL_KEY);
                for (_, key) in LEGACY_PARAM_KEYS {
                    self.backend.remove(key);
                }
                info!("migrated legacy parameter keys to {}", STORE_KEY);
            }
            Err(err) => warn!("legacy parameter migration failed: {}", err),
        }
    }
}

// Filter state persistence
use super::state::{FilterState, ScopeKey};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Keyed storage for filter state. `Ok(None)` means no state was ever saved for the key.
pub trait FilterStateStore: Send + Sync {
    fn load(&self, key: &ScopeKey) -> Result<Option<FilterState>>;
    fn save(&self, key: &ScopeKey, state: &FilterState) -> Result<()>;
}

fn lock(states: &Mutex<HashMap<String, FilterState>>) -> Result<MutexGuard<'_, HashMap<String, FilterState>>> {
    states
        .lock()
        .map_err(|_| EngineError::StateStoreError("filter state lock poisoned".to_string()))
}

#[derive(Default)]
pub struct MemoryFilterStateStore {
    states: Mutex<HashMap<String, FilterState>>,
}

impl MemoryFilterStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterStateStore for MemoryFilterStateStore {
    fn load(&self, key: &ScopeKey) -> Result<Option<FilterState>> {
        Ok(lock(&self.states)?.get(&key.to_string()).cloned())
    }

    fn save(&self, key: &ScopeKey, state: &FilterState) -> Result<()> {
        lock(&self.states)?.insert(key.to_string(), state.clone());
        Ok(())
    }
}

/// All scopes in one JSON object keyed by the scope key's string form.
/// The whole file is rewritten on every save.
pub struct JsonFileFilterStateStore {
    path: PathBuf,
    states: Mutex<HashMap<String, FilterState>>,
}

impl JsonFileFilterStateStore {
    /// Opens `path`, starting empty when it does not exist. Unreadable entries are dropped
    /// so their scopes start cold.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let states = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            parse_states(&path, &contents)
        } else {
            debug!(path = %path.display(), "no filter state file yet");
            HashMap::new()
        };
        Ok(Self {
            path,
            states: Mutex::new(states),
        })
    }

    fn write(&self, states: &HashMap<String, FilterState>) -> Result<()> {
        let json = serde_json::to_string_pretty(states)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn parse_states(path: &Path, contents: &str) -> HashMap<String, FilterState> {
    let raw: HashMap<String, serde_json::Value> = match serde_json::from_str(contents) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "filter state file is corrupt, starting cold");
            return HashMap::new();
        }
    };
    raw.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<FilterState>(value) {
            Ok(state) => Some((key, state)),
            Err(e) => {
                warn!(scope = %key, error = %e, "dropping unreadable filter state");
                None
            }
        })
        .collect()
}

impl FilterStateStore for JsonFileFilterStateStore {
    fn load(&self, key: &ScopeKey) -> Result<Option<FilterState>> {
        Ok(lock(&self.states)?.get(&key.to_string()).cloned())
    }

    /// The cached state only changes once the file has been written.
    fn save(&self, key: &ScopeKey, state: &FilterState) -> Result<()> {
        let mut states = lock(&self.states)?;
        let mut next = states.clone();
        next.insert(key.to_string(), state.clone());
        self.write(&next)?;
        *states = next;
        Ok(())
    }
}

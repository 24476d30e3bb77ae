use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::info;

/// Session id → exclusive session resource.
///
/// The table lock only covers lookup, insert and remove. Launching and
/// dropping a session both happen outside it, and callers hold a session's
/// own lock for the whole of a page interaction.
pub struct SessionRegistry<S> {
    table: Mutex<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<S>>> {
        self.table.lock().get(id).cloned()
    }

    /// Existing session for `id`, or a newly launched one. When two callers
    /// race on a fresh id, the first insert wins and the other launch is
    /// discarded.
    pub fn get_or_launch(&self, id: &str, launch: impl FnOnce() -> Result<S>) -> Result<Arc<Mutex<S>>> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let fresh = Arc::new(Mutex::new(launch()?));
        let (session, spare) = {
            let mut table = self.table.lock();
            match table.entry(id.to_string()) {
                Entry::Occupied(e) => (Arc::clone(e.get()), Some(fresh)),
                Entry::Vacant(e) => {
                    info!("Started session {}", id);
                    (Arc::clone(e.insert(fresh)), None)
                }
            }
        };
        drop(spare);
        Ok(session)
    }

    /// Forget `id`. The resource itself is released once the last in-flight
    /// user lets go of it.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.table.lock().remove(id);
        let existed = removed.is_some();
        drop(removed);
        if existed {
            info!("Closed session {}", id);
        }
        existed
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

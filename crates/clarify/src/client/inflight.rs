use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::ClientError;

/// Registry of operations currently awaiting a response. Shared by clones of
/// the client so a duplicate submission fails fast instead of racing.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    active: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub(crate) fn acquire(&self, key: String) -> Result<InFlightGuard, ClientError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key.clone()) {
            return Err(ClientError::InFlight { operation: key });
        }
        Ok(InFlightGuard {
            active: Arc::clone(&self.active),
            key,
        })
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, key: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its slot when the owning future completes or is dropped.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    active: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

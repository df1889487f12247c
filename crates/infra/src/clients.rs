//! Client lookup port.
//!
//! Client records live in the surrounding service layer; the engine only
//! needs to know whether an identifier resolves.

use std::collections::HashSet;
use std::sync::RwLock;

use crediflow_core::ClientId;

/// Resolve client identifiers provided by the surrounding service layer.
pub trait ClientDirectory: Send + Sync {
    fn contains(&self, id: ClientId) -> bool;
}

/// In-memory client directory.
///
/// Intended for tests/dev; a production implementation fronts the real
/// client store.
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<HashSet<ClientId>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ClientId) {
        if let Ok(mut clients) = self.clients.write() {
            clients.insert(id);
        }
    }
}

impl ClientDirectory for InMemoryClientDirectory {
    fn contains(&self, id: ClientId) -> bool {
        match self.clients.read() {
            Ok(clients) => clients.contains(&id),
            Err(_) => false,
        }
    }
}

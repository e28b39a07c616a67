// src/engine/registry.rs

//! Connected clients and their negotiated settings.

use std::collections::BTreeMap;

use crate::protocol::{EffectiveSettings, Settings};
use crate::transport::Connection;
use crate::types::ClientId;

/// One registered client.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub connection: Connection,
    pub settings: Settings,
}

impl Client {
    pub fn effective_settings(&self, defaults: &EffectiveSettings) -> EffectiveSettings {
        self.settings.resolve(defaults)
    }
}

/// Clients keyed by id.
///
/// Ids start at 1 and only ever grow, so an id that was unregistered is
/// never handed out again by the same registry.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientId, Client>,
    last_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: Connection) -> ClientId {
        self.last_id += 1;
        let id = ClientId::new(self.last_id);
        self.clients.insert(
            id,
            Client {
                id,
                connection,
                settings: Settings::default(),
            },
        );
        id
    }

    /// Remove a client. Absent ids are ignored.
    pub fn unregister(&mut self, id: ClientId) -> Option<Client> {
        self.clients.remove(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Clients in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    /// Merge `update` into the client's settings. Returns false for unknown ids.
    pub fn update_settings(&mut self, id: ClientId, update: &Settings) -> bool {
        match self.clients.get_mut(&id) {
            Some(client) => {
                client.settings.merge(update);
                true
            }
            None => false,
        }
    }

    pub fn effective_settings(
        &self,
        id: ClientId,
        defaults: &EffectiveSettings,
    ) -> Option<EffectiveSettings> {
        self.get(id).map(|client| client.effective_settings(defaults))
    }

    /// Whether a file-content read could be needed by anyone right now.
    pub fn wants_contents(&self, defaults: &EffectiveSettings) -> bool {
        defaults.with_contents
            || self
                .clients
                .values()
                .any(|client| client.settings.with_contents == Some(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> EffectiveSettings {
        EffectiveSettings::new("/default")
    }

    #[test]
    fn ids_increase_and_are_never_reused() {
        let mut registry = ClientRegistry::new();
        let (a, _rx_a) = Connection::channel();
        let (b, _rx_b) = Connection::channel();
        let (c, _rx_c) = Connection::channel();

        let first = registry.register(a);
        let second = registry.register(b);
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);

        registry.unregister(second);
        let third = registry.register(c);
        assert_eq!(third.get(), 3);
        assert_eq!(registry.ids(), vec![first, third]);
    }

    #[test]
    fn unregister_twice_is_a_no_op() {
        let mut registry = ClientRegistry::new();
        let (conn, _rx) = Connection::channel();
        let id = registry.register(conn);

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn settings_updates_merge_per_client() {
        let mut registry = ClientRegistry::new();
        let (a, _rx_a) = Connection::channel();
        let (b, _rx_b) = Connection::channel();
        let a = registry.register(a);
        let b = registry.register(b);

        registry.update_settings(
            a,
            &Settings {
                relative_paths: Some(true),
                ..Settings::default()
            },
        );
        registry.update_settings(
            a,
            &Settings {
                with_contents: Some(true),
                ..Settings::default()
            },
        );

        assert_eq!(
            registry.effective_settings(a, &defaults()).unwrap(),
            EffectiveSettings::new("/default")
                .with_relative_paths(true)
                .with_file_contents(true)
        );
        assert_eq!(
            registry.effective_settings(b, &defaults()).unwrap(),
            defaults()
        );
    }

    #[test]
    fn update_for_unknown_client_is_rejected() {
        let mut registry = ClientRegistry::new();
        let (conn, _rx) = Connection::channel();
        let id = registry.register(conn);
        registry.unregister(id);

        assert!(!registry.update_settings(id, &Settings::default()));
        assert!(registry.effective_settings(id, &defaults()).is_none());
    }

    #[test]
    fn contents_wanted_by_defaults_or_any_client() {
        let mut registry = ClientRegistry::new();
        assert!(!registry.wants_contents(&defaults()));
        assert!(registry.wants_contents(&defaults().with_file_contents(true)));

        let (conn, _rx) = Connection::channel();
        let id = registry.register(conn);
        registry.update_settings(
            id,
            &Settings {
                with_contents: Some(true),
                ..Settings::default()
            },
        );
        assert!(registry.wants_contents(&defaults()));
    }
}

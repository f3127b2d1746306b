//! Server topology directory backing the global status indicators.
//!
//! SYSTEM CONTEXT
//! ==============
//! Topology events never touch chart buffers. They flip per-server
//! connectivity and bump `object_list_revision`, which the navigation layer
//! watches to re-fetch its object list.

#[cfg(test)]
#[path = "servers_test.rs"]
mod servers_test;

use std::collections::BTreeMap;

/// Last known state of one object server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: String,
    /// Display name; the id until the server reports one.
    pub name: String,
    pub connected: bool,
    /// Receive time of the last connectivity change, epoch milliseconds.
    pub last_change_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerDirectory {
    servers: BTreeMap<String, ServerInfo>,
    object_list_revision: u64,
}

impl ServerDirectory {
    /// Record a connectivity report. Returns `true` when the state flipped;
    /// a flip also requests an object list refresh.
    pub fn apply_status(&mut self, server_id: &str, server_name: Option<&str>, connected: bool, at_ms: i64) -> bool {
        let entry = self.servers.entry(server_id.to_owned()).or_insert_with(|| ServerInfo {
            id: server_id.to_owned(),
            name: server_id.to_owned(),
            connected: !connected,
            last_change_ms: at_ms,
        });
        if let Some(name) = server_name.filter(|n| !n.is_empty()) {
            name.clone_into(&mut entry.name);
        }
        if entry.connected == connected {
            return false;
        }
        entry.connected = connected;
        entry.last_change_ms = at_ms;
        self.object_list_revision += 1;
        true
    }

    /// Ask the navigation layer to re-fetch object lists.
    pub fn request_object_list_refresh(&mut self) {
        self.object_list_revision += 1;
    }

    pub fn object_list_revision(&self) -> u64 {
        self.object_list_revision
    }

    pub fn get(&self, server_id: &str) -> Option<&ServerInfo> {
        self.servers.get(server_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerInfo> {
        self.servers.values()
    }

    pub fn connected_count(&self) -> usize {
        self.servers.values().filter(|s| s.connected).count()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

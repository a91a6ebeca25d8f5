//! Registry of live client connections
//!
//! This module tracks who is connected to the board server:
//! - Connection ids, assigned monotonically as sockets are accepted
//! - Peer addresses and connect times for logging
//! - Per-connection request counters
//!
//! No capacity limit is enforced; every accepted socket is registered and
//! served by its own task.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client as seen by the server
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Peer address of the socket
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    /// Requests answered on this connection so far
    pub requests: u64,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            requests: 0,
        }
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Tracks all connected clients.
///
/// Shared between the accept loop and the per-connection tasks behind an
/// async `RwLock`; it is never held while the board lock is held.
pub struct ClientManager {
    /// Connected clients indexed by their id
    clients: HashMap<u32, Client>,
    /// Next id handed out to an accepted socket
    next_client_id: u32,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
        }
    }

    /// Registers a freshly accepted socket and returns its connection id
    pub fn add_client(&mut self, addr: SocketAddr) -> u32 {
        let client_id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1);

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        client_id
    }

    /// Removes a client, returning its record if it was registered
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!(
            "Client {} ({}) left after {} requests in {:.1}s",
            client.id,
            client.addr,
            client.requests,
            client.connected_for().as_secs_f32()
        );
        Some(client)
    }

    /// Adds answered requests to a client's counter; returns false for unknown ids
    pub fn record_requests(&mut self, client_id: u32, count: u64) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.requests += count;
                true
            }
            None => false,
        }
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new(1, test_addr());

        assert_eq!(client.id, 1);
        assert_eq!(client.addr, test_addr());
        assert_eq!(client.requests, 0);
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new();

        let client_id1 = manager.add_client(test_addr());
        let client_id2 = manager.add_client(test_addr2());

        assert_eq!(client_id1, 1);
        assert_eq!(client_id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_no_capacity_limit() {
        let mut manager = ClientManager::new();
        for port in 0..500u16 {
            manager.add_client(SocketAddr::from(([127, 0, 0, 1], 10_000 + port)));
        }
        assert_eq!(manager.len(), 500);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new();
        let client_id = manager.add_client(test_addr());

        let removed = manager.remove_client(&client_id).unwrap();
        assert_eq!(removed.id, client_id);
        assert!(manager.is_empty());

        assert!(manager.remove_client(&client_id).is_none());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new();
        let first = manager.add_client(test_addr());
        manager.remove_client(&first);

        let second = manager.add_client(test_addr());
        assert_ne!(first, second);
    }

    #[test]
    fn test_record_requests() {
        let mut manager = ClientManager::new();
        let client_id = manager.add_client(test_addr());

        assert!(manager.record_requests(client_id, 2));
        assert!(manager.record_requests(client_id, 3));
        assert!(!manager.record_requests(999, 1));

        let client = manager.remove_client(&client_id).unwrap();
        assert_eq!(client.requests, 5);
    }

    #[test]
    fn test_get_client_addrs() {
        let mut manager = ClientManager::new();
        let client_id1 = manager.add_client(test_addr());
        let client_id2 = manager.add_client(test_addr2());

        let mut addrs = manager.get_client_addrs();
        addrs.sort();
        assert_eq!(addrs, vec![(client_id1, test_addr()), (client_id2, test_addr2())]);
    }
}

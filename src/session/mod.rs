//! # Session Module
//!
//! Registry of DSU clients that asked for pad data.
//!
//! A client is registered by its first PadData request and stays eligible
//! for broadcast until it has been idle longer than the client timeout.
//! Both operations run under one lock, so counter increments and evictions
//! are atomic with the lookup that produced them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Default idle time after which a client is evicted
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// State kept per registered client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSession {
    /// Last time the client sent a PadData request
    pub last_access_time: Instant,

    /// Packet number to use for the next broadcast to this client
    pub last_packet_count: u32,
}

/// Thread-safe client registry
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SocketAddr, ClientSession>>,
    timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_TIMEOUT)
    }
}

impl SessionRegistry {
    /// Create an empty registry with the given idle timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, ClientSession>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a client or refresh its last access time
    pub fn touch(&self, endpoint: SocketAddr) {
        self.touch_at(endpoint, Instant::now());
    }

    /// [`touch`](Self::touch) with an explicit clock reading
    pub fn touch_at(&self, endpoint: SocketAddr, now: Instant) {
        let mut sessions = self.lock();
        match sessions.get_mut(&endpoint) {
            Some(session) => session.last_access_time = now,
            None => {
                info!("DSU client registered: {}", endpoint);
                sessions.insert(
                    endpoint,
                    ClientSession {
                        last_access_time: now,
                        last_packet_count: 0,
                    },
                );
            }
        }
    }

    /// Collect the recipients of one broadcast
    ///
    /// Returns every live client with the packet number to send it, and
    /// advances each returned client's counter. Clients idle longer than the
    /// timeout are left out and removed once the scan is done.
    pub fn broadcast_round(&self) -> Vec<(SocketAddr, u32)> {
        self.broadcast_round_at(Instant::now())
    }

    /// [`broadcast_round`](Self::broadcast_round) with an explicit clock reading
    pub fn broadcast_round_at(&self, now: Instant) -> Vec<(SocketAddr, u32)> {
        let mut sessions = self.lock();
        let mut recipients = Vec::with_capacity(sessions.len());
        let mut expired = Vec::new();

        for (endpoint, session) in sessions.iter_mut() {
            if now.saturating_duration_since(session.last_access_time) > self.timeout {
                expired.push(*endpoint);
            } else {
                recipients.push((*endpoint, session.last_packet_count));
                session.last_packet_count = session.last_packet_count.wrapping_add(1);
            }
        }

        for endpoint in expired {
            sessions.remove(&endpoint);
            debug!("DSU client timed out: {}", endpoint);
        }

        recipients
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no client is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

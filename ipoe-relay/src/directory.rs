//! Session directory
//!
//! Every relayed PPPoE session has two hash entries: one keyed by the AC's
//! MAC and AC-assigned session number, one keyed by the client's MAC and the
//! relay-assigned number. Both point at one slot in a fixed arena; a frame
//! arriving from either side finds its session by scanning a single bucket.
//!
//! ```text
//!   buckets[hash(ac_mac, ac_ses)]      buckets[hash(cli_mac, slot+1)]
//!           |                                     |
//!           +---------> slots[i] <----------------+
//!                       (generation g)
//! ```
//!
//! Handles carry the slot generation, so a handle to a freed session stays
//! harmless: lookups through it miss and freeing it again does nothing.

use crate::bundle::{BundleId, BundleKey, BundleManager};
use ipoe_core::{Error, MacAddr, Result};
use tracing::{debug, info};

/// Bucket count; prime, about six entries per bucket at full capacity
pub const HASH_BUCKETS: usize = 18917;

pub const DEFAULT_SESSIONS: usize = 5000;

/// Relay-assigned numbers are slot + 1; 0 and 0xFFFF are reserved
pub const MAX_SESSIONS: usize = 65534;

/// Bucket index for a (MAC, session number) key
pub fn hash(mac: &MacAddr, session_id: u16) -> usize {
    let m = mac.0;
    let lo = u32::from(m[0])
        | u32::from(m[1]) << 8
        | u32::from(m[2]) << 16
        | u32::from(m[3]) << 24;
    let hi = u32::from(session_id) | u32::from(m[4]) << 16 | u32::from(m[5]) << 24;
    ((lo ^ hi) % HASH_BUCKETS as u32) as usize
}

/// Which side of the relay an entry faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Access concentrator
    Ac,
    Client,
}

impl Side {
    pub fn peer(self) -> Side {
        match self {
            Side::Ac => Side::Client,
            Side::Client => Side::Ac,
        }
    }
}

/// Reference to a live session; stale once the session is freed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    slot: u32,
    generation: u32,
}

impl SessionHandle {
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    /// Session number the relay hands to the client
    pub fn relay_session_id(&self) -> u16 {
        (self.slot + 1) as u16
    }
}

/// One side of a session, as seen from the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// Relay interface index
    pub interface: usize,
    pub peer_mac: MacAddr,
    pub session_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDiscriminator {
    pub class: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub ac: SessionEntry,
    pub client: SessionEntry,
    /// Epoch of the last frame seen
    pub epoch: u64,
    pub userid: Vec<u8>,
    /// Identifier of the pending PAP/CHAP exchange
    pub auth_seq_id: Option<u8>,
    pub auth_ok: bool,
    pub epdis: Option<EndpointDiscriminator>,
    pub bundle: Option<BundleId>,
}

impl Session {
    pub fn entry(&self, side: Side) -> &SessionEntry {
        match side {
            Side::Ac => &self.ac,
            Side::Client => &self.client,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    session: Option<Session>,
}

/// Fixed-capacity session table with dual-keyed hash lookup
#[derive(Debug)]
pub struct SessionDirectory {
    slots: Vec<Slot>,
    free: Vec<u32>,
    buckets: Vec<Vec<(u32, Side)>>,
    bundles: BundleManager,
    epoch: u64,
}

impl SessionDirectory {
    /// Create a directory with `capacity` slots, clamped to 1..=65534
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_SESSIONS);
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                session: None,
            })
            .collect();

        Self {
            slots,
            // Lowest slot is handed out first
            free: (0..capacity as u32).rev().collect(),
            buckets: vec![Vec::new(); HASH_BUCKETS],
            bundles: BundleManager::new(),
            epoch: 0,
        }
    }

    /// Open a session from a PADS
    ///
    /// Fails with `ResourceExhausted` when every slot is taken; the
    /// directory is left as it was.
    pub fn create(
        &mut self,
        ac_interface: usize,
        client_interface: usize,
        ac_mac: MacAddr,
        client_mac: MacAddr,
        ac_session_id: u16,
    ) -> Result<SessionHandle> {
        let slot = self.free.pop().ok_or_else(|| {
            Error::ResourceExhausted(format!("all {} session slots in use", self.slots.len()))
        })?;

        let handle = SessionHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        };
        let relay_id = handle.relay_session_id();

        self.slots[slot as usize].session = Some(Session {
            ac: SessionEntry {
                interface: ac_interface,
                peer_mac: ac_mac,
                session_id: ac_session_id,
            },
            client: SessionEntry {
                interface: client_interface,
                peer_mac: client_mac,
                session_id: relay_id,
            },
            epoch: self.epoch,
            userid: Vec::new(),
            auth_seq_id: None,
            auth_ok: false,
            epdis: None,
            bundle: None,
        });

        self.buckets[hash(&ac_mac, ac_session_id)].push((slot, Side::Ac));
        self.buckets[hash(&client_mac, relay_id)].push((slot, Side::Client));

        info!(
            ac_mac = %ac_mac,
            ac_session = ac_session_id,
            client_mac = %client_mac,
            session = relay_id,
            "Opened session"
        );

        Ok(handle)
    }

    /// Look up the entry keyed by (mac, session number) on one side
    pub fn find(&self, mac: &MacAddr, session_id: u16, side: Side) -> Option<SessionHandle> {
        self.find_any(mac, session_id)
            .filter(|&(_, s)| s == side)
            .map(|(handle, _)| handle)
    }

    /// Look up the entry keyed by (mac, session number) on either side
    pub fn find_any(&self, mac: &MacAddr, session_id: u16) -> Option<(SessionHandle, Side)> {
        self.buckets[hash(mac, session_id)]
            .iter()
            .find_map(|&(slot, side)| {
                let s = self.slots[slot as usize].session.as_ref()?;
                let entry = s.entry(side);
                (entry.peer_mac == *mac && entry.session_id == session_id).then(|| {
                    (
                        SessionHandle {
                            slot,
                            generation: self.slots[slot as usize].generation,
                        },
                        side,
                    )
                })
            })
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&Session> {
        let slot = self.slots.get(handle.slot())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.session.as_ref()
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut Session> {
        let slot = self.slots.get_mut(handle.slot())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.session.as_mut()
    }

    /// Close a session and release its slot
    ///
    /// Returns the closed session, or `None` if the handle was already stale.
    pub fn free(&mut self, handle: SessionHandle, reason: &str) -> Option<Session> {
        let slot = self.slots.get_mut(handle.slot())?;
        if slot.generation != handle.generation {
            debug!(session = handle.relay_session_id(), reason, "Session already closed");
            return None;
        }
        let session = slot.session.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        for side in [Side::Ac, Side::Client] {
            let entry = session.entry(side);
            self.buckets[hash(&entry.peer_mac, entry.session_id)]
                .retain(|&(s, e)| !(s == handle.slot && e == side));
        }
        self.free.push(handle.slot);

        if let Some(bundle) = session.bundle {
            self.bundles.leave(bundle);
        }

        info!(
            ac_mac = %session.ac.peer_mac,
            ac_session = session.ac.session_id,
            client_mac = %session.client.peer_mac,
            session = session.client.session_id,
            reason,
            "Closed session"
        );

        Some(session)
    }

    /// Record activity on a session at the current epoch
    pub fn touch(&mut self, handle: SessionHandle) {
        let epoch = self.epoch;
        if let Some(session) = self.get_mut(handle) {
            session.epoch = epoch;
        }
    }

    /// Put an authenticated session into its multilink bundle
    ///
    /// Needs a successful authentication and an endpoint discriminator.
    /// A session already in a bundle keeps it.
    pub fn join_bundle(&mut self, handle: SessionHandle) -> Option<BundleId> {
        let slot = self.slots.get_mut(handle.slot())?;
        if slot.generation != handle.generation {
            return None;
        }
        let session = slot.session.as_mut()?;
        if let Some(id) = session.bundle {
            return Some(id);
        }
        if !session.auth_ok {
            return None;
        }
        let epdis = session.epdis.as_ref()?;

        let id = self.bundles.join(BundleKey {
            userid: session.userid.clone(),
            class: epdis.class,
            data: epdis.data.clone(),
        });
        session.bundle = Some(id);
        Some(id)
    }

    pub fn bundles(&self) -> &BundleManager {
        &self.bundles
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Sessions whose last activity is more than `threshold` epochs old
    pub fn idle_sessions(&self, threshold: u64) -> Vec<SessionHandle> {
        self.iter()
            .filter(|(_, s)| self.epoch.saturating_sub(s.epoch) > threshold)
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionHandle, &Session)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.session.as_ref().map(|s| {
                (
                    SessionHandle {
                        slot: i as u32,
                        generation: slot.generation,
                    },
                    s,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AC_MAC: MacAddr = MacAddr([0x00, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);
    const CLIENT_MAC: MacAddr = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn client(n: u8) -> MacAddr {
        MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, n])
    }

    #[test]
    fn test_hash_formula() {
        // (0x33221100 ^ (0x0007 | 0x44 << 16 | 0x55 << 24)) % 18917
        let expected = (0x3322_1100u32 ^ 0x5544_0007u32) % 18917;
        assert_eq!(hash(&CLIENT_MAC, 7), expected as usize);
        assert!(hash(&MacAddr::BROADCAST, 0xFFFF) < HASH_BUCKETS);
    }

    #[test]
    fn test_create_and_find_both_keys() {
        let mut dir = SessionDirectory::new(16);
        let handle = dir.create(1, 0, AC_MAC, CLIENT_MAC, 0x1234).unwrap();
        assert_eq!(handle.relay_session_id(), 1);

        let (from_ac, ac_side) = dir.find_any(&AC_MAC, 0x1234).unwrap();
        let (from_client, client_side) = dir.find_any(&CLIENT_MAC, 1).unwrap();

        assert_eq!(from_ac, handle);
        assert_eq!(from_client, handle);
        assert_eq!(ac_side, Side::Ac);
        assert_eq!(client_side, ac_side.peer());

        let session = dir.get(handle).unwrap();
        assert_eq!(session.entry(Side::Ac).interface, 1);
        assert_eq!(session.entry(Side::Client).interface, 0);
        assert_eq!(session.client.session_id, 1);

        assert_eq!(dir.find(&AC_MAC, 0x1234, Side::Ac), Some(handle));
        assert_eq!(dir.find(&AC_MAC, 0x1234, Side::Client), None);
        assert_eq!(dir.find_any(&CLIENT_MAC, 0x1234), None);
    }

    #[test]
    fn test_double_free_is_noop() {
        let mut dir = SessionDirectory::new(4);
        let handle = dir.create(1, 0, AC_MAC, CLIENT_MAC, 9).unwrap();

        assert!(dir.free(handle, "Received PADT").is_some());
        assert!(dir.free(handle, "Idle Timeout").is_none());
        assert!(dir.find_any(&AC_MAC, 9).is_none());
        assert!(dir.find_any(&CLIENT_MAC, 1).is_none());
        assert!(dir.is_empty());

        // Slot is reused, the stale handle stays dead
        let again = dir.create(1, 0, AC_MAC, CLIENT_MAC, 10).unwrap();
        assert_eq!(again.slot(), handle.slot());
        assert_ne!(again, handle);
        assert!(dir.get(handle).is_none());
        assert!(dir.free(handle, "stale").is_none());
        assert!(dir.get(again).is_some());
    }

    #[test]
    fn test_full_table() {
        let mut dir = SessionDirectory::new(2);
        let a = dir.create(1, 0, AC_MAC, client(1), 100).unwrap();
        let b = dir.create(1, 0, AC_MAC, client(2), 101).unwrap();

        let err = dir.create(1, 0, AC_MAC, client(3), 102).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted(_)));

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.find_any(&AC_MAC, 100).map(|(h, _)| h), Some(a));
        assert_eq!(dir.find_any(&AC_MAC, 101).map(|(h, _)| h), Some(b));
        assert!(dir.find_any(&AC_MAC, 102).is_none());
    }

    #[test]
    fn test_relay_numbers_follow_slots() {
        let mut dir = SessionDirectory::new(3);
        let ids: Vec<u16> = (0..3)
            .map(|i| {
                dir.create(1, 0, AC_MAC, client(i), 200 + i as u16)
                    .unwrap()
                    .relay_session_id()
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_capacity_clamped() {
        assert_eq!(SessionDirectory::new(0).capacity(), 1);
        assert_eq!(SessionDirectory::new(100_000).capacity(), MAX_SESSIONS);
    }

    #[test]
    fn test_idle_sessions_threshold() {
        let mut dir = SessionDirectory::new(4);
        let idle = dir.create(1, 0, AC_MAC, client(1), 1).unwrap();
        let busy = dir.create(1, 0, AC_MAC, client(2), 2).unwrap();

        for _ in 0..3 {
            dir.advance_epoch();
        }
        dir.touch(busy);
        assert!(dir.idle_sessions(3).is_empty());

        dir.advance_epoch();
        assert_eq!(dir.idle_sessions(3), vec![idle]);
    }

    #[test]
    fn test_bundle_join_and_leave_on_free() {
        let mut dir = SessionDirectory::new(4);
        let a = dir.create(1, 0, AC_MAC, client(1), 1).unwrap();
        let b = dir.create(1, 0, AC_MAC, client(2), 2).unwrap();

        // Not authenticated yet
        assert_eq!(dir.join_bundle(a), None);

        for handle in [a, b] {
            let s = dir.get_mut(handle).unwrap();
            s.userid = b"alice".to_vec();
            s.auth_ok = true;
            s.epdis = Some(EndpointDiscriminator {
                class: 3,
                data: vec![1, 2, 3, 4, 5, 6],
            });
        }

        let id = dir.join_bundle(a).unwrap();
        assert_eq!(dir.join_bundle(a), Some(id));
        assert_eq!(dir.join_bundle(b), Some(id));
        assert_eq!(dir.bundles().members(id), Some(2));

        dir.free(a, "Received PADT");
        assert_eq!(dir.bundles().members(id), Some(1));
        dir.free(b, "Received PADT");
        assert!(dir.bundles().is_empty());
    }
}

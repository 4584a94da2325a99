//! Multilink bundle membership
//!
//! Sessions that authenticated as the same user and offered the same
//! endpoint discriminator belong to one bundle. Only membership is tracked.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleId(u32);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multilink identity shared by the members of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleKey {
    pub userid: Vec<u8>,
    pub class: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Bundle {
    key: BundleKey,
    members: usize,
}

/// Reference-counted bundles keyed by multilink identity
#[derive(Debug, Default)]
pub struct BundleManager {
    by_key: HashMap<BundleKey, BundleId>,
    bundles: HashMap<BundleId, Bundle>,
    next_id: u32,
}

impl BundleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one member to the bundle for `key`, creating it if needed
    pub fn join(&mut self, key: BundleKey) -> BundleId {
        if let Some(&id) = self.by_key.get(&key) {
            if let Some(bundle) = self.bundles.get_mut(&id) {
                bundle.members += 1;
                debug!(bundle = %id, members = bundle.members, "Session joined bundle");
                return id;
            }
        }

        let id = BundleId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        info!(
            bundle = %id,
            user = %String::from_utf8_lossy(&key.userid),
            class = key.class,
            "Created bundle"
        );

        self.by_key.insert(key.clone(), id);
        self.bundles.insert(id, Bundle { key, members: 1 });
        id
    }

    /// Drop one member; returns true when the bundle was destroyed
    pub fn leave(&mut self, id: BundleId) -> bool {
        let Some(bundle) = self.bundles.get_mut(&id) else {
            return false;
        };

        bundle.members = bundle.members.saturating_sub(1);
        if bundle.members > 0 {
            debug!(bundle = %id, members = bundle.members, "Session left bundle");
            return false;
        }

        if let Some(bundle) = self.bundles.remove(&id) {
            self.by_key.remove(&bundle.key);
        }
        info!(bundle = %id, "Destroyed bundle");
        true
    }

    pub fn members(&self, id: BundleId) -> Option<usize> {
        self.bundles.get(&id).map(|b| b.members)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

//! Room type and identifiers

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::chat::{Hub, HubHandle};
use crate::engine::{Negotiator, RetryPolicy};
use crate::rtc::RtcBackend;

/// Public identifier of a room: lowercase hex SHA-256 of the primary id
pub fn public_id(primary_id: &str) -> String {
    Sha256::digest(primary_id.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// A shared session: one track registry, one connection set, one chat hub
pub struct Room {
    id: String,
    public_id: String,
    negotiator: Arc<Negotiator>,
    hub: HubHandle,
}

impl Room {
    /// Create a room and start its chat hub
    pub(super) fn create(id: &str, backend: Arc<dyn RtcBackend>, policy: RetryPolicy) -> Self {
        let (hub, handle) = Hub::new(id);
        hub.spawn();

        Self {
            id: id.to_string(),
            public_id: public_id(id),
            negotiator: Arc::new(Negotiator::new(id, backend, policy)),
            hub: handle,
        }
    }

    /// Primary identifier chosen by the creator
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Derived identifier used by the stream paths
    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    pub fn negotiator(&self) -> &Arc<Negotiator> {
        &self.negotiator
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("public_id", &self.public_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_is_hex_sha256() {
        assert_eq!(
            public_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(public_id("").len(), 64);
    }
}

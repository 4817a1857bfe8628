use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MeshError, Result};

/// Unique identifier of a machine registered in the directory.
pub type MachineId = Uuid;

/// Operating system descriptor reported at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingSystem {
    /// e.g. "linux".
    pub name: String,
    /// e.g. "ubuntu".
    pub distro: String,
}

impl OperatingSystem {
    pub fn new(name: impl Into<String>, distro: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distro: distro.into(),
        }
    }

    /// Both the name and the distribution are set.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.distro.is_empty()
    }
}

/// A device registered in the mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    /// Stable hardware identifier sent on registration.
    pub hardware_id: Uuid,
    pub hostname: String,
    pub os: OperatingSystem,
    /// WireGuard-style public key; the machine's cryptographic identity.
    pub public_key: String,
    pub endpoints: Vec<SocketAddr>,
    /// Primary meshnet address assigned by the directory.
    pub address: Option<IpAddr>,
    /// Email of the owning user.
    pub email: String,
    pub supports_routing: bool,
}

impl Machine {
    /// Candidate for registration with the minimum required identity.
    pub fn candidate(public_key: impl Into<String>, os: OperatingSystem) -> Self {
        Self {
            public_key: public_key.into(),
            os,
            ..Default::default()
        }
    }

    pub fn with_hardware_id(mut self, hardware_id: Uuid) -> Self {
        self.hardware_id = hardware_id;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Vec<SocketAddr>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_routing_support(mut self, supports_routing: bool) -> Self {
        self.supports_routing = supports_routing;
        self
    }

    /// Check that this machine carries everything the directory needs to register it.
    pub fn validate_for_registration(&self) -> Result<()> {
        if self.public_key.is_empty() {
            return Err(MeshError::MissingPublicKey);
        }
        if !self.os.is_complete() {
            return Err(MeshError::MissingOsInfo);
        }
        Ok(())
    }
}

/// What the local machine permits a peer to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    pub allow_routing: bool,
    pub allow_inbound: bool,
    pub allow_local_network: bool,
    pub allow_fileshare: bool,
    pub always_accept_files: bool,
}

/// What a peer permits the local machine to do, plus its routing capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerGrants {
    pub allows_routing: bool,
    pub allows_inbound: bool,
    pub allows_local_network: bool,
    pub allows_fileshare: bool,
    pub supports_routing: bool,
}

/// A machine as seen from another machine, with permissions in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePeer {
    pub id: MachineId,
    pub hostname: String,
    pub os: OperatingSystem,
    pub public_key: String,
    pub endpoints: Vec<SocketAddr>,
    pub address: Option<IpAddr>,
    pub email: String,
    /// Peer sits on the same local network segment.
    pub is_local: bool,
    /// Outbound: granted by us to the peer.
    pub grants: Grants,
    /// Inbound: granted by the peer to us.
    pub peer_grants: PeerGrants,
}

impl MachinePeer {
    /// The peer can carry our traffic: it lets us route through it and is able to.
    pub fn can_route_through(&self) -> bool {
        self.peer_grants.allows_routing && self.peer_grants.supports_routing
    }
}

/// Lookup helpers over a peer listing.
pub trait PeerListExt {
    fn find_peer(&self, id: MachineId) -> Option<&MachinePeer>;
    fn routable_peers(&self) -> Vec<&MachinePeer>;
}

impl PeerListExt for [MachinePeer] {
    fn find_peer(&self, id: MachineId) -> Option<&MachinePeer> {
        self.iter().find(|p| p.id == id)
    }

    fn routable_peers(&self) -> Vec<&MachinePeer> {
        self.iter().filter(|p| p.can_route_through()).collect()
    }
}

/// A meshnet DNS record: one address and the names that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsHost {
    pub ip: IpAddr,
    pub domains: Vec<String>,
}

/// Full topology snapshot for one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineMap {
    /// The requesting machine as the directory currently sees it.
    pub machine: Machine,
    pub hosts: Vec<DnsHost>,
    pub peers: Vec<MachinePeer>,
    /// Response body exactly as received, for consumers that must re-serialize
    /// or verify it byte for byte.
    pub raw: Bytes,
}

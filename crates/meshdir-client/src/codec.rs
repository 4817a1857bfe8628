//! Wire records exchanged with the directory and their conversion to the
//! domain model.
//!
//! Lists the directory may send as `null` are decoded as empty. Peer grant
//! fields are required: a record missing one is rejected rather than defaulted.
//! Invitation records with a status this client does not know are skipped
//! with a warning; the rest of the list is still returned.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use meshdir_core::{
    DnsHost, Grants, Invitation, InvitationState, InviteGrants, Machine, MachineId, MachineMap,
    MachinePeer, MeshError, OperatingSystem, PeerGrants, Result,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

// ── Requests ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MachineCreateRequest<'a> {
    pub public_key: &'a str,
    pub hardware_identifier: Uuid,
    pub os: &'a str,
    pub os_version: &'a str,
    pub endpoints: &'a [SocketAddr],
    pub traffic_routing_supported: bool,
}

impl<'a> MachineCreateRequest<'a> {
    pub fn from_machine(machine: &'a Machine) -> Self {
        Self {
            public_key: &machine.public_key,
            hardware_identifier: machine.hardware_id,
            os: &machine.os.name,
            os_version: &machine.os.distro,
            endpoints: &machine.endpoints,
            traffic_routing_supported: machine.supports_routing,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MachineUpdateRequest<'a> {
    pub endpoints: &'a [SocketAddr],
    pub traffic_routing_supported: bool,
}

/// Outbound grants for one peer. Always the full set.
#[derive(Debug, Serialize)]
pub struct PeerUpdateRequest {
    pub allow_peer_traffic_routing: bool,
    pub allow_incoming_connections: bool,
    pub allow_peer_local_network_access: bool,
    pub allow_peer_send_files: bool,
    pub always_accept_files: bool,
}

impl From<Grants> for PeerUpdateRequest {
    fn from(g: Grants) -> Self {
        Self {
            allow_peer_traffic_routing: g.allow_routing,
            allow_incoming_connections: g.allow_inbound,
            allow_peer_local_network_access: g.allow_local_network,
            allow_peer_send_files: g.allow_fileshare,
            always_accept_files: g.always_accept_files,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvitationGrantsRecord {
    pub allow_peer_traffic_routing: bool,
    pub allow_incoming_connections: bool,
    pub allow_peer_local_network_access: bool,
    pub allow_peer_send_files: bool,
}

impl From<InviteGrants> for InvitationGrantsRecord {
    fn from(g: InviteGrants) -> Self {
        Self {
            allow_peer_traffic_routing: g.allow_routing,
            allow_incoming_connections: g.allow_inbound,
            allow_peer_local_network_access: g.allow_local_network,
            allow_peer_send_files: g.allow_fileshare,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendInvitationRequest<'a> {
    pub email: &'a str,
    #[serde(flatten)]
    pub grants: InvitationGrantsRecord,
}

/// Announces a file transfer batch to a peer.
///
/// The file name is left empty until everything else about the request has
/// been logged; `Debug` never prints it.
#[derive(Serialize)]
pub struct FileTransferNotification {
    pub receiver_machine_identifier: MachineId,
    pub file_count: u32,
    pub file_name: String,
}

impl fmt::Debug for FileTransferNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTransferNotification")
            .field("receiver_machine_identifier", &self.receiver_machine_identifier)
            .field("file_count", &self.file_count)
            .field("file_name", &"<redacted>")
            .finish()
    }
}

// ── Responses ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MachineCreateResponse {
    identifier: Uuid,
    hostname: String,
    #[serde(default)]
    endpoints: Option<Vec<SocketAddr>>,
    #[serde(default)]
    ip_addresses: Option<Vec<IpAddr>>,
}

#[derive(Debug, Deserialize)]
struct MachinePeerResponse {
    identifier: Uuid,
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    os: String,
    #[serde(default)]
    os_version: String,
    #[serde(default)]
    endpoints: Option<Vec<SocketAddr>>,
    #[serde(default)]
    ip_addresses: Option<Vec<IpAddr>>,
    #[serde(default)]
    user_email: String,
    #[serde(default)]
    is_local: bool,

    // What we allow the peer.
    allow_peer_traffic_routing: bool,
    allow_incoming_connections: bool,
    allow_peer_local_network_access: bool,
    allow_peer_send_files: bool,
    always_accept_files: bool,

    // What the peer allows us.
    peer_allows_traffic_routing: bool,
    peer_allows_incoming_connections: bool,
    peer_allows_local_network_access: bool,
    peer_allows_send_files: bool,
    traffic_routing_supported: bool,
}

impl MachinePeerResponse {
    fn os(&self) -> OperatingSystem {
        OperatingSystem::new(self.os.clone(), self.os_version.clone())
    }

    fn into_peer(self) -> MachinePeer {
        MachinePeer {
            id: self.identifier,
            os: self.os(),
            hostname: self.hostname,
            public_key: self.public_key,
            endpoints: self.endpoints.unwrap_or_default(),
            address: first_address(self.ip_addresses.as_deref()),
            email: self.user_email,
            is_local: self.is_local,
            grants: Grants {
                allow_routing: self.allow_peer_traffic_routing,
                allow_inbound: self.allow_incoming_connections,
                allow_local_network: self.allow_peer_local_network_access,
                allow_fileshare: self.allow_peer_send_files,
                always_accept_files: self.always_accept_files,
            },
            peer_grants: PeerGrants {
                allows_routing: self.peer_allows_traffic_routing,
                allows_inbound: self.peer_allows_incoming_connections,
                allows_local_network: self.peer_allows_local_network_access,
                allows_fileshare: self.peer_allows_send_files,
                supports_routing: self.traffic_routing_supported,
            },
        }
    }

    /// Own-device view: permission fields are dropped.
    fn into_machine(self) -> Machine {
        Machine {
            id: self.identifier,
            os: self.os(),
            hostname: self.hostname,
            public_key: self.public_key,
            endpoints: self.endpoints.unwrap_or_default(),
            address: first_address(self.ip_addresses.as_deref()),
            email: self.user_email,
            supports_routing: self.traffic_routing_supported,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct MachineMapResponse {
    identifier: Uuid,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    public_key: String,
    #[serde(default)]
    os: String,
    #[serde(default)]
    os_version: String,
    #[serde(default)]
    endpoints: Option<Vec<SocketAddr>>,
    #[serde(default)]
    ip_addresses: Option<Vec<IpAddr>>,
    #[serde(default)]
    traffic_routing_supported: bool,
    #[serde(default)]
    peers: Option<Vec<MachinePeerResponse>>,
    #[serde(default)]
    dns: Option<DnsResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct DnsResponse {
    #[serde(default)]
    hosts: Option<Vec<DnsHostResponse>>,
}

#[derive(Debug, Deserialize)]
struct DnsHostResponse {
    ip: IpAddr,
    #[serde(default)]
    domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InvitationResponse {
    identifier: Uuid,
    sender: String,
    receiver: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    allow_peer_traffic_routing: Option<bool>,
    #[serde(default)]
    allow_incoming_connections: Option<bool>,
    #[serde(default)]
    allow_peer_local_network_access: Option<bool>,
    #[serde(default)]
    allow_peer_send_files: Option<bool>,
}

impl InvitationResponse {
    /// `None` when the status is not one of the known lifecycle states.
    fn into_invitation(self) -> Option<Invitation> {
        // A directory that omits the status only lists pending invitations.
        let state = match self.status.as_deref() {
            None => InvitationState::Sent,
            Some(status) => match parse_state(status) {
                Some(state) => state,
                None => {
                    warn!(
                        invitation_id = %self.identifier,
                        status,
                        "skipping invitation with unknown status"
                    );
                    return None;
                }
            },
        };
        let flags = [
            self.allow_peer_traffic_routing,
            self.allow_incoming_connections,
            self.allow_peer_local_network_access,
            self.allow_peer_send_files,
        ];
        let grants = flags.iter().any(Option::is_some).then(|| InviteGrants {
            allow_routing: self.allow_peer_traffic_routing.unwrap_or(false),
            allow_inbound: self.allow_incoming_connections.unwrap_or(false),
            allow_local_network: self.allow_peer_local_network_access.unwrap_or(false),
            allow_fileshare: self.allow_peer_send_files.unwrap_or(false),
        });
        Some(Invitation {
            id: self.identifier,
            sender: self.sender,
            receiver: self.receiver,
            created_at: self.created_at,
            expires_at: self.expires_at,
            state,
            grants,
        })
    }
}

fn parse_state(status: &str) -> Option<InvitationState> {
    match status {
        "sent" => Some(InvitationState::Sent),
        "accepted" => Some(InvitationState::Accepted),
        "rejected" => Some(InvitationState::Rejected),
        "revoked" => Some(InvitationState::Revoked),
        _ => None,
    }
}

// ── Decoding ───────────────────────────────────────────────────

fn first_address(addresses: Option<&[IpAddr]>) -> Option<IpAddr> {
    addresses.and_then(|a| a.first().copied())
}

fn decode<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| MeshError::InvalidDirectoryResponse(format!("{what}: {e}")))
}

/// Merge a registration response into the submitted candidate.
///
/// Only the identifier, hostname, endpoints and address are taken from the
/// directory; OS and public key stay as the caller supplied them.
pub fn decode_registered(candidate: &Machine, body: &[u8]) -> Result<Machine> {
    let raw: MachineCreateResponse = decode(body, "machine registration")?;
    let addresses = raw.ip_addresses.unwrap_or_default();
    let Some(address) = addresses.first().copied() else {
        return Err(MeshError::InvalidDirectoryResponse(
            "registration returned no addresses".into(),
        ));
    };

    Ok(Machine {
        id: raw.identifier,
        hostname: raw.hostname,
        endpoints: raw.endpoints.unwrap_or_default(),
        address: Some(address),
        ..candidate.clone()
    })
}

/// Peers of a machine with the full permission matrix.
pub fn decode_peers(body: &[u8]) -> Result<Vec<MachinePeer>> {
    let raw: Option<Vec<MachinePeerResponse>> = decode(body, "peer list")?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(MachinePeerResponse::into_peer)
        .collect())
}

/// The caller's own machines, without peer permissions.
pub fn decode_local_machines(body: &[u8]) -> Result<Vec<Machine>> {
    let raw: Option<Vec<MachinePeerResponse>> = decode(body, "machine list")?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(MachinePeerResponse::into_machine)
        .collect())
}

/// Decode a mesh map, keeping `body` untouched in [`MachineMap::raw`].
pub fn decode_map(body: Bytes) -> Result<MachineMap> {
    let raw: MachineMapResponse = decode(&body, "machine map")?;
    let hosts = raw
        .dns
        .unwrap_or_default()
        .hosts
        .unwrap_or_default()
        .into_iter()
        .map(|h| DnsHost {
            ip: h.ip,
            domains: h.domains,
        })
        .collect();
    let peers = raw
        .peers
        .unwrap_or_default()
        .into_iter()
        .map(MachinePeerResponse::into_peer)
        .collect();

    Ok(MachineMap {
        machine: Machine {
            id: raw.identifier,
            hostname: raw.hostname,
            os: OperatingSystem::new(raw.os, raw.os_version),
            public_key: raw.public_key,
            endpoints: raw.endpoints.unwrap_or_default(),
            address: first_address(raw.ip_addresses.as_deref()),
            supports_routing: raw.traffic_routing_supported,
            ..Default::default()
        },
        hosts,
        peers,
        raw: body,
    })
}

pub fn decode_invitations(body: &[u8]) -> Result<Vec<Invitation>> {
    let raw: Option<Vec<InvitationResponse>> = decode(body, "invitation list")?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(InvitationResponse::into_invitation)
        .collect())
}

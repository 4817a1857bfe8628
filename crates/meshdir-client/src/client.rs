use std::net::SocketAddr;
use std::sync::Arc;

use meshdir_config::DirectoryConfig;
use meshdir_core::{
    Grants, Invitation, InvitationId, InviteGrants, Machine, MachineId, MachineMap, MachinePeer,
    MeshError, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::codec::{
    self, FileTransferNotification, InvitationGrantsRecord, MachineCreateRequest,
    MachineUpdateRequest, PeerUpdateRequest, SendInvitationRequest,
};
use crate::envelope::extract_error;
use crate::http::HttpTransport;
use crate::transport::{ApiRequest, ApiResponse, Transport};

const MACHINES: &str = "/v1/meshnet/machines";

fn machine_path(id: MachineId) -> String {
    format!("{MACHINES}/{id}")
}

fn peer_path(id: MachineId, peer: MachineId) -> String {
    format!("{MACHINES}/{id}/peers/{peer}")
}

fn invitations_path(id: MachineId) -> String {
    format!("{MACHINES}/{id}/invitations")
}

fn invitation_path(id: MachineId, invitation: InvitationId) -> String {
    format!("{MACHINES}/{id}/invitations/{invitation}")
}

/// Client for the meshnet directory.
///
/// Holds no directory state: every call goes to the service and every result
/// is rebuilt from its response. Calls on one client are serialized; each
/// holds the client's lock from building the request until the response has
/// been consumed. Use separate clients for concurrent access.
pub struct DirectoryClient {
    transport: Arc<dyn Transport>,
    lock: Mutex<()>,
}

impl DirectoryClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            lock: Mutex::new(()),
        }
    }

    /// Client over HTTP, using the configured base URL, user agent and timeout.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        info!(base_url = %transport.base_url(), "directory client ready");
        Ok(Self::new(Arc::new(transport)))
    }

    /// Send `request` and reject any non-success response via the error envelope.
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.transport.send(request).await?;
        extract_error(&response)?;
        Ok(response)
    }

    // ── Machine lifecycle ──────────────────────────────────────

    /// Register `machine` and return it with the directory-assigned identity.
    pub async fn register(&self, token: &str, machine: &Machine) -> Result<Machine> {
        machine.validate_for_registration()?;
        let _guard = self.lock.lock().await;

        let request = ApiRequest::post(MACHINES, token)
            .with_json(&MachineCreateRequest::from_machine(machine))?;
        let response = self.call(request).await?;
        let registered = codec::decode_registered(machine, &response.body)?;

        info!(machine_id = %registered.id, hostname = %registered.hostname, "machine registered");
        Ok(registered)
    }

    /// Publish a new endpoint set for `id`. Also declares routing support.
    pub async fn update(&self, token: &str, id: MachineId, endpoints: &[SocketAddr]) -> Result<()> {
        if endpoints.is_empty() {
            return Err(MeshError::MissingEndpoints);
        }
        let _guard = self.lock.lock().await;

        let request = ApiRequest::patch(machine_path(id), token).with_json(&MachineUpdateRequest {
            endpoints,
            traffic_routing_supported: true,
        })?;
        self.call(request).await?;
        debug!(machine_id = %id, endpoints = endpoints.len(), "endpoints published");
        Ok(())
    }

    pub async fn unregister(&self, token: &str, id: MachineId) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.call(ApiRequest::delete(machine_path(id), token)).await?;
        info!(machine_id = %id, "machine unregistered");
        Ok(())
    }

    // ── Peers ──────────────────────────────────────────────────

    /// The caller's own registered machines.
    pub async fn local(&self, token: &str) -> Result<Vec<Machine>> {
        let _guard = self.lock.lock().await;
        let response = self.call(ApiRequest::get(MACHINES, token)).await?;
        codec::decode_local_machines(&response.body)
    }

    /// All peers of `id` with permissions in both directions.
    pub async fn list(&self, token: &str, id: MachineId) -> Result<Vec<MachinePeer>> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/peers", machine_path(id));
        let response = self.call(ApiRequest::get(path, token)).await?;
        codec::decode_peers(&response.body)
    }

    /// Replace every outbound grant `id` gives to `peer`.
    pub async fn configure(
        &self,
        token: &str,
        id: MachineId,
        peer: MachineId,
        grants: Grants,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let request =
            ApiRequest::patch(peer_path(id, peer), token).with_json(&PeerUpdateRequest::from(grants))?;
        self.call(request).await?;
        debug!(machine_id = %id, peer_id = %peer, ?grants, "peer permissions configured");
        Ok(())
    }

    pub async fn unpair(&self, token: &str, id: MachineId, peer: MachineId) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.call(ApiRequest::delete(peer_path(id, peer), token)).await?;
        info!(machine_id = %id, peer_id = %peer, "peer unpaired");
        Ok(())
    }

    /// Current topology snapshot for `id`, with the response body kept verbatim.
    pub async fn map(&self, token: &str, id: MachineId) -> Result<MachineMap> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/map", machine_path(id));
        let response = self.call(ApiRequest::get(path, token)).await?;
        let map = codec::decode_map(response.body)?;
        debug!(machine_id = %id, peers = map.peers.len(), hosts = map.hosts.len(), "mesh map fetched");
        Ok(map)
    }

    // ── Invitations ────────────────────────────────────────────

    /// Invite `email` to pair with `id`'s owner, offering `grants`.
    pub async fn invite(
        &self,
        token: &str,
        id: MachineId,
        email: &str,
        grants: InviteGrants,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let request = ApiRequest::post(invitations_path(id), token).with_json(&SendInvitationRequest {
            email,
            grants: grants.into(),
        })?;
        self.call(request).await?;
        info!(machine_id = %id, "invitation sent");
        Ok(())
    }

    /// Invitations sent by `id`, in whatever state the directory reports.
    pub async fn sent(&self, token: &str, id: MachineId) -> Result<Vec<Invitation>> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/sent", invitations_path(id));
        let response = self.call(ApiRequest::get(path, token)).await?;
        codec::decode_invitations(&response.body)
    }

    /// Invitations received by `id`, in whatever state the directory reports.
    pub async fn received(&self, token: &str, id: MachineId) -> Result<Vec<Invitation>> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/received", invitations_path(id));
        let response = self.call(ApiRequest::get(path, token)).await?;
        codec::decode_invitations(&response.body)
    }

    /// Accept a pending invitation, granting the sender `grants`.
    pub async fn accept(
        &self,
        token: &str,
        id: MachineId,
        invitation: InvitationId,
        grants: InviteGrants,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/accept", invitation_path(id, invitation));
        let request = ApiRequest::post(path, token).with_json(&InvitationGrantsRecord::from(grants))?;
        self.call(request).await?;
        info!(machine_id = %id, invitation_id = %invitation, "invitation accepted");
        Ok(())
    }

    pub async fn reject(&self, token: &str, id: MachineId, invitation: InvitationId) -> Result<()> {
        let _guard = self.lock.lock().await;
        let path = format!("{}/reject", invitation_path(id, invitation));
        self.call(ApiRequest::post(path, token)).await?;
        info!(machine_id = %id, invitation_id = %invitation, "invitation rejected");
        Ok(())
    }

    /// Withdraw an invitation `id` sent.
    pub async fn revoke(&self, token: &str, id: MachineId, invitation: InvitationId) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.call(ApiRequest::delete(invitation_path(id, invitation), token))
            .await?;
        info!(machine_id = %id, invitation_id = %invitation, "invitation revoked");
        Ok(())
    }

    // ── Notifications ──────────────────────────────────────────

    /// Tell `peer` that `file_count` files are on their way.
    pub async fn notify_new_transfer(
        &self,
        token: &str,
        id: MachineId,
        peer: MachineId,
        file_name: &str,
        file_count: u32,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut notification = FileTransferNotification {
            receiver_machine_identifier: peer,
            file_count,
            file_name: String::new(),
        };
        debug!(machine_id = %id, peer_id = %peer, file_count, "notifying peer of file transfer");
        // File names must never reach the logs; attach it last.
        notification.file_name = file_name.to_string();

        let path = format!("{}/notifications/file-transfer", machine_path(id));
        let request = ApiRequest::post(path, token).with_json(&notification)?;
        self.call(request).await?;
        Ok(())
    }
}

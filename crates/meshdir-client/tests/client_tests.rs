#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use meshdir_client::{DirectoryClient, MockTransport};
    use meshdir_core::*;
    use reqwest::Method;
    use serde_json::{Value, json};
    use uuid::Uuid;

    const TOKEN: &str = "bearer-token";

    fn client(mock: MockTransport) -> (DirectoryClient, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        (DirectoryClient::new(mock.clone()), mock)
    }

    fn body_json(mock: &MockTransport) -> Value {
        let req = mock.last_request().expect("a request was sent");
        serde_json::from_slice(req.body.as_ref().expect("request has a body")).unwrap()
    }

    fn candidate() -> Machine {
        Machine::candidate("pk1", OperatingSystem::new("linux", "ubuntu"))
    }

    // ── Register ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_register_without_public_key_sends_nothing() {
        let (client, mock) = client(MockTransport::new());
        let machine = Machine::candidate("", OperatingSystem::new("linux", "ubuntu"));
        let err = client.register(TOKEN, &machine).await.unwrap_err();
        assert!(matches!(err, MeshError::MissingPublicKey));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_register_without_os_sends_nothing() {
        let (client, mock) = client(MockTransport::new());
        for os in [OperatingSystem::new("", "ubuntu"), OperatingSystem::new("linux", "")] {
            let err = client
                .register(TOKEN, &Machine::candidate("pk1", os))
                .await
                .unwrap_err();
            assert!(matches!(err, MeshError::MissingOsInfo));
        }
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_register_merges_server_identity_with_candidate() {
        let id = Uuid::new_v4();
        let (client, mock) = client(MockTransport::new().with_json(
            201,
            json!({
                "identifier": id,
                "hostname": "h1",
                "endpoints": ["10.0.0.1:51820"],
                "ip_addresses": ["10.0.0.1"],
                // Echoed back but not trusted.
                "public_key": "server-key",
                "os": "windows",
                "os_version": "11"
            }),
        ));
        let hardware_id = Uuid::new_v4();
        let machine = candidate()
            .with_hardware_id(hardware_id)
            .with_routing_support(true);

        let registered = client.register(TOKEN, &machine).await.unwrap();
        assert_eq!(registered.id, id);
        assert_eq!(registered.hostname, "h1");
        assert_eq!(registered.public_key, "pk1");
        assert_eq!(registered.os, OperatingSystem::new("linux", "ubuntu"));
        assert_eq!(registered.address, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(registered.endpoints, vec!["10.0.0.1:51820".parse::<SocketAddr>().unwrap()]);

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/v1/meshnet/machines");
        assert_eq!(req.token, TOKEN);
        let body = body_json(&mock);
        assert_eq!(body["public_key"], "pk1");
        assert_eq!(body["hardware_identifier"], hardware_id.to_string());
        assert_eq!(body["os"], "linux");
        assert_eq!(body["os_version"], "ubuntu");
        assert_eq!(body["traffic_routing_supported"], true);
    }

    #[tokio::test]
    async fn test_register_with_no_addresses_is_invalid_response() {
        let (client, _mock) = client(MockTransport::new().with_json(
            201,
            json!({ "identifier": Uuid::new_v4(), "hostname": "h1", "endpoints": [], "ip_addresses": [] }),
        ));
        let err = client.register(TOKEN, &candidate()).await.unwrap_err();
        assert!(matches!(err, MeshError::InvalidDirectoryResponse(_)));
    }

    #[tokio::test]
    async fn test_register_surfaces_envelope_without_decoding() {
        let (client, _mock) =
            client(MockTransport::new().with_error(400, 100200, "public key already registered"));
        let err = client.register(TOKEN, &candidate()).await.unwrap_err();
        match err {
            MeshError::Directory(e) => {
                assert_eq!(e.kind, DirectoryErrorKind::BadRequest);
                assert_eq!(e.code, Some(100200));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // ── Update / unregister ────────────────────────────────────

    #[tokio::test]
    async fn test_update_without_endpoints_sends_nothing() {
        let (client, mock) = client(MockTransport::new());
        let err = client.update(TOKEN, Uuid::new_v4(), &[]).await.unwrap_err();
        assert!(matches!(err, MeshError::MissingEndpoints));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_update_publishes_endpoints_and_routing_support() {
        let id = Uuid::new_v4();
        let (client, mock) = client(MockTransport::new().with_status(200).with_status(200));
        let endpoints: [SocketAddr; 1] = ["203.0.113.7:51820".parse().unwrap()];

        client.update(TOKEN, id, &endpoints).await.unwrap();
        client.update(TOKEN, id, &endpoints).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(requests[0].path, format!("/v1/meshnet/machines/{id}"));
        assert_eq!(requests[0].body, requests[1].body);
        let body = body_json(&mock);
        assert_eq!(body["endpoints"], json!(["203.0.113.7:51820"]));
        assert_eq!(body["traffic_routing_supported"], true);
    }

    #[tokio::test]
    async fn test_unregistered_machine_is_not_found() {
        let id = Uuid::new_v4();
        let (client, mock) = client(
            MockTransport::new()
                .with_status(204)
                .with_error(404, 100404, "machine not found"),
        );
        client.unregister(TOKEN, id).await.unwrap();
        assert_eq!(mock.last_request().unwrap().method, Method::DELETE);

        let err = client.list(TOKEN, id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    // ── Peers ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_local_lists_own_machines() {
        let id = Uuid::new_v4();
        let (client, mock) = client(MockTransport::new().with_json(
            200,
            json!([{
                "identifier": id,
                "hostname": "laptop.nord",
                "public_key": "pk-laptop",
                "os": "linux",
                "os_version": "arch",
                "ip_addresses": ["100.64.0.9"],
                "allow_peer_traffic_routing": false,
                "allow_incoming_connections": false,
                "allow_peer_local_network_access": false,
                "allow_peer_send_files": false,
                "always_accept_files": false,
                "peer_allows_traffic_routing": false,
                "peer_allows_incoming_connections": false,
                "peer_allows_local_network_access": false,
                "peer_allows_send_files": false,
                "traffic_routing_supported": true
            }]),
        ));
        let machines = client.local(TOKEN).await.unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].id, id);
        assert_eq!(machines[0].address, Some("100.64.0.9".parse().unwrap()));
        assert!(machines[0].supports_routing);

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/v1/meshnet/machines");
    }

    #[tokio::test]
    async fn test_configure_sends_full_grant_set() {
        let (id, peer) = (Uuid::new_v4(), Uuid::new_v4());
        let (client, mock) = client(MockTransport::new().with_status(200));
        let grants = Grants {
            allow_routing: true,
            allow_inbound: false,
            allow_local_network: false,
            allow_fileshare: true,
            always_accept_files: false,
        };
        client.configure(TOKEN, id, peer, grants).await.unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.path, format!("/v1/meshnet/machines/{id}/peers/{peer}"));
        assert_eq!(
            body_json(&mock),
            json!({
                "allow_peer_traffic_routing": true,
                "allow_incoming_connections": false,
                "allow_peer_local_network_access": false,
                "allow_peer_send_files": true,
                "always_accept_files": false
            })
        );
    }

    #[tokio::test]
    async fn test_unpair_path() {
        let (id, peer) = (Uuid::new_v4(), Uuid::new_v4());
        let (client, mock) = client(MockTransport::new().with_status(204));
        client.unpair(TOKEN, id, peer).await.unwrap();
        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.path, format!("/v1/meshnet/machines/{id}/peers/{peer}"));
        assert!(req.body.is_none());
    }

    // ── Map ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_map_with_zero_peers_is_empty_not_error() {
        let id = Uuid::new_v4();
        let raw = json!({
            "identifier": id,
            "hostname": "self.nord",
            "public_key": "pk-self",
            "ip_addresses": ["100.64.0.1"],
            "peers": [],
            "dns": { "hosts": [] }
        })
        .to_string();
        let (client, mock) = client(MockTransport::new().with_response(200, raw.clone()));

        let map = client.map(TOKEN, id).await.unwrap();
        assert!(map.peers.is_empty());
        assert!(map.hosts.is_empty());
        assert_eq!(map.machine.hostname, "self.nord");
        assert_eq!(&map.raw[..], raw.as_bytes());
        assert_eq!(mock.last_request().unwrap().path, format!("/v1/meshnet/machines/{id}/map"));
    }

    #[tokio::test]
    async fn test_map_keeps_raw_body_byte_for_byte() {
        // Unusual spacing and key order must survive untouched.
        let raw = format!(
            "{{ \"peers\" : null ,\n  \"identifier\":\"{}\", \"dns\":{{\"hosts\":[{{\"ip\":\"100.64.0.2\",\"domains\":[\"peer.nord\"]}}]}} }}",
            Uuid::new_v4()
        );
        let (client, _mock) = client(MockTransport::new().with_response(200, raw.clone()));
        let map = client.map(TOKEN, Uuid::new_v4()).await.unwrap();
        assert_eq!(&map.raw[..], raw.as_bytes());
        assert_eq!(map.hosts[0].domains, vec!["peer.nord".to_string()]);
    }

    #[tokio::test]
    async fn test_map_malformed_body() {
        let (client, _mock) = client(MockTransport::new().with_response(200, "{not json"));
        let err = client.map(TOKEN, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MeshError::InvalidDirectoryResponse(_)));
    }

    // ── Invitations ────────────────────────────────────────────

    #[tokio::test]
    async fn test_invite_body_and_path() {
        let id = Uuid::new_v4();
        let (client, mock) = client(MockTransport::new().with_status(201));
        let grants = InviteGrants {
            allow_inbound: true,
            allow_local_network: true,
            ..Default::default()
        };
        client.invite(TOKEN, id, "bob@example.com", grants).await.unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, format!("/v1/meshnet/machines/{id}/invitations"));
        assert_eq!(
            body_json(&mock),
            json!({
                "email": "bob@example.com",
                "allow_peer_traffic_routing": false,
                "allow_incoming_connections": true,
                "allow_peer_local_network_access": true,
                "allow_peer_send_files": false
            })
        );
    }

    #[tokio::test]
    async fn test_sent_and_received_paths() {
        let id = Uuid::new_v4();
        let listing = json!([{
            "identifier": Uuid::new_v4(),
            "sender": "alice@example.com",
            "receiver": "bob@example.com",
            "created_at": "2026-03-01T12:00:00Z",
            "status": "revoked"
        }]);
        let (client, mock) = client(
            MockTransport::new()
                .with_json(200, listing)
                .with_json(200, Value::Null),
        );

        let sent = client.sent(TOKEN, id).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].state, InvitationState::Revoked);
        assert!(client.received(TOKEN, id).await.unwrap().is_empty());

        let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                format!("/v1/meshnet/machines/{id}/invitations/sent"),
                format!("/v1/meshnet/machines/{id}/invitations/received"),
            ]
        );
    }

    #[tokio::test]
    async fn test_accept_reject_revoke_requests() {
        let (id, inv) = (Uuid::new_v4(), Uuid::new_v4());
        let (client, mock) = client(
            MockTransport::new()
                .with_status(200)
                .with_status(200)
                .with_status(204),
        );
        let grants = InviteGrants {
            allow_routing: true,
            ..Default::default()
        };
        client.accept(TOKEN, id, inv, grants).await.unwrap();
        client.reject(TOKEN, id, inv).await.unwrap();
        client.revoke(TOKEN, id, inv).await.unwrap();

        let requests = mock.requests();
        let base = format!("/v1/meshnet/machines/{id}/invitations/{inv}");
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, format!("{base}/accept"));
        let accept_body: Value = serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(accept_body["allow_peer_traffic_routing"], true);
        assert!(accept_body.get("email").is_none());
        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(requests[1].path, format!("{base}/reject"));
        assert!(requests[1].body.is_none());
        assert_eq!(requests[2].method, Method::DELETE);
        assert_eq!(requests[2].path, base);
    }

    #[tokio::test]
    async fn test_accept_on_terminal_invitation_is_invalid_state() {
        let (client, _mock) = client(
            MockTransport::new().with_error(409, 101301, "invitation is no longer pending"),
        );
        let err = client
            .accept(TOKEN, Uuid::new_v4(), Uuid::new_v4(), InviteGrants::default())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    // ── Notifications ──────────────────────────────────────────

    #[tokio::test]
    async fn test_notify_new_transfer() {
        let (id, peer) = (Uuid::new_v4(), Uuid::new_v4());
        let (client, mock) = client(MockTransport::new().with_status(200));
        client
            .notify_new_transfer(TOKEN, id, peer, "holiday-photos.zip", 3)
            .await
            .unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.path, format!("/v1/meshnet/machines/{id}/notifications/file-transfer"));
        // The request as the transport would log it carries no file name or token.
        let printed = format!("{req:?}");
        assert!(!printed.contains("holiday-photos"));
        assert!(!printed.contains(TOKEN));

        let body = body_json(&mock);
        assert_eq!(body["receiver_machine_identifier"], peer.to_string());
        assert_eq!(body["file_count"], 3);
        assert_eq!(body["file_name"], "holiday-photos.zip");
    }

    // ── Transport failures ─────────────────────────────────────

    #[tokio::test]
    async fn test_transport_error_propagates() {
        // Nothing queued: the mock fails like a dropped connection.
        let (client, _mock) = client(MockTransport::new());
        let err = client.list(TOKEN, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MeshError::Transport(_)));
    }

    #[tokio::test]
    async fn test_lock_released_after_error() {
        let (client, _mock) = client(
            MockTransport::new()
                .with_error(500, 1, "boom")
                .with_json(200, json!([])),
        );
        assert!(client.list(TOKEN, Uuid::new_v4()).await.is_err());
        assert!(client.list(TOKEN, Uuid::new_v4()).await.unwrap().is_empty());
    }
}

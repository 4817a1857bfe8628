#[cfg(test)]
mod tests {
    use chrono::Utc;
    use meshdir_core::*;
    use uuid::Uuid;

    fn invitation(state: InvitationState) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            sender: "alice@example.com".into(),
            receiver: "bob@example.com".into(),
            created_at: Utc::now(),
            expires_at: None,
            state,
            grants: None,
        }
    }

    // ── Registration preconditions ─────────────────────────────

    #[test]
    fn test_candidate_without_public_key_is_rejected() {
        let m = Machine::candidate("", OperatingSystem::new("linux", "ubuntu"));
        assert!(matches!(
            m.validate_for_registration(),
            Err(MeshError::MissingPublicKey)
        ));
    }

    #[test]
    fn test_candidate_without_os_is_rejected() {
        for os in [
            OperatingSystem::new("", "ubuntu"),
            OperatingSystem::new("linux", ""),
            OperatingSystem::default(),
        ] {
            let m = Machine::candidate("pk1", os);
            assert!(matches!(
                m.validate_for_registration(),
                Err(MeshError::MissingOsInfo)
            ));
        }
    }

    #[test]
    fn test_public_key_checked_before_os() {
        let m = Machine::candidate("", OperatingSystem::default());
        assert!(matches!(
            m.validate_for_registration(),
            Err(MeshError::MissingPublicKey)
        ));
    }

    #[test]
    fn test_complete_candidate_is_accepted() {
        let m = Machine::candidate("pk1", OperatingSystem::new("linux", "ubuntu"))
            .with_hardware_id(Uuid::new_v4())
            .with_routing_support(true);
        assert!(m.validate_for_registration().is_ok());
        assert!(m.supports_routing);
    }

    // ── Invitation state machine ───────────────────────────────

    #[test]
    fn test_sent_transitions() {
        let s = InvitationState::Sent;
        assert_eq!(s.transition(InvitationAction::Accept).unwrap(), InvitationState::Accepted);
        assert_eq!(s.transition(InvitationAction::Reject).unwrap(), InvitationState::Rejected);
        assert_eq!(s.transition(InvitationAction::Revoke).unwrap(), InvitationState::Revoked);
    }

    #[test]
    fn test_terminal_states_reject_every_action() {
        let terminal = [
            InvitationState::Accepted,
            InvitationState::Rejected,
            InvitationState::Revoked,
        ];
        let actions = [
            InvitationAction::Accept,
            InvitationAction::Reject,
            InvitationAction::Revoke,
        ];
        for state in terminal {
            assert!(state.is_terminal());
            for action in actions {
                let err = state.transition(action).unwrap_err();
                assert!(matches!(
                    err,
                    MeshError::InvalidTransition { from, action: a } if from == state && a == action
                ));
            }
        }
        assert!(!InvitationState::Sent.is_terminal());
    }

    #[test]
    fn test_apply_leaves_invitation_untouched_on_error() {
        let mut inv = invitation(InvitationState::Revoked);
        assert!(inv.apply(InvitationAction::Accept).is_err());
        assert_eq!(inv.state, InvitationState::Revoked);
        assert!(inv.grants.is_none());
    }

    #[test]
    fn test_accept_attaches_grants() {
        let mut inv = invitation(InvitationState::Sent);
        let grants = InviteGrants {
            allow_routing: true,
            allow_fileshare: true,
            ..Default::default()
        };
        inv.accept(grants).unwrap();
        assert_eq!(inv.state, InvitationState::Accepted);
        assert_eq!(inv.grants, Some(grants));
        assert!(!inv.is_pending());
        assert!(inv.accept(grants).is_err());
    }

    #[test]
    fn test_state_serde_is_lowercase() {
        let json = serde_json::to_string(&InvitationState::Revoked).unwrap();
        assert_eq!(json, "\"revoked\"");
        let s: InvitationState = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(s, InvitationState::Accepted);
    }

    // ── Peers ──────────────────────────────────────────────────

    #[test]
    fn test_routable_peers_need_permission_and_support() {
        let allowed_only = MachinePeer {
            id: Uuid::new_v4(),
            peer_grants: PeerGrants {
                allows_routing: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let routable = MachinePeer {
            id: Uuid::new_v4(),
            peer_grants: PeerGrants {
                allows_routing: true,
                supports_routing: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let peers = vec![allowed_only.clone(), routable.clone()];
        let found = peers.routable_peers();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, routable.id);
        assert_eq!(peers.find_peer(allowed_only.id), Some(&allowed_only));
        assert!(peers.find_peer(Uuid::new_v4()).is_none());
    }

    // ── Errors ─────────────────────────────────────────────────

    #[test]
    fn test_directory_kind_from_status() {
        assert_eq!(DirectoryErrorKind::from_status(404), DirectoryErrorKind::NotFound);
        assert_eq!(DirectoryErrorKind::from_status(409), DirectoryErrorKind::InvalidState);
        assert_eq!(DirectoryErrorKind::from_status(422), DirectoryErrorKind::InvalidState);
        assert_eq!(DirectoryErrorKind::from_status(401), DirectoryErrorKind::Unauthorized);
        assert_eq!(DirectoryErrorKind::from_status(503), DirectoryErrorKind::Server);
        assert_eq!(DirectoryErrorKind::from_status(418), DirectoryErrorKind::Other);
    }

    #[test]
    fn test_directory_error_helpers() {
        let err = MeshError::from(DirectoryError {
            kind: DirectoryErrorKind::NotFound,
            status: 404,
            code: Some(101),
            message: "machine not found".into(),
        });
        assert!(err.is_not_found());
        assert!(!err.is_invalid_state());
        let text = err.to_string();
        assert!(text.contains("not found"));
        assert!(text.contains("code 101"));
        assert!(text.contains("machine not found"));
        assert!(MeshError::MissingEndpoints.directory_kind().is_none());
    }
}

//! Properties of gate classification.

use std::sync::Arc;

use proptest::prelude::*;
use quire::{IdentityResolver, NodeError, OwnershipGate, Session, TrustDecision};
use quire_core::{InstanceId, Payload};
use quire_net::MemoryNetwork;
use quire_testkit::generators::{hostname, local_identity, payload};

fn gate_for(identity: quire_core::Identity) -> OwnershipGate {
    let network = MemoryNetwork::new();
    let resolver = Arc::new(IdentityResolver::new(
        Arc::new(network.transport(&identity.hostname)),
        None,
    ));
    OwnershipGate::new(Arc::new(identity), resolver, "http", true)
}

fn claiming(mut payload: Payload, owner: &quire_core::IdentityId, origin: &str) -> Payload {
    payload.stamp(&InstanceId::generate(), owner, origin);
    payload
}

proptest! {
    #[test]
    fn self_owner_needs_local_session(
        me in local_identity(),
        content in payload(),
        origin in hostname(),
    ) {
        let gate = gate_for(me.clone());
        let claimed = claiming(content, &me.id, &origin);

        let anonymous = gate.classify(&claimed, Session::Anonymous);
        prop_assert!(
            matches!(anonymous, Err(NodeError::OwnershipMismatch { .. })),
            "anonymous claim of self classified as {:?}",
            anonymous
        );
        prop_assert_eq!(
            gate.classify(&claimed, Session::AuthenticatedLocal).ok(),
            Some(TrustDecision::LocalTrusted)
        );
    }

    #[test]
    fn other_owner_goes_to_verification(
        me in local_identity(),
        other in local_identity(),
        content in payload(),
    ) {
        prop_assume!(me.id != other.id);
        let gate = gate_for(me);
        let claimed = claiming(content, &other.id, &other.hostname);

        prop_assert_eq!(
            gate.classify(&claimed, Session::Anonymous).ok(),
            Some(TrustDecision::RemoteClaimPendingVerification)
        );
    }
}

use std::sync::Barrier;
use std::thread;

use chrono::Duration;

use super::common::*;
use crate::auth::UserRole;
use crate::providers::{invitation_code, InvitationError, InvitationService, InvitationStatus, LeadStatus};
use crate::store::Store;

#[test]
fn codes_follow_the_atk_format() {
    assert_eq!(invitation_code(2025, "voyage", 1), "ATK-2025-VOYAGE-001");
    assert_eq!(invitation_code(2025, "Casa Voyage!", 12), "ATK-2025-CASAVOYAGE-012");
}

#[test]
fn generate_uses_the_next_sequence_and_invites_the_lead() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let service = InvitationService::new(store.clone());

    let first = service
        .generate(&lead.id, None, "voyage", 2025, 30, now())
        .expect("first code");
    let second = service
        .generate(&lead.id, None, "voyage", 2025, 30, now())
        .expect("second code");

    assert_eq!(first.code, "ATK-2025-VOYAGE-001");
    assert_eq!(second.code, "ATK-2025-VOYAGE-002");
    assert_eq!(first.email.as_deref(), Some("hola@casavoyage.cl"));
    assert_eq!(
        store.provider_leads.require(&lead.id).expect("lead").status,
        LeadStatus::Invited
    );

    assert!(matches!(
        service.generate(&lead.id, None, "--", 2025, 30, now()),
        Err(InvitationError::InvalidSlug(_))
    ));
}

#[test]
fn validate_expires_stale_codes() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let service = InvitationService::new(store.clone());
    let invitation = service
        .generate(&lead.id, None, "voyage", 2025, 7, now())
        .expect("generated");

    assert!(service.validate("atk-2025-voyage-001", now()).is_ok());

    let later = now() + Duration::days(8);
    assert!(matches!(
        service.validate(&invitation.code, later),
        Err(InvitationError::Expired(_))
    ));
    assert_eq!(
        store.invitations.require(&invitation.code).expect("stored").status,
        InvitationStatus::Expired
    );
}

#[test]
fn redeem_claims_the_mock_provider() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let stay = mock_stay(&store, &lead.id);
    let listing = mock_listing(&store, &lead.id);
    user(&store, "uid-marta", UserRole::Tourist);
    let service = InvitationService::new(store.clone());
    let invitation = service
        .generate(&lead.id, Some(&stay.id), "voyage", 2025, 30, now())
        .expect("generated");

    let redemption = service
        .redeem(&invitation.code, "uid-marta", now())
        .expect("redeemed");

    assert_eq!(redemption.invitation.status, InvitationStatus::Redeemed);
    assert_eq!(redemption.claimed_listings, vec![listing.id.clone()]);

    let stay = store.stays.require(&stay.id).expect("stay");
    assert_eq!(stay.owner_id.as_deref(), Some("uid-marta"));
    assert!(!stay.is_mock);
    assert!(!store.marketplace_listings.require(&listing.id).expect("listing").is_mock);
    assert_eq!(
        store.provider_leads.require(&lead.id).expect("lead").status,
        LeadStatus::Converted
    );
    assert_eq!(
        store.users.require("uid-marta").expect("user").role,
        UserRole::Provider
    );
    assert_eq!(
        store
            .user_profiles
            .require("uid-marta")
            .expect("profile")
            .provider_lead_id
            .as_deref(),
        Some(lead.id.as_str())
    );
    assert_eq!(store.conversion_logs.list().expect("logs").len(), 1);

    assert!(matches!(
        service.redeem(&invitation.code, "uid-marta", now()),
        Err(InvitationError::AlreadyRedeemed(_))
    ));
}

#[test]
fn redeem_requires_a_registered_user() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let service = InvitationService::new(store.clone());
    let invitation = service
        .generate(&lead.id, None, "voyage", 2025, 30, now())
        .expect("generated");

    assert!(matches!(
        service.redeem(&invitation.code, "ghost", now()),
        Err(InvitationError::UnknownUser(_))
    ));
    assert_eq!(
        store.invitations.require(&invitation.code).expect("stored").status,
        InvitationStatus::Pending
    );
}

#[test]
fn revoked_codes_cannot_be_validated() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let service = InvitationService::new(store.clone());
    let invitation = service
        .generate(&lead.id, None, "voyage", 2025, 30, now())
        .expect("generated");

    service.revoke(&invitation.code).expect("revoked");
    assert!(matches!(
        service.validate(&invitation.code, now()),
        Err(InvitationError::Revoked(_))
    ));
}

#[test]
fn concurrent_redemptions_claim_the_provider_once() {
    let store = Store::in_memory();
    let lead = lead(&store);
    let stay = mock_stay(&store, &lead.id);
    mock_listing(&store, &lead.id);
    user(&store, "uid-marta", UserRole::Tourist);
    user(&store, "uid-pedro", UserRole::Tourist);
    let service = InvitationService::new(store.clone());
    let invitation = service
        .generate(&lead.id, Some(&stay.id), "voyage", 2025, 30, now())
        .expect("generated");

    let barrier = Barrier::new(2);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = ["uid-marta", "uid-pedro"]
            .into_iter()
            .map(|uid| {
                let (service, barrier, code) = (&service, &barrier, invitation.code.as_str());
                scope.spawn(move || {
                    barrier.wait();
                    (uid, service.redeem(code, uid, now()))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("redeem thread"))
            .collect()
    });

    let winners: Vec<&str> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(uid, _)| *uid)
        .collect();
    assert_eq!(winners.len(), 1);
    assert!(results.iter().any(|(_, result)| matches!(
        result,
        Err(InvitationError::AlreadyRedeemed(_))
    )));

    let stored = store.invitations.require(&invitation.code).expect("stored");
    assert_eq!(stored.redeemed_by.as_deref(), Some(winners[0]));
    assert_eq!(
        store.stays.require(&stay.id).expect("stay").owner_id.as_deref(),
        Some(winners[0])
    );
    assert_eq!(store.conversion_logs.list().expect("logs").len(), 1);
}

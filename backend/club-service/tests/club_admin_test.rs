//! Moderator operations: diff-based edits, denormalized name repair,
//! current-read rotation, and the client-orchestrated cascade delete.

mod common;

use club_service::cache::SessionCache;
use club_service::domain::models::{
    collections, fields, Club, ClubPatch, MeetingKind, Membership, Visibility,
};
use club_service::error::ServiceError;
use common::{club_draft, in_person_event_draft, online_event_draft, TestBackend};
use record_store::{from_document, Document, Predicate, RecordStore};
use serde_json::json;
use uuid::Uuid;

async fn stored_club(backend: &TestBackend, club_id: Uuid) -> Club {
    from_document(
        backend
            .store
            .get(collections::CLUBS, &club_id.to_string())
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn rename_propagates_to_every_membership() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;
    let first = backend.seed_user("Avery").await;
    let second = backend.seed_user("Blake").await;

    let mod_coord = backend.coordinator(&moderator);
    let mut mod_cache = SessionCache::new();
    mod_coord.bootstrap(&mut mod_cache).await.unwrap();
    let club = mod_coord
        .create_club(
            &mut mod_cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    for reader in [&first, &second] {
        let coord = backend.coordinator(reader);
        let mut cache = SessionCache::new();
        coord.bootstrap(&mut cache).await.unwrap();
        coord.join_club(&mut cache, club.id).await.unwrap();
    }

    mod_coord
        .update_club_details(
            &mut mod_cache,
            club.id,
            ClubPatch {
                name: Some("Fantasy Readers".to_string()),
                ..ClubPatch::default()
            },
        )
        .await
        .unwrap();

    let memberships: Vec<Membership> = backend
        .store
        .query(
            collections::MEMBERSHIPS,
            &[Predicate::eq(fields::CLUB_ID, json!(club.id))],
        )
        .await
        .unwrap()
        .into_iter()
        .map(|doc| from_document(doc).unwrap())
        .collect();

    // Both copies repaired, none lost.
    assert_eq!(memberships.len(), 2);
    assert!(memberships.iter().all(|m| m.club_name == "Fantasy Readers"));
    assert_eq!(stored_club(&backend, club.id).await.name, "Fantasy Readers");
}

#[tokio::test]
async fn diff_write_does_not_clobber_concurrent_edits() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;

    let coord = backend.coordinator(&moderator);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();
    let club = coord
        .create_club(
            &mut cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    // Another device edits the description behind this session's back.
    let mut remote_edit = Document::new();
    remote_edit.insert(
        "description".to_string(),
        json!("rewritten on another device"),
    );
    backend
        .store
        .set(collections::CLUBS, &club.id.to_string(), remote_edit, true)
        .await
        .unwrap();

    // This session changes only the genre; the diff keeps the
    // description out of the write set entirely.
    coord
        .update_club_details(
            &mut cache,
            club.id,
            ClubPatch {
                genre: Some("Epic Fantasy".to_string()),
                ..ClubPatch::default()
            },
        )
        .await
        .unwrap();

    let stored = stored_club(&backend, club.id).await;
    assert_eq!(stored.genre, "Epic Fantasy");
    assert_eq!(stored.description, "rewritten on another device");
}

#[tokio::test]
async fn empty_diff_is_a_noop() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;

    let coord = backend.coordinator(&moderator);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();
    let club = coord
        .create_club(
            &mut cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    let unchanged = coord
        .update_club_details(&mut cache, club.id, ClubPatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged.name, club.name);
}

#[tokio::test]
async fn only_the_moderator_may_edit_or_delete() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;
    let reader = backend.seed_user("Riley").await;

    let mod_coord = backend.coordinator(&moderator);
    let mut mod_cache = SessionCache::new();
    mod_coord.bootstrap(&mut mod_cache).await.unwrap();
    let club = mod_coord
        .create_club(
            &mut mod_cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    let coord = backend.coordinator(&reader);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();

    let edit = coord
        .update_club_details(
            &mut cache,
            club.id,
            ClubPatch {
                name: Some("Hijacked".to_string()),
                ..ClubPatch::default()
            },
        )
        .await;
    assert!(matches!(edit, Err(ServiceError::Precondition(_))));

    let delete = coord.delete_club(&mut cache, club.id).await;
    assert!(matches!(delete, Err(ServiceError::Precondition(_))));
    assert_eq!(stored_club(&backend, club.id).await.name, "Fantasy Club");
}

#[tokio::test]
async fn event_drafts_are_validated_against_the_club_meeting_kind() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;

    let coord = backend.coordinator(&moderator);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();

    let online = coord
        .create_club(
            &mut cache,
            club_draft("Online Club", "Fiction", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();
    let local = coord
        .create_club(
            &mut cache,
            club_draft("Local Club", "Fiction", MeetingKind::InPerson, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    // An online club rejects a draft without a meeting link.
    let mut no_link = online_event_draft(online.id, "Kickoff", 10);
    no_link.meeting_link = None;
    let err = coord.create_event(&mut cache, no_link).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    // An in-person club rejects a draft without a location.
    let mut no_location = in_person_event_draft(local.id, "Meetup", 10);
    no_location.location = None;
    let err = coord
        .create_event(&mut cache, no_location)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    // Capacity must leave at least one reservable space.
    let empty_room = in_person_event_draft(local.id, "Meetup", 0);
    let err = coord.create_event(&mut cache, empty_room).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let event = coord
        .create_event(&mut cache, in_person_event_draft(local.id, "Meetup", 10))
        .await
        .unwrap();
    assert!(event.location.is_some());
    assert_eq!(event.attendees_count, 0);
}

#[tokio::test]
async fn set_current_read_rotates_previous_onto_past_reads() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;

    let coord = backend.coordinator(&moderator);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();
    let mut draft = club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public);
    draft.current_read = Some("Dune".to_string());
    let club = coord.create_club(&mut cache, draft, None).await.unwrap();

    coord
        .set_current_read(&mut cache, club.id, "Hyperion")
        .await
        .unwrap();

    let stored = stored_club(&backend, club.id).await;
    assert_eq!(stored.current_read.as_deref(), Some("Hyperion"));
    assert_eq!(stored.past_reads, vec!["Dune".to_string()]);
}

#[tokio::test]
async fn delete_club_cascades_over_all_dependents() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;
    let reader = backend.seed_user("Riley").await;

    let mod_coord = backend.coordinator(&moderator);
    let mut mod_cache = SessionCache::new();
    mod_coord.bootstrap(&mut mod_cache).await.unwrap();
    let club = mod_coord
        .create_club(
            &mut mod_cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            Some(vec![0xff, 0xd8, 0xff]),
        )
        .await
        .unwrap();
    let event = mod_coord
        .create_event(&mut mod_cache, online_event_draft(club.id, "Kickoff", 10))
        .await
        .unwrap();

    let coord = backend.coordinator(&reader);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();
    coord.join_club(&mut cache, club.id).await.unwrap();
    coord.attend_event(&mut cache, event.id, true).await.unwrap();

    mod_coord.delete_club(&mut mod_cache, club.id).await.unwrap();

    assert!(backend
        .store
        .get(collections::CLUBS, &club.id.to_string())
        .await
        .unwrap()
        .is_none());
    for collection in [
        collections::EVENTS,
        collections::MEMBERSHIPS,
        collections::ATTENDANCE,
    ] {
        let rows = backend
            .store
            .query(collection, &[Predicate::eq(fields::CLUB_ID, json!(club.id))])
            .await
            .unwrap();
        assert!(rows.is_empty(), "{collection} rows not cascaded");
    }
    assert!(backend.blobs.is_empty());
    assert!(mod_cache.explore_clubs.is_empty());
}

#[tokio::test]
async fn mid_cascade_failure_leaves_tolerated_orphans() {
    let backend = TestBackend::new();
    let moderator = backend.seed_user("Morgan").await;
    let reader = backend.seed_user("Riley").await;

    let mod_coord = backend.coordinator(&moderator);
    let mut mod_cache = SessionCache::new();
    mod_coord.bootstrap(&mut mod_cache).await.unwrap();
    let club = mod_coord
        .create_club(
            &mut mod_cache,
            club_draft("Fantasy Club", "Fantasy", MeetingKind::Online, Visibility::Public),
            None,
        )
        .await
        .unwrap();

    let coord = backend.coordinator(&reader);
    let mut cache = SessionCache::new();
    coord.bootstrap(&mut cache).await.unwrap();
    coord.join_club(&mut cache, club.id).await.unwrap();

    // The membership leg of the cascade fails; the club is gone and an
    // orphaned membership stays behind.
    backend.store.fail_writes_to(collections::MEMBERSHIPS);
    mod_coord.delete_club(&mut mod_cache, club.id).await.unwrap();
    backend.store.clear_write_failures();

    let orphans = backend
        .store
        .query(
            collections::MEMBERSHIPS,
            &[Predicate::eq(fields::CLUB_ID, json!(club.id))],
        )
        .await
        .unwrap();
    assert_eq!(orphans.len(), 1);

    // A fresh bootstrap skips the dangling membership instead of
    // failing on it.
    let mut fresh = SessionCache::new();
    coord.bootstrap(&mut fresh).await.unwrap();
    assert!(fresh.joined_clubs.is_empty());
}

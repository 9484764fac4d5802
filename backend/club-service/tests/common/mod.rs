#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use club_service::config::Config;
use club_service::domain::models::{
    collections, ClubDraft, EventDraft, GeoPoint, MeetingKind, UserProfile, Visibility,
};
use club_service::services::coordinator::Coordinator;
use club_service::session::Session;
use record_store::{to_document, MemoryBlobStore, MemoryRecordStore, RecordStore};

/// In-memory backend shared by every session in a test.
pub struct TestBackend {
    pub store: Arc<MemoryRecordStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryRecordStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }

    /// Seed a user profile document and return it.
    pub async fn seed_user(&self, name: &str) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            avatar_path: None,
        };
        self.store
            .set(
                collections::USERS,
                &profile.id.to_string(),
                to_document(&profile).unwrap(),
                false,
            )
            .await
            .unwrap();
        profile
    }

    /// A coordinator acting as `user`, with its own session.
    pub fn coordinator(&self, user: &UserProfile) -> Coordinator {
        Coordinator::new(
            self.store.clone(),
            self.blobs.clone(),
            Session::authenticated(user.id),
            Config::default(),
        )
    }

    pub fn anonymous_coordinator(&self) -> Coordinator {
        Coordinator::new(
            self.store.clone(),
            self.blobs.clone(),
            Session::anonymous(),
            Config::default(),
        )
    }
}

pub fn club_draft(name: &str, genre: &str, kind: MeetingKind, visibility: Visibility) -> ClubDraft {
    ClubDraft {
        name: name.to_string(),
        description: format!("{name} description"),
        genre: genre.to_string(),
        meeting_kind: kind,
        visibility,
        current_read: None,
    }
}

pub fn online_event_draft(club_id: Uuid, title: &str, capacity: i64) -> EventDraft {
    EventDraft {
        club_id,
        title: title.to_string(),
        starts_at: Utc::now() + Duration::days(1),
        duration_minutes: 60,
        capacity,
        meeting_link: Some("https://meet.example.com/room".to_string()),
        location: None,
    }
}

pub fn in_person_event_draft(club_id: Uuid, title: &str, capacity: i64) -> EventDraft {
    EventDraft {
        club_id,
        title: title.to_string(),
        starts_at: Utc::now() + Duration::days(1),
        duration_minutes: 90,
        capacity,
        meeting_link: None,
        location: Some(GeoPoint {
            latitude: 51.5,
            longitude: -0.12,
        }),
    }
}

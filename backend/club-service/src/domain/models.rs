use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection addressing.
///
/// Fixed collections hold one document per entity id. Message threads
/// and recent-message summaries are path-shaped, one collection per
/// owner (and per counterpart for threads), which is what makes the two
/// copies of a message independently addressable.
pub mod collections {
    use uuid::Uuid;

    pub const USERS: &str = "users";
    pub const CLUBS: &str = "clubs";
    pub const MEMBERSHIPS: &str = "memberships";
    pub const EVENTS: &str = "events";
    pub const ATTENDANCE: &str = "attendance";

    /// Message copies owned by `owner`, keyed per counterpart.
    pub fn messages(owner: Uuid, counterpart: Uuid) -> String {
        format!("messages/{owner}/{counterpart}")
    }

    /// Recent-message summaries owned by `owner`; document id is the
    /// counterpart's user id.
    pub fn recent_messages(owner: Uuid) -> String {
        format!("recent_messages/{owner}")
    }
}

/// Field names used in predicates and counter updates.
pub mod fields {
    pub const CLUB_ID: &str = "club_id";
    pub const USER_ID: &str = "user_id";
    pub const EVENT_ID: &str = "event_id";
    pub const MODERATOR_ID: &str = "moderator_id";
    pub const VISIBILITY: &str = "visibility";
    pub const CLUB_NAME: &str = "club_name";
    pub const ATTENDEES_COUNT: &str = "attendees_count";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    Online,
    InPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
}

/// Club entity - owned and mutable by its moderator only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub moderator_id: Uuid,
    pub cover_path: Option<String>,
    pub description: String,
    pub genre: String,
    pub meeting_kind: MeetingKind,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub current_read: Option<String>,
    pub past_reads: Vec<String>,
}

/// Membership entity - one per (club, user) pair.
///
/// Carries denormalized copies of the club name and the member's display
/// fields; the club-name copy is repaired on club rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub club_name: String,
    pub member_name: String,
    pub member_avatar_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Geographic coordinate for in-person meetings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Event entity.
///
/// `attendees_count` is a cached denormalization of the matching
/// Attendance rows, maintained by atomic increments; it may drift and
/// is never treated as authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub club_id: Uuid,
    pub moderator_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub attendees_count: i64,
    pub status: EventStatus,
    pub meeting_link: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Attendance entity - record existence is the sole source of truth for
/// "this user has a reserved space".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub event_id: Uuid,
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Message entity - stored twice (sender-keyed and recipient-keyed),
/// both copies field-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Latest-message summary, one per (owner, counterpart), stored once per
/// participant for symmetric retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMessageSummary {
    pub counterpart_id: Uuid,
    pub counterpart_name: String,
    pub counterpart_avatar_path: Option<String>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// User display profile, source of the denormalized member fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_path: Option<String>,
}

/// Input for club creation
#[derive(Debug, Clone)]
pub struct ClubDraft {
    pub name: String,
    pub description: String,
    pub genre: String,
    pub meeting_kind: MeetingKind,
    pub visibility: Visibility,
    pub current_read: Option<String>,
}

/// Field-level patch for club edits; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ClubPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub meeting_kind: Option<MeetingKind>,
    pub visibility: Option<Visibility>,
}

/// Input for event creation
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub club_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub meeting_link: Option<String>,
    pub location: Option<GeoPoint>,
}

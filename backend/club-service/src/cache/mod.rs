//! Session-scoped in-memory mirrors of the store.
//!
//! One `SessionCache` per user session, passed explicitly to the
//! coordinator (which is its only mutator) and to the view engine
//! (which only reads). Mutation is incremental: single-entry
//! append/remove/replace after each coordinator operation, wholesale
//! replacement only on bootstrap. No locks; all mutation happens on the
//! session's single logical execution context. Staleness relative to
//! other devices is expected and tolerated.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::models::{
    Attendance, Club, Event, Membership, Message, RecentMessageSummary, UserProfile,
};

#[derive(Debug, Default)]
pub struct SessionCache {
    /// The acting user's own display profile.
    pub profile: Option<UserProfile>,
    /// Public clubs for the explore surface.
    pub explore_clubs: Vec<Club>,
    /// Clubs the user holds a Membership in.
    pub joined_clubs: Vec<Club>,
    /// Clubs the user moderates. Moderation does not imply a
    /// Membership, so private moderated clubs appear nowhere else.
    pub moderated_clubs: Vec<Club>,
    /// Roster per club id, for clubs the user has joined.
    pub rosters: HashMap<Uuid, Vec<Membership>>,
    /// Events under joined clubs plus events the user moderates.
    pub events: Vec<Event>,
    /// The acting user's own attendance rows.
    pub attendance: Vec<Attendance>,
    /// Messageable users derived from joined-club rosters.
    pub contacts: Vec<UserProfile>,
    /// Message threads keyed by counterpart user id.
    pub threads: HashMap<Uuid, Vec<Message>>,
    /// Recent-message summaries, newest first.
    pub recent_messages: Vec<RecentMessageSummary>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- lookups ----

    pub fn is_joined(&self, club_id: Uuid) -> bool {
        self.joined_clubs.iter().any(|c| c.id == club_id)
    }

    pub fn joined_club_ids(&self) -> HashSet<Uuid> {
        self.joined_clubs.iter().map(|c| c.id).collect()
    }

    /// Look a club up across the joined, moderated, and explore mirrors.
    pub fn find_club(&self, club_id: Uuid) -> Option<&Club> {
        self.joined_clubs
            .iter()
            .chain(self.moderated_clubs.iter())
            .chain(self.explore_clubs.iter())
            .find(|c| c.id == club_id)
    }

    pub fn find_event(&self, event_id: Uuid) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn is_attending(&self, event_id: Uuid, user_id: Uuid) -> bool {
        self.attendance
            .iter()
            .any(|a| a.event_id == event_id && a.user_id == user_id)
    }

    // ---- clubs ----

    /// Replace the club wherever it is mirrored; new public clubs are
    /// appended to the explore list.
    pub fn upsert_club(&mut self, club: Club) {
        let mut seen = false;
        for slot in self
            .joined_clubs
            .iter_mut()
            .chain(self.moderated_clubs.iter_mut())
            .chain(self.explore_clubs.iter_mut())
        {
            if slot.id == club.id {
                *slot = club.clone();
                seen = true;
            }
        }
        if !seen && club.visibility == crate::domain::models::Visibility::Public {
            self.explore_clubs.push(club);
        }
    }

    pub fn mark_joined(&mut self, club: Club) {
        if !self.is_joined(club.id) {
            self.joined_clubs.push(club);
        }
    }

    /// Mirror a club the user moderates, private clubs included.
    pub fn mark_moderated(&mut self, club: Club) {
        if !self.moderated_clubs.iter().any(|c| c.id == club.id) {
            self.moderated_clubs.push(club);
        }
    }

    /// Evict a deleted club and everything that references it.
    pub fn remove_club(&mut self, club_id: Uuid) {
        self.explore_clubs.retain(|c| c.id != club_id);
        self.joined_clubs.retain(|c| c.id != club_id);
        self.moderated_clubs.retain(|c| c.id != club_id);
        self.rosters.remove(&club_id);
        self.events.retain(|e| e.club_id != club_id);
        self.attendance.retain(|a| a.club_id != club_id);
        tracing::debug!(%club_id, "evicted club and dependents from session cache");
    }

    /// Local effect of leaving a club: the club stays visible on
    /// explore, but its roster, events, and the user's attendance under
    /// it drop out of the joined views.
    pub fn leave_club(&mut self, club_id: Uuid, user_id: Uuid) {
        self.joined_clubs.retain(|c| c.id != club_id);
        self.rosters.remove(&club_id);
        self.events
            .retain(|e| e.club_id != club_id || e.moderator_id == user_id);
        self.attendance.retain(|a| a.club_id != club_id);
    }

    // ---- memberships ----

    pub fn insert_membership(&mut self, membership: Membership) {
        let roster = self.rosters.entry(membership.club_id).or_default();
        if !roster.iter().any(|m| m.user_id == membership.user_id) {
            roster.push(membership);
        }
    }

    pub fn remove_membership(&mut self, club_id: Uuid, user_id: Uuid) {
        if let Some(roster) = self.rosters.get_mut(&club_id) {
            roster.retain(|m| m.user_id != user_id);
        }
    }

    /// Repair the denormalized club name on every mirrored roster entry.
    pub fn patch_roster_club_name(&mut self, club_id: Uuid, name: &str) {
        if let Some(roster) = self.rosters.get_mut(&club_id) {
            for membership in roster.iter_mut() {
                membership.club_name = name.to_string();
            }
        }
    }

    // ---- events & attendance ----

    pub fn upsert_event(&mut self, event: Event) {
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => *slot = event,
            None => self.events.push(event),
        }
    }

    pub fn remove_event(&mut self, event_id: Uuid) {
        self.events.retain(|e| e.id != event_id);
        self.attendance.retain(|a| a.event_id != event_id);
    }

    pub fn insert_attendance(&mut self, attendance: Attendance) {
        if !self.is_attending(attendance.event_id, attendance.user_id) {
            self.attendance.push(attendance);
        }
    }

    pub fn remove_attendance(&mut self, event_id: Uuid, user_id: Uuid) {
        self.attendance
            .retain(|a| !(a.event_id == event_id && a.user_id == user_id));
    }

    // ---- messaging ----

    pub fn push_message(&mut self, counterpart_id: Uuid, message: Message) {
        self.threads.entry(counterpart_id).or_default().push(message);
    }

    pub fn set_thread(&mut self, counterpart_id: Uuid, messages: Vec<Message>) {
        self.threads.insert(counterpart_id, messages);
    }

    /// Replace or append the summary for its counterpart, keeping the
    /// list ordered newest first.
    pub fn upsert_recent_message(&mut self, summary: RecentMessageSummary) {
        self.recent_messages
            .retain(|s| s.counterpart_id != summary.counterpart_id);
        self.recent_messages.push(summary);
        self.recent_messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    }

    pub fn set_contacts(&mut self, contacts: Vec<UserProfile>) {
        self.contacts = contacts;
    }
}

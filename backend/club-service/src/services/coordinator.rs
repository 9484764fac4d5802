//! Consistency coordinator.
//!
//! Every user-initiated state change is an ordered sequence of
//! independent document writes. Each sub-write is attempted only after
//! the prior acknowledgement; there is no rollback and no transaction.
//! A failed first write aborts the operation with the cache untouched;
//! failures after that point are logged and leave a documented degraded
//! state that read paths tolerate. On success the session cache is
//! reconciled incrementally so the view engine reflects the operation
//! without another store round trip.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use record_store::{from_document, to_document, BlobStore, Document, Predicate, RecordStore};

use crate::cache::SessionCache;
use crate::config::Config;
use crate::domain::models::{
    collections, fields, Attendance, Club, ClubDraft, ClubPatch, Event, EventDraft, EventStatus,
    MeetingKind, Membership, Message, RecentMessageSummary, UserProfile,
};
use crate::error::{ServiceError, ServiceResult};
use crate::services::counters::CounterMaintainer;
use crate::session::Session;

fn id_pred(field: &str, id: Uuid) -> Predicate {
    Predicate::eq(field, json!(id))
}

fn decode_all<T: serde::de::DeserializeOwned>(docs: Vec<Document>) -> ServiceResult<Vec<T>> {
    docs.into_iter()
        .map(|doc| from_document(doc).map_err(ServiceError::from))
        .collect()
}

pub struct Coordinator {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    counters: CounterMaintainer,
    session: Session,
    config: Config,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        session: Session,
        config: Config,
    ) -> Self {
        let counters = CounterMaintainer::new(store.clone());
        Self {
            store,
            blobs,
            counters,
            session,
            config,
        }
    }

    // ---- helpers ----

    async fn fetch_club(&self, cache: &SessionCache, club_id: Uuid) -> ServiceResult<Club> {
        if let Some(club) = cache.find_club(club_id) {
            return Ok(club.clone());
        }
        let doc = self
            .store
            .get(collections::CLUBS, &club_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("club {club_id}")))?;
        Ok(from_document(doc)?)
    }

    async fn fetch_event(&self, cache: &SessionCache, event_id: Uuid) -> ServiceResult<Event> {
        if let Some(event) = cache.find_event(event_id) {
            return Ok(event.clone());
        }
        let doc = self
            .store
            .get(collections::EVENTS, &event_id.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;
        Ok(from_document(doc)?)
    }

    async fn own_profile(&self, cache: &SessionCache) -> ServiceResult<UserProfile> {
        if let Some(profile) = &cache.profile {
            return Ok(profile.clone());
        }
        let user = self.session.current_user()?;
        let doc = self
            .store
            .get(collections::USERS, &user.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("profile for user {user}")))?;
        Ok(from_document(doc)?)
    }

    fn require_moderator(&self, club: &Club) -> ServiceResult<Uuid> {
        let user = self.session.current_user()?;
        if club.moderator_id != user {
            return Err(ServiceError::Precondition(
                "only the club moderator may do this".to_string(),
            ));
        }
        Ok(user)
    }

    /// Query-and-delete every document matching `predicate`. Failures
    /// are logged and skipped: a mid-cascade crash leaves orphans, and
    /// read paths ignore them rather than fail.
    async fn delete_matching(&self, collection: &str, predicate: Predicate) -> usize {
        let docs = match self
            .store
            .query(collection, std::slice::from_ref(&predicate))
            .await
        {
            Ok(docs) => docs,
            Err(error) => {
                warn!(collection, %error, "cascade query failed; orphans remain");
                return 0;
            }
        };
        let mut deleted = 0;
        for doc in docs {
            let Some(id) = doc.get("id").and_then(Value::as_str) else {
                continue;
            };
            match self.store.delete(collection, id).await {
                Ok(()) => deleted += 1,
                Err(error) => {
                    warn!(collection, id, %error, "cascade delete failed; orphan remains")
                }
            }
        }
        deleted
    }

    fn derive_contacts(rosters: &HashMap<Uuid, Vec<Membership>>, me: Uuid) -> Vec<UserProfile> {
        let mut seen = HashSet::new();
        let mut contacts: Vec<UserProfile> = rosters
            .values()
            .flatten()
            .filter(|m| m.user_id != me && seen.insert(m.user_id))
            .map(|m| UserProfile {
                id: m.user_id,
                display_name: m.member_name.clone(),
                avatar_path: m.member_avatar_path.clone(),
            })
            .collect();
        contacts.sort_by_key(|c| c.display_name.to_lowercase());
        contacts
    }

    // ---- bootstrap ----

    /// Wholesale load of the session cache. The only full reload; every
    /// other operation reconciles incrementally.
    pub async fn bootstrap(&self, cache: &mut SessionCache) -> ServiceResult<()> {
        let user = self.session.current_user()?;
        let mut fresh = SessionCache::new();

        // Always re-read the profile; a stale cached display name must
        // not survive the reload and seed denormalized fields later.
        let profile_doc = self
            .store
            .get(collections::USERS, &user.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("profile for user {user}")))?;
        fresh.profile = Some(from_document(profile_doc)?);

        let memberships: Vec<Membership> = decode_all(
            self.store
                .query(
                    collections::MEMBERSHIPS,
                    &[id_pred(fields::USER_ID, user)],
                )
                .await?,
        )?;

        for membership in &memberships {
            let doc = self
                .store
                .get(collections::CLUBS, &membership.club_id.to_string())
                .await?;
            let Some(doc) = doc else {
                // Orphaned membership from a lagging cascade; skip it.
                debug!(club_id = %membership.club_id, "membership references a deleted club");
                continue;
            };
            let club: Club = from_document(doc)?;

            let roster: Vec<Membership> = decode_all(
                self.store
                    .query(
                        collections::MEMBERSHIPS,
                        &[id_pred(fields::CLUB_ID, club.id)],
                    )
                    .await?,
            )?;
            fresh.rosters.insert(club.id, roster);

            let events: Vec<Event> = decode_all(
                self.store
                    .query(collections::EVENTS, &[id_pred(fields::CLUB_ID, club.id)])
                    .await?,
            )?;
            for event in events {
                fresh.upsert_event(event);
            }

            fresh.joined_clubs.push(club);
        }

        // Moderation does not imply a Membership, so moderated clubs
        // (private ones included) need their own query or their events
        // would have no club row to join against.
        let moderated_clubs: Vec<Club> = decode_all(
            self.store
                .query(collections::CLUBS, &[id_pred(fields::MODERATOR_ID, user)])
                .await?,
        )?;
        for club in moderated_clubs {
            fresh.mark_moderated(club);
        }

        let moderated: Vec<Event> = decode_all(
            self.store
                .query(collections::EVENTS, &[id_pred(fields::MODERATOR_ID, user)])
                .await?,
        )?;
        for event in moderated {
            fresh.upsert_event(event);
        }

        fresh.attendance = decode_all(
            self.store
                .query(collections::ATTENDANCE, &[id_pred(fields::USER_ID, user)])
                .await?,
        )?;

        fresh.explore_clubs = decode_all(
            self.store
                .query(
                    collections::CLUBS,
                    &[Predicate::eq(fields::VISIBILITY, json!("public"))],
                )
                .await?,
        )?;

        let mut recent: Vec<RecentMessageSummary> = decode_all(
            self.store
                .query(&collections::recent_messages(user), &[])
                .await?,
        )?;
        recent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        fresh.recent_messages = recent;

        fresh.contacts = Self::derive_contacts(&fresh.rosters, user);

        *cache = fresh;
        debug!(%user, "session cache bootstrapped");
        Ok(())
    }

    // ---- clubs ----

    pub async fn create_club(
        &self,
        cache: &mut SessionCache,
        draft: ClubDraft,
        cover: Option<Vec<u8>>,
    ) -> ServiceResult<Club> {
        let user = self.session.current_user()?;
        if draft.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "club name must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let cover_path = match cover {
            Some(bytes) => {
                let path = format!("{}/{}.jpg", self.config.blob.covers_prefix, id);
                self.blobs.put(&path, bytes).await?;
                Some(path)
            }
            None => None,
        };

        let club = Club {
            id,
            name: draft.name,
            moderator_id: user,
            cover_path,
            description: draft.description,
            genre: draft.genre,
            meeting_kind: draft.meeting_kind,
            visibility: draft.visibility,
            created_at: Utc::now(),
            current_read: draft.current_read,
            past_reads: Vec::new(),
        };
        self.store
            .set(
                collections::CLUBS,
                &club.id.to_string(),
                to_document(&club)?,
                false,
            )
            .await?;

        cache.mark_moderated(club.clone());
        cache.upsert_club(club.clone());
        Ok(club)
    }

    /// Join a club. Soft no-op (`false`) when the pair already has a
    /// Membership; the pre-check is the only uniqueness guard, the
    /// store has none.
    pub async fn join_club(&self, cache: &mut SessionCache, club_id: Uuid) -> ServiceResult<bool> {
        let user = self.session.current_user()?;
        if cache.is_joined(club_id) {
            return Ok(false);
        }

        let club = self.fetch_club(cache, club_id).await?;
        let profile = self.own_profile(cache).await?;
        if cache.profile.is_none() {
            cache.profile = Some(profile.clone());
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            club_id,
            user_id: user,
            club_name: club.name.clone(),
            member_name: profile.display_name,
            member_avatar_path: profile.avatar_path,
            created_at: Utc::now(),
        };
        self.store
            .set(
                collections::MEMBERSHIPS,
                &membership.id.to_string(),
                to_document(&membership)?,
                false,
            )
            .await?;

        cache.mark_joined(club);
        cache.insert_membership(membership);

        // Pull the club's events into the joined views.
        let events = self
            .store
            .query(collections::EVENTS, &[id_pred(fields::CLUB_ID, club_id)])
            .await
            .and_then(|docs| {
                docs.into_iter()
                    .map(from_document::<Event>)
                    .collect::<Result<Vec<_>, _>>()
            });
        match events {
            Ok(events) => {
                for event in events {
                    cache.upsert_event(event);
                }
            }
            Err(error) => warn!(%club_id, %error, "could not load events for joined club"),
        }

        // New club-mates become messageable.
        if let Err(error) = self.refresh_contacts(cache).await {
            warn!(%club_id, %error, "contact refresh after join failed");
        }
        Ok(true)
    }

    /// Leave a club: three independent deletions (membership, the
    /// user's attendance rows under the club, local cache eviction).
    /// Failures after the membership delete leave stale attendance
    /// rows, an accepted degraded state.
    pub async fn leave_club(&self, cache: &mut SessionCache, club_id: Uuid) -> ServiceResult<bool> {
        let user = self.session.current_user()?;

        let rows = self
            .store
            .query(
                collections::MEMBERSHIPS,
                &[id_pred(fields::CLUB_ID, club_id), id_pred(fields::USER_ID, user)],
            )
            .await?;
        if rows.is_empty() {
            return Ok(false);
        }
        for doc in rows {
            let membership: Membership = from_document(doc)?;
            self.store
                .delete(collections::MEMBERSHIPS, &membership.id.to_string())
                .await?;
        }

        match self
            .store
            .query(
                collections::ATTENDANCE,
                &[id_pred(fields::CLUB_ID, club_id), id_pred(fields::USER_ID, user)],
            )
            .await
        {
            Ok(docs) => {
                for doc in docs {
                    let Some(id) = doc.get("id").and_then(Value::as_str) else {
                        continue;
                    };
                    if let Err(error) = self.store.delete(collections::ATTENDANCE, id).await {
                        warn!(%club_id, id, %error, "stale attendance row left behind on leave");
                    }
                }
            }
            Err(error) => warn!(%club_id, %error, "attendance cleanup on leave failed"),
        }

        cache.leave_club(club_id, user);
        cache.remove_membership(club_id, user);
        if let Err(error) = self.refresh_contacts(cache).await {
            warn!(%club_id, %error, "contact refresh after leave failed");
        }
        Ok(true)
    }

    /// Edit a club. Writes only the fields that differ from the cached
    /// original (merge, not overwrite) so concurrent edits to unrelated
    /// fields are not clobbered. A name change patches the denormalized
    /// copy on every Membership before the edit is considered complete.
    pub async fn update_club_details(
        &self,
        cache: &mut SessionCache,
        club_id: Uuid,
        patch: ClubPatch,
    ) -> ServiceResult<Club> {
        let current = self.fetch_club(cache, club_id).await?;
        self.require_moderator(&current)?;

        let mut updated = current.clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(genre) = patch.genre {
            updated.genre = genre;
        }
        if let Some(meeting_kind) = patch.meeting_kind {
            updated.meeting_kind = meeting_kind;
        }
        if let Some(visibility) = patch.visibility {
            updated.visibility = visibility;
        }

        let mut changed = Document::new();
        if updated.name != current.name {
            changed.insert("name".to_string(), json!(updated.name.clone()));
        }
        if updated.description != current.description {
            changed.insert(
                "description".to_string(),
                json!(updated.description.clone()),
            );
        }
        if updated.genre != current.genre {
            changed.insert("genre".to_string(), json!(updated.genre.clone()));
        }
        if updated.meeting_kind != current.meeting_kind {
            changed.insert("meeting_kind".to_string(), json!(updated.meeting_kind));
        }
        if updated.visibility != current.visibility {
            changed.insert("visibility".to_string(), json!(updated.visibility));
        }
        if changed.is_empty() {
            return Ok(current);
        }

        let name_changed = updated.name != current.name;
        self.store
            .set(collections::CLUBS, &club_id.to_string(), changed, true)
            .await?;

        if name_changed {
            // Full scan of the club's memberships; each denormalized
            // copy is patched independently and a failed patch is a
            // tolerated inconsistency, not an abort.
            match self
                .store
                .query(collections::MEMBERSHIPS, &[id_pred(fields::CLUB_ID, club_id)])
                .await
            {
                Ok(docs) => {
                    for doc in docs {
                        let Some(id) = doc.get("id").and_then(Value::as_str) else {
                            continue;
                        };
                        let mut name_fix = Document::new();
                        name_fix.insert(
                            fields::CLUB_NAME.to_string(),
                            json!(updated.name.clone()),
                        );
                        if let Err(error) = self
                            .store
                            .set(collections::MEMBERSHIPS, id, name_fix, true)
                            .await
                        {
                            warn!(%club_id, id, %error, "membership kept a stale club name");
                        }
                    }
                }
                Err(error) => {
                    warn!(%club_id, %error, "club name propagation scan failed");
                }
            }
            cache.patch_roster_club_name(club_id, &updated.name);
        }

        cache.upsert_club(updated.clone());
        Ok(updated)
    }

    /// Move the current read onto the past-reads list and set a new one.
    pub async fn set_current_read(
        &self,
        cache: &mut SessionCache,
        club_id: Uuid,
        reference: &str,
    ) -> ServiceResult<Club> {
        let current = self.fetch_club(cache, club_id).await?;
        self.require_moderator(&current)?;

        let mut updated = current;
        if let Some(previous) = updated.current_read.take() {
            updated.past_reads.push(previous);
        }
        updated.current_read = Some(reference.to_string());

        let mut changed = Document::new();
        changed.insert(
            "current_read".to_string(),
            json!(updated.current_read.clone()),
        );
        changed.insert("past_reads".to_string(), json!(updated.past_reads.clone()));
        self.store
            .set(collections::CLUBS, &club_id.to_string(), changed, true)
            .await?;

        cache.upsert_club(updated.clone());
        Ok(updated)
    }

    /// Delete a club and cascade over everything referencing it. The
    /// club document goes first; every later deletion is independent,
    /// and a crash mid-cascade leaves orphans that read paths ignore.
    pub async fn delete_club(&self, cache: &mut SessionCache, club_id: Uuid) -> ServiceResult<()> {
        let club = self.fetch_club(cache, club_id).await?;
        self.require_moderator(&club)?;

        self.store
            .delete(collections::CLUBS, &club_id.to_string())
            .await?;

        if let Some(path) = &club.cover_path {
            if let Err(error) = self.blobs.delete(path).await {
                warn!(%club_id, path, %error, "club cover blob left behind");
            }
        }

        let events = self
            .delete_matching(collections::EVENTS, id_pred(fields::CLUB_ID, club_id))
            .await;
        let memberships = self
            .delete_matching(collections::MEMBERSHIPS, id_pred(fields::CLUB_ID, club_id))
            .await;
        let attendance = self
            .delete_matching(collections::ATTENDANCE, id_pred(fields::CLUB_ID, club_id))
            .await;

        cache.remove_club(club_id);
        info!(%club_id, events, memberships, attendance, "club cascade delete completed");
        Ok(())
    }

    // ---- events ----

    pub async fn create_event(
        &self,
        cache: &mut SessionCache,
        draft: EventDraft,
    ) -> ServiceResult<Event> {
        let club = self.fetch_club(cache, draft.club_id).await?;
        let user = self.require_moderator(&club)?;

        if draft.capacity <= 0 {
            return Err(ServiceError::InvalidInput(
                "event capacity must be positive".to_string(),
            ));
        }
        match club.meeting_kind {
            MeetingKind::Online if draft.meeting_link.is_none() => {
                return Err(ServiceError::InvalidInput(
                    "online events need a meeting link".to_string(),
                ))
            }
            MeetingKind::InPerson if draft.location.is_none() => {
                return Err(ServiceError::InvalidInput(
                    "in-person events need a location".to_string(),
                ))
            }
            _ => {}
        }

        let event = Event {
            id: Uuid::new_v4(),
            club_id: draft.club_id,
            moderator_id: user,
            title: draft.title,
            starts_at: draft.starts_at,
            duration_minutes: draft.duration_minutes,
            capacity: draft.capacity,
            attendees_count: 0,
            status: EventStatus::Scheduled,
            meeting_link: draft.meeting_link,
            location: draft.location,
        };
        self.store
            .set(
                collections::EVENTS,
                &event.id.to_string(),
                to_document(&event)?,
                false,
            )
            .await?;

        cache.upsert_event(event.clone());
        Ok(event)
    }

    pub async fn delete_event(
        &self,
        cache: &mut SessionCache,
        event_id: Uuid,
    ) -> ServiceResult<()> {
        let event = self.fetch_event(cache, event_id).await?;
        let club = self.fetch_club(cache, event.club_id).await?;
        self.require_moderator(&club)?;

        self.store
            .delete(collections::EVENTS, &event_id.to_string())
            .await?;
        let attendance = self
            .delete_matching(collections::ATTENDANCE, id_pred(fields::EVENT_ID, event_id))
            .await;

        cache.remove_event(event_id);
        info!(%event_id, attendance, "event cascade delete completed");
        Ok(())
    }

    /// Toggle attendance. Order: attendance row, then the atomic
    /// counter move, then an authoritative re-read for the cache.
    /// Counter and re-read failures after the row write are logged,
    /// not surfaced; counter divergence is an expected mode.
    pub async fn attend_event(
        &self,
        cache: &mut SessionCache,
        event_id: Uuid,
        attending: bool,
    ) -> ServiceResult<bool> {
        let user = self.session.current_user()?;

        if attending {
            if cache.is_attending(event_id, user) {
                return Ok(false);
            }
            let event = self.fetch_event(cache, event_id).await?;
            if event.attendees_count >= event.capacity {
                debug!(%event_id, "event at capacity; rsvp refused");
                return Ok(false);
            }

            let attendance = Attendance {
                id: Uuid::new_v4(),
                event_id,
                club_id: event.club_id,
                user_id: user,
                created_at: Utc::now(),
            };
            self.store
                .set(
                    collections::ATTENDANCE,
                    &attendance.id.to_string(),
                    to_document(&attendance)?,
                    false,
                )
                .await?;
            cache.insert_attendance(attendance);

            if let Err(error) = self.counters.increment_attendees(event_id).await {
                warn!(%event_id, %error, "attendee counter increment failed; counter may drift");
            }
        } else {
            let rows = self
                .store
                .query(
                    collections::ATTENDANCE,
                    &[id_pred(fields::EVENT_ID, event_id), id_pred(fields::USER_ID, user)],
                )
                .await?;
            if rows.is_empty() {
                return Ok(false);
            }
            for doc in rows {
                let attendance: Attendance = from_document(doc)?;
                self.store
                    .delete(collections::ATTENDANCE, &attendance.id.to_string())
                    .await?;
            }
            cache.remove_attendance(event_id, user);

            if let Err(error) = self.counters.decrement_attendees(event_id).await {
                warn!(%event_id, %error, "attendee counter decrement failed; counter may drift");
            }
        }

        match self.counters.reconcile(event_id).await {
            Ok(Some(fresh)) => cache.upsert_event(fresh),
            Ok(None) => cache.remove_event(event_id),
            Err(error) => warn!(%event_id, %error, "event re-read failed; cached copy kept"),
        }
        Ok(true)
    }

    // ---- messaging ----

    /// Send a direct message. The sender-keyed copy goes first: a
    /// message visible only to its sender is the safest partial state.
    /// The recipient copy and the two summary writes are each
    /// fire-and-forget with respect to the stages before them.
    pub async fn send_message(
        &self,
        cache: &mut SessionCache,
        to: &UserProfile,
        text: &str,
    ) -> ServiceResult<Message> {
        let from = self.session.current_user()?;
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "message text must not be empty".to_string(),
            ));
        }

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: from,
            recipient_id: to.id,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        let doc = to_document(&message)?;
        let message_id = message.id.to_string();

        self.store
            .set(
                &collections::messages(from, to.id),
                &message_id,
                doc.clone(),
                false,
            )
            .await?;
        cache.push_message(to.id, message.clone());

        match self
            .store
            .set(&collections::messages(to.id, from), &message_id, doc, false)
            .await
        {
            Ok(()) => {
                self.write_recent_summaries(cache, to, &message).await;
            }
            Err(error) => {
                warn!(
                    %message_id,
                    recipient = %to.id,
                    %error,
                    "recipient copy not written; message visible to sender only until retried"
                );
            }
        }
        Ok(message)
    }

    /// The two symmetric RecentMessageSummary writes; only reached when
    /// both message copies landed. Each write failure is logged and
    /// skipped.
    async fn write_recent_summaries(
        &self,
        cache: &mut SessionCache,
        to: &UserProfile,
        message: &Message,
    ) {
        let sender_side = RecentMessageSummary {
            counterpart_id: to.id,
            counterpart_name: to.display_name.clone(),
            counterpart_avatar_path: to.avatar_path.clone(),
            text: message.text.clone(),
            sent_at: message.sent_at,
        };
        match to_document(&sender_side) {
            Ok(doc) => match self
                .store
                .set(
                    &collections::recent_messages(message.sender_id),
                    &to.id.to_string(),
                    doc,
                    false,
                )
                .await
            {
                Ok(()) => cache.upsert_recent_message(sender_side),
                Err(error) => warn!(%error, "sender recent-message summary not written"),
            },
            Err(error) => warn!(%error, "sender recent-message summary not encodable"),
        }

        let Some(me) = cache.profile.clone() else {
            warn!("own profile not cached; recipient summary skipped");
            return;
        };
        let recipient_side = RecentMessageSummary {
            counterpart_id: message.sender_id,
            counterpart_name: me.display_name,
            counterpart_avatar_path: me.avatar_path,
            text: message.text.clone(),
            sent_at: message.sent_at,
        };
        match to_document(&recipient_side) {
            Ok(doc) => {
                if let Err(error) = self
                    .store
                    .set(
                        &collections::recent_messages(to.id),
                        &message.sender_id.to_string(),
                        doc,
                        false,
                    )
                    .await
                {
                    warn!(%error, "recipient recent-message summary not written");
                }
            }
            Err(error) => warn!(%error, "recipient recent-message summary not encodable"),
        }
    }

    /// Load the sender-keyed thread with `counterpart` into the cache,
    /// ascending by send time.
    pub async fn load_thread(
        &self,
        cache: &mut SessionCache,
        counterpart: Uuid,
    ) -> ServiceResult<()> {
        let user = self.session.current_user()?;
        let mut messages: Vec<Message> = decode_all(
            self.store
                .query(&collections::messages(user, counterpart), &[])
                .await?,
        )?;
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        cache.set_thread(counterpart, messages);
        Ok(())
    }

    // ---- contacts ----

    /// Re-derive the messageable-user set from the rosters of every
    /// joined club.
    pub async fn refresh_contacts(&self, cache: &mut SessionCache) -> ServiceResult<()> {
        let user = self.session.current_user()?;
        let mut rosters: HashMap<Uuid, Vec<Membership>> = HashMap::new();
        for club_id in cache.joined_club_ids() {
            let roster: Vec<Membership> = decode_all(
                self.store
                    .query(collections::MEMBERSHIPS, &[id_pred(fields::CLUB_ID, club_id)])
                    .await?,
            )?;
            rosters.insert(club_id, roster);
        }
        cache.set_contacts(Self::derive_contacts(&rosters, user));
        cache.rosters = rosters;
        Ok(())
    }
}

//! Read-side join & filter engine.
//!
//! Pure functions over the session cache; no store round trips. Every
//! join is an inner join that silently drops rows whose parent is
//! missing: an event whose club has been deleted simply never appears
//! in a view. That matches the cascade-may-lag reality of
//! client-orchestrated deletes.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::domain::models::{Club, Event, MeetingKind, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    InPerson,
    Online,
    CreatedByMe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClubSort {
    Name,
    DateCreated,
}

/// Calendar-day category marker; one dot per category per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventColorTag {
    CreatedByMe,
    Online,
    InPerson,
}

fn clubs_by_id(cache: &SessionCache) -> HashMap<Uuid, &Club> {
    cache
        .explore_clubs
        .iter()
        .chain(cache.joined_clubs.iter())
        .chain(cache.moderated_clubs.iter())
        .map(|c| (c.id, c))
        .collect()
}

fn attending_event_ids(cache: &SessionCache, user: Uuid) -> HashSet<Uuid> {
    cache
        .attendance
        .iter()
        .filter(|a| a.user_id == user)
        .map(|a| a.event_id)
        .collect()
}

fn passes(
    event: &Event,
    club: &Club,
    user: Uuid,
    filter: EventFilter,
    club_name: Option<&str>,
    date: Option<NaiveDate>,
) -> bool {
    let filter_ok = match filter {
        EventFilter::All => true,
        EventFilter::InPerson => club.meeting_kind == MeetingKind::InPerson,
        EventFilter::Online => club.meeting_kind == MeetingKind::Online,
        EventFilter::CreatedByMe => event.moderator_id == user,
    };
    filter_ok
        && club_name.map_or(true, |name| club.name == name)
        && date.map_or(true, |day| event.starts_at.date_naive() == day)
}

/// Events the user attends or moderates, joined through their club,
/// filtered and sorted ascending by start time.
pub fn upcoming_events_for(
    cache: &SessionCache,
    user: Uuid,
    filter: EventFilter,
    club_name: Option<&str>,
    date: Option<NaiveDate>,
) -> Vec<Event> {
    let clubs = clubs_by_id(cache);
    let attending = attending_event_ids(cache, user);

    let mut events: Vec<Event> = cache
        .events
        .iter()
        .filter(|e| attending.contains(&e.id) || e.moderator_id == user)
        .filter_map(|e| clubs.get(&e.club_id).map(|club| (e, *club)))
        .filter(|(e, club)| passes(e, club, user, filter, club_name, date))
        .map(|(e, _)| e.clone())
        .collect();
    events.sort_by_key(|e| e.starts_at);
    events
}

/// Events under joined clubs the user does not already attend; the
/// complement of the upcoming-attending set, same filter/sort contract.
pub fn discoverable_events_for(
    cache: &SessionCache,
    user: Uuid,
    filter: EventFilter,
    club_name: Option<&str>,
    date: Option<NaiveDate>,
) -> Vec<Event> {
    let clubs = clubs_by_id(cache);
    let attending = attending_event_ids(cache, user);
    let joined = cache.joined_club_ids();

    let mut events: Vec<Event> = cache
        .events
        .iter()
        .filter(|e| joined.contains(&e.club_id) && !attending.contains(&e.id))
        .filter_map(|e| clubs.get(&e.club_id).map(|club| (e, *club)))
        .filter(|(e, club)| passes(e, club, user, filter, club_name, date))
        .map(|(e, _)| e.clone())
        .collect();
    events.sort_by_key(|e| e.starts_at);
    events
}

/// Case-insensitive substring search over public clubs, matching name
/// or genre; an empty query returns every public club. Results are
/// ordered alphabetically by name.
pub fn explore_search(cache: &SessionCache, query: &str) -> Vec<Club> {
    let needle = query.trim().to_lowercase();
    let mut clubs: Vec<Club> = cache
        .explore_clubs
        .iter()
        .filter(|c| c.visibility == Visibility::Public)
        .filter(|c| {
            needle.is_empty()
                || c.name.to_lowercase().contains(&needle)
                || c.genre.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    clubs.sort_by_key(|c| c.name.to_lowercase());
    clubs
}

/// Optional exact-genre filter, then optional sort. `None` preserves
/// the input order.
pub fn filter_and_sort(clubs: &[Club], sort: Option<ClubSort>, genre: Option<&str>) -> Vec<Club> {
    let mut clubs: Vec<Club> = clubs
        .iter()
        .filter(|c| genre.map_or(true, |g| c.genre == g))
        .cloned()
        .collect();
    match sort {
        Some(ClubSort::Name) => clubs.sort_by_key(|c| c.name.to_lowercase()),
        Some(ClubSort::DateCreated) => clubs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        None => {}
    }
    clubs
}

/// The set of category markers across the user's events on `date`;
/// duplicates of a category collapse to one marker.
pub fn event_color_tags(cache: &SessionCache, user: Uuid, date: NaiveDate) -> HashSet<EventColorTag> {
    let clubs = clubs_by_id(cache);
    let attending = attending_event_ids(cache, user);

    let mut tags = HashSet::new();
    for event in cache
        .events
        .iter()
        .filter(|e| attending.contains(&e.id) || e.moderator_id == user)
        .filter(|e| e.starts_at.date_naive() == date)
    {
        let Some(club) = clubs.get(&event.club_id) else {
            continue;
        };
        if event.moderator_id == user {
            tags.insert(EventColorTag::CreatedByMe);
        }
        match club.meeting_kind {
            MeetingKind::Online => tags.insert(EventColorTag::Online),
            MeetingKind::InPerson => tags.insert(EventColorTag::InPerson),
        };
    }
    tags
}

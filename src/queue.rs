//! # Queue Formation
//!
//! Runs once per session to decide which catalog songs enter the pool,
//! and which of those start pre-snoozed.
//!
//! Admission is strict — a song nobody can perform, or that only one
//! person knows, never enters the pool — because the selection algorithm
//! guarantees it can always fall back to "unchanged" while pruning, and
//! that guarantee only helps if every pool song is at least plausible.
//!
//! Damping then spreads variety: without it the single
//! highest-consensus song would play first every session and keep
//! dominating tie-breaks, and obscure songs would bunch up wherever a
//! superfan's pruning happens to win.

use crate::rating::PreferenceIndex;
use crate::rng::Randomness;
use crate::session::{Session, SessionSong};
use log::{debug, info};

/// Knobs for queue formation. Defaults match live behavior; tests and
/// static playlist generation disable the damping stages to stay
/// deterministic.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How many of the strongest songs get an initial snooze. Zero
    /// disables top-song damping.
    pub top_snooze_count: usize,
    /// Whether little-known songs get an initial snooze.
    pub obscurity_damping: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            top_snooze_count: 10,
            obscurity_damping: true,
        }
    }
}

impl QueueConfig {
    /// No damping at all: pool order and eligibility depend only on the
    /// ratings. Used by tests and static playlists.
    #[must_use]
    pub fn undamped() -> Self {
        Self {
            top_snooze_count: 0,
            obscurity_damping: false,
        }
    }
}

/// Populate a session's song pool from the rating index.
///
/// Idempotent only if called once per session: calling it again appends
/// a second copy of the pool.
pub fn form_queue(
    session: &mut Session,
    index: &PreferenceIndex,
    rng: &mut dyn Randomness,
    config: &QueueConfig,
) {
    let admitted = admit_songs(session, index);
    info!(
        "session {}: admitted {} songs into the pool",
        session.display_code,
        admitted.len()
    );

    session
        .songs
        .extend(admitted.into_iter().map(SessionSong::new));

    if config.top_snooze_count > 0 {
        snooze_top_songs(session, index, rng, config.top_snooze_count);
    }
    if config.obscurity_damping {
        let threshold = session.participants.len() / 2;
        snooze_obscure_songs(session, index, threshold, rng);
    }
}

/// The admission filter: at least two roster members must know the song
/// (rated it anything but `DontKnow`), and at least one must be able to
/// perform it. Returns ids ascending so the pool order is deterministic.
fn admit_songs(session: &Session, index: &PreferenceIndex) -> Vec<i64> {
    index
        .song_ids()
        .into_iter()
        .filter(|&song_id| {
            let mut know = 0usize;
            let mut can_perform = 0usize;
            for participant in &session.participants {
                let rating = index.rating_for(participant.user_id, song_id);
                if rating != crate::rating::Rating::DontKnow {
                    know += 1;
                }
                if rating.can_perform() {
                    can_perform += 1;
                }
            }
            let admitted = know > 1 && can_perform > 0;
            if !admitted {
                debug!(
                    "song {song_id} rejected (know {know}, can perform {can_perform})"
                );
            }
            admitted
        })
        .collect()
}

/// Snooze the top `n` songs by combined score so the obvious crowd
/// pleasers don't all play first.
///
/// The top slice is walked weakest first; entry `rank` gets a TTL drawn
/// from `[5, 20 - rank)`, so the strongest songs draw from a narrower,
/// guaranteed-nonzero band.
fn snooze_top_songs(
    session: &mut Session,
    index: &PreferenceIndex,
    rng: &mut dyn Randomness,
    n: usize,
) {
    let mut ranked: Vec<(i64, i64)> = session
        .songs
        .iter()
        .map(|s| (s.song_id, session.combined_score(index, s.song_id)))
        .collect();
    // Strongest first; equal scores fall back to pool (id) order.
    ranked.sort_by_key(|&(_, score)| std::cmp::Reverse(score));
    ranked.truncate(n);

    for (rank, &(song_id, score)) in ranked.iter().rev().enumerate() {
        let hi = 20u32.saturating_sub(rank as u32);
        let ttl = rng.uniform(5, hi.max(6));
        debug!("top-song damping: song {song_id} (score {score}) snoozed {ttl}");
        if let Some(song) = session.songs.iter_mut().find(|s| s.song_id == song_id) {
            song.snooze_ttl = ttl;
        }
    }
}

/// Snooze songs that few people in the whole catalog know. The threshold
/// scales with the roster (half of it, floored), but the know count is
/// global on purpose — the room decides what is singable, the catalog
/// decides what is obscure.
fn snooze_obscure_songs(
    session: &mut Session,
    index: &PreferenceIndex,
    know_count_threshold: usize,
    rng: &mut dyn Randomness,
) {
    for song in &mut session.songs {
        let know_count = index.know_count(song.song_id);
        if know_count < know_count_threshold {
            song.snooze_ttl = rng.uniform(10, 20);
            debug!(
                "obscurity damping: song {} (known by {know_count}) snoozed {}",
                song.song_id, song.snooze_ttl
            );
        }
    }
}

//! # Selection Algorithm
//!
//! Picks the next song for a session. The pipeline per request:
//!
//! 1. Refuse (return `None`) while a song is already in flight.
//! 2. Collect candidates: unplayed songs with no snooze TTL.
//! 3. Order participants fairly: present ones shuffled, then stable-sorted
//!    ascending by cumulative score; stepped-out ones last.
//! 4. Prune the candidate set per participant, preferred tier first —
//!    inverted tiers for stepped-out participants. A participant with no
//!    opinion among the candidates leaves the set unchanged.
//! 5. Tie-break on combined score and mark the winner current.
//!
//! The shuffle in step 3 exists to break ties among equal scores so the
//! same low-score participant isn't always consulted first; the tie-break
//! in step 5 is deliberately randomness-free so outcomes are testable.

use crate::rating::{PreferenceIndex, Rating, PRUNE_TIERS};
use crate::rng::Randomness;
use crate::session::{EngineError, Session};
use log::{debug, info};

/// Select the next song and mark it current.
///
/// Returns `Ok(None)` when a song is already in flight or nothing is
/// eligible — both are polling states, not errors.
///
/// # Errors
///
/// [`EngineError::PruningEmptied`] if pruning empties a non-empty
/// candidate set, which the pruning rules make unreachable.
pub fn select_next(
    session: &mut Session,
    index: &PreferenceIndex,
    rng: &mut dyn Randomness,
) -> Result<Option<i64>, EngineError> {
    if session.current_song().is_some() {
        info!("session {}: a song is still in flight", session.display_code);
        return Ok(None);
    }

    let mut candidates: Vec<i64> = session
        .songs
        .iter()
        .filter(|s| !s.played && s.snooze_ttl == 0)
        .map(|s| s.song_id)
        .collect();

    info!(
        "session {}: selecting from {} eligible songs",
        session.display_code,
        candidates.len()
    );

    if candidates.is_empty() {
        return Ok(None);
    }

    for (user_id, stepped_out) in fairness_order(session, rng) {
        candidates = prune_for_participant(candidates, user_id, stepped_out, index);
        if candidates.len() == 1 {
            debug!("one candidate left, stopping early");
            break;
        }
    }

    if candidates.is_empty() {
        return Err(EngineError::PruningEmptied);
    }

    let max_score = candidates
        .iter()
        .map(|&id| session.combined_score(index, id))
        .max()
        .unwrap_or(i64::MIN);
    let picked = candidates
        .iter()
        .copied()
        .find(|&id| session.combined_score(index, id) == max_score)
        .ok_or(EngineError::PruningEmptied)?;

    info!(
        "session {}: picked song {} (combined score {})",
        session.display_code, picked, max_score
    );

    if let Some(song) = session.songs.iter_mut().find(|s| s.song_id == picked) {
        song.current = true;
    }
    Ok(Some(picked))
}

/// The order in which participants get to prune.
///
/// Present participants are shuffled, then stable-sorted ascending by
/// score — the shuffle only decides among equals. Stepped-out
/// participants come after every present one regardless of score; their
/// preferences are consulted last and inverted.
fn fairness_order(session: &Session, rng: &mut dyn Randomness) -> Vec<(i64, bool)> {
    let mut present: Vec<usize> = Vec::new();
    let mut stepped_out: Vec<usize> = Vec::new();
    for (pos, participant) in session.participants.iter().enumerate() {
        if participant.stepped_out {
            stepped_out.push(pos);
        } else {
            present.push(pos);
        }
    }

    rng.shuffle(&mut present);
    present.sort_by_key(|&pos| session.participants[pos].score);

    present
        .into_iter()
        .map(|pos| (session.participants[pos].user_id, false))
        .chain(
            stepped_out
                .into_iter()
                .map(|pos| (session.participants[pos].user_id, true)),
        )
        .collect()
}

/// Prune `candidates` by one participant's preferences.
///
/// Tiers are scanned most wanted first (`PRUNE_TIERS`), reversed for a
/// stepped-out participant. The first tier with any match wins; a tier
/// matching everything, or no tier matching anything, leaves the set
/// unchanged. Never empties a non-empty set.
fn prune_for_participant(
    candidates: Vec<i64>,
    user_id: i64,
    stepped_out: bool,
    index: &PreferenceIndex,
) -> Vec<i64> {
    debug!(
        "pruning {} candidates for user {}{}",
        candidates.len(),
        user_id,
        if stepped_out { " (stepped out)" } else { "" }
    );

    let mut tiers = PRUNE_TIERS;
    // An absent singer should not dictate songs that need them.
    if stepped_out {
        tiers.reverse();
    }

    for tier in tiers {
        let matched: Vec<i64> = candidates
            .iter()
            .copied()
            .filter(|&song_id| index.rating_for(user_id, song_id) == tier)
            .collect();

        if matched.is_empty() {
            continue;
        }
        if matched.len() == candidates.len() {
            debug!("tier {tier:?} matched every candidate, not pruning");
            return candidates;
        }
        debug!("tier {tier:?} kept {} candidates", matched.len());
        return matched;
    }

    // No tier matched anything: this participant has no opinion among the
    // current candidates.
    debug!("user {user_id} gains nothing from pruning, set unchanged");
    candidates
}

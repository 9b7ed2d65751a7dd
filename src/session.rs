//! # Session State Machine
//!
//! A karaoke session is an arena of plain records: one [`Participant`]
//! per roster member and one [`SessionSong`] per admitted song, all
//! cross-referenced by id. No object graphs, no cycles.
//!
//! Per-song lifecycle:
//!
//! ```text
//! Pending --select--> Current --played--> Played   (terminal)
//!    ^                   |
//!    |                   +--skip-------> Played    (no score update)
//!    +----snooze (ttl=5)-+
//! ```
//!
//! Play-completion is the only transition that touches participant
//! scores, and it also runs the session-wide clock tick that lets
//! snoozed songs drift back into candidacy.

use crate::rating::PreferenceIndex;
use crate::rng::Randomness;
use log::{debug, info};
use std::collections::HashSet;
use thiserror::Error;

/// Number of picks a snoozed song sits out.
pub const SNOOZE_TTL: u32 = 5;

/// Length of a session display code.
pub const DISPLAY_CODE_LEN: usize = 4;

/// Errors the engine itself can produce. Precondition misses (selecting
/// while a song is in flight, completing when nothing is) are `None`s and
/// no-ops, not errors — callers poll repeatedly.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A session, user, or song id that the store does not know.
    #[error("{0} not found")]
    NotFound(String),

    /// A stored rating value outside the scale. Indicates a corrupt row.
    #[error("corrupt rating value {0} in store")]
    CorruptRating(i64),

    /// Pruning emptied a non-empty candidate set. The "unchanged when
    /// nothing matches" rule makes this unreachable; seeing it means a
    /// logic bug, not bad input.
    #[error("pruning emptied a non-empty candidate set")]
    PruningEmptied,
}

/// A roster member's per-session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: i64,
    /// Cumulative fairness score; only play-completion mutates it.
    pub score: i64,
    /// True while the participant is temporarily absent.
    pub stepped_out: bool,
}

impl Participant {
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            score: 0,
            stepped_out: false,
        }
    }
}

/// An admitted song's per-session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSong {
    pub song_id: i64,
    /// Terminal once true.
    pub played: bool,
    /// At most one per session.
    pub current: bool,
    /// Picks remaining before the song is eligible again.
    pub snooze_ttl: u32,
}

impl SessionSong {
    #[must_use]
    pub fn new(song_id: i64) -> Self {
        Self {
            song_id,
            played: false,
            current: false,
            snooze_ttl: 0,
        }
    }
}

/// One karaoke session: roster, song pool, and a shareable display code.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: i64,
    pub display_code: String,
    pub participants: Vec<Participant>,
    /// Pool order is ascending song id (set at formation) and drives the
    /// deterministic tie-break.
    pub songs: Vec<SessionSong>,
}

impl Session {
    #[must_use]
    pub fn new(id: i64, display_code: String, roster: &[i64]) -> Self {
        Self {
            id,
            display_code,
            participants: roster.iter().map(|&uid| Participant::new(uid)).collect(),
            songs: Vec::new(),
        }
    }

    /// The song in flight, if any.
    #[must_use]
    pub fn current_song(&self) -> Option<&SessionSong> {
        self.songs.iter().find(|s| s.current)
    }

    fn current_song_mut(&mut self) -> Option<&mut SessionSong> {
        self.songs.iter_mut().find(|s| s.current)
    }

    #[must_use]
    pub fn participant(&self, user_id: i64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Combined score of a song: the rating-score sum over the whole
    /// roster, present and stepped-out alike.
    #[must_use]
    pub fn combined_score(&self, index: &PreferenceIndex, song_id: i64) -> i64 {
        self.participants
            .iter()
            .map(|p| index.rating_for(p.user_id, song_id).score())
            .sum()
    }

    /// How many pool songs have been played.
    #[must_use]
    pub fn played_count(&self) -> usize {
        self.songs.iter().filter(|s| s.played).count()
    }

    /// Complete the current song. No-op when nothing is in flight.
    ///
    /// Marks the song played, credits every roster participant with their
    /// rating score for it (absence affects selection, not scoring), and
    /// ticks every positive `snooze_ttl` in the session down by one.
    pub fn mark_current_played(&mut self, index: &PreferenceIndex) {
        let Some(current) = self.current_song_mut() else {
            debug!("mark_current_played: no song in flight");
            return;
        };
        current.played = true;
        current.current = false;
        let song_id = current.song_id;

        for participant in &mut self.participants {
            let delta = index.rating_for(participant.user_id, song_id).score();
            participant.score += delta;
            debug!(
                "user {} score {:+} -> {}",
                participant.user_id, delta, participant.score
            );
        }

        // The clock tick that lets snoozed songs re-enter candidacy.
        for song in &mut self.songs {
            if song.snooze_ttl > 0 {
                song.snooze_ttl -= 1;
            }
        }

        info!(
            "session {}: song {} played ({}/{} done)",
            self.display_code,
            song_id,
            self.played_count(),
            self.songs.len()
        );
    }

    /// Retire the current song without scoring it. No-op when nothing is
    /// in flight. Unlike play-completion there is no snooze tick.
    pub fn skip_current(&mut self) {
        let Some(current) = self.current_song_mut() else {
            debug!("skip_current: no song in flight");
            return;
        };
        current.played = true;
        current.current = false;
        let song_id = current.song_id;
        info!("session {}: song {} skipped", self.display_code, song_id);
    }

    /// Push the current song back into the pool with a fresh snooze TTL.
    /// No-op when nothing is in flight.
    pub fn snooze_current(&mut self) {
        let code = self.display_code.clone();
        let Some(current) = self.current_song_mut() else {
            debug!("snooze_current: no song in flight");
            return;
        };
        current.current = false;
        current.snooze_ttl = SNOOZE_TTL;
        info!(
            "session {}: song {} snoozed for {} picks",
            code, current.song_id, SNOOZE_TTL
        );
    }

    /// Flag a participant as stepped out (or back). Takes effect on the
    /// next selection, never retroactively.
    pub fn set_stepped_out(&mut self, user_id: i64, stepped_out: bool) -> Result<(), EngineError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id} in session")))?;
        participant.stepped_out = stepped_out;
        info!(
            "session {}: user {} {}",
            self.display_code,
            user_id,
            if stepped_out { "stepped out" } else { "stepped back" }
        );
        Ok(())
    }

    /// Add a user to the roster mid-session with a zero score. No-op if
    /// already present.
    pub fn add_participant(&mut self, user_id: i64) {
        if self.participant(user_id).is_none() {
            self.participants.push(Participant::new(user_id));
            info!("session {}: user {} joined", self.display_code, user_id);
        }
    }

    /// Remove a user from the roster. No-op if absent.
    pub fn remove_participant(&mut self, user_id: i64) {
        let before = self.participants.len();
        self.participants.retain(|p| p.user_id != user_id);
        if self.participants.len() != before {
            info!("session {}: user {} left", self.display_code, user_id);
        }
    }
}

/// Generate a short shareable session code: four uppercase ASCII letters,
/// rejection-sampled until it collides with nothing in `existing`.
#[must_use]
pub fn generate_display_code(existing: &HashSet<String>, rng: &mut dyn Randomness) -> String {
    loop {
        let code: String = (0..DISPLAY_CODE_LEN)
            .map(|_| char::from(b'A' + rng.uniform(0, 26) as u8))
            .collect();
        if !existing.contains(&code) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::Rating;

    fn index_with(ratings: &[(i64, i64, Rating)]) -> PreferenceIndex {
        let mut index = PreferenceIndex::new();
        for &(user, song, rating) in ratings {
            index.insert(user, song, rating);
        }
        index
    }

    fn session_with_current(song_id: i64) -> Session {
        let mut session = Session::new(1, "ABCD".into(), &[1, 2]);
        session.songs.push(SessionSong::new(song_id));
        session.songs.push(SessionSong::new(song_id + 1));
        session.songs[0].current = true;
        session
    }

    #[test]
    fn mark_played_updates_scores_for_everyone() {
        let mut session = session_with_current(10);
        session.participants[1].stepped_out = true;
        let index = index_with(&[(1, 10, Rating::NeedTheMic), (2, 10, Rating::SingAlong)]);

        session.mark_current_played(&index);

        assert!(session.songs[0].played);
        assert!(!session.songs[0].current);
        assert_eq!(session.participants[0].score, 5);
        // Stepped-out participants score identically.
        assert_eq!(session.participants[1].score, 1);
    }

    #[test]
    fn mark_played_scores_unrated_as_dont_know() {
        let mut session = session_with_current(10);
        let index = index_with(&[(1, 10, Rating::CanTakeTheMic)]);

        session.mark_current_played(&index);

        assert_eq!(session.participants[0].score, 2);
        assert_eq!(session.participants[1].score, -1);
    }

    #[test]
    fn mark_played_ticks_all_snoozed_songs() {
        let mut session = session_with_current(10);
        session.songs[1].snooze_ttl = 3;
        session.songs.push(SessionSong::new(12));
        session.songs[2].snooze_ttl = 1;
        let index = PreferenceIndex::new();

        session.mark_current_played(&index);

        assert_eq!(session.songs[1].snooze_ttl, 2);
        assert_eq!(session.songs[2].snooze_ttl, 0);
    }

    #[test]
    fn mark_played_without_current_is_a_noop() {
        let mut session = Session::new(1, "ABCD".into(), &[1]);
        session.songs.push(SessionSong::new(10));
        session.songs[0].snooze_ttl = 2;
        let index = PreferenceIndex::new();

        session.mark_current_played(&index);

        assert_eq!(session.participants[0].score, 0);
        // No tick either: the clock only advances on completed plays.
        assert_eq!(session.songs[0].snooze_ttl, 2);
    }

    #[test]
    fn skip_marks_played_without_scores_or_tick() {
        let mut session = session_with_current(10);
        session.songs[1].snooze_ttl = 3;
        session.skip_current();

        assert!(session.songs[0].played);
        assert!(!session.songs[0].current);
        assert_eq!(session.participants[0].score, 0);
        assert_eq!(session.songs[1].snooze_ttl, 3);
    }

    #[test]
    fn snooze_returns_song_to_pending_with_fresh_ttl() {
        let mut session = session_with_current(10);
        session.snooze_current();

        assert!(!session.songs[0].played);
        assert!(!session.songs[0].current);
        assert_eq!(session.songs[0].snooze_ttl, SNOOZE_TTL);
    }

    #[test]
    fn played_is_never_reset() {
        // No transition path resets `played`; snoozing or skipping after a
        // play cannot run because nothing is current.
        let mut session = session_with_current(10);
        let index = PreferenceIndex::new();
        session.mark_current_played(&index);
        session.snooze_current();
        session.skip_current();
        assert!(session.songs[0].played);
        assert_eq!(session.songs[0].snooze_ttl, 0);
    }

    #[test]
    fn step_out_unknown_user_is_not_found() {
        let mut session = Session::new(1, "ABCD".into(), &[1]);
        assert!(session.set_stepped_out(1, true).is_ok());
        assert!(session.participant(1).unwrap().stepped_out);
        assert!(matches!(
            session.set_stepped_out(99, true),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn join_and_leave_manage_the_roster() {
        let mut session = Session::new(1, "ABCD".into(), &[1]);
        session.add_participant(2);
        session.add_participant(2);
        assert_eq!(session.participants.len(), 2);
        assert_eq!(session.participant(2).unwrap().score, 0);

        session.remove_participant(1);
        assert!(session.participant(1).is_none());
        session.remove_participant(1);
        assert_eq!(session.participants.len(), 1);
    }

    #[test]
    fn combined_score_sums_the_whole_roster() {
        let session = Session::new(1, "ABCD".into(), &[1, 2, 3]);
        let index = index_with(&[
            (1, 10, Rating::NeedTheMic),
            (2, 10, Rating::DontKnow),
            // user 3 unrated -> DontKnow
        ]);
        assert_eq!(session.combined_score(&index, 10), 5 - 1 - 1);
    }

    #[test]
    fn display_code_avoids_existing_codes() {
        struct CycleRng {
            values: Vec<u32>,
            at: usize,
        }
        impl Randomness for CycleRng {
            fn shuffle(&mut self, _positions: &mut [usize]) {}
            fn uniform(&mut self, _lo: u32, _hi: u32) -> u32 {
                let v = self.values[self.at % self.values.len()];
                self.at += 1;
                v
            }
        }

        // First four draws spell AAAA (taken), next four spell BBBB.
        let mut rng = CycleRng {
            values: vec![0, 0, 0, 0, 1, 1, 1, 1],
            at: 0,
        };
        let existing: HashSet<String> = ["AAAA".to_string()].into_iter().collect();
        let code = generate_display_code(&existing, &mut rng);
        assert_eq!(code, "BBBB");
        assert_eq!(code.len(), DISPLAY_CODE_LEN);
    }
}

//! # Rating Scale and Preference Index
//!
//! Ordinal preference levels for (user, song) pairs, their fixed score
//! contributions, and the in-memory index the queue engine consults.
//!
//! ## Scale
//!
//! From lowest to highest desire to perform:
//!
//! - `DontKnow` — never heard it (score -1)
//! - `SingAlong` — happy to join in (score 1)
//! - `CanTakeTheMic` — could carry it (score 2)
//! - `NeedTheMic` — must sing this (score 5)
//!
//! `Unknown` is a request sentinel only: rating a song `Unknown` deletes
//! the stored rating. It is never persisted and a pair without a stored
//! rating reads as `DontKnow`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How much a user wants to perform a song.
///
/// Exactly one active rating exists per (user, song) pair. The numeric
/// repr (0-3) is the stored database value; `Unknown` has no stored form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    /// Delete-the-rating sentinel; never stored.
    Unknown,
    /// Never heard the song.
    DontKnow,
    /// Will sing along from the crowd.
    SingAlong,
    /// Could take the mic if nobody else wants it.
    CanTakeTheMic,
    /// Must have the mic for this one.
    NeedTheMic,
}

/// Pruning tiers for a present participant, most wanted first.
///
/// `DontKnow` sits last: it matches every candidate the positive tiers
/// missed, so for a present participant it can never prune. Reversed (for
/// a stepped-out participant) it comes first and steers selection toward
/// songs the absent singer won't miss.
pub const PRUNE_TIERS: [Rating; 4] = [
    Rating::NeedTheMic,
    Rating::CanTakeTheMic,
    Rating::SingAlong,
    Rating::DontKnow,
];

impl Rating {
    /// Fixed score contribution used for fairness accounting and the
    /// combined-score tie-break.
    #[must_use]
    pub fn score(self) -> i64 {
        match self {
            Rating::Unknown | Rating::DontKnow => -1,
            Rating::SingAlong => 1,
            Rating::CanTakeTheMic => 2,
            Rating::NeedTheMic => 5,
        }
    }

    /// True for ratings strong enough to count as "can perform" during
    /// queue admission.
    #[must_use]
    pub fn can_perform(self) -> bool {
        matches!(self, Rating::CanTakeTheMic | Rating::NeedTheMic)
    }

    /// The stored database value. `None` for the `Unknown` sentinel.
    #[must_use]
    pub fn to_stored(self) -> Option<i64> {
        match self {
            Rating::Unknown => None,
            Rating::DontKnow => Some(0),
            Rating::SingAlong => Some(1),
            Rating::CanTakeTheMic => Some(2),
            Rating::NeedTheMic => Some(3),
        }
    }

    /// Decode a stored database value.
    pub fn from_stored(value: i64) -> Result<Self, crate::session::EngineError> {
        match value {
            0 => Ok(Rating::DontKnow),
            1 => Ok(Rating::SingAlong),
            2 => Ok(Rating::CanTakeTheMic),
            3 => Ok(Rating::NeedTheMic),
            other => Err(crate::session::EngineError::CorruptRating(other)),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rating::Unknown => "unknown",
            Rating::DontKnow => "I don't know the song",
            Rating::SingAlong => "I can sing along",
            Rating::CanTakeTheMic => "I can take the mic",
            Rating::NeedTheMic => "I NEED the mic!",
        };
        f.write_str(name)
    }
}

/// In-memory map of every stored rating, keyed song-first so the queue
/// engine can answer both "how does user X feel about song Y" and "who
/// knows song Y at all" without touching the store again.
#[derive(Debug, Default, Clone)]
pub struct PreferenceIndex {
    by_song: HashMap<i64, HashMap<i64, Rating>>,
}

impl PreferenceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rating. `Unknown` removes the pair instead, mirroring the
    /// delete-on-unknown rule of the store.
    pub fn insert(&mut self, user_id: i64, song_id: i64, rating: Rating) {
        if rating == Rating::Unknown {
            if let Some(users) = self.by_song.get_mut(&song_id) {
                users.remove(&user_id);
                if users.is_empty() {
                    self.by_song.remove(&song_id);
                }
            }
            return;
        }
        self.by_song.entry(song_id).or_default().insert(user_id, rating);
    }

    /// The active rating for a pair; unrated pairs read as `DontKnow`.
    #[must_use]
    pub fn rating_for(&self, user_id: i64, song_id: i64) -> Rating {
        self.by_song
            .get(&song_id)
            .and_then(|users| users.get(&user_id))
            .copied()
            .unwrap_or(Rating::DontKnow)
    }

    /// How many users across the whole catalog rated the song something
    /// other than `DontKnow`. Drives obscurity damping, which deliberately
    /// looks beyond the session roster.
    #[must_use]
    pub fn know_count(&self, song_id: i64) -> usize {
        self.by_song
            .get(&song_id)
            .map(|users| users.values().filter(|r| **r != Rating::DontKnow).count())
            .unwrap_or(0)
    }

    /// All song ids with at least one stored rating, ascending. The sort
    /// keeps pool construction deterministic.
    #[must_use]
    pub fn song_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.by_song.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_song.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_mapping_is_fixed() {
        assert_eq!(Rating::DontKnow.score(), -1);
        assert_eq!(Rating::SingAlong.score(), 1);
        assert_eq!(Rating::CanTakeTheMic.score(), 2);
        assert_eq!(Rating::NeedTheMic.score(), 5);
        assert_eq!(Rating::Unknown.score(), Rating::DontKnow.score());
    }

    #[test]
    fn stored_values_round_trip() {
        for rating in [
            Rating::DontKnow,
            Rating::SingAlong,
            Rating::CanTakeTheMic,
            Rating::NeedTheMic,
        ] {
            let stored = rating.to_stored().expect("stored form");
            assert_eq!(Rating::from_stored(stored).unwrap(), rating);
        }
        assert_eq!(Rating::Unknown.to_stored(), None);
        assert!(Rating::from_stored(9).is_err());
    }

    #[test]
    fn unrated_pair_reads_as_dont_know() {
        let index = PreferenceIndex::new();
        assert_eq!(index.rating_for(1, 1), Rating::DontKnow);
    }

    #[test]
    fn unknown_deletes_the_rating() {
        let mut index = PreferenceIndex::new();
        index.insert(1, 7, Rating::NeedTheMic);
        assert_eq!(index.rating_for(1, 7), Rating::NeedTheMic);

        index.insert(1, 7, Rating::Unknown);
        assert_eq!(index.rating_for(1, 7), Rating::DontKnow);
        assert!(index.is_empty());
    }

    #[test]
    fn reinserting_replaces_the_rating() {
        let mut index = PreferenceIndex::new();
        index.insert(1, 7, Rating::SingAlong);
        index.insert(1, 7, Rating::CanTakeTheMic);
        assert_eq!(index.rating_for(1, 7), Rating::CanTakeTheMic);
    }

    #[test]
    fn know_count_ignores_dont_know() {
        let mut index = PreferenceIndex::new();
        index.insert(1, 7, Rating::DontKnow);
        index.insert(2, 7, Rating::SingAlong);
        index.insert(3, 7, Rating::NeedTheMic);
        assert_eq!(index.know_count(7), 2);
        assert_eq!(index.know_count(8), 0);
    }

    #[test]
    fn song_ids_are_sorted() {
        let mut index = PreferenceIndex::new();
        index.insert(1, 30, Rating::SingAlong);
        index.insert(1, 10, Rating::SingAlong);
        index.insert(1, 20, Rating::SingAlong);
        assert_eq!(index.song_ids(), vec![10, 20, 30]);
    }

    #[test]
    fn tier_order_is_most_wanted_first() {
        assert_eq!(PRUNE_TIERS[0], Rating::NeedTheMic);
        assert_eq!(PRUNE_TIERS[3], Rating::DontKnow);
    }
}

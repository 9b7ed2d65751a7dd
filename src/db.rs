//! # Database Module
//!
//! SQLite persistence for the catalog (users, songs, ratings) and for
//! sessions. The engine itself never touches the database: callers load
//! a [`Session`] and a [`PreferenceIndex`], run engine operations in
//! memory, and save the session back as a unit.
//!
//! Multi-row writes go through transactions; loads use prepared
//! statements. Unknown ids surface as [`EngineError::NotFound`] wrapped
//! in the `anyhow` chain so the CLI can report them distinctly.

use crate::rating::{PreferenceIndex, Rating};
use crate::session::{EngineError, Participant, Session, SessionSong};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// A catalog user. Shared reference data; sessions point at it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// A catalog song. The video link is stored verbatim; resolving or
/// embedding it is the player's problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub video_link: String,
}

/// Open (and create if missing) the database at `path`.
pub fn connect(path: &Path) -> Result<Connection> {
    Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Create the schema. Safe to call repeatedly.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id   INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS song (
            id         INTEGER PRIMARY KEY,
            title      TEXT NOT NULL,
            artist     TEXT NOT NULL,
            video_link TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS user_song_rating (
            user_id INTEGER NOT NULL REFERENCES user(id),
            song_id INTEGER NOT NULL REFERENCES song(id),
            rating  INTEGER NOT NULL,
            PRIMARY KEY (user_id, song_id)
        );
        CREATE TABLE IF NOT EXISTS session (
            id           INTEGER PRIMARY KEY,
            display_code TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS session_user (
            session_id  INTEGER NOT NULL REFERENCES session(id),
            user_id     INTEGER NOT NULL REFERENCES user(id),
            score       INTEGER NOT NULL DEFAULT 0,
            stepped_out INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session_id, user_id)
        );
        CREATE TABLE IF NOT EXISTS session_song (
            session_id INTEGER NOT NULL REFERENCES session(id),
            song_id    INTEGER NOT NULL REFERENCES song(id),
            played     INTEGER NOT NULL DEFAULT 0,
            is_current INTEGER NOT NULL DEFAULT 0,
            snooze_ttl INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session_id, song_id)
        );",
    )
    .context("failed to create schema")
}

pub fn create_user(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO user (name) VALUES (?1)", params![name])
        .with_context(|| format!("failed to insert user {name:?}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name FROM user ORDER BY id")?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to query users")?;
    Ok(users)
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, name FROM user WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")).into())
}

pub fn create_song(conn: &Connection, title: &str, artist: &str, video_link: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO song (title, artist, video_link) VALUES (?1, ?2, ?3)",
        params![title, artist, video_link],
    )
    .with_context(|| format!("failed to insert song {title:?}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn list_songs(conn: &Connection) -> Result<Vec<Song>> {
    let mut stmt = conn.prepare("SELECT id, title, artist, video_link FROM song ORDER BY id")?;
    let songs = stmt
        .query_map([], |row| {
            Ok(Song {
                id: row.get(0)?,
                title: row.get(1)?,
                artist: row.get(2)?,
                video_link: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to query songs")?;
    Ok(songs)
}

pub fn get_song(conn: &Connection, song_id: i64) -> Result<Song> {
    conn.query_row(
        "SELECT id, title, artist, video_link FROM song WHERE id = ?1",
        params![song_id],
        |row| {
            Ok(Song {
                id: row.get(0)?,
                title: row.get(1)?,
                artist: row.get(2)?,
                video_link: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound(format!("song {song_id}")).into())
}

pub fn update_song(
    conn: &Connection,
    song_id: i64,
    title: &str,
    artist: &str,
    video_link: &str,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE song SET title = ?1, artist = ?2, video_link = ?3 WHERE id = ?4",
        params![title, artist, video_link, song_id],
    )?;
    if changed == 0 {
        return Err(EngineError::NotFound(format!("song {song_id}")).into());
    }
    Ok(())
}

/// Remove a song and every rating that points at it. Session rows are
/// left alone; a running session keeps its pool.
pub fn delete_song(conn: &mut Connection, song_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM user_song_rating WHERE song_id = ?1",
        params![song_id],
    )?;
    let changed = tx.execute("DELETE FROM song WHERE id = ?1", params![song_id])?;
    if changed == 0 {
        return Err(EngineError::NotFound(format!("song {song_id}")).into());
    }
    tx.commit().context("failed to commit song deletion")
}

/// Upsert a rating. Rating `Unknown` deletes the row instead — exactly
/// one active rating per (user, song) pair.
pub fn rate_song(conn: &Connection, user_id: i64, song_id: i64, rating: Rating) -> Result<()> {
    match rating.to_stored() {
        None => {
            conn.execute(
                "DELETE FROM user_song_rating WHERE user_id = ?1 AND song_id = ?2",
                params![user_id, song_id],
            )?;
        }
        Some(stored) => {
            conn.execute(
                "INSERT OR REPLACE INTO user_song_rating (user_id, song_id, rating)
                 VALUES (?1, ?2, ?3)",
                params![user_id, song_id, stored],
            )?;
        }
    }
    Ok(())
}

/// Songs the user has not rated yet, ascending by id. Drives the rating
/// flow: keep asking until this comes back empty.
pub fn unrated_songs(conn: &Connection, user_id: i64) -> Result<Vec<Song>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.title, s.artist, s.video_link
         FROM song s
         LEFT JOIN user_song_rating r ON r.song_id = s.id AND r.user_id = ?1
         WHERE r.rating IS NULL
         ORDER BY s.id",
    )?;
    let songs = stmt
        .query_map(params![user_id], |row| {
            Ok(Song {
                id: row.get(0)?,
                title: row.get(1)?,
                artist: row.get(2)?,
                video_link: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to query unrated songs")?;
    Ok(songs)
}

/// Load every stored rating into a [`PreferenceIndex`].
pub fn load_preference_index(conn: &Connection) -> Result<PreferenceIndex> {
    let mut stmt = conn.prepare("SELECT user_id, song_id, rating FROM user_song_rating")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut index = PreferenceIndex::new();
    for row in rows {
        let (user_id, song_id, stored) = row.context("failed to read rating row")?;
        index.insert(user_id, song_id, Rating::from_stored(stored)?);
    }
    Ok(index)
}

/// Display codes of every stored session, for rejection sampling.
pub fn existing_display_codes(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT display_code FROM session")?;
    let codes = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()
        .context("failed to query display codes")?;
    Ok(codes)
}

/// Persist a freshly formed session. Returns the new session id.
pub fn insert_session(conn: &mut Connection, session: &Session) -> Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO session (display_code) VALUES (?1)",
        params![session.display_code],
    )
    .with_context(|| format!("failed to insert session {}", session.display_code))?;
    let session_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO session_user (session_id, user_id, score, stepped_out)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in &session.participants {
            stmt.execute(params![session_id, p.user_id, p.score, p.stepped_out])?;
        }
    }
    {
        let mut stmt = tx.prepare(
            "INSERT INTO session_song (session_id, song_id, played, is_current, snooze_ttl)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for s in &session.songs {
            stmt.execute(params![session_id, s.song_id, s.played, s.current, s.snooze_ttl])?;
        }
    }

    tx.commit().context("failed to commit new session")?;
    Ok(session_id)
}

/// Load a session by display code.
pub fn load_session(conn: &Connection, display_code: &str) -> Result<Session> {
    let (id, code) = conn
        .query_row(
            "SELECT id, display_code FROM session WHERE display_code = ?1",
            params![display_code],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow::Error::from(EngineError::NotFound(format!("session {display_code}"))))?;

    let mut session = Session {
        id,
        display_code: code,
        participants: Vec::new(),
        songs: Vec::new(),
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, score, stepped_out FROM session_user
         WHERE session_id = ?1 ORDER BY rowid",
    )?;
    session.participants = stmt
        .query_map(params![id], |row| {
            Ok(Participant {
                user_id: row.get(0)?,
                score: row.get(1)?,
                stepped_out: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to query session participants")?;

    let mut stmt = conn.prepare(
        "SELECT song_id, played, is_current, snooze_ttl FROM session_song
         WHERE session_id = ?1 ORDER BY song_id",
    )?;
    session.songs = stmt
        .query_map(params![id], |row| {
            Ok(SessionSong {
                song_id: row.get(0)?,
                played: row.get(1)?,
                current: row.get(2)?,
                snooze_ttl: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to query session songs")?;

    Ok(session)
}

/// Write a session's state back. Rows are replaced wholesale inside one
/// transaction so join/leave and every flag change land together.
pub fn save_session(conn: &mut Connection, session: &Session) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM session_user WHERE session_id = ?1",
        params![session.id],
    )?;
    tx.execute(
        "DELETE FROM session_song WHERE session_id = ?1",
        params![session.id],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO session_user (session_id, user_id, score, stepped_out)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in &session.participants {
            stmt.execute(params![session.id, p.user_id, p.score, p.stepped_out])?;
        }
    }
    {
        let mut stmt = tx.prepare(
            "INSERT INTO session_song (session_id, song_id, played, is_current, snooze_ttl)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for s in &session.songs {
            stmt.execute(params![session.id, s.song_id, s.played, s.current, s.snooze_ttl])?;
        }
    }

    tx.commit()
        .with_context(|| format!("failed to save session {}", session.display_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn schema_init_is_idempotent() {
        let conn = memory_db();
        init_schema(&conn).expect("second init");
    }

    #[test]
    fn user_and_song_crud_round_trip() {
        let conn = memory_db();
        let uid = create_user(&conn, "Amir").unwrap();
        let sid = create_song(&conn, "My Shot", "Cast of Hamilton", "https://example.com/v").unwrap();

        assert_eq!(get_user(&conn, uid).unwrap().name, "Amir");
        let song = get_song(&conn, sid).unwrap();
        assert_eq!(song.title, "My Shot");
        assert_eq!(list_users(&conn).unwrap().len(), 1);
        assert_eq!(list_songs(&conn).unwrap().len(), 1);

        update_song(&conn, sid, "My Shot", "Hamilton", "https://example.com/v2").unwrap();
        assert_eq!(get_song(&conn, sid).unwrap().artist, "Hamilton");
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let conn = memory_db();
        let err = get_user(&conn, 42).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::NotFound(_))
        ));
        assert!(get_song(&conn, 42).is_err());
        assert!(load_session(&conn, "ZZZZ").is_err());
    }

    #[test]
    fn rating_unknown_deletes_the_row() {
        let conn = memory_db();
        let uid = create_user(&conn, "Haim").unwrap();
        let sid = create_song(&conn, "Unicorn", "Noa Kirel", "").unwrap();

        rate_song(&conn, uid, sid, Rating::NeedTheMic).unwrap();
        assert_eq!(
            load_preference_index(&conn).unwrap().rating_for(uid, sid),
            Rating::NeedTheMic
        );

        rate_song(&conn, uid, sid, Rating::SingAlong).unwrap();
        assert_eq!(
            load_preference_index(&conn).unwrap().rating_for(uid, sid),
            Rating::SingAlong
        );

        rate_song(&conn, uid, sid, Rating::Unknown).unwrap();
        assert!(load_preference_index(&conn).unwrap().is_empty());
    }

    #[test]
    fn unrated_songs_shrink_as_ratings_land() {
        let conn = memory_db();
        let uid = create_user(&conn, "Daniel").unwrap();
        let s1 = create_song(&conn, "a", "x", "").unwrap();
        let s2 = create_song(&conn, "b", "y", "").unwrap();

        assert_eq!(unrated_songs(&conn, uid).unwrap().len(), 2);
        rate_song(&conn, uid, s1, Rating::DontKnow).unwrap();
        let remaining = unrated_songs(&conn, uid).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, s2);
    }

    #[test]
    fn session_persistence_round_trip() {
        let mut conn = memory_db();
        let mut session = Session::new(0, "KICK".into(), &[1, 2]);
        session.songs.push(SessionSong::new(10));
        session.songs.push(SessionSong::new(11));
        session.songs[1].snooze_ttl = 7;
        session.participants[0].score = 5;
        session.participants[1].stepped_out = true;

        let id = insert_session(&mut conn, &session).unwrap();
        session.id = id;

        let loaded = load_session(&conn, "KICK").unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.participants, session.participants);
        assert_eq!(loaded.songs, session.songs);

        let mut mutated = loaded;
        mutated.songs[0].played = true;
        mutated.participants[0].score = 9;
        mutated.add_participant(3);
        save_session(&mut conn, &mutated).unwrap();

        let reloaded = load_session(&conn, "KICK").unwrap();
        assert_eq!(reloaded.participants, mutated.participants);
        assert_eq!(reloaded.songs, mutated.songs);
        assert!(existing_display_codes(&conn).unwrap().contains("KICK"));
    }
}

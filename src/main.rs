//! # Micdrop - Fair Song Queues for Group Karaoke
//!
//! Keeps a catalog of songs and per-user ratings, forms a song pool for
//! whoever is in the room, and repeatedly picks the song that serves the
//! group best while keeping turns fair.
//!
//! ## Usage
//!
//! ```bash
//! # Build the catalog
//! micdrop init
//! micdrop user add "Amir"
//! micdrop song add "My Shot" --artist "Hamilton" --link "https://youtu.be/..."
//! micdrop user rate 1 1 need-the-mic
//!
//! # Run a night
//! micdrop session start 1 2 3 4
//! micdrop session next KICK
//! micdrop session played KICK
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;
use micdrop::{algorithm, cli, completion, config, db, queue, rng, session};
use rusqlite::Connection;

/// Open the database and make sure the schema exists.
fn open_database(runtime: &config::RuntimeConfig) -> Result<Connection> {
    let conn = db::connect(&runtime.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Load a session together with everything needed to operate on it.
fn load_session_state(
    conn: &Connection,
    code: &str,
) -> Result<(session::Session, micdrop::rating::PreferenceIndex)> {
    let session = db::load_session(conn, &code.to_uppercase())?;
    let index = db::load_preference_index(conn)?;
    Ok((session, index))
}

fn print_song_line(song: &db::Song) {
    if song.video_link.is_empty() {
        println!("[{}] {} - {}", song.id, song.title, song.artist);
    } else {
        println!(
            "[{}] {} - {} <{}>",
            song.id, song.title, song.artist, song.video_link
        );
    }
}

/// Main entry point for the Micdrop application.
///
/// Initializes logging, parses command-line arguments, and routes
/// commands to the appropriate module functions.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug micdrop session next KICK` - Enable debug logging
/// - `RUST_LOG=micdrop::algorithm=trace` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let runtime = config::RuntimeConfig::resolve(args.database)?;

    match args.command {
        cli::Command::Init => {
            let _conn = open_database(&runtime)?;
            println!("Database ready at {}", runtime.db_path.display());
        }
        cli::Command::User { command } => {
            let conn = open_database(&runtime)?;
            match command {
                cli::UserCommand::Add { name } => {
                    let id = db::create_user(&conn, &name)?;
                    println!("Added user [{id}] {name}");
                }
                cli::UserCommand::List => {
                    for user in db::list_users(&conn)? {
                        println!("[{}] {}", user.id, user.name);
                    }
                }
                cli::UserCommand::Rate {
                    user_id,
                    song_id,
                    rating,
                } => {
                    // Fail early on bad ids so a typo doesn't record a
                    // dangling rating.
                    db::get_user(&conn, user_id)?;
                    let song = db::get_song(&conn, song_id)?;
                    let rating = micdrop::rating::Rating::from(rating);
                    db::rate_song(&conn, user_id, song_id, rating)?;
                    match rating {
                        micdrop::rating::Rating::Unknown => {
                            println!("Cleared rating for {}", song.title);
                        }
                        _ => println!("{}: {}", song.title, rating),
                    }
                }
                cli::UserCommand::Unrated { user_id } => {
                    db::get_user(&conn, user_id)?;
                    for song in db::unrated_songs(&conn, user_id)? {
                        print_song_line(&song);
                    }
                }
            }
        }
        cli::Command::Song { command } => {
            let mut conn = open_database(&runtime)?;
            match command {
                cli::SongCommand::Add {
                    title,
                    artist,
                    link,
                } => {
                    let id = db::create_song(&conn, &title, &artist, &link)?;
                    println!("Added song [{id}] {title} - {artist}");
                }
                cli::SongCommand::List => {
                    for song in db::list_songs(&conn)? {
                        print_song_line(&song);
                    }
                }
                cli::SongCommand::Edit {
                    song_id,
                    title,
                    artist,
                    link,
                } => {
                    let song = db::get_song(&conn, song_id)?;
                    let title = title.unwrap_or(song.title);
                    let artist = artist.unwrap_or(song.artist);
                    let link = link.unwrap_or(song.video_link);
                    db::update_song(&conn, song_id, &title, &artist, &link)?;
                    println!("Updated song [{song_id}] {title} - {artist}");
                }
                cli::SongCommand::Remove { song_id } => {
                    let song = db::get_song(&conn, song_id)?;
                    db::delete_song(&mut conn, song_id)?;
                    println!("Removed {} - {}", song.title, song.artist);
                }
            }
        }
        cli::Command::Session { command } => {
            let mut conn = open_database(&runtime)?;
            let mut random = rng::ThreadRandomness;
            match command {
                cli::SessionCommand::Start { users } => {
                    for user_id in &users {
                        db::get_user(&conn, *user_id)?;
                    }
                    let index = db::load_preference_index(&conn)?;
                    let codes = db::existing_display_codes(&conn)?;
                    let code = session::generate_display_code(&codes, &mut random);
                    let mut session = session::Session::new(0, code, &users);
                    queue::form_queue(
                        &mut session,
                        &index,
                        &mut random,
                        &queue::QueueConfig::default(),
                    );
                    session.id = db::insert_session(&mut conn, &session)?;
                    info!(
                        "started session {} with {} participants and {} songs",
                        session.display_code,
                        session.participants.len(),
                        session.songs.len()
                    );
                    println!("Session {} is on!", session.display_code);
                    println!("{} songs in the pool.", session.songs.len());
                }
                cli::SessionCommand::Next { code } => {
                    let (mut session, index) = load_session_state(&conn, &code)?;
                    match algorithm::select_next(&mut session, &index, &mut random)? {
                        Some(song_id) => {
                            let song = db::get_song(&conn, song_id)?;
                            db::save_session(&mut conn, &session)?;
                            println!("Up next:");
                            print_song_line(&song);
                        }
                        None => println!("Nothing left to sing. What a night!"),
                    }
                }
                cli::SessionCommand::Played { code } => {
                    let (mut session, index) = load_session_state(&conn, &code)?;
                    match session.current_song().map(|s| s.song_id) {
                        Some(song_id) => {
                            session.mark_current_played(&index);
                            db::save_session(&mut conn, &session)?;
                            let song = db::get_song(&conn, song_id)?;
                            println!("{} is done. Scores updated.", song.title);
                        }
                        None => println!("No song is on the mic."),
                    }
                }
                cli::SessionCommand::Skip { code } => {
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    match session.current_song().map(|s| s.song_id) {
                        Some(song_id) => {
                            session.skip_current();
                            db::save_session(&mut conn, &session)?;
                            let song = db::get_song(&conn, song_id)?;
                            println!("Skipped {}.", song.title);
                        }
                        None => println!("No song is on the mic."),
                    }
                }
                cli::SessionCommand::Snooze { code } => {
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    match session.current_song().map(|s| s.song_id) {
                        Some(song_id) => {
                            session.snooze_current();
                            db::save_session(&mut conn, &session)?;
                            let song = db::get_song(&conn, song_id)?;
                            println!("{} will come back later.", song.title);
                        }
                        None => println!("No song is on the mic."),
                    }
                }
                cli::SessionCommand::StepOut { code, user_id } => {
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    session.set_stepped_out(user_id, true)?;
                    db::save_session(&mut conn, &session)?;
                    let user = db::get_user(&conn, user_id)?;
                    println!("{} stepped out.", user.name);
                }
                cli::SessionCommand::StepBack { code, user_id } => {
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    session.set_stepped_out(user_id, false)?;
                    db::save_session(&mut conn, &session)?;
                    let user = db::get_user(&conn, user_id)?;
                    println!("{} is back in the room.", user.name);
                }
                cli::SessionCommand::Join { code, user_id } => {
                    let user = db::get_user(&conn, user_id)?;
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    session.add_participant(user_id);
                    db::save_session(&mut conn, &session)?;
                    println!("{} joined session {}.", user.name, session.display_code);
                }
                cli::SessionCommand::Leave { code, user_id } => {
                    let user = db::get_user(&conn, user_id)?;
                    let (mut session, _index) = load_session_state(&conn, &code)?;
                    session.remove_participant(user_id);
                    db::save_session(&mut conn, &session)?;
                    println!("{} left session {}.", user.name, session.display_code);
                }
                cli::SessionCommand::Current { code } => {
                    let (session, _index) = load_session_state(&conn, &code)?;
                    match session.current_song() {
                        Some(s) => {
                            let song = db::get_song(&conn, s.song_id)?;
                            println!("On the mic:");
                            print_song_line(&song);
                        }
                        None => println!("No song is on the mic."),
                    }
                }
                cli::SessionCommand::Scores { code } => {
                    let (session, _index) = load_session_state(&conn, &code)?;
                    println!(
                        "Session {} - {} of {} songs played",
                        session.display_code,
                        session.played_count(),
                        session.songs.len()
                    );
                    for p in &session.participants {
                        let user = db::get_user(&conn, p.user_id)?;
                        let marker = if p.stepped_out { " (out)" } else { "" };
                        println!("{:>4}  {}{}", p.score, user.name, marker);
                    }
                }
            }
        }
        cli::Command::Playlist { users, json } => {
            let conn = open_database(&runtime)?;
            for user_id in &users {
                db::get_user(&conn, *user_id)?;
            }
            let index = db::load_preference_index(&conn)?;
            let mut random = rng::ThreadRandomness;

            // An ephemeral session, drained to the end. Damping is off
            // so the whole admitted pool comes out in play order.
            let mut session = session::Session::new(0, "PLAN".into(), &users);
            queue::form_queue(
                &mut session,
                &index,
                &mut random,
                &queue::QueueConfig::undamped(),
            );

            let mut playlist = Vec::new();
            while let Some(song_id) =
                algorithm::select_next(&mut session, &index, &mut random)?
            {
                playlist.push(db::get_song(&conn, song_id)?);
                session.mark_current_played(&index);
            }

            if json {
                let rendered = serde_json::to_string_pretty(&playlist)
                    .context("failed to serialize playlist")?;
                println!("{rendered}");
            } else {
                for song in &playlist {
                    print_song_line(song);
                }
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(shell, &mut cmd);
        }
    }

    Ok(())
}

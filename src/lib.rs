//! Fair song queues for group karaoke sessions.
//!
//! Micdrop keeps a catalog of songs and per-user ratings, forms a song
//! pool for whoever is in the room, and repeatedly picks the song that
//! serves the group best while keeping turns fair.
//!
//! Core modules:
//! - [`rating`] - The rating scale and the in-memory preference index
//! - [`queue`] - Session pool formation: admission and damping
//! - [`algorithm`] - Next-song selection: fairness order and pruning
//! - [`session`] - Session state and play/skip/snooze transitions
//! - [`db`] - SQLite persistence for catalog and sessions
//!
//! ### Supporting Modules
//!
//! - [`rng`] - Injectable randomness, seedable for reproducible runs
//! - [`config`] - Data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use micdrop::{algorithm, db, queue, rng, session};
//!
//! let db_path = micdrop::config::get_db_path()?;
//! let mut conn = db::connect(&db_path)?;
//! db::init_schema(&conn)?;
//!
//! // Everyone rates songs ahead of time; sessions read the index.
//! let index = db::load_preference_index(&conn)?;
//!
//! let mut random = rng::ThreadRandomness;
//! let codes = db::existing_display_codes(&conn)?;
//! let code = session::generate_display_code(&codes, &mut random);
//! let mut session = session::Session::new(0, code, &[1, 2, 3]);
//! queue::form_queue(&mut session, &index, &mut random, &queue::QueueConfig::default());
//! session.id = db::insert_session(&mut conn, &session)?;
//!
//! // One round: pick, sing, credit the singers.
//! if let Some(song_id) = algorithm::select_next(&mut session, &index, &mut random)? {
//!     println!("up next: song {song_id}");
//!     session.mark_current_played(&index);
//! }
//! db::save_session(&mut conn, &session)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## How Selection Works
//!
//! Each pick walks the participants from lowest session score to
//! highest, letting everyone in turn narrow the candidate pool to the
//! songs they care most about. Whoever has sung least shapes the pool
//! first, which is what keeps the night fair. Stepped-out participants
//! still get a pass at the end, steering selection toward songs they
//! would mind missing least.
//!
//! ## Error Handling
//!
//! Public fallible functions return `anyhow::Result`; engine-level
//! failures are typed as [`session::EngineError`] and can be recovered
//! through `downcast_ref`.

pub mod algorithm;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod queue;
pub mod rating;
pub mod rng;
pub mod session;

//! # Command-Line Interface Module
//!
//! Defines the command-line interface for Micdrop using Clap derive
//! macros. Commands map onto the two halves of the crate: catalog
//! management (`user`, `song`) and running sessions (`session`,
//! `playlist`).
//!
//! ## Examples
//!
//! ```bash
//! micdrop song add "My Shot" --artist "Hamilton" --link "https://youtu.be/..."
//! micdrop user rate 1 3 need-the-mic
//! micdrop session start 1 2 3 4
//! micdrop session next KICK
//! ```

use crate::rating::Rating;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Rating values as they appear on the command line.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum RatingArg {
    /// Remove any stored rating for this song
    Unknown,
    /// I don't know this song
    DontKnow,
    /// I'd sing along
    SingAlong,
    /// I can take the mic
    CanTakeTheMic,
    /// I NEED the mic!
    NeedTheMic,
}

impl From<RatingArg> for Rating {
    fn from(arg: RatingArg) -> Self {
        match arg {
            RatingArg::Unknown => Rating::Unknown,
            RatingArg::DontKnow => Rating::DontKnow,
            RatingArg::SingAlong => Rating::SingAlong,
            RatingArg::CanTakeTheMic => Rating::CanTakeTheMic,
            RatingArg::NeedTheMic => Rating::NeedTheMic,
        }
    }
}

/// Main application arguments structure.
///
/// Uses Clap derive macros to automatically generate argument parsing,
/// help text, and validation.
#[derive(Parser)]
#[command(name = "micdrop")]
#[command(about = "Micdrop: fair song queues for group karaoke sessions")]
#[command(version)]
pub struct Args {
    /// Path to the database file (defaults to the platform data directory)
    #[arg(long, global = true, env = "MICDROP_DB")]
    pub database: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Create the database and tables if they do not exist yet
    Init,

    /// Manage users and their song ratings
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage the song catalog
    Song {
        #[command(subcommand)]
        command: SongCommand,
    },

    /// Run karaoke sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Print a full playlist for a fixed group, in play order
    ///
    /// Forms an undamped session for the given users and drains it,
    /// printing every song the group would sing. Useful for planning a
    /// night in advance or for exporting to a player.
    Playlist {
        /// User ids making up the group
        #[arg(short, long = "user", required = true, num_args = 1..)]
        users: Vec<i64>,

        /// Emit the playlist as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    ///
    /// Outputs completion scripts for the specified shell to stdout.
    /// Pipe the output to the appropriate completion directory.
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// User and rating management.
#[derive(Subcommand)]
pub enum UserCommand {
    /// Add a user
    Add {
        /// Display name
        name: String,
    },

    /// List all users
    List,

    /// Rate a song on behalf of a user
    Rate {
        /// User id
        user_id: i64,
        /// Song id
        song_id: i64,
        /// The rating to record
        rating: RatingArg,
    },

    /// List songs the user has not rated yet
    Unrated {
        /// User id
        user_id: i64,
    },
}

/// Song catalog management.
#[derive(Subcommand)]
pub enum SongCommand {
    /// Add a song to the catalog
    Add {
        /// Song title
        title: String,

        /// Performing artist
        #[arg(short, long)]
        artist: String,

        /// Link to a singable video of the song
        #[arg(short, long, default_value = "")]
        link: String,
    },

    /// List the whole catalog
    List,

    /// Edit a song's metadata
    Edit {
        /// Song id
        song_id: i64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New artist
        #[arg(short, long)]
        artist: Option<String>,

        /// New video link
        #[arg(short, long)]
        link: Option<String>,
    },

    /// Remove a song and its ratings
    Remove {
        /// Song id
        song_id: i64,
    },
}

/// Session lifecycle and in-session actions.
///
/// Every command except `start` takes the four-letter display code that
/// `start` printed.
#[derive(Subcommand)]
pub enum SessionCommand {
    /// Start a session for the given users and print its display code
    Start {
        /// User ids of everyone in the room
        #[arg(required = true, num_args = 1..)]
        users: Vec<i64>,
    },

    /// Pick the next song to sing
    Next {
        /// Session display code
        code: String,
    },

    /// Mark the current song as sung to the end
    Played {
        /// Session display code
        code: String,
    },

    /// Drop the current song without crediting anyone
    Skip {
        /// Session display code
        code: String,
    },

    /// Put the current song back in the pool for later
    Snooze {
        /// Session display code
        code: String,
    },

    /// Mark a participant as away from the room
    StepOut {
        /// Session display code
        code: String,
        /// User id
        user_id: i64,
    },

    /// Mark a participant as back in the room
    StepBack {
        /// Session display code
        code: String,
        /// User id
        user_id: i64,
    },

    /// Add a user to a running session
    Join {
        /// Session display code
        code: String,
        /// User id
        user_id: i64,
    },

    /// Remove a user from a running session
    Leave {
        /// Session display code
        code: String,
        /// User id
        user_id: i64,
    },

    /// Show the song currently on the mic
    Current {
        /// Session display code
        code: String,
    },

    /// Show per-participant scores
    Scores {
        /// Session display code
        code: String,
    },
}

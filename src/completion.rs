//! # Shell Completion Module
//!
//! Generates completion scripts for the shells clap_complete supports.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! micdrop completion bash > ~/.local/share/bash-completion/completions/micdrop
//!
//! # Generate zsh completions
//! micdrop completion zsh > ~/.config/zsh/completions/_micdrop
//! ```

use crate::cli;
use clap::Command;
use clap_complete::{generate, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell, written to stdout.
pub fn generate_completions(shell: cli::Shell, cmd: &mut Command) {
    let gen: CompletionShell = match shell {
        cli::Shell::Bash => CompletionShell::Bash,
        cli::Shell::Zsh => CompletionShell::Zsh,
        cli::Shell::Fish => CompletionShell::Fish,
        cli::Shell::PowerShell => CompletionShell::PowerShell,
        cli::Shell::Elvish => CompletionShell::Elvish,
    };
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

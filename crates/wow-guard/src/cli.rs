//! Command-line surface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wow-guard",
    version,
    about = "Policy enforcement gateway for AI assistant tool calls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a PreToolUse hook: read the request JSON on stdin, write one
    /// decision JSON object on stdout (exit 0 = allow, 1 = deny).
    Hook,
    /// Operator bypass controls for bypassable blocks.
    Bypass {
        #[command(subcommand)]
        cmd: BypassCommands,
    },
    /// Superadmin elevation.
    Superadmin {
        #[command(subcommand)]
        cmd: SuperadminCommands,
    },
    /// Cross-session report: score, trend, comparison, recurring patterns.
    Report,
}

#[derive(Subcommand)]
pub enum BypassCommands {
    /// Enable bypass for a bounded time (e.g. 30s, 15m, 2h).
    Enable { duration: String },
    /// Disable bypass immediately.
    Disable,
}

#[derive(Subcommand)]
pub enum SuperadminCommands {
    /// Unlock superadmin elevation for a bounded time.
    Unlock {
        /// How long the elevation lasts (e.g. 30s, 15m, 2h).
        #[arg(long, default_value = "15m")]
        duration: String,
    },
}

/// Parse an operator duration: bare seconds, or `s`/`m`/`h` suffixed.
pub fn parse_duration(input: &str) -> Result<chrono::Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration is empty".to_string());
    }
    let (number, unit) = match input.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&input[..idx], Some(c)),
        _ => (input, None),
    };
    let value: i64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{input}': expected e.g. 30s, 15m, 2h"))?;
    if value <= 0 {
        return Err(format!("invalid duration '{input}': must be positive"));
    }
    let duration = match unit {
        None | Some('s') => chrono::Duration::seconds(value),
        Some('m') => chrono::Duration::minutes(value),
        Some('h') => chrono::Duration::hours(value),
        Some(other) => {
            return Err(format!(
                "invalid duration unit '{other}' in '{input}': use s, m, or h"
            ));
        }
    };
    Ok(duration)
}

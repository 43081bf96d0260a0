use anyhow::Result;
use clap::Parser;
use std::io::Read;

mod cli;
mod hook_cmd;
mod operator_cmds;
mod report_cmd;

use cli::{BypassCommands, Cli, Commands, SuperadminCommands, parse_duration};

fn init_tracing() {
    // stdout belongs to the hook protocol; all logging goes to stderr.
    let filter = if wow_config::debug_enabled() {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .ok();
}

/// Offline subcommands: a missing settings file means defaults, but a
/// present-and-invalid one is a real error.
fn load_offline_config() -> Result<wow_config::GatewayConfig> {
    let path = wow_config::paths::settings_path();
    if !path.exists() {
        return Ok(wow_config::GatewayConfig::default());
    }
    Ok(wow_config::GatewayConfig::load(&path)?)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let sessions_root = wow_config::sessions_root();

    match cli.command {
        Commands::Hook => {
            // The hot path never fails: a broken settings file falls back to
            // defaults, and nothing below exits non-zero except a deny.
            let config = wow_config::GatewayConfig::load_or_default(
                &wow_config::paths::settings_path(),
            );
            let mut raw_input = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut raw_input) {
                tracing::warn!("could not read stdin: {e}");
            }
            let result = hook_cmd::run(&raw_input, &sessions_root, config);
            match serde_json::to_string(&result.output) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    tracing::warn!("could not serialize decision: {e}");
                    println!(
                        r#"{{"hookSpecificOutput":{{"hookEventName":"PreToolUse","permissionDecision":"allow","permissionDecisionReason":"serialization error, failing open"}}}}"#
                    );
                    std::process::exit(0);
                }
            }
            std::process::exit(result.exit_code);
        }
        Commands::Bypass { cmd } => {
            let config = load_offline_config()?;
            let message = match cmd {
                BypassCommands::Enable { duration } => {
                    let duration = parse_duration(&duration).map_err(anyhow::Error::msg)?;
                    operator_cmds::bypass_enable(
                        &sessions_root,
                        config.scoring.initial_score,
                        duration,
                    )?
                }
                BypassCommands::Disable => {
                    operator_cmds::bypass_disable(&sessions_root, config.scoring.initial_score)?
                }
            };
            println!("{message}");
        }
        Commands::Superadmin { cmd } => {
            let config = load_offline_config()?;
            let SuperadminCommands::Unlock { duration } = cmd;
            let duration = parse_duration(&duration).map_err(anyhow::Error::msg)?;
            let message = operator_cmds::superadmin_unlock(
                &sessions_root,
                config.scoring.initial_score,
                duration,
            )?;
            println!("{message}");
        }
        Commands::Report => {
            let config = load_offline_config()?;
            let rendered =
                report_cmd::run(&sessions_root, &config, wow_config::message_format())?;
            println!("{rendered}");
        }
    }

    Ok(())
}

//! # NEO Robot
//!
//! Terminal front end for learning Python with a 3-servo robot arm.
//!
//! ```bash
//! # Interactive shell against the simulated arm
//! neo-robot --mock
//!
//! # Run a program on the real arm
//! neo-robot --config neo.toml run wave.py
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod config;
mod console;
mod modes;
mod worker;

use bootstrap::{Connection, RobotGuard};
use config::AppConfig;
use modes::repl::run_repl;
use modes::script::run_script;
use worker::Worker;

/// NEO Robot - learn Python by moving a robot arm
#[derive(Parser, Debug)]
#[command(name = "neo-robot")]
#[command(about = "Learn Python with a robot arm", long_about = None)]
#[command(version)]
struct Cli {
    /// Run in simulation mode (no hardware required)
    #[arg(long, global = true)]
    mock: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program file
    Run {
        /// Path to the program
        file: PathBuf,
    },

    /// Start the interactive shell (default)
    Repl,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("neo_robot=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if cli.mock {
        config.hardware.use_mock = true;
    }

    let (robot, connection) = bootstrap::connect(&config.hardware, Some(console::hardware_log()));
    if let Connection::Fallback(_) = connection {
        console::write_error("Could not connect to hardware - using simulation mode.");
    }
    let guard = RobotGuard::new(robot.into_shared());

    let worker = Worker::spawn(
        guard.robot().clone(),
        config.executor,
        Some(console::live_log()),
    )?;
    let interrupt = worker.interrupt_handle();
    ctrlc::set_handler(move || interrupt.interrupt()).context("failed to install Ctrl-C handler")?;

    let succeeded = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Run { file } => run_script(&worker, &file)?,
        Commands::Repl => {
            run_repl(&worker, &config.app_title)?;
            true
        }
    };

    worker.join()?;
    drop(guard);

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repl_is_default() {
        let cli = Cli::try_parse_from(["neo-robot", "--mock"]).unwrap();
        assert!(cli.mock);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_with_config() {
        let cli = Cli::try_parse_from(["neo-robot", "run", "wave.py", "--config", "neo.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("neo.toml")));
        assert!(matches!(cli.command, Some(Commands::Run { file }) if file == PathBuf::from("wave.py")));
    }
}

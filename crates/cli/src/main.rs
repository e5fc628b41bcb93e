//! trainlaunch - launch a distributed RL training run
//!
//! Clears stale training processes, sets the interconnect and tracking
//! environment, then runs the training entry point with configuration
//! overrides and exits with its status.

mod settings;
mod telemetry;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use settings::LauncherSettings;
use telemetry::LogFormat;
use trainlaunch_core::application::constants::LAUNCHER_FAILURE_EXIT_CODE;
use trainlaunch_core::application::Launcher;
use trainlaunch_core::port::time_provider::SystemTimeProvider;
use trainlaunch_infra_system::{SubprocessRunner, SystemProcessReaper};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "trainlaunch")]
#[command(about = "Launch a distributed RL training run", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Launcher config file (TOML)
    #[arg(long, global = true, env = "TRAINLAUNCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "TRAINLAUNCH_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the environment, then run the training entry point
    Run {
        /// Extra override (KEY=VALUE), applied last
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Extra environment variable (NAME=VALUE) for the training process
        #[arg(short, long = "env", value_name = "NAME=VALUE")]
        env: Vec<String>,

        /// Skip stopping and killing stale processes
        #[arg(long)]
        no_reset: bool,
    },

    /// Print the command that `run` would execute
    Plan {
        /// Extra override (KEY=VALUE), applied last
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Extra environment variable (NAME=VALUE) for the training process
        #[arg(short, long = "env", value_name = "NAME=VALUE")]
        env: Vec<String>,

        /// Emit JSON instead of a shell line
        #[arg(long)]
        json: bool,
    },

    /// Only stop and kill stale training processes
    Reset,
}

fn launcher() -> Launcher {
    let time_provider = Arc::new(SystemTimeProvider);
    Launcher::new(
        Arc::new(SystemProcessReaper::new(time_provider.clone())),
        Arc::new(SubprocessRunner::new(time_provider.clone())),
        time_provider,
    )
}

/// Execute the selected command, returning the process exit code
async fn run(cli: Cli) -> Result<i32> {
    let settings = LauncherSettings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { set, env, no_reset } => {
            let plan = settings.build_plan(&set)?;
            let env = settings.launch_env(&env)?;
            let policy = if no_reset {
                trainlaunch_core::domain::ResetPolicy::disabled()
            } else {
                settings.reset_policy()
            };

            let outcome = launcher().launch(plan, &env, &policy).await?;
            Ok(outcome.propagated_code())
        }

        Commands::Plan { set, env, json } => {
            let mut plan = settings.build_plan(&set)?;
            plan.env.merge(&settings.launch_env(&env)?);

            if json {
                let env: serde_json::Map<String, serde_json::Value> = plan
                    .env
                    .iter()
                    .map(|(name, value)| (name.to_string(), json!(value)))
                    .collect();
                let doc = json!({
                    "program": plan.program,
                    "args": plan.argv(),
                    "env": env,
                    "working_dir": plan.working_dir,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                if let Some(dir) = &plan.working_dir {
                    println!("{} {}", "cd".cyan().bold(), dir.display());
                }
                println!("{}", plan.command_line());
            }
            Ok(0)
        }

        Commands::Reset => {
            let report = launcher()
                .reset_environment(&settings.reset_policy())
                .await;

            println!("{}", "✓ Environment reset".green().bold());
            println!("  stop commands run:    {}", report.commands_run);
            println!("  stop commands failed: {}", report.commands_failed);
            println!("  processes signalled:  {}", report.processes_signalled);
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_format);

    info!("trainlaunch v{} starting", VERSION);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "Launch failed");
            eprintln!("{} {:#}", "error:".red().bold(), e);
            LAUNCHER_FAILURE_EXIT_CODE
        }
    };

    std::process::exit(code);
}

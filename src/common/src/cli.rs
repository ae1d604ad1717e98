use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared by every kprune command
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands that only inspect the configuration
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments.
    ///
    /// `RUST_LOG` wins over the verbosity flags when set.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("kprune Configuration:");
            println!("=====================");
            println!("Concurrency: {}", config.prune.concurrency);
            println!("Wait for deletion: {}", config.prune.wait_for_deletion);
            println!("Dry run: {}", config.prune.dry_run);
            println!("Field manager: {}", config.prune.manager_name);
            println!("Skip annotation: {}", config.prune.skip_delete_annotation);
            println!(
                "Skip-if-tags annotation: {}",
                config.prune.skip_delete_if_tags_annotation
            );
            for (index, phase) in config.prune.phases.iter().enumerate() {
                if phase.is_empty() {
                    println!("Phase {}: <everything else>", index + 1);
                } else {
                    println!("Phase {}: {}", index + 1, phase.join(", "));
                }
            }
            println!("Progress: {:?}", config.status.progress);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        config
            .prune
            .validate()
            .context("Invalid [prune] configuration")?;

        log::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Handle commands that only inspect the configuration
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

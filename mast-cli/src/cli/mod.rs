//! Command-line interface

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::api::MastClient;
use crate::config::Config;

pub use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "mast", version, about = "Import masonry shake-table experiments into the MAST database")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// URL of the MAST API (overrides config and MAST_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// API key for mutating requests (overrides config and MAST_API_KEY)
    #[arg(long, global = true)]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import an experiments workbook
    Upload {
        /// Path to the .xlsx workbook
        workbook: PathBuf,
        /// Parse and print the records without uploading
        #[arg(long)]
        dry_run: bool,
    },
    /// Show one reference
    Reference {
        id: i64,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List references
    References {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Remove a reference
    RmReference {
        id: i64,
        /// Do not ask for confirmation
        #[arg(long)]
        force: bool,
        /// Also remove its experiments and their run results
        #[arg(long)]
        recursive: bool,
    },
    /// Show one experiment
    Experiment {
        id: i64,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List experiments
    Experiments {
        /// Only experiments of this reference id
        #[arg(long)]
        reference: Option<i64>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Remove an experiment
    RmExperiment {
        id: i64,
        /// Do not ask for confirmation
        #[arg(long)]
        force: bool,
        /// Also remove its run results
        #[arg(long)]
        recursive: bool,
    },
    /// List the run results of an experiment
    RunResults {
        /// Experiment id
        #[arg(long)]
        experiment: i64,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Create the folder template of an experiment repository
    GenerateRepo {
        /// Repository folder
        folder: PathBuf,
        /// Experiment id, to name files after its runs
        #[arg(long)]
        id: Option<i64>,
    },
    /// Check a repository folder against the template
    ValidateRepo {
        /// Repository folder
        folder: PathBuf,
        /// Experiment id, to check the per-run files
        #[arg(long)]
        id: Option<i64>,
    },
    /// Upload a repository folder or zip to an experiment
    UploadRepo {
        /// Repository folder or .zip archive
        source: PathBuf,
        /// Experiment id
        #[arg(long)]
        id: i64,
    },
    /// Remove the file repository of an experiment
    RmRepo {
        /// Experiment id
        #[arg(long)]
        id: i64,
        /// Do not ask for confirmation
        #[arg(long)]
        force: bool,
    },
    /// Show or change the saved configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
        /// Save the API URL
        #[arg(long, value_name = "URL")]
        set_url: Option<String>,
        /// Save the API key
        #[arg(long, value_name = "KEY")]
        set_key: Option<String>,
    },
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.url, cli.key)?;
    let client = MastClient::new(config.url.clone(), config.api_key.clone());

    match cli.command {
        Commands::Upload { workbook, dry_run } => {
            commands::upload::handle_upload(&client, &workbook, dry_run).await
        }
        Commands::Reference { id, pretty } => {
            commands::records::show_reference(&client, id, pretty).await
        }
        Commands::References { format } => commands::records::list_references(&client, format).await,
        Commands::RmReference {
            id,
            force,
            recursive,
        } => commands::records::remove_reference(&client, id, force, recursive).await,
        Commands::Experiment { id, pretty } => {
            commands::records::show_experiment(&client, id, pretty).await
        }
        Commands::Experiments { reference, format } => {
            commands::records::list_experiments(&client, reference, format).await
        }
        Commands::RmExperiment {
            id,
            force,
            recursive,
        } => commands::records::remove_experiment(&client, id, force, recursive).await,
        Commands::RunResults { experiment, format } => {
            commands::records::list_run_results(&client, experiment, format).await
        }
        Commands::GenerateRepo { folder, id } => {
            commands::repo::generate_repo(&client, &folder, id).await
        }
        Commands::ValidateRepo { folder, id } => {
            commands::repo::validate_repo(&client, &folder, id).await
        }
        Commands::UploadRepo { source, id } => commands::repo::upload_repo(&client, &source, id).await,
        Commands::RmRepo { id, force } => commands::repo::remove_repo(&client, id, force).await,
        Commands::Config {
            show,
            set_url,
            set_key,
        } => commands::config::handle_config(&config, show, set_url, set_key),
    }
}

//! Repository commands: generate, validate, upload and remove file repositories

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::*;
use serde_json::json;
use tempfile::TempDir;

use super::records::confirm;
use crate::api::{MastClient, Resource};
use crate::repo::{self, ExperimentInfo, Validation, layout};

/// Fetch an experiment and the run ids that carry data files
async fn experiment_info(client: &MastClient, id: i64) -> Result<ExperimentInfo> {
    let experiment = client
        .fetch(Resource::Experiments, id)
        .await
        .with_context(|| format!("Experiment with id {} does not exist", id))?;
    let filter = json!({ "experiment_id": id });
    let runs = client
        .list(Resource::RunResults, Some(&filter))
        .await
        .with_context(|| format!("Failed to list run results of experiment {}", id))?;

    Ok(ExperimentInfo::from_records(id, &experiment, &runs))
}

pub async fn generate_repo(client: &MastClient, folder: &Path, id: Option<i64>) -> Result<()> {
    let info = match id {
        Some(id) => Some(experiment_info(client, id).await?),
        None => None,
    };

    let created = layout::generate(folder, info.as_ref(), chrono::Local::now().naive_local())?;

    println!(
        "{} {} ({} new files)",
        "Repository ready:".bright_green(),
        folder.display(),
        created.len()
    );
    Ok(())
}

pub async fn validate_repo(client: &MastClient, folder: &Path, id: Option<i64>) -> Result<()> {
    if !folder.is_dir() {
        bail!("Not a folder: {}", folder.display());
    }

    let run_ids = match id {
        Some(id) => experiment_info(client, id).await?.run_ids,
        None => Vec::new(),
    };

    let validation = layout::validate(folder, &run_ids);
    print_validation(&validation);

    if !validation.is_valid() {
        bail!("Repository has {} errors", validation.errors.len());
    }
    Ok(())
}

pub async fn upload_repo(client: &MastClient, source: &Path, id: i64) -> Result<()> {
    if !client.has_api_key() {
        bail!("Uploading requires an API key. Pass --key, set MAST_API_KEY or run `mast config --set-key`");
    }

    let info = experiment_info(client, id).await?;
    let scratch = TempDir::new().context("Failed to create scratch directory")?;
    let package = repo::package(source, &info.run_ids, scratch.path())?;

    print_validation(&package.validation);
    if !package.validation.is_valid() {
        bail!(
            "Repository has {} errors, nothing uploaded",
            package.validation.errors.len()
        );
    }

    let path = format!("{}/files", Resource::Experiments.item_path(id));
    client
        .upload_files(&path, std::slice::from_ref(&package.archive))
        .await
        .with_context(|| format!("Failed to upload repository of experiment {}", id))?;

    println!(
        "{} {} to experiment {}",
        "Uploaded".bright_green(),
        source.display(),
        id
    );
    Ok(())
}

pub async fn remove_repo(client: &MastClient, id: i64, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Remove the file repository of experiment {}?", id))? {
        println!("Aborted");
        return Ok(());
    }

    let path = format!("{}/files", Resource::Experiments.item_path(id));
    client
        .delete_path(&path)
        .await
        .with_context(|| format!("Failed to remove repository of experiment {}", id))?;

    println!("{} repository of experiment {}", "Removed".bright_green(), id);
    Ok(())
}

fn print_validation(validation: &Validation) {
    for warning in &validation.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    for error in &validation.errors {
        println!("{} {}", "error:".red().bold(), error);
    }
    if validation.warnings.is_empty() && validation.errors.is_empty() {
        println!("{}", "Repository matches the template".bright_green());
    }
}

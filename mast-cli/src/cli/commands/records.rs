//! Record commands: show, list and remove references, experiments and run results

use anyhow::{Context, Result};
use colored::*;
use dialoguer::Confirm;
use serde_json::{Value, json};

use crate::api::{MastClient, Operation, Resource, record_id};
use crate::cli::output::{OutputFormat, format_output};

pub async fn show_reference(client: &MastClient, id: i64, pretty: bool) -> Result<()> {
    show(client, Resource::References, id, pretty).await
}

pub async fn show_experiment(client: &MastClient, id: i64, pretty: bool) -> Result<()> {
    show(client, Resource::Experiments, id, pretty).await
}

async fn show(client: &MastClient, resource: Resource, id: i64, pretty: bool) -> Result<()> {
    let record = client
        .fetch(resource, id)
        .await
        .with_context(|| format!("Failed to fetch {} {}", resource.singular(), id))?;

    let format = if pretty { OutputFormat::Pretty } else { OutputFormat::Json };
    println!("{}", format_output(&record, format)?);
    Ok(())
}

pub async fn list_references(client: &MastClient, format: OutputFormat) -> Result<()> {
    print_list(client, Resource::References, None, format).await
}

pub async fn list_experiments(client: &MastClient, reference: Option<i64>, format: OutputFormat) -> Result<()> {
    let filter = reference.map(|id| json!({ "reference_id": id }));
    print_list(client, Resource::Experiments, filter, format).await
}

pub async fn list_run_results(client: &MastClient, experiment: i64, format: OutputFormat) -> Result<()> {
    let filter = json!({ "experiment_id": experiment });
    print_list(client, Resource::RunResults, Some(filter), format).await
}

async fn print_list(
    client: &MastClient,
    resource: Resource,
    filter: Option<Value>,
    format: OutputFormat,
) -> Result<()> {
    let records = client
        .list(resource, filter.as_ref())
        .await
        .with_context(|| format!("Failed to list {}", resource))?;

    log::debug!("Fetched {} {}", records.len(), resource);
    println!("{}", format_output(&Value::Array(records), format)?);
    Ok(())
}

pub async fn remove_reference(client: &MastClient, id: i64, force: bool, recursive: bool) -> Result<()> {
    let prompt = if recursive {
        format!("Remove reference {} with all its experiments and run results?", id)
    } else {
        format!("Remove reference {}?", id)
    };
    if !force && !confirm(&prompt)? {
        println!("Aborted");
        return Ok(());
    }

    if recursive {
        let filter = json!({ "reference_id": id });
        let experiments = client.list(Resource::Experiments, Some(&filter)).await?;
        for experiment in &experiments {
            let experiment_id = record_id(experiment)?;
            delete_run_results(client, experiment_id).await?;
            delete(client, Resource::Experiments, experiment_id).await?;
        }
    }

    delete(client, Resource::References, id).await
}

pub async fn remove_experiment(client: &MastClient, id: i64, force: bool, recursive: bool) -> Result<()> {
    let prompt = if recursive {
        format!("Remove experiment {} with all its run results?", id)
    } else {
        format!("Remove experiment {}?", id)
    };
    if !force && !confirm(&prompt)? {
        println!("Aborted");
        return Ok(());
    }

    if recursive {
        delete_run_results(client, id).await?;
    }

    delete(client, Resource::Experiments, id).await
}

async fn delete_run_results(client: &MastClient, experiment_id: i64) -> Result<()> {
    let filter = json!({ "experiment_id": experiment_id });
    let runs = client.list(Resource::RunResults, Some(&filter)).await?;
    for run in &runs {
        delete(client, Resource::RunResults, record_id(run)?).await?;
    }
    Ok(())
}

async fn delete(client: &MastClient, resource: Resource, id: i64) -> Result<()> {
    client
        .execute(&Operation::delete(resource, id))
        .await
        .with_context(|| format!("Failed to remove {} {}", resource.singular(), id))?;

    println!("{} {} {}", "Removed".bright_green(), resource.singular(), id);
    Ok(())
}

/// Ask for confirmation on the terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

//! `mast upload`: import a workbook

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::*;
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::api::MastClient;
use crate::cli::output::to_pretty_json;
use crate::import::{self, ParsedWorkbook};
use crate::upload;

pub async fn handle_upload(client: &MastClient, workbook: &Path, dry_run: bool) -> Result<()> {
    if !workbook.is_file() {
        bail!("Workbook does not exist: {}", workbook.display());
    }
    if !dry_run && !client.has_api_key() {
        bail!("Uploading requires an API key. Pass --key, set MAST_API_KEY or run `mast config --set-key`");
    }

    let scratch = TempDir::new().context("Failed to create scratch directory")?;
    let parsed = import::read_workbook(workbook, scratch.path())?;

    if dry_run {
        println!("{}", to_pretty_json(&dry_run_view(&parsed))?);
        return Ok(());
    }

    println!(
        "Uploading {} references, {} experiments and {} run results to {}",
        parsed.references.len(),
        parsed.experiments.len(),
        parsed.run_results.len(),
        client.base_url().cyan()
    );

    let report = upload::upload_workbook(client, &parsed).await;

    let summary = format!(
        "{} references, {} experiments, {} run results, {} images uploaded",
        report.references_created + report.references_updated,
        report.experiments,
        report.run_results,
        report.images
    );
    if report.failed == 0 && report.skipped == 0 {
        println!("{}", summary.bright_green());
    } else {
        println!("{}", summary.yellow());
        println!(
            "{}",
            format!(
                "{} records failed, {} skipped because a record they depend on was not uploaded",
                report.failed, report.skipped
            )
            .yellow()
        );
    }

    Ok(())
}

/// Parsed records with their local links, for review before uploading
fn dry_run_view(parsed: &ParsedWorkbook) -> Value {
    let references: Vec<Value> = parsed
        .references
        .iter()
        .map(|r| json!({ "local_id": r.local_id, "record": r.to_payload() }))
        .collect();

    let experiments: Vec<Value> = parsed
        .experiments
        .iter()
        .map(|e| {
            let image = parsed
                .images
                .iter()
                .find(|i| i.experiment_local_id == e.local_id)
                .and_then(|i| i.path.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            json!({
                "local_id": e.local_id,
                "reference_local_id": e.reference_local_id,
                "image": image,
                "record": e,
            })
        })
        .collect();

    let run_results: Vec<Value> = parsed
        .run_results
        .iter()
        .map(|r| json!({ "experiment_local_id": r.experiment_local_id, "record": r }))
        .collect();

    json!({
        "references": references,
        "experiments": experiments,
        "run_results": run_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::fixtures::{Fixture, write_workbook};

    #[test]
    fn test_dry_run_view() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path(), Fixture::default());
        let parsed = import::read_workbook(&path, scratch.path()).unwrap();

        let view = dry_run_view(&parsed);

        assert_eq!(view["references"].as_array().unwrap().len(), 1);
        assert_eq!(view["experiments"][1]["reference_local_id"], json!(1));
        assert_eq!(view["experiments"][1]["image"], json!("2.png"));
        assert!(view["experiments"][0]["record"].get("local_id").is_none());
        assert_eq!(view["run_results"][0]["experiment_local_id"], json!(1));
    }

    #[tokio::test]
    async fn test_upload_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path(), Fixture::default());
        let client = MastClient::new("http://127.0.0.1:9", None);

        let err = handle_upload(&client, &path, false).await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}

//! Upload pipeline
//!
//! Pushes a parsed workbook to the API in dependency order:
//! images, references, experiments, run results. Each stage returns the map
//! from local ids to server values that the next stage needs. Records are
//! sent one at a time; a failed record is logged and skipped, and whatever
//! depended on it is skipped as well.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::api::{Operation, RecordStore, Resource, record_id};
use crate::import::{Experiment, ImageAsset, ParsedWorkbook, Reference, RunResult};

/// Experiment local id -> uploaded file handle
pub type ImageHandles = HashMap<u32, Value>;
/// Reference short name -> server id
pub type ReferenceIds = HashMap<String, i64>;
/// Experiment local id -> server id
pub type ExperimentIds = HashMap<u32, i64>;

/// Counters for the final log line
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub images: usize,
    pub references_created: usize,
    pub references_updated: usize,
    pub experiments: usize,
    pub run_results: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl UploadReport {
    fn log(&self) {
        log::info!(
            "Upload finished: {} images, {} references created, {} updated, {} experiments, {} run results ({} failed, {} skipped)",
            self.images,
            self.references_created,
            self.references_updated,
            self.experiments,
            self.run_results,
            self.failed,
            self.skipped
        );
    }
}

/// Upload every record of a parsed workbook
pub async fn upload_workbook(store: &dyn RecordStore, workbook: &ParsedWorkbook) -> UploadReport {
    let mut report = UploadReport::default();

    let images = upload_images(store, &workbook.images, &mut report).await;
    let reference_ids = upload_references(store, &workbook.references, &mut report).await;
    let experiment_ids = upload_experiments(
        store,
        &workbook.experiments,
        &workbook.references,
        &reference_ids,
        &images,
        &mut report,
    )
    .await;
    upload_run_results(store, &workbook.run_results, &experiment_ids, &mut report).await;

    report.log();
    report
}

/// Stage 1: upload scheme images
pub async fn upload_images(
    store: &dyn RecordStore,
    images: &[ImageAsset],
    report: &mut UploadReport,
) -> ImageHandles {
    let mut handles = ImageHandles::new();

    for image in images {
        let files = [image.path.clone()];
        match store.upload_files(Resource::Files.path(), &files).await {
            Ok(response) => {
                log::info!(
                    "Uploaded image {} for experiment {}",
                    image.path.display(),
                    image.experiment_local_id
                );
                handles.insert(image.experiment_local_id, file_handle(response));
                report.images += 1;
            }
            Err(e) => {
                log::warn!(
                    "Failed to upload image for experiment {}: {:#}",
                    image.experiment_local_id,
                    e
                );
                report.failed += 1;
            }
        }
    }

    handles
}

/// Stage 2: create or update references, keyed by short name
pub async fn upload_references(
    store: &dyn RecordStore,
    references: &[Reference],
    report: &mut UploadReport,
) -> ReferenceIds {
    let mut ids = ReferenceIds::new();

    for reference in references {
        match upsert_reference(store, reference).await {
            Ok((id, created)) => {
                log::info!(
                    "{} reference '{}' (id {})",
                    if created { "Created" } else { "Updated" },
                    reference.reference,
                    id
                );
                if created {
                    report.references_created += 1;
                } else {
                    report.references_updated += 1;
                }
                ids.insert(reference.reference.clone(), id);
            }
            Err(e) => {
                log::warn!("Failed to upload reference '{}': {:#}", reference.reference, e);
                report.failed += 1;
            }
        }
    }

    ids
}

async fn upsert_reference(store: &dyn RecordStore, reference: &Reference) -> anyhow::Result<(i64, bool)> {
    let filter = json!({ "reference": reference.reference });
    let existing = store.list(Resource::References, Some(&filter)).await?;

    // The server filter is not guaranteed to be an exact match
    let existing_id = existing
        .iter()
        .find(|record| record["reference"].as_str() == Some(reference.reference.as_str()))
        .map(record_id)
        .transpose()?;
    let payload = reference.to_payload();

    match existing_id {
        Some(id) => {
            let response = store
                .execute(&Operation::update(Resource::References, id, payload))
                .await?;
            Ok((record_id(&response).unwrap_or(id), false))
        }
        None => {
            let response = store
                .execute(&Operation::create(Resource::References, payload))
                .await?;
            Ok((record_id(&response)?, true))
        }
    }
}

/// Stage 3: create experiments whose reference was uploaded
pub async fn upload_experiments(
    store: &dyn RecordStore,
    experiments: &[Experiment],
    references: &[Reference],
    reference_ids: &ReferenceIds,
    images: &ImageHandles,
    report: &mut UploadReport,
) -> ExperimentIds {
    let names: HashMap<u32, &str> = references
        .iter()
        .map(|r| (r.local_id, r.reference.as_str()))
        .collect();

    let mut ids = ExperimentIds::new();

    for experiment in experiments {
        let reference_id = experiment
            .reference_local_id
            .and_then(|local| names.get(&local))
            .and_then(|name| reference_ids.get(*name));

        let Some(reference_id) = reference_id else {
            log::debug!(
                "Skipping experiment {}: reference '{}' was not uploaded",
                experiment.local_id,
                experiment.reference
            );
            report.skipped += 1;
            continue;
        };

        let payload = experiment.to_payload(*reference_id, images.get(&experiment.local_id));
        let result = store
            .execute(&Operation::create(Resource::Experiments, payload))
            .await
            .and_then(|response| record_id(&response));

        match result {
            Ok(id) => {
                log::info!("Created experiment {} (id {})", experiment.local_id, id);
                ids.insert(experiment.local_id, id);
                report.experiments += 1;
            }
            Err(e) => {
                log::warn!("Failed to create experiment {}: {:#}", experiment.local_id, e);
                report.failed += 1;
            }
        }
    }

    ids
}

/// Stage 4: create run results whose experiment was uploaded
pub async fn upload_run_results(
    store: &dyn RecordStore,
    run_results: &[RunResult],
    experiment_ids: &ExperimentIds,
    report: &mut UploadReport,
) {
    for run in run_results {
        let Some(experiment_id) = experiment_ids.get(&run.experiment_local_id) else {
            log::debug!(
                "Skipping run {} of experiment {}: experiment was not uploaded",
                run.run_id,
                run.experiment_local_id
            );
            report.skipped += 1;
            continue;
        };

        let payload = run.to_payload(*experiment_id);
        match store
            .execute(&Operation::create(Resource::RunResults, payload))
            .await
        {
            Ok(_) => {
                log::info!(
                    "Created run {} of experiment {}",
                    run.run_id,
                    run.experiment_local_id
                );
                report.run_results += 1;
            }
            Err(e) => {
                log::warn!(
                    "Failed to create run {} of experiment {}: {:#}",
                    run.run_id,
                    run.experiment_local_id,
                    e
                );
                report.failed += 1;
            }
        }
    }
}

/// The files endpoint answers with the list of stored files
fn file_handle(response: Value) -> Value {
    match response {
        Value::Array(mut files) if !files.is_empty() => files.swap_remove(0),
        other => other,
    }
}

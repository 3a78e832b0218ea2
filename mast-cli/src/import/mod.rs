//! Workbook import
//!
//! Turns an experiment workbook into the record collections uploaded to the
//! API. The `Summary` sheet drives everything: its rows become experiments,
//! the reference columns are deduplicated into references, and each experiment
//! pulls its runs from the `B{id}` sheet of the same local id.

pub mod cells;
pub mod images;
pub mod references;
pub mod resolver;
pub mod runs;
pub mod summary;
pub mod types;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Reader, Xlsx, open_workbook};

pub use types::{Experiment, ImageAsset, ParsedWorkbook, Reference, RunResult};

use references::REFERENCES_SHEET;
use summary::SUMMARY_SHEET;

/// Read and normalize a whole workbook
///
/// Scheme images are written into `scratch_dir`, which must outlive the
/// returned assets. A missing `Summary` or `References` sheet, or a missing
/// required column, aborts the import; problems with a single `B{id}` sheet or with the images
/// only lose that part of the data.
pub fn read_workbook(path: &Path, scratch_dir: &Path) -> Result<ParsedWorkbook> {
    log::info!("Reading workbook {}", path.display());

    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;
    let sheet_names: HashSet<String> = workbook.sheet_names().into_iter().collect();

    if !sheet_names.contains(SUMMARY_SHEET) {
        bail!("Workbook has no '{}' sheet", SUMMARY_SHEET);
    }
    let summary_range = workbook
        .worksheet_range(SUMMARY_SHEET)
        .with_context(|| format!("Failed to read sheet: {}", SUMMARY_SHEET))?;
    let rows = summary::read_summary(&summary_range)?;

    if !sheet_names.contains(REFERENCES_SHEET) {
        bail!("Workbook has no '{}' sheet", REFERENCES_SHEET);
    }
    let references_range = workbook
        .worksheet_range(REFERENCES_SHEET)
        .with_context(|| format!("Failed to read sheet: {}", REFERENCES_SHEET))?;
    let citations = references::read_full_references(&references_range)?;

    let (references, experiments) = resolver::link_references(rows, &citations);

    let mut run_results = Vec::new();
    for experiment in &experiments {
        let sheet_name = runs::run_sheet_name(experiment.local_id);
        if !sheet_names.contains(&sheet_name) {
            log::warn!(
                "Experiment {}: sheet '{}' not found, no run results",
                experiment.local_id,
                sheet_name
            );
            continue;
        }

        let parsed = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))
            .and_then(|range| runs::read_run_results(&range, experiment.local_id));

        match parsed {
            Ok(found) => run_results.extend(found),
            Err(e) => log::warn!("Experiment {}: {:#}", experiment.local_id, e),
        }
    }
    log::info!("Read {} run results", run_results.len());

    let images = match images::extract_images(path, SUMMARY_SHEET, &experiments, scratch_dir) {
        Ok(images) => images,
        Err(e) => {
            log::warn!("Image extraction failed, continuing without images: {:#}", e);
            Vec::new()
        }
    };

    Ok(ParsedWorkbook {
        references,
        experiments,
        run_results,
        images,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::{Fixture, PIXEL_PNG, write_workbook};
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_read_workbook_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path(), Fixture::default());

        let parsed = read_workbook(&path, scratch.path()).unwrap();

        assert_eq!(parsed.references.len(), 1);
        let reference = &parsed.references[0];
        assert_eq!(reference.local_id, 1);
        assert_eq!(reference.reference, "Smith 2019");
        assert_eq!(reference.corresponding_author_name.as_deref(), Some("John Smith"));
        assert_eq!(
            reference.corresponding_author_email.as_deref(),
            Some("john.smith@example.org")
        );
        assert_eq!(reference.request_data_available.as_deref(), Some("Upon request"));
        assert_eq!(
            reference.full_references,
            vec!["Smith J. (2019) Shaking a stone house. Eng Struct."]
        );

        assert_eq!(parsed.experiments.len(), 2);
        assert!(parsed.experiments.iter().all(|e| e.reference_local_id == Some(1)));
        assert!(!parsed.experiments[0].retrofitted);
        assert!(parsed.experiments[1].retrofitted);
        assert_eq!(
            parsed.experiments[0].applied_excitation_directions,
            Some(vec!["X".to_string(), "Y".to_string()])
        );

        assert_eq!(parsed.run_results.len(), 2);
        assert_eq!(parsed.run_results[0].experiment_local_id, 1);
        assert_eq!(parsed.run_results[1].experiment_local_id, 2);
        assert_eq!(parsed.run_results[0].to_payload(10)["run_id"], json!(1));
    }

    #[test]
    fn test_read_workbook_extracts_images_by_local_id() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path(), Fixture::default());

        let parsed = read_workbook(&path, scratch.path()).unwrap();

        let names: Vec<String> = parsed
            .images
            .iter()
            .map(|i| i.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.png", "2.png"]);
        assert_eq!(parsed.images[1].experiment_local_id, 2);
        assert_eq!(std::fs::read(&parsed.images[0].path).unwrap(), PIXEL_PNG);
    }

    #[test]
    fn test_workbook_without_images() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let fixture = Fixture {
            with_images: false,
            ..Default::default()
        };
        let path = write_workbook(dir.path(), fixture);

        let parsed = read_workbook(&path, scratch.path()).unwrap();
        assert!(parsed.images.is_empty());
        assert_eq!(parsed.experiments.len(), 2);
    }

    #[test]
    fn test_missing_run_sheet_only_loses_its_runs() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let fixture = Fixture {
            with_second_run_sheet: false,
            ..Default::default()
        };
        let path = write_workbook(dir.path(), fixture);

        let parsed = read_workbook(&path, scratch.path()).unwrap();
        assert_eq!(parsed.experiments.len(), 2);
        assert_eq!(parsed.run_results.len(), 1);
        assert_eq!(parsed.run_results[0].experiment_local_id, 1);
    }

    #[test]
    fn test_missing_summary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let fixture = Fixture {
            with_summary: false,
            ..Default::default()
        };
        let path = write_workbook(dir.path(), fixture);

        let err = read_workbook(&path, scratch.path()).unwrap_err();
        assert!(err.to_string().contains("Summary"));
    }

    #[test]
    fn test_missing_references_sheet_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let fixture = Fixture {
            with_references: false,
            ..Default::default()
        };
        let path = write_workbook(dir.path(), fixture);

        let err = read_workbook(&path, scratch.path()).unwrap_err();
        assert!(err.to_string().contains("References"));
    }

    #[test]
    fn test_repeated_building_number_reads_its_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let fixture = Fixture {
            repeat_first_id: true,
            ..Default::default()
        };
        let path = write_workbook(dir.path(), fixture);

        let parsed = read_workbook(&path, scratch.path()).unwrap();

        assert_eq!(parsed.experiments.len(), 1);
        assert_eq!(parsed.experiments[0].description.as_deref(), Some("Two-storey building 1"));
        assert_eq!(parsed.run_results.len(), 1);
        assert_eq!(parsed.run_results[0].experiment_local_id, 1);
        assert_eq!(parsed.images.len(), 1);
    }
}

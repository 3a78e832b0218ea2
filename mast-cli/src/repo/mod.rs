//! Experiment file repositories
//!
//! A repository is a folder of measured data files (crack maps, time
//! histories, 3D model) attached to one experiment. It follows a fixed
//! template and is uploaded to the API as a single zip archive.

pub mod archive;
pub mod layout;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

pub use layout::{ExperimentInfo, Validation};

/// A repository ready for upload
#[derive(Debug)]
pub struct Package {
    /// Archive to send
    pub archive: PathBuf,
    /// Validation of the archive content
    pub validation: Validation,
}

/// Validate a repository folder or zip and produce the archive to upload
///
/// A folder is zipped into `scratch`. A zip is unpacked into `scratch` for
/// validation and uploaded as is.
pub fn package(source: &Path, run_ids: &[String], scratch: &Path) -> Result<Package> {
    if archive::is_zip(source) {
        let unpacked = scratch.join("unpacked");
        archive::unzip(source, &unpacked)?;
        return Ok(Package {
            archive: source.to_path_buf(),
            validation: layout::validate(&unpacked, run_ids),
        });
    }

    if !source.is_dir() {
        bail!("{} is neither a folder nor a zip archive", source.display());
    }

    let validation = layout::validate(source, run_ids);
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("repository");
    let archive_path = scratch.join(format!("{}.zip", name));
    archive::zip_folder(source, &archive_path)?;

    Ok(Package {
        archive: archive_path,
        validation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn run_ids() -> Vec<String> {
        vec!["1".to_string()]
    }

    fn template(root: &Path) {
        let generated_on = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let info = ExperimentInfo {
            id: 1,
            run_ids: run_ids(),
            ..Default::default()
        };
        layout::generate(root, Some(&info), generated_on).unwrap();
    }

    #[test]
    fn test_package_folder() {
        let work = tempfile::tempdir().unwrap();
        let repo = work.path().join("B1");
        template(&repo);
        let scratch = tempfile::tempdir().unwrap();

        let package = package(&repo, &run_ids(), scratch.path()).unwrap();

        assert_eq!(package.archive, scratch.path().join("B1.zip"));
        assert!(package.archive.is_file());
        assert!(package.validation.is_valid());
    }

    #[test]
    fn test_package_zip_is_validated_and_kept() {
        let work = tempfile::tempdir().unwrap();
        let repo = work.path().join("B1");
        template(&repo);
        std::fs::remove_file(repo.join("Crack maps/1.png")).unwrap();
        let zip_path = work.path().join("B1.zip");
        archive::zip_folder(&repo, &zip_path).unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let package = package(&zip_path, &run_ids(), scratch.path()).unwrap();

        assert_eq!(package.archive, zip_path);
        assert_eq!(package.validation.errors.len(), 1);
        assert!(scratch.path().join("unpacked/README.md").is_file());
    }

    #[test]
    fn test_package_rejects_missing_source() {
        let scratch = tempfile::tempdir().unwrap();
        assert!(package(&scratch.path().join("nope"), &[], scratch.path()).is_err());
    }
}

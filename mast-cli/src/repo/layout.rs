//! Folder template of an experiment file repository

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde_json::{Number, Value};

pub const README_FILE: &str = "README.md";

/// Runs that exist in the database but have no data files
const EXCLUDED_RUN_IDS: &[&str] = &["Initial", "Final"];
/// Run ids used when generating a template without an experiment
const PLACEHOLDER_RUN_IDS: &[&str] = &["1", "2", "3"];

/// Expected content of a template folder
#[derive(Debug, Clone, Copy)]
enum Content {
    /// Fixed file names
    Files(&'static [&'static str]),
    /// One file per run id with this extension
    PerRun(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Folder {
    name: &'static str,
    content: Content,
}

const FOLDERS: &[Folder] = &[
    Folder {
        name: "3D model",
        content: Content::Files(&["main.vtk"]),
    },
    Folder {
        name: "Period and DG evolution",
        content: Content::Files(&["Period_evolution.png", "DG_evolution.png"]),
    },
    Folder {
        name: "Crack maps",
        content: Content::PerRun("png"),
    },
    Folder {
        name: "Global force-displacement curve",
        content: Content::PerRun("txt"),
    },
    Folder {
        name: "Shake-table accelerations",
        content: Content::PerRun("txt"),
    },
    Folder {
        name: "Top displacement histories",
        content: Content::PerRun("txt"),
    },
];

impl Folder {
    fn file_names(&self, run_ids: &[String]) -> Vec<String> {
        match self.content {
            Content::Files(names) => names.iter().map(|n| n.to_string()).collect(),
            Content::PerRun(ext) => run_ids.iter().map(|id| format!("{}.{}", id, ext)).collect(),
        }
    }
}

/// What the repository is generated or validated against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentInfo {
    pub id: i64,
    pub experiment_id: Option<String>,
    pub description: Option<String>,
    pub run_ids: Vec<String>,
}

impl ExperimentInfo {
    /// Build from an experiment record and its run result records
    pub fn from_records(id: i64, experiment: &Value, run_results: &[Value]) -> Self {
        let text = |field: &str| {
            experiment
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        Self {
            id,
            experiment_id: text("experiment_id"),
            description: text("description"),
            run_ids: data_run_ids(run_results),
        }
    }
}

/// Run ids of the records that carry data files
pub fn data_run_ids(run_results: &[Value]) -> Vec<String> {
    run_results
        .iter()
        .filter_map(|record| match record.get("run_id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(run_id_text(n)),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .filter(|id| !EXCLUDED_RUN_IDS.contains(&id.as_str()))
        .collect()
}

/// Whole floats lose their fraction so that `1.0` names `1.png`
fn run_id_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Create the template folders and empty files under `root`
///
/// Existing files are never overwritten. Returns the files that were created.
pub fn generate(
    root: &Path,
    experiment: Option<&ExperimentInfo>,
    generated_on: NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    let run_ids: Vec<String> = match experiment {
        Some(info) => info.run_ids.clone(),
        None => PLACEHOLDER_RUN_IDS.iter().map(|s| s.to_string()).collect(),
    };

    let mut created = Vec::new();

    for folder in FOLDERS {
        let dir = root.join(folder.name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create folder: {}", dir.display()))?;

        for name in folder.file_names(&run_ids) {
            let path = dir.join(name);
            if write_new(&path, "")? {
                created.push(path);
            }
        }
    }

    let readme_path = root.join(README_FILE);
    if write_new(&readme_path, &readme(experiment, generated_on))? {
        created.push(readme_path);
    }

    log::info!("Created {} files in {}", created.len(), root.display());
    Ok(created)
}

fn write_new(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        log::debug!("Keeping existing {}", path.display());
        return Ok(false);
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// README content of a generated repository
pub fn readme(experiment: Option<&ExperimentInfo>, generated_on: NaiveDateTime) -> String {
    let mut out = String::new();

    match experiment {
        Some(info) => {
            let title = info
                .experiment_id
                .clone()
                .unwrap_or_else(|| info.id.to_string());
            out.push_str(&format!("# {}\n", title));
            if let Some(description) = &info.description {
                out.push_str(&format!("\n{}\n", description));
            }
        }
        None => {
            out.push_str("# _experiment_id_\n");
            out.push_str("\n_experiment_description_\n");
        }
    }

    out.push_str(&format!(
        "\n## Generated on {}\n",
        generated_on.format("%Y-%m-%d %H:%M:%S")
    ));
    out
}

/// Outcome of checking a folder against the template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Missing optional parts (absent folders, no README)
    pub warnings: Vec<String>,
    /// Folders that exist but lack an expected file
    pub errors: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a repository folder against the template
///
/// Per-run files are only expected for the given run ids, so a folder
/// validated without an experiment only checks the fixed files.
pub fn validate(root: &Path, run_ids: &[String]) -> Validation {
    let mut validation = Validation::default();

    for folder in FOLDERS {
        let dir = root.join(folder.name);
        if !dir.is_dir() {
            validation
                .warnings
                .push(format!("'{}' folder does not exist", folder.name));
            continue;
        }

        for name in folder.file_names(run_ids) {
            if !dir.join(&name).is_file() {
                validation.errors.push(format!(
                    "'{}' folder exists but does not contain the {} file",
                    folder.name, name
                ));
            }
        }
    }

    if !root.join(README_FILE).is_file() {
        validation
            .warnings
            .push(format!("{} file does not exist", README_FILE));
    }

    log::debug!(
        "Validated {}: {} warnings, {} errors",
        root.display(),
        validation.warnings.len(),
        validation.errors.len()
    );
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generate_placeholder_template() {
        let dir = tempfile::tempdir().unwrap();

        let created = generate(dir.path(), None, timestamp()).unwrap();

        // main.vtk, 2 evolution plots, 4 per-run folders x 3 runs, README
        assert_eq!(created.len(), 1 + 2 + 12 + 1);
        assert!(dir.path().join("Crack maps/3.png").is_file());
        assert!(dir.path().join("Top displacement histories/1.txt").is_file());

        let readme = fs::read_to_string(dir.path().join(README_FILE)).unwrap();
        assert_eq!(
            readme,
            "# _experiment_id_\n\n_experiment_description_\n\n## Generated on 2024-03-01 09:30:00\n"
        );
    }

    #[test]
    fn test_generate_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("3D model")).unwrap();
        fs::write(dir.path().join("3D model/main.vtk"), "mesh").unwrap();
        fs::write(dir.path().join(README_FILE), "# Mine\n").unwrap();

        let created = generate(dir.path(), None, timestamp()).unwrap();

        assert_eq!(created.len(), 2 + 12);
        assert_eq!(fs::read_to_string(dir.path().join("3D model/main.vtk")).unwrap(), "mesh");
        assert_eq!(fs::read_to_string(dir.path().join(README_FILE)).unwrap(), "# Mine\n");
    }

    #[test]
    fn test_generate_for_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let info = ExperimentInfo {
            id: 12,
            experiment_id: None,
            description: Some("Stone masonry house".to_string()),
            run_ids: ids(&["1", "2b"]),
        };

        generate(dir.path(), Some(&info), timestamp()).unwrap();

        assert!(dir.path().join("Shake-table accelerations/2b.txt").is_file());
        assert!(!dir.path().join("Shake-table accelerations/3.txt").exists());
        let readme = fs::read_to_string(dir.path().join(README_FILE)).unwrap();
        assert!(readme.starts_with("# 12\n\nStone masonry house\n"));
    }

    #[test]
    fn test_validate_generated_template() {
        let dir = tempfile::tempdir().unwrap();
        generate(dir.path(), None, timestamp()).unwrap();

        let validation = validate(dir.path(), &ids(&["1", "2", "3"]));
        assert!(validation.is_valid());
        assert!(validation.warnings.is_empty());
    }

    #[test]
    fn test_validate_reports_warnings_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Crack maps")).unwrap();
        fs::write(dir.path().join("Crack maps/1.png"), "").unwrap();
        fs::create_dir_all(dir.path().join("3D model")).unwrap();

        let validation = validate(dir.path(), &ids(&["1", "2"]));

        assert_eq!(
            validation.errors,
            vec![
                "'3D model' folder exists but does not contain the main.vtk file",
                "'Crack maps' folder exists but does not contain the 2.png file",
            ]
        );
        assert_eq!(validation.warnings.len(), 5);
        assert!(validation.warnings.contains(&"README.md file does not exist".to_string()));
        assert!(!validation.is_valid());
    }

    #[test]
    fn test_data_run_ids() {
        let records = vec![
            json!({"run_id": "Initial"}),
            json!({"run_id": 1}),
            json!({"run_id": "2b"}),
            json!({"run_id": "Final"}),
            json!({"id": 9}),
        ];
        assert_eq!(data_run_ids(&records), ids(&["1", "2b"]));
    }

    #[test]
    fn test_float_run_ids_name_files_without_fraction() {
        let records = vec![json!({"run_id": 3.0}), json!({"run_id": 4.5})];
        assert_eq!(data_run_ids(&records), ids(&["3", "4.5"]));
    }

    #[test]
    fn test_experiment_info_from_records() {
        let info = ExperimentInfo::from_records(
            4,
            &json!({"experiment_id": "TUM-01", "description": ""}),
            &[json!({"run_id": 1})],
        );
        assert_eq!(info.experiment_id.as_deref(), Some("TUM-01"));
        assert_eq!(info.description, None);
        assert_eq!(info.run_ids, ids(&["1"]));
    }
}

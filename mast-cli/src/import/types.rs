//! Record types produced by the workbook import
//!
//! Local identifiers (`local_id`, `experiment_local_id`, `reference_local_id`)
//! only link rows within one parse pass. They are skipped on serialization so
//! they can never reach the server; the upload stage injects server ids instead.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One building specimen test campaign, parsed from a `Summary` row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Experiment {
    /// "Building #" of the row, names the `B{id}` sheet
    #[serde(skip)]
    pub local_id: u32,
    /// 0-based sheet row the experiment was read from
    #[serde(skip)]
    pub sheet_row: u32,
    /// Short reference name as written in the summary
    #[serde(skip)]
    pub reference: String,
    /// Local reference id, set by the resolver
    #[serde(skip)]
    pub reference_local_id: Option<u32>,

    pub description: Option<String>,
    pub experiment_id: Option<String>,
    pub test_scale: Option<String>,
    pub simultaneous_excitations_nb: Option<Number>,
    pub applied_excitation_directions: Option<Vec<String>>,
    pub storeys_nb: Option<Number>,
    pub total_building_height: Option<Number>,
    pub diaphragm_material: Option<String>,
    pub roof_material_geometry: Option<String>,
    pub masonry_unit_type: Option<String>,
    pub masonry_unit_material: Option<String>,
    pub mortar_type: Option<String>,
    pub masonry_compressive_strength: Option<Number>,
    pub masonry_wall_thickness: Option<Vec<String>>,
    pub wall_leaves_nb: Option<Number>,
    pub internal_walls: bool,
    pub mechanical_connectors: Option<String>,
    pub connectors_activation: Option<String>,
    pub retrofitted: bool,
    pub retrofitting_application: Option<String>,
    pub retrofitting_type: Option<Vec<String>>,
    pub first_estimated_fundamental_period: Option<Number>,
    pub last_estimated_fundamental_period: Option<Number>,
    pub max_horizontal_pga: Option<Number>,
    pub max_estimated_dg: Option<Number>,
    pub material_characterizations: Option<Vec<String>>,
    pub associated_test_types: Option<Vec<String>>,
    pub material_characterization_refs: Option<Vec<String>>,
    pub experimental_results_reported: Option<Vec<String>>,
    pub open_measured_data: bool,
    pub link_to_open_measured_data: Option<String>,
    pub digitalized_data: bool,
    pub crack_types_observed: Option<Vec<String>>,
    pub experimental_campaign_motivation: Option<String>,
}

impl Experiment {
    /// Build the JSON body for `POST /experiments`
    pub fn to_payload(&self, reference_id: i64, scheme: Option<&Value>) -> Value {
        let mut payload = to_object(self);
        payload.insert("reference_id".to_string(), Value::from(reference_id));
        if let Some(scheme) = scheme {
            payload.insert("scheme".to_string(), scheme.clone());
        }
        Value::Object(payload)
    }
}

/// Reference-related columns of a summary row, before deduplication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceFields {
    pub reference: String,
    pub publication_year: Option<Number>,
    pub link_to_experimental_paper: Option<String>,
    pub corresponding_author_name: Option<String>,
    pub corresponding_author_email: Option<String>,
    pub request_data: Option<String>,
}

/// A citable publication backing one or more experiments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reference {
    /// Sequential id in first-seen order, starting at 1
    #[serde(skip)]
    pub local_id: u32,
    /// Short name, unique within one workbook
    pub reference: String,
    pub publication_year: Option<Number>,
    pub link_to_experimental_paper: Option<String>,
    pub corresponding_author_name: Option<String>,
    pub corresponding_author_email: Option<String>,
    pub request_data_available: Option<String>,
    pub link_to_request_data: Option<String>,
    /// Full citations from the `References` sheet, deduplicated
    #[serde(skip)]
    pub full_references: Vec<String>,
}

impl Reference {
    /// Build the JSON body for `POST/PUT /references`
    ///
    /// Several distinct citations for the same short name are joined with a
    /// blank line.
    pub fn to_payload(&self) -> Value {
        let mut payload = to_object(self);
        let full_reference = if self.full_references.is_empty() {
            Value::Null
        } else {
            Value::String(self.full_references.join("\n\n"))
        };
        payload.insert("full_reference".to_string(), full_reference);
        Value::Object(payload)
    }
}

/// Run identifier, either a label ("Initial") or a run number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunId {
    Number(Number),
    Text(String),
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunId::Number(n) => write!(f, "{}", n),
            RunId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One shake-table run, parsed from a `B{id}` sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// Local id of the owning experiment
    #[serde(skip)]
    pub experiment_local_id: u32,
    pub run_id: RunId,
    pub nominal_pga_x: Value,
    pub nominal_pga_y: Value,
    pub nominal_pga_z: Value,
    pub actual_pga_x: Value,
    pub actual_pga_y: Value,
    pub actual_pga_z: Value,
    pub reported_t1_x: Option<Number>,
    pub reported_t1_y: Option<Number>,
    pub reported_dg: Value,
    pub derived_dg: Value,
    pub max_drift_x: Value,
    pub max_drift_y: Value,
    pub max_base_shear_x: Value,
    pub max_base_shear_y: Value,
}

impl RunResult {
    /// Build the JSON body for `POST /run_results`
    pub fn to_payload(&self, experiment_id: i64) -> Value {
        let mut payload = to_object(self);
        payload.insert("experiment_id".to_string(), Value::from(experiment_id));
        Value::Object(payload)
    }
}

/// An image exported from the summary sheet for one experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub experiment_local_id: u32,
    pub path: PathBuf,
}

/// Everything read from one workbook, ready for upload
#[derive(Debug, Clone, Default)]
pub struct ParsedWorkbook {
    pub references: Vec<Reference>,
    pub experiments: Vec<Experiment>,
    pub run_results: Vec<RunResult>,
    pub images: Vec<ImageAsset>,
}

fn to_object<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_experiment_payload_hides_local_ids() {
        let experiment = Experiment {
            local_id: 4,
            sheet_row: 4,
            reference: "Smith 2019".to_string(),
            reference_local_id: Some(1),
            description: Some("Two-storey house".to_string()),
            retrofitted: true,
            ..Default::default()
        };

        let payload = experiment.to_payload(42, Some(&json!({"id": "abc", "name": "4.png"})));

        assert_eq!(payload["reference_id"], json!(42));
        assert_eq!(payload["scheme"]["name"], json!("4.png"));
        assert_eq!(payload["description"], json!("Two-storey house"));
        assert_eq!(payload["retrofitted"], json!(true));
        assert!(payload.get("local_id").is_none());
        assert!(payload.get("reference").is_none());
        assert!(payload.get("reference_local_id").is_none());
    }

    #[test]
    fn test_reference_payload_joins_full_references() {
        let reference = Reference {
            local_id: 1,
            reference: "Smith 2019".to_string(),
            full_references: vec!["Smith J. (2019) A".to_string(), "Smith J. (2019) B".to_string()],
            ..Default::default()
        };

        let payload = reference.to_payload();
        assert_eq!(payload["full_reference"], json!("Smith J. (2019) A\n\nSmith J. (2019) B"));
        assert!(payload.get("local_id").is_none());
        assert!(payload.get("full_references").is_none());

        let empty = Reference::default().to_payload();
        assert_eq!(empty["full_reference"], Value::Null);
    }

    #[test]
    fn test_run_id_serialization() {
        assert_eq!(serde_json::to_value(RunId::Number(Number::from(3))).unwrap(), json!(3));
        assert_eq!(
            serde_json::to_value(RunId::Text("Initial".to_string())).unwrap(),
            json!("Initial")
        );
        assert_eq!(RunId::Number(Number::from(12)).to_string(), "12");
    }
}

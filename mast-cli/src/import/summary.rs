//! Read experiments from the `Summary` sheet
//!
//! The sheet holds one experiment per row below a single header row. The table
//! ends at the first completely empty row; anything below it (notes, legends)
//! is ignored.

use std::collections::HashMap;

use anyhow::{Result, bail};
use calamine::{Data, Range};

use super::cells;
use super::types::{Experiment, ReferenceFields};

pub const SUMMARY_SHEET: &str = "Summary";

/// Column whose drawings hold the experiment scheme image (column B)
pub const SCHEME_COLUMN: u32 = 1;

/// Header labels of the summary sheet and the field each one feeds
const COLUMNS: &[(&str, &str)] = &[
    ("Building #", "id"),
    ("Scheme", "scheme"),
    ("Reference", "reference"),
    ("Publication year", "publication_year"),
    ("Short description", "description"),
    ("Experiment ID", "experiment_id"),
    ("Scale of test", "test_scale"),
    ("Number of simultaneous excitations", "simultaneous_excitations_nb"),
    ("Directions of applied excitations", "applied_excitation_directions"),
    ("Number of test runs", "run_results_nb"),
    ("Number of storeys", "storeys_nb"),
    ("Total building height", "total_building_height"),
    ("Diaphragm material", "diaphragm_material"),
    ("Roof material and geometry", "roof_material_geometry"),
    ("Type of masonry unit", "masonry_unit_type"),
    ("Masonry unit material", "masonry_unit_material"),
    ("Mortar type", "mortar_type"),
    ("Compressive strength of masonry", "masonry_compressive_strength"),
    ("Masonry walls thickness", "masonry_wall_thickness"),
    ("Number of wall leaves", "wall_leaves_nb"),
    ("Internal walls", "internal_walls"),
    ("Mechanical connectors present", "mechanical_connectors"),
    ("Activation of connectors", "connectors_activation"),
    ("Retrofitted", "retrofitted"),
    ("Application of retrofitting", "retrofitting_application"),
    ("Type of retrofitting", "retrofitting_type"),
    ("First estimated fundamental period", "first_estimated_fundamental_period"),
    ("Last estimated fundamental period", "last_estimated_fundamental_period"),
    ("Maximum horizontal PGA", "max_horizontal_pga"),
    ("Maximum estimated DG", "max_estimated_dg"),
    ("Material characterization available", "material_characterizations"),
    ("Associated type of test", "associated_test_types"),
    ("Reference for material characterization", "material_characterization_refs"),
    ("Experimental results reported", "experimental_results_reported"),
    ("Measured data openly available as digital files", "open_measured_data"),
    ("Link to request data", "link_to_request_data"),
    ("Digitalized data available", "digitalized_data"),
    ("Types of cracks observed", "crack_types_observed"),
    ("Motivation of the experimental campaign", "experimental_campaign_motivation"),
    ("Link to experimental paper", "link_to_experimental_paper"),
    ("Corresponding author", "corresponding_author"),
];

/// Fields without which a summary row cannot be linked to anything
const REQUIRED_FIELDS: &[&str] = &["id", "reference"];

/// An experiment together with the reference columns of its row
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub experiment: Experiment,
    pub reference: ReferenceFields,
}

/// Field name -> column index within the range
struct ColumnMap {
    columns: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn from_header(header: &[Data]) -> Result<Self> {
        let mut columns = HashMap::new();

        for (idx, cell) in header.iter().enumerate() {
            let Some(label) = cells::display(cell) else {
                continue;
            };
            if let Some((_, field)) = COLUMNS.iter().find(|(h, _)| *h == label) {
                columns.entry(*field).or_insert(idx);
            } else {
                log::debug!("Ignoring unknown summary column '{}'", label);
            }
        }

        for required in REQUIRED_FIELDS {
            if !columns.contains_key(required) {
                let label = COLUMNS
                    .iter()
                    .find(|(_, f)| f == required)
                    .map(|(h, _)| *h)
                    .unwrap_or(*required);
                bail!("Sheet '{}' has no '{}' column", SUMMARY_SHEET, label);
            }
        }

        for (label, field) in COLUMNS {
            if !columns.contains_key(field) {
                log::warn!("Sheet '{}' has no '{}' column, values will be empty", SUMMARY_SHEET, label);
            }
        }

        Ok(Self { columns })
    }

    fn cell<'a>(&self, row: &'a [Data], field: &str) -> &'a Data {
        self.columns
            .get(field)
            .and_then(|idx| row.get(*idx))
            .unwrap_or(&cells::EMPTY)
    }
}

/// Read all experiment rows of the summary sheet
///
/// The first row of the used range is the header. Reading stops at the first
/// row where every cell is blank.
pub fn read_summary(range: &Range<Data>) -> Result<Vec<SummaryRow>> {
    let Some((start_row, _)) = range.start() else {
        bail!("Sheet '{}' is empty", SUMMARY_SHEET);
    };

    let mut rows = range.rows();
    let header = rows.next().unwrap_or(&[]);
    let columns = ColumnMap::from_header(header)?;

    let mut summary = Vec::new();

    for (offset, row) in rows.enumerate() {
        if cells::is_blank_row(row) {
            log::debug!(
                "Blank row {} in '{}', end of experiment table",
                start_row as usize + offset + 2,
                SUMMARY_SHEET
            );
            break;
        }

        let position = summary.len() as u32 + 1;
        let sheet_row = start_row + 1 + offset as u32;
        summary.push(parse_row(&columns, row, position, sheet_row));
    }

    log::info!("Read {} experiments from '{}'", summary.len(), SUMMARY_SHEET);
    Ok(summary)
}

fn parse_row(columns: &ColumnMap, row: &[Data], position: u32, sheet_row: u32) -> SummaryRow {
    let cell = |field: &str| columns.cell(row, field);

    let local_id = cells::integer(cell("id")).unwrap_or_else(|| {
        log::warn!(
            "Row {} of '{}' has no usable 'Building #', using position {}",
            sheet_row + 1,
            SUMMARY_SHEET,
            position
        );
        position
    });

    let (author_name, author_email) = split_author(cell("corresponding_author"));

    let open_measured_data = cell("open_measured_data");
    let link_to_open_measured_data = cells::display(open_measured_data).filter(|s| is_url(s));

    let reference_name = cells::display(cell("reference")).unwrap_or_default();
    if reference_name.is_empty() {
        log::warn!("Experiment {} has no reference", local_id);
    }

    let experiment = Experiment {
        local_id,
        sheet_row,
        reference: reference_name.clone(),
        reference_local_id: None,
        description: cells::display(cell("description")),
        experiment_id: cells::display(cell("experiment_id")),
        test_scale: cells::display(cell("test_scale")),
        simultaneous_excitations_nb: cells::number(cell("simultaneous_excitations_nb")),
        applied_excitation_directions: cells::list(cell("applied_excitation_directions")),
        storeys_nb: cells::number(cell("storeys_nb")),
        total_building_height: cells::number(cell("total_building_height")),
        diaphragm_material: cells::display(cell("diaphragm_material")),
        roof_material_geometry: cells::display(cell("roof_material_geometry")),
        masonry_unit_type: cells::display(cell("masonry_unit_type")),
        masonry_unit_material: cells::display(cell("masonry_unit_material")),
        mortar_type: cells::display(cell("mortar_type")),
        masonry_compressive_strength: cells::number(cell("masonry_compressive_strength")),
        masonry_wall_thickness: cells::list(cell("masonry_wall_thickness")),
        wall_leaves_nb: cells::number(cell("wall_leaves_nb")),
        internal_walls: cells::yes_no(cell("internal_walls")),
        mechanical_connectors: cells::display(cell("mechanical_connectors")),
        connectors_activation: cells::display(cell("connectors_activation")),
        retrofitted: cells::yes_no(cell("retrofitted")),
        retrofitting_application: cells::display(cell("retrofitting_application")),
        retrofitting_type: cells::list(cell("retrofitting_type")),
        first_estimated_fundamental_period: cells::number(cell("first_estimated_fundamental_period")),
        last_estimated_fundamental_period: cells::number(cell("last_estimated_fundamental_period")),
        max_horizontal_pga: cells::number(cell("max_horizontal_pga")),
        max_estimated_dg: cells::number(cell("max_estimated_dg")),
        material_characterizations: cells::list(cell("material_characterizations")),
        associated_test_types: cells::list(cell("associated_test_types")),
        material_characterization_refs: cells::list(cell("material_characterization_refs")),
        experimental_results_reported: cells::list(cell("experimental_results_reported")),
        open_measured_data: cells::yes_no(open_measured_data),
        link_to_open_measured_data,
        digitalized_data: cells::yes_no(cell("digitalized_data")),
        crack_types_observed: cells::list(cell("crack_types_observed")),
        experimental_campaign_motivation: cells::text(cell("experimental_campaign_motivation")),
    };

    let reference = ReferenceFields {
        reference: reference_name,
        publication_year: cells::number(cell("publication_year")),
        link_to_experimental_paper: cells::display(cell("link_to_experimental_paper")),
        corresponding_author_name: author_name,
        corresponding_author_email: author_email,
        request_data: cells::display(cell("link_to_request_data")),
    };

    SummaryRow {
        experiment,
        reference,
    }
}

/// Split "Name\nemail" on the last newline
fn split_author(cell: &Data) -> (Option<String>, Option<String>) {
    let Some(combined) = cells::display(cell) else {
        return (None, None);
    };

    match combined.rsplit_once('\n') {
        Some((name, email)) => (non_empty(name), non_empty(email)),
        None => (non_empty(&combined), None),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

pub fn is_url(s: &str) -> bool {
    s.starts_with("http")
}

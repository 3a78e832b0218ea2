//! Read run results from the per-experiment `B{id}` sheets

use std::collections::HashMap;

use anyhow::{Result, bail};
use calamine::{Data, Range};

use super::cells;
use super::types::{RunId, RunResult};

/// 0-based row holding the header
const HEADER_ROW: u32 = 1;
/// Columns A:O
const FIRST_COLUMN: u32 = 0;
const LAST_COLUMN: u32 = 14;

/// Marks a run that was planned but not performed
const SKIPPED_RUN: &str = "-";

const COLUMNS: &[(&str, &str)] = &[
    ("Run ID", "run_id"),
    ("Nominal PGA X", "nominal_pga_x"),
    ("Nominal PGA Y", "nominal_pga_y"),
    ("Nominal PGA Z", "nominal_pga_z"),
    ("Actual PGA X", "actual_pga_x"),
    ("Actual PGA Y", "actual_pga_y"),
    ("Actual PGA Z", "actual_pga_z"),
    ("Reported fundamental period X", "reported_t1_x"),
    ("Reported fundamental period Y", "reported_t1_y"),
    ("Reported DG", "reported_dg"),
    ("Derived DG", "derived_dg"),
    ("Maximum drift X", "max_drift_x"),
    ("Maximum drift Y", "max_drift_y"),
    ("Maximum base shear X", "max_base_shear_x"),
    ("Maximum base shear Y", "max_base_shear_y"),
];

/// Name of the sheet holding the runs of an experiment
pub fn run_sheet_name(experiment_local_id: u32) -> String {
    format!("B{}", experiment_local_id)
}

/// Read the run results of one experiment sheet
///
/// Rows without a run id, or with the `-` placeholder, are dropped.
pub fn read_run_results(range: &Range<Data>, experiment_local_id: u32) -> Result<Vec<RunResult>> {
    let sheet_name = run_sheet_name(experiment_local_id);

    let Some(end) = range.end() else {
        bail!("Sheet '{}' is empty", sheet_name);
    };

    let mut columns: HashMap<&'static str, u32> = HashMap::new();
    for col in FIRST_COLUMN..=LAST_COLUMN {
        let Some(label) = range.get_value((HEADER_ROW, col)).and_then(cells::display) else {
            continue;
        };
        if let Some((_, field)) = COLUMNS.iter().find(|(h, _)| *h == label) {
            columns.entry(*field).or_insert(col);
        }
    }

    if !columns.contains_key("run_id") {
        bail!(
            "Sheet '{}' has no 'Run ID' header on row {}",
            sheet_name,
            HEADER_ROW + 1
        );
    }

    let cell = |row: u32, field: &str| field_cell(range, &columns, row, field);

    let mut runs = Vec::new();

    for row in (HEADER_ROW + 1)..=end.0 {
        let Some(run_id) = parse_run_id(cell(row, "run_id")) else {
            continue;
        };

        runs.push(RunResult {
            experiment_local_id,
            run_id,
            nominal_pga_x: cells::raw(cell(row, "nominal_pga_x")),
            nominal_pga_y: cells::raw(cell(row, "nominal_pga_y")),
            nominal_pga_z: cells::raw(cell(row, "nominal_pga_z")),
            actual_pga_x: cells::raw(cell(row, "actual_pga_x")),
            actual_pga_y: cells::raw(cell(row, "actual_pga_y")),
            actual_pga_z: cells::raw(cell(row, "actual_pga_z")),
            reported_t1_x: cells::number(cell(row, "reported_t1_x")),
            reported_t1_y: cells::number(cell(row, "reported_t1_y")),
            reported_dg: cells::raw(cell(row, "reported_dg")),
            derived_dg: cells::raw(cell(row, "derived_dg")),
            max_drift_x: cells::raw(cell(row, "max_drift_x")),
            max_drift_y: cells::raw(cell(row, "max_drift_y")),
            max_base_shear_x: cells::raw(cell(row, "max_base_shear_x")),
            max_base_shear_y: cells::raw(cell(row, "max_base_shear_y")),
        });
    }

    log::debug!("Read {} runs from '{}'", runs.len(), sheet_name);
    Ok(runs)
}

fn field_cell<'a>(
    range: &'a Range<Data>,
    columns: &HashMap<&'static str, u32>,
    row: u32,
    field: &str,
) -> &'a Data {
    columns
        .get(field)
        .and_then(|col| range.get_value((row, *col)))
        .unwrap_or(&cells::EMPTY)
}

/// Parse a run id cell, `None` for rows that are not runs
fn parse_run_id(cell: &Data) -> Option<RunId> {
    match cell {
        Data::String(s) if s == SKIPPED_RUN => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(RunId::Text(s.clone())),
        Data::Int(_) | Data::Float(_) => cells::number(cell).map(RunId::Number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Number, Value, json};

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    fn run_range(rows: &[Vec<Data>]) -> Range<Data> {
        let mut range = Range::new((0, 0), (rows.len() as u32 + 1, LAST_COLUMN));
        range.set_value((0, 0), s("Test runs"));
        for (c, (header, _)) in COLUMNS.iter().enumerate() {
            range.set_value((HEADER_ROW, c as u32), s(header));
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                range.set_value((r as u32 + 2, c as u32), value.clone());
            }
        }
        range
    }

    #[test]
    fn test_dash_rows_are_excluded() {
        let range = run_range(&[
            vec![s("Initial"), Data::Empty],
            vec![Data::Float(1.0), Data::Float(0.05)],
            vec![s("-"), Data::Float(0.1)],
            vec![Data::Empty, Data::Float(0.2)],
            vec![s("2b"), Data::Float(0.3)],
        ]);

        let runs = read_run_results(&range, 3).unwrap();
        let ids: Vec<String> = runs.iter().map(|r| r.run_id.to_string()).collect();
        assert_eq!(ids, vec!["Initial", "1", "2b"]);
        assert!(runs.iter().all(|r| r.experiment_local_id == 3));
        assert_eq!(runs[1].nominal_pga_x, json!(0.05));
        assert_eq!(runs[0].nominal_pga_x, Value::Null);
    }

    #[test]
    fn test_dash_sentinel_is_exact() {
        assert_eq!(parse_run_id(&s("-")), None);
        assert_eq!(parse_run_id(&s("--")), Some(RunId::Text("--".to_string())));
        assert_eq!(parse_run_id(&Data::Float(4.0)), Some(RunId::Number(Number::from(4))));
        assert_eq!(parse_run_id(&Data::Empty), None);
    }

    #[test]
    fn test_reported_periods_are_numeric() {
        let mut row = vec![Data::Float(1.0)];
        row.extend(std::iter::repeat_n(Data::Empty, 6));
        row.push(Data::Float(0.12));
        row.push(s("n.a."));

        let runs = read_run_results(&run_range(&[row]), 1).unwrap();
        assert_eq!(runs[0].reported_t1_x, Number::from_f64(0.12));
        assert_eq!(runs[0].reported_t1_y, None);
    }

    #[test]
    fn test_missing_run_id_header() {
        let mut range = Range::new((0, 0), (3, 3));
        range.set_value((1, 0), s("Run"));
        range.set_value((2, 0), Data::Float(1.0));

        let err = read_run_results(&range, 9).unwrap_err();
        assert!(err.to_string().contains("B9"));
    }

    #[test]
    fn test_run_sheet_name() {
        assert_eq!(run_sheet_name(12), "B12");
    }
}

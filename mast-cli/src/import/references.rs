//! Read full citations from the `References` sheet
//!
//! Layout: a title on the first row, the header on the second row, data in
//! columns A:C ("Building #", "Excel sheet name", "Reference"). The sheet name
//! column is only a navigation aid for authors and is not imported.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use calamine::{Data, Range};

use super::cells;

pub const REFERENCES_SHEET: &str = "References";

/// 0-based row holding the header
const HEADER_ROW: u32 = 1;
/// Columns A:C
const FIRST_COLUMN: u32 = 0;
const LAST_COLUMN: u32 = 2;

const EXPERIMENT_ID_HEADER: &str = "Building #";
const FULL_REFERENCE_HEADER: &str = "Reference";
const DROPPED_HEADER: &str = "Excel sheet name";

/// Read the experiment local id -> full citations mapping
///
/// Several rows may cite the same building; their texts are kept in sheet order.
pub fn read_full_references(range: &Range<Data>) -> Result<BTreeMap<u32, Vec<String>>> {
    let Some((_, end)) = range.start().zip(range.end()) else {
        bail!("Sheet '{}' is empty", REFERENCES_SHEET);
    };

    let mut id_col = None;
    let mut text_col = None;

    for col in FIRST_COLUMN..=LAST_COLUMN {
        let header = range
            .get_value((HEADER_ROW, col))
            .and_then(cells::display)
            .unwrap_or_default();
        match header.as_str() {
            EXPERIMENT_ID_HEADER => id_col = Some(col),
            FULL_REFERENCE_HEADER => text_col = Some(col),
            DROPPED_HEADER => {}
            "" => {}
            other => log::debug!("Ignoring column '{}' in '{}'", other, REFERENCES_SHEET),
        }
    }

    let (Some(id_col), Some(text_col)) = (id_col, text_col) else {
        bail!(
            "Sheet '{}' must have '{}' and '{}' headers on row {} (columns A:C)",
            REFERENCES_SHEET,
            EXPERIMENT_ID_HEADER,
            FULL_REFERENCE_HEADER,
            HEADER_ROW + 1
        );
    };

    let mut citations: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for row in (HEADER_ROW + 1)..=end.0 {
        let id_cell = range.get_value((row, id_col)).unwrap_or(&cells::EMPTY);
        let text_cell = range.get_value((row, text_col)).unwrap_or(&cells::EMPTY);

        if cells::is_blank(id_cell) && cells::is_blank(text_cell) {
            continue;
        }

        let Some(experiment_id) = cells::integer(id_cell) else {
            log::warn!(
                "Row {} of '{}' has no usable '{}', skipping",
                row + 1,
                REFERENCES_SHEET,
                EXPERIMENT_ID_HEADER
            );
            continue;
        };

        let Some(text) = cells::display(text_cell) else {
            continue;
        };

        citations.entry(experiment_id).or_default().push(text);
    }

    log::info!(
        "Read full references for {} experiments from '{}'",
        citations.len(),
        REFERENCES_SHEET
    );
    Ok(citations)
}

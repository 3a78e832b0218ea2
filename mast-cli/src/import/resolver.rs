//! Cross-reference resolution between summary rows and references
//!
//! The summary sheet repeats the reference columns on every experiment row.
//! The resolver collapses them into one reference per short name and links
//! each experiment to the local id of its reference.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::summary::{SUMMARY_SHEET, SummaryRow, is_url};
use super::types::{Experiment, Reference, ReferenceFields};

/// References keyed by short name, in first-seen order
#[derive(Debug, Default)]
pub struct ReferenceTable {
    references: Vec<Reference>,
    by_name: HashMap<String, usize>,
}

impl ReferenceTable {
    /// Create a new empty reference table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reference of a summary row, returning its local id
    ///
    /// Later rows with an already known short name do not change the stored
    /// reference. Rows without a short name get no reference.
    pub fn insert(&mut self, fields: &ReferenceFields) -> Option<u32> {
        if fields.reference.is_empty() {
            return None;
        }

        if let Some(idx) = self.by_name.get(&fields.reference) {
            return Some(self.references[*idx].local_id);
        }

        let local_id = self.references.len() as u32 + 1;
        let (request_data_available, link_to_request_data) =
            split_request_data(fields.request_data.as_deref());

        self.references.push(Reference {
            local_id,
            reference: fields.reference.clone(),
            publication_year: fields.publication_year.clone(),
            link_to_experimental_paper: fields.link_to_experimental_paper.clone(),
            corresponding_author_name: fields.corresponding_author_name.clone(),
            corresponding_author_email: fields.corresponding_author_email.clone(),
            request_data_available,
            link_to_request_data,
            full_references: Vec::new(),
        });
        self.by_name
            .insert(fields.reference.clone(), self.references.len() - 1);

        Some(local_id)
    }

    /// Attach a full citation to a reference, ignoring duplicates
    pub fn attach_citation(&mut self, local_id: u32, citation: &str) {
        let Some(reference) = self.references.iter_mut().find(|r| r.local_id == local_id) else {
            return;
        };
        if !reference.full_references.iter().any(|c| c == citation) {
            reference.full_references.push(citation.to_string());
        }
    }

    pub fn into_references(self) -> Vec<Reference> {
        self.references
    }
}

/// Deduplicate references and link experiments to them
///
/// `citations` maps experiment local ids to the full citations read from the
/// references sheet; they end up on the reference of that experiment. A row
/// whose local id was already used by an earlier row is dropped.
pub fn link_references(
    rows: Vec<SummaryRow>,
    citations: &BTreeMap<u32, Vec<String>>,
) -> (Vec<Reference>, Vec<Experiment>) {
    let mut table = ReferenceTable::new();
    let mut experiments = Vec::with_capacity(rows.len());
    let mut seen = HashSet::new();

    for row in rows {
        let mut experiment = row.experiment;
        if !seen.insert(experiment.local_id) {
            log::warn!(
                "Row {} of '{}' repeats experiment id {}, row ignored",
                experiment.sheet_row + 1,
                SUMMARY_SHEET,
                experiment.local_id
            );
            continue;
        }

        experiment.reference_local_id = table.insert(&row.reference);

        if let Some(reference_id) = experiment.reference_local_id {
            for citation in citations.get(&experiment.local_id).into_iter().flatten() {
                table.attach_citation(reference_id, citation);
            }
        }

        experiments.push(experiment);
    }

    let orphans: Vec<u32> = citations
        .keys()
        .filter(|id| !experiments.iter().any(|e| e.local_id == **id))
        .copied()
        .collect();
    if !orphans.is_empty() {
        log::warn!("Full references for unknown experiments ignored: {:?}", orphans);
    }

    let references = table.into_references();
    log::info!(
        "Resolved {} unique references for {} experiments",
        references.len(),
        experiments.len()
    );
    (references, experiments)
}

/// Split the "Link to request data" column into (note, link)
///
/// A URL becomes the link; any other text is kept as a free-text note.
fn split_request_data(value: Option<&str>) -> (Option<String>, Option<String>) {
    match value {
        None => (None, None),
        Some(v) if is_url(v) => (None, Some(v.to_string())),
        Some(v) => (Some(v.to_string()), None),
    }
}

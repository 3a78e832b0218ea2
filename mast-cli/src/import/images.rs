//! Extract pictures anchored in worksheet cells
//!
//! calamine exposes the workbook media but not where each picture sits, so the
//! drawing parts are read straight from the xlsx package:
//! workbook.xml -> worksheet part -> drawing part -> anchor cell + media file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipArchive;

use super::summary::SCHEME_COLUMN;
use super::types::{Experiment, ImageAsset};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const DRAWING_REL_TYPE: &str = "/drawing";

/// A picture and the top-left cell it is anchored to (0-based)
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPicture {
    pub row: u32,
    pub col: u32,
    pub extension: String,
    pub data: Vec<u8>,
}

/// A relationship entry from a `.rels` part
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    target: String,
    rel_type: String,
}

/// Read every picture anchored on the named sheet
///
/// A sheet without drawings yields an empty list.
pub fn read_sheet_pictures(path: &Path, sheet_name: &str) -> Result<Vec<SheetPicture>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Not an xlsx package: {}", path.display()))?;

    let Some(sheet_part) = find_sheet_part(&mut zip, sheet_name)? else {
        log::debug!("Sheet '{}' not found in workbook package", sheet_name);
        return Ok(Vec::new());
    };

    let drawing_parts: Vec<String> = read_relationships(&mut zip, &sheet_part)?
        .into_iter()
        .filter(|rel| rel.rel_type.ends_with(DRAWING_REL_TYPE))
        .map(|rel| resolve_target(&sheet_part, &rel.target))
        .collect();

    let mut pictures = Vec::new();
    for drawing_part in drawing_parts {
        pictures.extend(read_drawing(&mut zip, &drawing_part)?);
    }

    log::debug!("Found {} pictures on sheet '{}'", pictures.len(), sheet_name);
    Ok(pictures)
}

/// Export the scheme picture of each experiment into `dir`
///
/// Pictures are looked up at (experiment row, scheme column) of the summary
/// sheet and written as `<local id>.<ext>`. Experiments without a picture are
/// skipped. The result follows the experiment order.
pub fn extract_images(
    workbook: &Path,
    sheet_name: &str,
    experiments: &[Experiment],
    dir: &Path,
) -> Result<Vec<ImageAsset>> {
    let mut by_cell: HashMap<(u32, u32), SheetPicture> = HashMap::new();
    for picture in read_sheet_pictures(workbook, sheet_name)? {
        // Keep the first picture when several share a cell
        by_cell.entry((picture.row, picture.col)).or_insert(picture);
    }

    let mut assets = Vec::new();
    for experiment in experiments {
        let Some(picture) = by_cell.get(&(experiment.sheet_row, SCHEME_COLUMN)) else {
            continue;
        };

        let path = dir.join(format!("{}.{}", experiment.local_id, picture.extension));
        std::fs::write(&path, &picture.data)
            .with_context(|| format!("Failed to write image: {}", path.display()))?;

        log::debug!(
            "Extracted image for experiment {} to {}",
            experiment.local_id,
            path.display()
        );
        assets.push(ImageAsset {
            experiment_local_id: experiment.local_id,
            path,
        });
    }

    log::info!("Extracted {} experiment images", assets.len());
    Ok(assets)
}

/// Locate the worksheet part (e.g. `xl/worksheets/sheet1.xml`) of a sheet name
fn find_sheet_part<R: Read + Seek>(zip: &mut ZipArchive<R>, sheet_name: &str) -> Result<Option<String>> {
    let Some(workbook_xml) = read_zip_text(zip, WORKBOOK_PART)? else {
        return Ok(None);
    };
    let doc = roxmltree::Document::parse(&workbook_xml).context("Failed to parse workbook.xml")?;

    let rel_id = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
        .find(|n| n.attribute("name") == Some(sheet_name))
        .and_then(|n| namespaced_attribute(&n, "id"));

    let Some(rel_id) = rel_id else {
        return Ok(None);
    };

    let target = read_relationships(zip, WORKBOOK_PART)?
        .into_iter()
        .find(|rel| rel.id == rel_id)
        .map(|rel| resolve_target(WORKBOOK_PART, &rel.target));

    Ok(target)
}

/// Read the anchored pictures of one drawing part
fn read_drawing<R: Read + Seek>(zip: &mut ZipArchive<R>, drawing_part: &str) -> Result<Vec<SheetPicture>> {
    let Some(drawing_xml) = read_zip_text(zip, drawing_part)? else {
        log::warn!("Drawing part {} is missing", drawing_part);
        return Ok(Vec::new());
    };
    let doc = roxmltree::Document::parse(&drawing_xml)
        .with_context(|| format!("Failed to parse {}", drawing_part))?;

    let media: HashMap<String, String> = read_relationships(zip, drawing_part)?
        .into_iter()
        .map(|rel| (rel.id, resolve_target(drawing_part, &rel.target)))
        .collect();

    let mut anchored = Vec::new();
    for anchor in doc.descendants().filter(|n| {
        n.is_element() && matches!(n.tag_name().name(), "twoCellAnchor" | "oneCellAnchor")
    }) {
        let Some(from) = anchor.children().find(|n| n.tag_name().name() == "from") else {
            continue;
        };
        let coordinate = |name: &str| -> Option<u32> {
            from.children()
                .find(|n| n.tag_name().name() == name)
                .and_then(|n| n.text())
                .and_then(|t| t.trim().parse().ok())
        };
        let (Some(row), Some(col)) = (coordinate("row"), coordinate("col")) else {
            continue;
        };

        let embed = anchor
            .descendants()
            .find(|n| n.tag_name().name() == "blip")
            .and_then(|n| namespaced_attribute(&n, "embed"));
        let Some(media_part) = embed.and_then(|id| media.get(&id).cloned()) else {
            continue;
        };

        anchored.push((row, col, media_part));
    }

    let mut pictures = Vec::new();
    for (row, col, media_part) in anchored {
        let Some(data) = read_zip_bytes(zip, &media_part)? else {
            log::warn!("Picture {} referenced by {} is missing", media_part, drawing_part);
            continue;
        };
        let extension = Path::new(&media_part)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_lowercase();
        pictures.push(SheetPicture {
            row,
            col,
            extension,
            data,
        });
    }

    Ok(pictures)
}

/// Read the `.rels` part that belongs to `part`
fn read_relationships<R: Read + Seek>(zip: &mut ZipArchive<R>, part: &str) -> Result<Vec<Relationship>> {
    let Some(xml) = read_zip_text(zip, &rels_part(part))? else {
        return Ok(Vec::new());
    };
    let doc = roxmltree::Document::parse(&xml)
        .with_context(|| format!("Failed to parse relationships of {}", part))?;

    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                target: n.attribute("Target")?.to_string(),
                rel_type: n.attribute("Type").unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Attribute in the relationships namespace (`r:id`, `r:embed`)
fn namespaced_attribute(node: &roxmltree::Node, name: &str) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == name && a.namespace().is_some())
        .map(|a| a.value().to_string())
}

fn read_zip_bytes<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    match zip.by_name(name) {
        Ok(mut entry) => {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .with_context(|| format!("Failed to read {}", name))?;
            Ok(Some(bytes))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", name)),
    }
}

fn read_zip_text<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    Ok(read_zip_bytes(zip, name)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part() {
        assert_eq!(rels_part("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_part("xl/worksheets/sheet2.xml"),
            "xl/worksheets/_rels/sheet2.xml.rels"
        );
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(
            resolve_target("xl/drawings/drawing1.xml", "/xl/media/image3.jpeg"),
            "xl/media/image3.jpeg"
        );
    }
}

//! Zip packaging of repository folders

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Zip the content of `folder` into `archive`
///
/// Entry names are relative to `folder` and use `/` separators. Returns the
/// number of files written.
pub fn zip_folder(folder: &Path, archive: &Path) -> Result<usize> {
    if !folder.is_dir() {
        bail!("Not a folder: {}", folder.display());
    }

    let file = File::create(archive)
        .with_context(|| format!("Failed to create archive: {}", archive.display()))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut count = 0;
    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", folder.display()))?;
        let relative = entry
            .path()
            .strip_prefix(folder)
            .with_context(|| format!("Unexpected path {}", entry.path().display()))?;
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .with_context(|| format!("Failed to add folder {}", name))?;
            continue;
        }

        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {}", name))?;
        let mut source = File::open(entry.path())
            .with_context(|| format!("Failed to open {}", entry.path().display()))?;
        io::copy(&mut source, &mut writer).with_context(|| format!("Failed to compress {}", name))?;
        count += 1;
    }

    writer
        .finish()
        .with_context(|| format!("Failed to finish archive: {}", archive.display()))?;

    log::info!("Packed {} files from {} into {}", count, folder.display(), archive.display());
    Ok(count)
}

/// Unpack `archive` into `dest`
///
/// Entries that would escape `dest` are rejected.
pub fn unzip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Not a zip archive: {}", archive.display()))?;

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).context("Failed to read archive entry")?;
        let Some(relative) = entry.enclosed_name() else {
            bail!("Archive entry '{}' escapes the target folder", entry.name());
        };
        let path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut out =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", path.display()))?;
        count += 1;
    }

    log::debug!("Unpacked {} files from {}", count, archive.display());
    Ok(count)
}

/// Check whether a path names a zip archive
pub fn is_zip(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_and_unzip_folder() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("Crack maps")).unwrap();
        fs::write(source.path().join("Crack maps/1.png"), b"png").unwrap();
        fs::write(source.path().join("README.md"), "# B1\n").unwrap();

        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("repo.zip");
        assert_eq!(zip_folder(source.path(), &archive).unwrap(), 2);
        assert!(is_zip(&archive));

        let mut names: Vec<String> = {
            let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
            (0..zip.len())
                .map(|i| zip.by_index(i).unwrap().name().to_string())
                .collect()
        };
        names.sort();
        assert_eq!(names, vec!["Crack maps/", "Crack maps/1.png", "README.md"]);

        let dest = work.path().join("unpacked");
        assert_eq!(unzip(&archive, &dest).unwrap(), 2);
        assert_eq!(fs::read(dest.join("Crack maps/1.png")).unwrap(), b"png");
        assert_eq!(fs::read_to_string(dest.join("README.md")).unwrap(), "# B1\n");
    }

    #[test]
    fn test_zip_missing_folder() {
        let work = tempfile::tempdir().unwrap();
        assert!(zip_folder(&work.path().join("nope"), &work.path().join("a.zip")).is_err());
    }

    #[test]
    fn test_is_zip() {
        let work = tempfile::tempdir().unwrap();
        let upper = work.path().join("REPO.ZIP");
        fs::write(&upper, b"").unwrap();
        assert!(is_zip(&upper));
        assert!(!is_zip(work.path()));
        assert!(!is_zip(&work.path().join("missing.zip")));
    }
}

//! Static wheel introspection: which top-level names does an artifact ship?

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use whichdist_core::ImportName;
use whichdist_pypi::{ArtifactInspector, InspectError};
use zip::ZipArchive;

/// Reads `top_level.txt` out of a wheel (or zip sdist), falling back to the
/// archive's top-level entries. Never executes anything from the payload.
#[derive(Debug, Clone, Copy)]
pub struct WheelInspector;

impl ArtifactInspector for WheelInspector {
    fn provided_names(
        &self,
        filename: &str,
        payload: &[u8],
    ) -> Result<BTreeSet<ImportName>, InspectError> {
        if !filename.ends_with(".whl") && !filename.ends_with(".zip") {
            return Err(InspectError::new(format!(
                "unsupported artifact format: {filename}"
            )));
        }

        let mut archive = ZipArchive::new(Cursor::new(payload))
            .map_err(|e| InspectError::new(format!("unreadable archive {filename}: {e}")))?;

        if let Some(names) = top_level_txt(&mut archive)? {
            return Ok(names);
        }
        Ok(top_level_entries(&archive))
    }
}

/// Parse `*.dist-info/top_level.txt` when the wheel ships one.
fn top_level_txt(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
) -> Result<Option<BTreeSet<ImportName>>, InspectError> {
    let Some(path) = archive
        .file_names()
        .find(|name| {
            name.ends_with("/top_level.txt")
                && (name.contains(".dist-info/") || name.contains(".egg-info/"))
        })
        .map(String::from)
    else {
        return Ok(None);
    };

    let mut file = archive
        .by_name(&path)
        .map_err(|e| InspectError::new(format!("reading {path}: {e}")))?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|e| InspectError::new(format!("reading {path}: {e}")))?;

    let names: BTreeSet<ImportName> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ImportName::new)
        .collect();
    Ok(Some(names))
}

/// Fall back to the archive's own top-level members: packages (directories
/// holding code) and top-level modules (`foo.py`).
fn top_level_entries(archive: &ZipArchive<Cursor<&[u8]>>) -> BTreeSet<ImportName> {
    let mut names = BTreeSet::new();
    for entry in archive.file_names() {
        let top = entry.split('/').next().unwrap_or(entry);
        if top.ends_with(".dist-info") || top.ends_with(".data") || top.ends_with(".egg-info") {
            continue;
        }
        if entry.contains('/') {
            names.insert(ImportName::new(top));
        } else if let Some(module) = top.strip_suffix(".py") {
            names.insert(ImportName::new(module));
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn wheel(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, contents) in entries {
            writer
                .start_file(*path, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_top_level_txt() {
        let payload = wheel(&[
            ("yaml/__init__.py", ""),
            ("PyYAML-6.0.dist-info/top_level.txt", "yaml\n_yaml\n"),
            ("PyYAML-6.0.dist-info/METADATA", "Name: PyYAML"),
        ]);
        let names = WheelInspector
            .provided_names("PyYAML-6.0-cp311-cp311-linux_x86_64.whl", &payload)
            .unwrap();
        assert!(names.contains(&ImportName::new("yaml")));
        assert!(names.contains(&ImportName::new("_yaml")));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn falls_back_to_archive_entries() {
        let payload = wheel(&[
            ("requests/__init__.py", ""),
            ("requests/api.py", ""),
            ("six.py", "# single module"),
            ("requests-2.31.0.dist-info/METADATA", "Name: requests"),
        ]);
        let names = WheelInspector
            .provided_names("requests-2.31.0-py3-none-any.whl", &payload)
            .unwrap();
        assert!(names.contains(&ImportName::new("requests")));
        assert!(names.contains(&ImportName::new("six")));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn rejects_unsupported_formats() {
        assert!(WheelInspector
            .provided_names("requests-2.31.0.tar.gz", b"not a zip")
            .is_err());
    }

    #[test]
    fn rejects_garbage_payloads() {
        assert!(WheelInspector
            .provided_names("broken-1.0-py3-none-any.whl", b"definitely not a zip")
            .is_err());
    }
}

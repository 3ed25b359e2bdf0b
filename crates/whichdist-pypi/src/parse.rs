//! Pure parsers for simple-index listings and artifact filenames.
//!
//! Kept free of I/O so they are testable offline against captured responses.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use url::Url;
use whichdist_core::{DistName, VersionString};
use whichdist_sync::{FetchError, FetchResult};

/// One downloadable artifact from a project's file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLink {
    /// Artifact filename (e.g. `requests-2.31.0-py3-none-any.whl`).
    pub filename: String,
    /// Absolute download URL.
    pub url: String,
}

impl ArtifactLink {
    /// Whether this artifact is a wheel.
    #[must_use]
    pub fn is_wheel(&self) -> bool {
        self.filename.ends_with(".whl")
    }
}

#[derive(Deserialize)]
struct ProjectListJson {
    projects: Vec<ProjectRefJson>,
}

#[derive(Deserialize)]
struct ProjectRefJson {
    name: String,
}

#[derive(Deserialize)]
struct FileListingJson {
    files: Vec<FileRefJson>,
}

#[derive(Deserialize)]
struct FileRefJson {
    filename: String,
    url: String,
}

/// Parse the PEP 691 JSON project list at the index root.
pub fn parse_project_list_json(body: &[u8]) -> FetchResult<Vec<DistName>> {
    let listing: ProjectListJson = sonic_rs::from_slice(body)
        .map_err(|e| FetchError::malformed(format!("project list json: {e}")))?;
    Ok(listing
        .projects
        .into_iter()
        .map(|p| DistName::new(p.name))
        .filter(|n| !n.is_empty())
        .collect())
}

/// Parse the legacy HTML project list at the index root: every anchor's text
/// is a project name.
#[must_use]
pub fn parse_project_list_html(body: &str) -> Vec<DistName> {
    anchors(body)
        .map(|(_, text)| DistName::new(text))
        .filter(|n| !n.is_empty())
        .collect()
}

/// Parse a PEP 691 JSON file listing for one project.
pub fn parse_file_listing_json(body: &[u8]) -> FetchResult<Vec<ArtifactLink>> {
    let listing: FileListingJson = sonic_rs::from_slice(body)
        .map_err(|e| FetchError::malformed(format!("file listing json: {e}")))?;
    Ok(listing
        .files
        .into_iter()
        .map(|f| ArtifactLink {
            filename: f.filename,
            url: f.url,
        })
        .collect())
}

/// Parse a legacy HTML file listing: anchor text is the artifact filename,
/// href (resolved against `base`) the download URL.
#[must_use]
pub fn parse_file_listing_html(body: &str, base: &Url) -> Vec<ArtifactLink> {
    anchors(body)
        .filter_map(|(href, text)| {
            // Fragments carry hash digests, not part of the URL proper.
            let href = href.split('#').next().unwrap_or(href);
            let url = base.join(href).ok()?;
            Some(ArtifactLink {
                filename: text.trim().to_string(),
                url: url.to_string(),
            })
        })
        .filter(|link| !link.filename.is_empty())
        .collect()
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>\s*([^<]*?)\s*</a>"#)
            .expect("anchor regex is valid")
    })
}

fn anchors(body: &str) -> impl Iterator<Item = (&str, &str)> {
    anchor_regex().captures_iter(body).filter_map(|cap| {
        let href = cap.get(1)?.as_str();
        let text = cap.get(2)?.as_str();
        Some((href, text))
    })
}

const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz", ".zip", ".tgz"];

/// Extract the version encoded in an artifact filename belonging to `dist`.
///
/// Wheels carry the version as the second dash-separated field; sdists are
/// `name-version.<archive suffix>` where the name itself may contain dashes,
/// so the split point is wherever the prefix canonicalizes to `dist` and the
/// remainder starts with a digit.
#[must_use]
pub fn version_from_filename(dist: &DistName, filename: &str) -> Option<VersionString> {
    if let Some(stem) = filename.strip_suffix(".whl") {
        let mut fields = stem.split('-');
        let name = fields.next()?;
        let version = fields.next()?;
        if DistName::new(name) != *dist || version.is_empty() {
            return None;
        }
        return Some(VersionString::new(version));
    }

    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| filename.strip_suffix(suffix))?;

    for (idx, _) in stem.match_indices('-') {
        let (name, rest) = stem.split_at(idx);
        let version = &rest[1..];
        if version.starts_with(|c: char| c.is_ascii_digit()) && DistName::new(name) == *dist {
            return Some(VersionString::new(version));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_list_json() {
        let body = br#"{"meta":{"api-version":"1.0"},"projects":[{"name":"Requests"},{"name":"ruamel.yaml"}]}"#;
        let names = parse_project_list_json(body).unwrap();
        assert_eq!(names, vec![DistName::new("requests"), DistName::new("ruamel-yaml")]);
    }

    #[test]
    fn project_list_json_malformed() {
        assert!(matches!(
            parse_project_list_json(b"not json"),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn project_list_html() {
        let body = r#"<html><body>
            <a href="/simple/requests/">requests</a>
            <A HREF='/simple/pyyaml/'>PyYAML</A>
        </body></html>"#;
        let names = parse_project_list_html(body);
        assert_eq!(names, vec![DistName::new("requests"), DistName::new("pyyaml")]);
    }

    #[test]
    fn file_listing_html_resolves_relative_urls() {
        let base = Url::parse("https://pypi.org/simple/requests/").unwrap();
        let body = r#"
            <a href="../../packages/requests-2.31.0-py3-none-any.whl#sha256=abc">requests-2.31.0-py3-none-any.whl</a>
            <a href="https://files.example/requests-2.30.0.tar.gz">requests-2.30.0.tar.gz</a>
        "#;
        let links = parse_file_listing_html(body, &base);
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].url,
            "https://pypi.org/packages/requests-2.31.0-py3-none-any.whl"
        );
        assert!(links[0].is_wheel());
        assert_eq!(links[1].url, "https://files.example/requests-2.30.0.tar.gz");
    }

    #[test]
    fn file_listing_json() {
        let body = br#"{"files":[{"filename":"flask-3.0.0-py3-none-any.whl","url":"https://files.example/flask-3.0.0-py3-none-any.whl"}]}"#;
        let links = parse_file_listing_json(body).unwrap();
        assert_eq!(links[0].filename, "flask-3.0.0-py3-none-any.whl");
    }

    #[test]
    fn wheel_version_extraction() {
        let dist = DistName::new("requests");
        let version =
            version_from_filename(&dist, "requests-2.31.0-py3-none-any.whl").unwrap();
        assert_eq!(version.as_str(), "2.31.0");
    }

    #[test]
    fn wheel_name_mismatch_is_none() {
        let dist = DistName::new("flask");
        assert!(version_from_filename(&dist, "requests-2.31.0-py3-none-any.whl").is_none());
    }

    #[test]
    fn sdist_version_with_dashed_name() {
        let dist = DistName::new("zope.interface");
        let version = version_from_filename(&dist, "zope-interface-6.1.tar.gz").unwrap();
        assert_eq!(version.as_str(), "6.1");

        let version = version_from_filename(&dist, "zope.interface-5.0.zip").unwrap();
        assert_eq!(version.as_str(), "5.0");
    }

    #[test]
    fn underscore_spelling_matches_canonical_name() {
        let dist = DistName::new("typing-extensions");
        let version =
            version_from_filename(&dist, "typing_extensions-4.9.0-py3-none-any.whl").unwrap();
        assert_eq!(version.as_str(), "4.9.0");
    }

    #[test]
    fn unknown_suffix_is_none() {
        let dist = DistName::new("requests");
        assert!(version_from_filename(&dist, "requests-2.31.0.exe").is_none());
    }
}

#![forbid(unsafe_code)]

//! `helix.toml`: optional per-project build settings.
//!
//! ```toml
//! [project]
//! name = "demo"
//!
//! [build]
//! output = "build/out.c"
//! line_comments = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

pub const MANIFEST_FILE: &str = "helix.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("manifest error: {message}")]
#[diagnostic(code(helix::manifest))]
pub struct ManifestError {
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub manifest_path: Option<PathBuf>,
    pub project_root: PathBuf,
    pub name: Option<String>,
    /// Already resolved against `project_root`.
    pub output: Option<PathBuf>,
    pub line_comments: Option<bool>,
}

impl ResolvedManifest {
    pub fn empty(project_root: PathBuf) -> Self {
        Self {
            project_root,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    project: Option<Project>,

    #[serde(default)]
    build: Option<Build>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Build {
    #[serde(default)]
    output: Option<String>,

    #[serde(default)]
    line_comments: Option<bool>,
}

/// Walks up from `start` to the nearest directory holding a manifest.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

pub fn load_resolved_manifest(start: &Path) -> Result<ResolvedManifest, ManifestError> {
    let project_root = if start.is_file() {
        start.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
    } else {
        start.to_path_buf()
    };

    let Some(manifest_path) = find_manifest(&project_root) else {
        return Ok(ResolvedManifest::empty(project_root));
    };

    let raw = fs::read_to_string(&manifest_path).map_err(|e| ManifestError {
        message: format!("failed to read {}: {e}", manifest_path.display()),
    })?;
    parse_manifest(&raw, manifest_path)
}

/// Parses manifest text; relative paths resolve against the manifest's
/// directory.
pub fn parse_manifest(raw: &str, manifest_path: PathBuf) -> Result<ResolvedManifest, ManifestError> {
    let parsed: Manifest = toml::from_str(raw).map_err(|e| ManifestError {
        message: format!("failed to parse {}: {e}", manifest_path.display()),
    })?;

    let manifest_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut out = ResolvedManifest {
        manifest_path: Some(manifest_path),
        project_root: manifest_dir.clone(),
        ..ResolvedManifest::default()
    };

    if let Some(project) = parsed.project {
        out.name = project.name;
    }
    if let Some(build) = parsed.build {
        out.output = build.output.map(|o| resolve_path(&manifest_dir, &o));
        out.line_comments = build.line_comments;
    }
    Ok(out)
}

fn resolve_path(base: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() { pb } else { base.join(pb) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_settings_resolve_against_the_manifest_directory() {
        let raw = r#"
[project]
name = "demo"

[build]
output = "build/out.c"
line_comments = true
"#;
        let resolved = parse_manifest(raw, PathBuf::from("/work/demo/helix.toml")).expect("manifest");
        assert_eq!(resolved.name.as_deref(), Some("demo"));
        assert_eq!(resolved.project_root, PathBuf::from("/work/demo"));
        assert_eq!(resolved.output, Some(PathBuf::from("/work/demo/build/out.c")));
        assert_eq!(resolved.line_comments, Some(true));
    }

    #[test]
    fn sections_are_optional() {
        let resolved = parse_manifest("", PathBuf::from("helix.toml")).expect("manifest");
        assert_eq!(resolved.output, None);
        assert_eq!(resolved.line_comments, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_manifest("[build]\noptimize = 3\n", PathBuf::from("helix.toml"))
            .expect_err("unknown key");
        assert!(err.message.contains("failed to parse"), "unexpected error message: {}", err.message);
    }
}

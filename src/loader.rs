//! Data-root document loader.
//!
//! Walks the configured data directory, dispatches each supported file to
//! [`extract`](crate::extract) by extension, and normalizes the
//! extracted parts into [`Document`]s. Unreadable or undecodable files are
//! skipped with a warning; they never abort a load.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::DataConfig;
use crate::extract::{self, ExtractedPart};
use crate::models::{Document, FileFormat};

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/.*/**", "**/~$*"];

/// Result of walking the data root.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    /// Supported files that were parsed successfully.
    pub files_loaded: usize,
    /// Supported files that failed to parse: `(relative path, reason)`.
    pub skipped: Vec<(String, String)>,
    /// Files with an extension outside the configured set.
    pub ignored: usize,
}

pub fn load_documents(config: &DataConfig) -> Result<LoadReport> {
    let root = &config.root;
    if !root.exists() {
        bail!("Data root does not exist: {}", root.display());
    }

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let allowed: Vec<FileFormat> = config
        .extensions
        .iter()
        .filter_map(|ext| {
            let format = FileFormat::from_extension(ext);
            if format.is_none() {
                warn!(extension = %ext, "ignoring unsupported extension in config");
            }
            format
        })
        .collect();

    let mut report = LoadReport::default();

    let walker = WalkDir::new(root)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "cannot access entry under data root");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
        {
            Some(f) if allowed.contains(&f) => f,
            _ => {
                report.ignored += 1;
                continue;
            }
        };

        match load_file(path, &rel_str, format) {
            Ok(docs) => {
                debug!(path = %rel_str, documents = docs.len(), "loaded file");
                report.files_loaded += 1;
                report.documents.extend(docs);
            }
            Err(e) => {
                warn!(path = %rel_str, error = %e, "skipping unreadable file");
                report.skipped.push((rel_str, e.to_string()));
            }
        }
    }

    report.documents.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then(a.page.cmp(&b.page))
            .then(a.row.cmp(&b.row))
    });

    Ok(report)
}

/// Read and parse a single file into documents (empty parts are dropped).
pub fn load_file(path: &Path, relative_path: &str, format: FileFormat) -> Result<Vec<Document>> {
    let bytes = std::fs::read(path)?;
    let modified_at = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| relative_path.to_string());

    let parts = extract::extract(&bytes, format)?;

    Ok(parts
        .into_iter()
        .filter(|part| {
            let keep = !part.text.trim().is_empty();
            if !keep {
                debug!(path = %relative_path, page = ?part.page, row = ?part.row, "dropping empty part");
            }
            keep
        })
        .map(|part| to_document(relative_path, &file_name, format, part, modified_at))
        .collect())
}

fn to_document(
    relative_path: &str,
    file_name: &str,
    format: FileFormat,
    part: ExtractedPart,
    modified_at: DateTime<Utc>,
) -> Document {
    Document {
        id: document_id(relative_path, part.page, part.row),
        path: relative_path.to_string(),
        file_name: file_name.to_string(),
        format,
        page: part.page,
        row: part.row,
        content: part.text,
        modified_at,
    }
}

/// Stable ID for a document position: same path and position, same ID.
pub fn document_id(relative_path: &str, page: Option<u32>, row: Option<usize>) -> String {
    let mut key = relative_path.to_string();
    if let Some(p) = page {
        key.push_str(&format!("#page={}", p));
    }
    if let Some(r) = row {
        key.push_str(&format!("#row={}", r));
    }
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn data_config(root: &Path) -> DataConfig {
        DataConfig {
            root: root.to_path_buf(),
            ..DataConfig::default()
        }
    }

    #[test]
    fn loads_nested_files_and_ignores_others() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("hr/policies")).unwrap();
        fs::write(root.join("hr/policies/leave.txt"), "Annual leave is 20 days.").unwrap();
        fs::write(root.join("hr/staff.csv"), "name,dept\nAiko,HR\nBen,Sales\n").unwrap();
        fs::write(root.join("notes.md"), "# not indexed").unwrap();

        let report = load_documents(&data_config(root)).unwrap();
        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.ignored, 1);
        assert!(report.skipped.is_empty());
        // two CSV rows plus one text file
        assert_eq!(report.documents.len(), 3);
        assert_eq!(report.documents[0].path, "hr/policies/leave.txt");
        assert_eq!(report.documents[1].row, Some(0));
        assert_eq!(report.documents[2].row, Some(1));
    }

    #[test]
    fn corrupt_file_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("broken.pdf"), "definitely not a pdf").unwrap();
        fs::write(root.join("ok.txt"), "fine").unwrap();

        let report = load_documents(&data_config(root)).unwrap();
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "broken.pdf");
    }

    #[test]
    fn empty_text_file_produces_no_document() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("empty.txt"), "   \n").unwrap();
        let report = load_documents(&data_config(tmp.path())).unwrap();
        assert_eq!(report.files_loaded, 1);
        assert!(report.documents.is_empty());
    }

    #[test]
    fn hidden_directories_and_custom_excludes_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::create_dir_all(root.join("archive")).unwrap();
        fs::write(root.join(".cache/tmp.txt"), "hidden").unwrap();
        fs::write(root.join("archive/old.txt"), "old").unwrap();
        fs::write(root.join("current.txt"), "current").unwrap();

        let mut cfg = data_config(root);
        cfg.exclude_globs = vec!["archive/**".to_string()];
        let report = load_documents(&cfg).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].path, "current.txt");
    }

    #[test]
    fn extension_filter_is_configurable() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "text").unwrap();
        fs::write(tmp.path().join("b.csv"), "h\nv\n").unwrap();
        let mut cfg = data_config(tmp.path());
        cfg.extensions = vec!["csv".to_string()];
        let report = load_documents(&cfg).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].format, FileFormat::Csv);
        assert_eq!(report.ignored, 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let cfg = data_config(Path::new("/nonexistent/data/root"));
        assert!(load_documents(&cfg).is_err());
    }

    #[test]
    fn document_ids_are_position_specific() {
        let a = document_id("a.pdf", Some(1), None);
        let b = document_id("a.pdf", Some(2), None);
        assert_ne!(a, b);
        assert_eq!(a, document_id("a.pdf", Some(1), None));
    }
}

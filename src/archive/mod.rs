//! Final archiving of the run's working directories.
//!
//! The data directory and the chunks directory are each compressed into
//! `<prefix>_<kind>.zip` and then removed. A source directory is only deleted
//! once its archive exists and is non-empty. The two directories are handled
//! independently: one failing does not stop the other. An archive that would
//! land inside the directory it holds is refused and the directory kept.

pub mod zip_dir;

pub use zip_dir::{ZipSummary, zip_directory};

use crate::errors::ArchiveError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Which working directory an archive holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    Data,
    Chunks,
}

impl ArchiveKind {
    /// Suffix used in the archive file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Data => "datadir",
            ArchiveKind::Chunks => "chunks",
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directory eligible for archiving and where its archive goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub kind: ArchiveKind,
    pub source: PathBuf,
    pub archive: PathBuf,
}

/// The directories a run archives.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    pub targets: Vec<ArchiveTarget>,
}

impl ArchiveManifest {
    pub fn new(data_dir: &Path, chunks_dir: &Path, prefix: &Path) -> Self {
        Self {
            targets: vec![
                ArchiveTarget {
                    kind: ArchiveKind::Data,
                    source: data_dir.to_path_buf(),
                    archive: archive_path(prefix, ArchiveKind::Data),
                },
                ArchiveTarget {
                    kind: ArchiveKind::Chunks,
                    source: chunks_dir.to_path_buf(),
                    archive: archive_path(prefix, ArchiveKind::Chunks),
                },
            ],
        }
    }
}

/// `<prefix>_<kind>.zip`
pub fn archive_path(prefix: &Path, kind: ArchiveKind) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(format!("_{}.zip", kind.as_str()));
    PathBuf::from(name)
}

/// What happened to one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArchiveOutcome {
    /// Archive written and verified, source removed
    Archived {
        archive: PathBuf,
        bytes: u64,
        files: usize,
    },
    /// Source directory did not exist
    Missing,
    /// Something went wrong; see `error`
    Failed {
        error: String,
        /// Whether the source directory is still on disk
        source_kept: bool,
    },
}

/// Per-directory outcome of [`finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub kind: ArchiveKind,
    pub source: PathBuf,
    pub outcome: ArchiveOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveReport {
    pub fn has_failures(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.outcome, ArchiveOutcome::Failed { .. }))
    }
}

/// Archive the data and chunks directories under `archive_prefix`.
///
/// Missing directories are skipped without touching the filesystem.
pub fn finalize(data_dir: &Path, chunks_dir: &Path, archive_prefix: &Path) -> ArchiveReport {
    let manifest = ArchiveManifest::new(data_dir, chunks_dir, archive_prefix);
    let entries = manifest
        .targets
        .iter()
        .map(|target| ArchiveEntry {
            kind: target.kind,
            source: target.source.clone(),
            outcome: archive_target(target),
        })
        .collect();
    ArchiveReport { entries }
}

fn archive_target(target: &ArchiveTarget) -> ArchiveOutcome {
    if !target.source.is_dir() {
        tracing::info!(
            kind = %target.kind,
            dir = %target.source.display(),
            "Directory not found; nothing to archive"
        );
        return ArchiveOutcome::Missing;
    }

    if archive_inside_source(&target.archive, &target.source) {
        let e = ArchiveError::DestinationInsideSource {
            archive: target.archive.clone(),
            dir: target.source.clone(),
        };
        tracing::error!(kind = %target.kind, error = %e, "Archiving skipped");
        return ArchiveOutcome::Failed {
            error: e.to_string(),
            source_kept: true,
        };
    }

    match compress_and_remove(target) {
        Ok((bytes, summary)) => {
            tracing::info!(
                kind = %target.kind,
                archive = %target.archive.display(),
                bytes,
                files = summary.files,
                "Archived and removed directory"
            );
            ArchiveOutcome::Archived {
                archive: target.archive.clone(),
                bytes,
                files: summary.files,
            }
        }
        Err(e) => {
            let source_kept = target.source.exists();
            tracing::error!(
                kind = %target.kind,
                dir = %target.source.display(),
                source_kept,
                error = %e,
                "Archiving failed"
            );
            ArchiveOutcome::Failed {
                error: e.to_string(),
                source_kept,
            }
        }
    }
}

fn compress_and_remove(target: &ArchiveTarget) -> Result<(u64, ZipSummary), ArchiveError> {
    let mut partial = target.archive.clone().into_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let written = zip_directory(&target.source, &partial).and_then(|summary| {
        std::fs::rename(&partial, &target.archive)
            .map(|()| summary)
            .map_err(|source| ArchiveError::Io {
                path: target.archive.clone(),
                source,
            })
    });
    let summary = match written {
        Ok(summary) => summary,
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
    };

    let bytes = verified_size(&target.archive)?;

    std::fs::remove_dir_all(&target.source).map_err(|source| ArchiveError::Remove {
        dir: target.source.clone(),
        archive: target.archive.clone(),
        source,
    })?;
    Ok((bytes, summary))
}

/// Whether `archive` resolves to a path under `source`.
fn archive_inside_source(archive: &Path, source: &Path) -> bool {
    match source.canonicalize() {
        Ok(source) => resolve_path(archive).starts_with(source),
        Err(_) => false,
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest.
fn resolve_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            return rest.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Size of the archive, or an error if it is missing or empty.
fn verified_size(archive: &Path) -> Result<u64, ArchiveError> {
    match std::fs::metadata(archive) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(ArchiveError::EmptyArchive {
            path: archive.to_path_buf(),
        }),
    }
}

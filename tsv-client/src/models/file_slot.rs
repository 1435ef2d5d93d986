//! File intake slots
//!
//! Two independent slots, one per input document. Each holds at most one
//! pending file and the error from its most recent rejected candidate.
//! `FileSlot::accept` is a pure transition; nothing else mutates a slot.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tsv_common::api::{MASTER_SHEET_FIELD, TERM_SHEET_FIELD};

const TERM_SHEET_EXTENSIONS: &[&str] = &["pdf", "docx", "xlsx", "jpg", "jpeg", "png", "tif", "tiff"];
const MASTER_SHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv", "pdf", "docx"];

/// Which input document a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    TermSheet,
    MasterSheet,
}

impl SlotKind {
    /// Extensions the advisory type filter lets through (lowercase, no dot)
    ///
    /// The service validates content authoritatively; this only catches
    /// obvious mistakes before upload.
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            SlotKind::TermSheet => TERM_SHEET_EXTENSIONS,
            SlotKind::MasterSheet => MASTER_SHEET_EXTENSIONS,
        }
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.accepted_extensions().contains(&extension.as_str())
    }

    /// Multipart field the file is sent under
    pub fn field_name(&self) -> &'static str {
        match self {
            SlotKind::TermSheet => TERM_SHEET_FIELD,
            SlotKind::MasterSheet => MASTER_SHEET_FIELD,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::TermSheet => f.write_str("term sheet"),
            SlotKind::MasterSheet => f.write_str("master sheet"),
        }
    }
}

impl std::str::FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "term-sheet" | "termsheet" | "term" => Ok(SlotKind::TermSheet),
            "master-sheet" | "mastersheet" | "master" => Ok(SlotKind::MasterSheet),
            other => Err(format!(
                "unknown slot '{}' (expected term-sheet or master-sheet)",
                other
            )),
        }
    }
}

/// A file accepted into a slot
#[derive(Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub bytes: Vec<u8>,
}

// Contents are omitted so that logging a slot never dumps a document
impl fmt::Debug for FileBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBlob")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

/// A file offered to a slot, not yet accepted
#[derive(Clone)]
pub struct FileCandidate {
    pub name: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            last_modified: None,
            bytes,
        }
    }

    /// Read a candidate from disk
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);

        Ok(Self {
            name,
            last_modified,
            bytes,
        })
    }

    /// Extension segment after the last '.', if the name has one
    fn extension(&self) -> Option<&str> {
        let name = self.name.as_deref()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// One intake slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSlot {
    pub file: Option<FileBlob>,
    pub error: Option<String>,
}

impl FileSlot {
    pub fn is_filled(&self) -> bool {
        self.file.is_some()
    }

    /// Offer a candidate to a slot of the given kind
    ///
    /// Rejection sets `error` and leaves the slot without a file.
    /// Acceptance replaces any previous file and clears `error`.
    pub fn accept(self, kind: SlotKind, candidate: FileCandidate) -> FileSlot {
        match check_candidate(kind, &candidate) {
            Ok(name) => {
                tracing::debug!(slot = %kind, file = %name, size = candidate.bytes.len(), "File accepted");
                FileSlot {
                    file: Some(FileBlob {
                        name,
                        size: candidate.bytes.len() as u64,
                        last_modified: candidate.last_modified,
                        bytes: candidate.bytes,
                    }),
                    error: None,
                }
            }
            Err(reason) => {
                tracing::warn!(slot = %kind, %reason, "File rejected");
                FileSlot {
                    file: None,
                    error: Some(reason),
                }
            }
        }
    }
}

fn check_candidate(kind: SlotKind, candidate: &FileCandidate) -> Result<String, String> {
    let name = match candidate.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err("File has no name".to_string()),
    };

    let extension = candidate
        .extension()
        .ok_or_else(|| format!("'{}' has no file extension", name))?;

    if !kind.accepts_extension(extension) {
        return Err(format!(
            "'{}' is not an accepted {} type (accepted: {})",
            name,
            kind,
            kind.accepted_extensions().join(", ")
        ));
    }

    Ok(name)
}

/// The two slots of one submission
#[derive(Debug, Clone, Default)]
pub struct IntakeSlots {
    pub term_sheet: FileSlot,
    pub master_sheet: FileSlot,
}

impl IntakeSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: SlotKind) -> &FileSlot {
        match kind {
            SlotKind::TermSheet => &self.term_sheet,
            SlotKind::MasterSheet => &self.master_sheet,
        }
    }

    /// Offer a candidate to one slot; the other slot is untouched
    pub fn accept(&mut self, kind: SlotKind, candidate: FileCandidate) -> &FileSlot {
        let slot = match kind {
            SlotKind::TermSheet => &mut self.term_sheet,
            SlotKind::MasterSheet => &mut self.master_sheet,
        };
        *slot = std::mem::take(slot).accept(kind, candidate);
        slot
    }

    /// Current per-slot rejections
    pub fn intake_errors(&self) -> Vec<ValidationError> {
        [SlotKind::TermSheet, SlotKind::MasterSheet]
            .into_iter()
            .filter_map(|kind| {
                self.slot(kind).error.as_ref().map(|reason| ValidationError::Intake {
                    slot: kind,
                    reason: reason.clone(),
                })
            })
            .collect()
    }

    /// Record a candidate that could not be read at all
    pub fn reject(&mut self, kind: SlotKind, reason: impl Into<String>) -> &FileSlot {
        let reason = reason.into();
        tracing::warn!(slot = %kind, %reason, "File rejected");
        let slot = match kind {
            SlotKind::TermSheet => &mut self.term_sheet,
            SlotKind::MasterSheet => &mut self.master_sheet,
        };
        *slot = FileSlot {
            file: None,
            error: Some(reason),
        };
        slot
    }
}

//! Protocol Acquisition
//!
//! One text buffer per session, filled from three sources:
//! - direct paste / edits ([`ProtocolBuffer::set_text`])
//! - file import, which overwrites the buffer ([`ProtocolBuffer::import_file`])
//! - plasmid context, kept as a single tagged line that is replaced on every
//!   append ([`ProtocolBuffer::append_plasmid_context`])

pub mod import;
pub mod plasmid;

pub use import::{extract_text, ImportError};
pub use plasmid::{PlasmidClient, PlasmidError, PlasmidRecord};

use serde::Serialize;

pub const PLASMID_CONTEXT_TAG: &str = "[Plasmid Context]";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProtocolBuffer {
    text: String,
    /// Name of the last imported file, if the buffer came from one
    source_file: Option<String>,
}

impl ProtocolBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// User edits replace whatever is in the buffer
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replace the buffer with the text of an uploaded file. On a parse
    /// error the buffer is left untouched.
    pub fn import_file(&mut self, filename: &str, bytes: &[u8]) -> Result<(), ImportError> {
        let text = extract_text(filename, bytes)?;
        self.set_imported(filename, text);
        Ok(())
    }

    /// Install text already extracted from `filename`
    pub fn set_imported(&mut self, filename: &str, text: String) {
        self.text = text;
        self.source_file = Some(filename.to_string());
    }

    /// Add the plasmid context line, or rewrite it in place when the buffer
    /// already has one. Text before the tagged line is never modified.
    pub fn append_plasmid_context(&mut self, record: &PlasmidRecord) {
        let line = plasmid_context_line(record);

        let existing = self
            .text
            .match_indices(PLASMID_CONTEXT_TAG)
            .map(|(idx, _)| idx)
            .find(|&idx| is_line_start(&self.text, idx));

        match existing {
            Some(start) => {
                let end = self.text[start..]
                    .find('\n')
                    .map_or(self.text.len(), |offset| start + offset);
                self.text.replace_range(start..end, &line);
            }
            None => {
                let kept = self.text.trim_end_matches('\n');
                self.text = if kept.is_empty() {
                    line
                } else {
                    format!("{}\n\n{}", kept, line)
                };
            }
        }
    }
}

pub fn plasmid_context_line(record: &PlasmidRecord) -> String {
    format!(
        "{} {} with features: {}",
        PLASMID_CONTEXT_TAG,
        record.name,
        record.features.join(", ")
    )
}

fn is_line_start(text: &str, idx: usize) -> bool {
    idx == 0 || text[..idx].ends_with('\n')
}

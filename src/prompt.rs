//! Prompt rendering
//!
//! An instruction template carries the placeholder `{protocol_text}` where the
//! protocol body goes. Rendering substitutes the trimmed protocol for every
//! occurrence in a single pass, so protocol text is never re-scanned.

use serde::Serialize;
use tracing::warn;

pub const PLACEHOLDER: &str = "{protocol_text}";

const TRUNCATION_NOTE: &str = "\n[... protocol truncated to fit the prompt limit ...]";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPrompt {
    pub text: String,
    /// Characters dropped from the end of the protocol to respect the limit
    pub truncated_chars: usize,
}

impl RenderedPrompt {
    pub fn was_truncated(&self) -> bool {
        self.truncated_chars > 0
    }

    pub fn warning(&self) -> Option<String> {
        self.was_truncated().then(|| {
            format!(
                "Protocol was truncated by {} characters to fit the prompt limit",
                self.truncated_chars
            )
        })
    }
}

/// Substitute `protocol` into `template`.
///
/// Templates without the placeholder get the protocol appended under a
/// `Protocol:` heading. When the result would exceed `max_chars`, the
/// protocol (never the instruction) is cut at a char boundary and a marker
/// line is added.
pub fn render(template: &str, protocol: &str, max_chars: usize) -> RenderedPrompt {
    let protocol = protocol.trim();
    let occurrences = template.matches(PLACEHOLDER).count().max(1);

    let frame_chars = if template.contains(PLACEHOLDER) {
        template.chars().count() - occurrences * PLACEHOLDER.chars().count()
    } else {
        template.chars().count() + "\n\nProtocol:\n".len()
    };

    let protocol_chars = protocol.chars().count();
    let total = frame_chars + occurrences * protocol_chars;

    let (body, truncated_chars) = if total <= max_chars {
        (protocol.to_string(), 0)
    } else {
        let note_chars = TRUNCATION_NOTE.chars().count();
        let room = max_chars
            .saturating_sub(frame_chars)
            .checked_div(occurrences)
            .unwrap_or(0)
            .saturating_sub(note_chars);
        let kept: String = protocol.chars().take(room).collect();
        let dropped = protocol_chars - kept.chars().count();
        warn!(
            protocol_chars,
            max_chars, dropped, "Prompt exceeds limit, truncating protocol"
        );
        (format!("{}{}", kept, TRUNCATION_NOTE), dropped)
    };

    let text = if template.contains(PLACEHOLDER) {
        template.replace(PLACEHOLDER, &body)
    } else {
        format!("{}\n\nProtocol:\n{}", template.trim_end(), body)
    };

    RenderedPrompt {
        text,
        truncated_chars,
    }
}

//! Inlay hints provider: one badge per placed marker

use tower_lsp::lsp_types::{
    InlayHint, InlayHintKind, InlayHintLabel, InlayHintTooltip, MarkupContent, MarkupKind,
    Position,
};

use crate::markers::{Marker, MarkerKind};
use crate::utils::truncate_string;

/// Shown when the registry reported no latest version
const NO_VERSION_GLYPH: &str = "📦";

/// Longest version label rendered inline
const MAX_LABEL_CHARS: usize = 24;

/// Generate the badge for a marker, anchored at `character` on its line.
///
/// Text markers get no badge: their popover is served by hover instead.
pub fn create_inlay_hint(marker: &Marker, character: u32) -> Option<InlayHint> {
    if marker.kind == MarkerKind::Text {
        return None;
    }

    let label = marker
        .latest
        .as_deref()
        .map(|latest| truncate_string(latest, MAX_LABEL_CHARS))
        .unwrap_or_else(|| NO_VERSION_GLYPH.to_string());

    Some(InlayHint {
        position: Position {
            line: marker.line,
            character,
        },
        label: InlayHintLabel::String(format!(" {}", label)),
        kind: Some(InlayHintKind::TYPE),
        text_edits: None,
        tooltip: Some(InlayHintTooltip::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: marker.tooltip.markdown.clone(),
        })),
        padding_left: Some(true),
        padding_right: None,
        data: None,
    })
}

/// Character offset just past the end of `line` in `content`
pub fn line_end(content: &str, line: u32) -> u32 {
    content
        .lines()
        .nth(line as usize)
        .map(|text| text.encode_utf16().count() as u32)
        .unwrap_or(0)
}

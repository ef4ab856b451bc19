//! Hover provider: the popover for the marker on the hovered line

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use crate::markers::Marker;

/// Build the hover for a marker spanning `line_len` characters of its line
pub fn create_hover(marker: &Marker, line_len: u32) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: marker.tooltip.markdown.clone(),
        }),
        range: Some(Range {
            start: Position {
                line: marker.line,
                character: 0,
            },
            end: Position {
                line: marker.line,
                character: line_len,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerKind;
    use crate::providers::tooltip::Tooltip;

    #[test]
    fn test_hover_covers_line() {
        let marker = Marker {
            name: "axios".into(),
            line: 4,
            kind: MarkerKind::Text,
            latest: Some("1.0.0".into()),
            tooltip: Tooltip {
                markdown: "### axios".into(),
                incomplete: false,
            },
        };
        let hover = create_hover(&marker, 18);
        let range = hover.range.unwrap();
        assert_eq!(range.start, Position { line: 4, character: 0 });
        assert_eq!(range.end, Position { line: 4, character: 18 });
        match hover.contents {
            HoverContents::Markup(content) => assert_eq!(content.value, "### axios"),
            _ => panic!("expected markdown"),
        }
    }
}

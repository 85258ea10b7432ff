//! Line classification for bot replies.
//!
//! A reply is displayed line by line. Each line is classified on its own, so
//! the formatter needs no state beyond the string it was handed and can be
//! re-run on the same text at any time.

const HEADING_MARKER: &str = "**";
const BULLET_MARKERS: [&str; 2] = ["• ", "- "];

/// One display line of a bot reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSegment<'a> {
    /// `**Title**` with the markers removed
    Heading(&'a str),
    /// A bullet line, marker included
    BulletItem(&'a str),
    /// Any other line with visible content
    Plain(&'a str),
    /// A blank line, kept as vertical spacing
    Spacer,
}

fn classify(line: &str) -> LineSegment<'_> {
    if line.len() >= 2 * HEADING_MARKER.len()
        && line.starts_with(HEADING_MARKER)
        && line.ends_with(HEADING_MARKER)
    {
        let inner = &line[HEADING_MARKER.len()..line.len() - HEADING_MARKER.len()];
        LineSegment::Heading(inner)
    } else if BULLET_MARKERS.iter().any(|marker| line.starts_with(marker)) {
        LineSegment::BulletItem(line)
    } else if !line.trim().is_empty() {
        LineSegment::Plain(line)
    } else {
        LineSegment::Spacer
    }
}

/// Split `text` on newlines and classify every line.
pub fn format_lines(text: &str) -> impl Iterator<Item = LineSegment<'_>> + '_ {
    text.split('\n').map(classify)
}

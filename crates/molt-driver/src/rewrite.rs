//! Range-based source rewriting.

use molt_scan::Span;

/// One pending replacement of a byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

/// Applies all edits to `text`.
///
/// Edits are applied in descending order of start offset, so applying one
/// never invalidates the offsets of an edit still pending. Ranges must not
/// overlap; specifier scans never produce overlapping ranges by
/// construction.
pub fn rewrite(text: &str, edits: &[Edit]) -> String {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.span.start.cmp(&a.span.start));

    let mut result = text.to_string();
    for edit in ordered {
        result.replace_range(edit.span.start..edit.span.end, &edit.replacement);
    }
    result
}

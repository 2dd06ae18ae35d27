//! Match overlay
//!
//! Converts character offsets of the active query into span positions and
//! paints them as highlight fragments inside the spans. Painting is
//! incremental: every operation reports which spans it touched so the
//! surface only has to repaint those.

use crate::error::{MappingFailure, TextLayerError, TextLayerResult};
use crate::text_layer::{SpanId, TextSpan};
use std::collections::BTreeSet;
use std::fmt;

/// A character position inside one span
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanPosition {
    /// Span index
    pub span: SpanId,

    /// Offset in characters from the start of the span's text
    pub offset: usize,
}

impl SpanPosition {
    pub fn new(span: SpanId, offset: usize) -> Self {
        Self { span, offset }
    }
}

/// One occurrence of the query, `begin <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub begin: SpanPosition,
    pub end: SpanPosition,
}

/// Which part of a match a fragment or span shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    /// Match begins and ends in this span
    Whole,
    /// First span of a multi-span match
    Begin,
    /// Span fully inside a multi-span match
    Middle,
    /// Last span of a multi-span match
    End,
}

/// Highlight styling of a fragment or a whole span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightClass {
    pub kind: HighlightKind,

    /// Part of the currently selected match
    pub selected: bool,
}

impl HighlightClass {
    pub fn new(kind: HighlightKind, selected: bool) -> Self {
        Self { kind, selected }
    }

    /// Class list as the surface applies it, e.g. `"highlight begin selected"`
    pub fn class_name(&self) -> String {
        let mut name = String::from("highlight");
        match self.kind {
            HighlightKind::Whole => {}
            HighlightKind::Begin => name.push_str(" begin"),
            HighlightKind::Middle => name.push_str(" middle"),
            HighlightKind::End => name.push_str(" end"),
        }
        if self.selected {
            name.push_str(" selected");
        }
        name
    }
}

impl fmt::Display for HighlightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class_name())
    }
}

/// A run of text inside a span, optionally highlighted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub class: Option<HighlightClass>,
}

impl Fragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }

    pub fn highlighted(text: impl Into<String>, class: HighlightClass) -> Self {
        Self {
            text: text.into(),
            class: Some(class),
        }
    }
}

/// Displayed content of a span
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanContent {
    /// Child fragments in order
    pub fragments: Vec<Fragment>,

    /// Class on the span itself (middle spans of a multi-span match)
    pub class: Option<HighlightClass>,
}

impl SpanContent {
    /// Unhighlighted content holding `text`
    pub fn plain(text: &str) -> Self {
        let fragments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Fragment::plain(text)]
        };
        Self {
            fragments,
            class: None,
        }
    }

    /// Concatenated fragment text
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Whether nothing in the span is highlighted
    pub fn is_plain(&self) -> bool {
        self.class.is_none() && self.fragments.iter().all(|f| f.class.is_none())
    }
}

/// Slice `text` by character offsets; `end == None` means to the end
///
/// Offsets past the end clamp; an inverted range is empty.
pub fn char_slice(text: &str, start: usize, end: Option<usize>) -> &str {
    let byte_at = |n: usize| text.char_indices().nth(n).map_or(text.len(), |(b, _)| b);
    let start = byte_at(start);
    let end = end.map_or(text.len(), byte_at);
    if start >= end {
        ""
    } else {
        &text[start..end]
    }
}

/// Find-controller view of one page, as far as painting is concerned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightState {
    /// Paint every match, not only the selected one
    pub highlight_all: bool,

    /// This page holds the selected match
    pub selected_page: bool,

    /// Index of the selected match within this page's matches
    pub selected_match: Option<usize>,
}

impl HighlightState {
    /// Whether match `index` is the selected one
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected_page && self.selected_match == Some(index)
    }
}

/// Result of a paint or clear operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayUpdate {
    /// Spans whose content changed
    pub dirty: BTreeSet<SpanId>,

    /// Span to bring into view (begin of the selected match)
    pub scroll_to: Option<SpanId>,
}

impl OverlayUpdate {
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty() && self.scroll_to.is_none()
    }
}

/// Forward-only position in the cumulative span text
#[derive(Debug, Clone, Copy)]
struct Walk {
    index: usize,
    base: usize,
}

impl Walk {
    /// Advance past spans that end before `target` (or at it, when `inclusive`)
    fn advance(&mut self, lengths: &[usize], target: usize, inclusive: bool) {
        let last = lengths.len().saturating_sub(1);
        while self.index < last {
            let span_end = self.base + lengths[self.index];
            let past = if inclusive {
                target >= span_end
            } else {
                target > span_end
            };
            if !past {
                break;
            }
            self.base = span_end;
            self.index += 1;
        }
    }

    fn position(&self, target: usize) -> SpanPosition {
        SpanPosition::new(self.index, target - self.base)
    }
}

/// Map one offset, advancing `walk`
fn map_offset(
    walk: &mut Walk,
    lengths: &[usize],
    total: usize,
    previous: Option<usize>,
    offset: usize,
    query_len: usize,
) -> TextLayerResult<Match> {
    let failure = if lengths.is_empty() {
        Some(MappingFailure::NoSpans)
    } else if previous.is_some_and(|prev| offset < prev) {
        Some(MappingFailure::OutOfOrder)
    } else {
        None
    };
    if let Some(reason) = failure {
        return Err(TextLayerError::Mapping { offset, reason });
    }
    let Some(target) = offset.checked_add(query_len).filter(|end| *end <= total) else {
        return Err(TextLayerError::Mapping {
            offset,
            reason: MappingFailure::PastEnd,
        });
    };

    walk.advance(lengths, offset, true);
    let begin = walk.position(offset);

    let mut end_walk = *walk;
    end_walk.advance(lengths, target, false);
    let end = end_walk.position(target);

    Ok(Match { begin, end })
}

/// Convert ascending character offsets into span positions
///
/// Offsets that cannot be mapped are logged and skipped.
pub fn convert_matches(spans: &[TextSpan], offsets: &[usize], query_len: usize) -> Vec<Match> {
    let lengths: Vec<usize> = spans.iter().map(TextSpan::char_len).collect();
    let total = lengths.iter().sum();

    let mut walk = Walk { index: 0, base: 0 };
    let mut previous = None;
    let mut matches = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        match map_offset(&mut walk, &lengths, total, previous, offset, query_len) {
            Ok(m) => {
                matches.push(m);
                previous = Some(offset);
            }
            Err(err) => log::warn!("{err}"),
        }
    }

    matches
}

/// Writes fragments into spans and records what it touched
struct Painter<'a> {
    spans: &'a mut [TextSpan],
    dirty: BTreeSet<SpanId>,
}

impl<'a> Painter<'a> {
    fn new(spans: &'a mut [TextSpan]) -> Self {
        Self {
            spans,
            dirty: BTreeSet::new(),
        }
    }

    fn span(&mut self, id: SpanId) -> Option<&mut TextSpan> {
        let count = self.spans.len();
        let span = self.spans.get_mut(id);
        if span.is_none() {
            log::warn!("{}", TextLayerError::UnknownSpan { index: id, count });
        }
        span
    }

    /// Replace the span's content with its text up to `pos`
    fn begin_text(&mut self, pos: SpanPosition, class: Option<HighlightClass>) {
        let Some(span) = self.span(pos.span) else {
            return;
        };
        let prefix = char_slice(span.text(), 0, Some(pos.offset)).to_string();
        span.content.fragments.clear();
        if !prefix.is_empty() {
            span.content.fragments.push(Fragment { text: prefix, class });
        }
        self.dirty.insert(pos.span);
    }

    /// Append the span's text from `from` up to `to` (or the end)
    fn append_text(&mut self, from: SpanPosition, to: Option<usize>, class: Option<HighlightClass>) {
        let Some(span) = self.span(from.span) else {
            return;
        };
        let text = char_slice(span.text(), from.offset, to).to_string();
        if text.is_empty() {
            return;
        }
        span.content.fragments.push(Fragment { text, class });
        self.dirty.insert(from.span);
    }

    fn highlight_span(&mut self, id: SpanId, class: HighlightClass) {
        if let Some(span) = self.span(id) {
            span.content.class = Some(class);
            self.dirty.insert(id);
        }
    }
}

/// Paint `matches` into `spans`
///
/// Paints every match when `highlight_all` is set, otherwise only the
/// selected match on the selected page. A match starting before the end of
/// the previous one is logged and skipped. Expects the spans to hold plain
/// content, see [`clear_matches`].
pub fn render_matches(
    spans: &mut [TextSpan],
    matches: &[Match],
    state: &HighlightState,
) -> OverlayUpdate {
    if matches.is_empty() {
        return OverlayUpdate::default();
    }

    let range = if state.highlight_all {
        0..matches.len()
    } else if state.selected_page {
        match state.selected_match {
            Some(index) if index < matches.len() => index..index + 1,
            _ => return OverlayUpdate::default(),
        }
    } else {
        return OverlayUpdate::default();
    };

    let mut painter = Painter::new(spans);
    let mut scroll_to = None;
    let mut prev_end: Option<SpanPosition> = None;

    for index in range {
        let Match { begin, end } = matches[index];
        if prev_end.is_some_and(|prev| begin < prev) {
            log::warn!(
                "match {index} at {}:{} overlaps the previous match, skipping",
                begin.span,
                begin.offset
            );
            continue;
        }
        let selected = state.is_selected(index);
        if selected {
            scroll_to = Some(begin.span);
        }

        match prev_end {
            Some(prev) if prev.span == begin.span => {
                painter.append_text(prev, Some(begin.offset), None);
            }
            _ => {
                if let Some(prev) = prev_end {
                    painter.append_text(prev, None, None);
                }
                painter.begin_text(begin, None);
            }
        }

        if begin.span == end.span {
            let class = HighlightClass::new(HighlightKind::Whole, selected);
            painter.append_text(begin, Some(end.offset), Some(class));
        } else {
            let class = HighlightClass::new(HighlightKind::Begin, selected);
            painter.append_text(begin, None, Some(class));
            for middle in begin.span + 1..end.span {
                painter.highlight_span(middle, HighlightClass::new(HighlightKind::Middle, selected));
            }
            painter.begin_text(end, Some(HighlightClass::new(HighlightKind::End, selected)));
        }
        prev_end = Some(end);
    }

    if let Some(prev) = prev_end {
        painter.append_text(prev, None, None);
    }

    OverlayUpdate {
        dirty: painter.dirty,
        scroll_to,
    }
}

/// Restore every span covered by `matches` to plain text
///
/// Only spans whose content actually changes are reported, so a second call
/// reports nothing.
pub fn clear_matches(spans: &mut [TextSpan], matches: &[Match]) -> BTreeSet<SpanId> {
    let mut dirty = BTreeSet::new();
    let mut cleared_until = 0;

    for m in matches {
        let first = cleared_until.max(m.begin.span);
        for id in first..=m.end.span {
            let Some(span) = spans.get_mut(id) else {
                break;
            };
            let plain = SpanContent::plain(span.text());
            if span.content != plain {
                span.content = plain;
                dirty.insert(id);
            }
        }
        cleared_until = cleared_until.max(m.end.span + 1);
    }

    dirty
}

/// Offsets and selection for one repaint
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    /// Ascending character offsets into the page text
    pub offsets: &'a [usize],

    /// Query length in characters
    pub query_len: usize,

    pub state: HighlightState,
}

/// Tracks the painted matches of one page
#[derive(Debug, Clone, Default)]
pub struct MatchOverlay {
    matches: Vec<Match>,
}

impl MatchOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches currently painted
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Convert and remember `offsets` without painting
    pub fn set_matches(&mut self, spans: &[TextSpan], offsets: &[usize], query_len: usize) -> &[Match] {
        self.matches = convert_matches(spans, offsets, query_len);
        &self.matches
    }

    /// Clear the previous matches, then paint the requested ones
    ///
    /// With no request (inactive search) the overlay is only cleared.
    pub fn update(&mut self, spans: &mut [TextSpan], request: Option<MatchRequest<'_>>) -> OverlayUpdate {
        let mut dirty = clear_matches(spans, &self.matches);
        self.matches.clear();

        let Some(request) = request else {
            return OverlayUpdate {
                dirty,
                scroll_to: None,
            };
        };

        self.set_matches(spans, request.offsets, request.query_len);
        let painted = render_matches(spans, &self.matches, &request.state);
        log::trace!(
            "painted {} matches, {} spans dirty",
            self.matches.len(),
            painted.dirty.len()
        );

        dirty.extend(painted.dirty);
        OverlayUpdate {
            dirty,
            scroll_to: painted.scroll_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::SpanRole;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spans(texts: &[&str]) -> Vec<TextSpan> {
        texts
            .iter()
            .map(|text| {
                let mut span = TextSpan::new(0, SpanRole::Inline, 10.0);
                span.text = Some(text.to_string());
                span.content = SpanContent::plain(text);
                span
            })
            .collect()
    }

    fn all() -> HighlightState {
        HighlightState {
            highlight_all: true,
            selected_page: false,
            selected_match: None,
        }
    }

    fn find_all(text: &str, query: &str) -> Vec<usize> {
        let chars: Vec<char> = text.chars().collect();
        let needle: Vec<char> = query.chars().collect();
        let mut offsets = Vec::new();
        let mut i = 0;
        while i + needle.len() <= chars.len() {
            if chars[i..i + needle.len()] == needle[..] {
                offsets.push(i);
                i += needle.len();
            } else {
                i += 1;
            }
        }
        offsets
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("héllo", 1, Some(3)), "él");
        assert_eq!(char_slice("héllo", 3, None), "lo");
        assert_eq!(char_slice("abc", 5, None), "");
        assert_eq!(char_slice("abc", 2, Some(1)), "");
    }

    #[test]
    fn test_class_names() {
        assert_eq!(HighlightClass::new(HighlightKind::Whole, false).class_name(), "highlight");
        assert_eq!(
            HighlightClass::new(HighlightKind::Begin, true).to_string(),
            "highlight begin selected"
        );
        assert_eq!(HighlightClass::new(HighlightKind::Middle, false).class_name(), "highlight middle");
    }

    #[test]
    fn test_match_within_one_span() {
        let mut spans = spans(&["hello world"]);
        let matches = convert_matches(&spans, &[6], 5);
        assert_eq!(
            matches,
            vec![Match {
                begin: SpanPosition::new(0, 6),
                end: SpanPosition::new(0, 11),
            }]
        );

        let update = render_matches(&mut spans, &matches, &all());
        assert_eq!(update.dirty, BTreeSet::from([0]));
        assert_eq!(
            spans[0].content.fragments,
            vec![
                Fragment::plain("hello "),
                Fragment::highlighted("world", HighlightClass::new(HighlightKind::Whole, false)),
            ]
        );
    }

    #[test]
    fn test_match_across_spans() {
        let mut spans = spans(&["hel", "lo world"]);
        let matches = convert_matches(&spans, &[1], 3);
        assert_eq!(
            matches,
            vec![Match {
                begin: SpanPosition::new(0, 1),
                end: SpanPosition::new(1, 1),
            }]
        );

        render_matches(&mut spans, &matches, &all());
        let begin = HighlightClass::new(HighlightKind::Begin, false);
        let end = HighlightClass::new(HighlightKind::End, false);
        assert_eq!(
            spans[0].content.fragments,
            vec![Fragment::plain("h"), Fragment::highlighted("el", begin)]
        );
        assert_eq!(
            spans[1].content.fragments,
            vec![Fragment::highlighted("l", end), Fragment::plain("o world")]
        );
    }

    #[test]
    fn test_middle_spans_get_class() {
        let mut spans = spans(&["ab", "cd", "ef"]);
        let matches = convert_matches(&spans, &[1], 4);
        let state = HighlightState {
            highlight_all: false,
            selected_page: true,
            selected_match: Some(0),
        };

        let update = render_matches(&mut spans, &matches, &state);
        assert_eq!(update.scroll_to, Some(0));
        assert_eq!(update.dirty, BTreeSet::from([0, 1, 2]));
        assert_eq!(
            spans[1].content.class,
            Some(HighlightClass::new(HighlightKind::Middle, true))
        );
        assert_eq!(spans[1].content.text(), "cd");
        assert_eq!(
            spans[2].content.fragments[0],
            Fragment::highlighted("e", HighlightClass::new(HighlightKind::End, true))
        );
    }

    #[test]
    fn test_boundary_offsets() {
        let spans = spans(&["abc", "def"]);
        // begin at a span boundary lands in the next span
        let matches = convert_matches(&spans, &[3], 2);
        assert_eq!(matches[0].begin, SpanPosition::new(1, 0));

        // end at a span boundary stays in the span
        let matches = convert_matches(&spans, &[1], 2);
        assert_eq!(matches[0].end, SpanPosition::new(0, 3));
    }

    #[test]
    fn test_empty_spans_are_skipped() {
        let spans = spans(&["ab", "", "cd"]);
        let matches = convert_matches(&spans, &[2], 1);
        assert_eq!(matches[0].begin, SpanPosition::new(2, 0));
        assert_eq!(matches[0].end, SpanPosition::new(2, 1));
    }

    #[test]
    fn test_unmappable_offsets_are_skipped() {
        let spans = spans(&["abc", "def"]);
        let matches = convert_matches(&spans, &[4, 2, 5, 10], 1);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].begin, SpanPosition::new(1, 1));
        assert_eq!(matches[1].begin, SpanPosition::new(1, 2));

        assert!(convert_matches(&[], &[0], 1).is_empty());
    }

    #[test]
    fn test_mapping_failure_reasons() {
        let lengths = [3, 3];
        let mut walk = Walk { index: 0, base: 0 };
        let err = map_offset(&mut walk, &lengths, 6, Some(4), 2, 1).unwrap_err();
        assert_eq!(
            err,
            TextLayerError::Mapping {
                offset: 2,
                reason: MappingFailure::OutOfOrder
            }
        );

        let err = map_offset(&mut walk, &lengths, 6, None, 5, 2).unwrap_err();
        assert!(matches!(
            err,
            TextLayerError::Mapping {
                reason: MappingFailure::PastEnd,
                ..
            }
        ));

        let err = map_offset(&mut walk, &[], 0, None, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            TextLayerError::Mapping {
                reason: MappingFailure::NoSpans,
                ..
            }
        ));

        let err = map_offset(&mut walk, &lengths, 6, None, usize::MAX, 3).unwrap_err();
        assert_eq!(
            err,
            TextLayerError::Mapping {
                offset: usize::MAX,
                reason: MappingFailure::PastEnd
            }
        );
    }

    #[test]
    fn test_huge_offset_is_skipped() {
        let spans = spans(&["hello"]);
        assert!(convert_matches(&spans, &[usize::MAX], 3).is_empty());
        assert_eq!(convert_matches(&spans, &[0, usize::MAX - 1], 2).len(), 1);
    }

    #[test]
    fn test_overlapping_matches_keep_span_text() {
        let mut spans = spans(&["aaa"]);
        let matches = convert_matches(&spans, &[0, 1], 2);
        assert_eq!(matches.len(), 2);

        render_matches(&mut spans, &matches, &all());
        assert_eq!(spans[0].content.text(), spans[0].text());
        assert_eq!(
            spans[0].content.fragments,
            vec![
                Fragment::highlighted("aa", HighlightClass::new(HighlightKind::Whole, false)),
                Fragment::plain("a"),
            ]
        );

        let mut spans = self::spans(&["aa", "aa"]);
        let matches = convert_matches(&spans, &[1, 2], 2);
        render_matches(&mut spans, &matches, &all());
        for span in &spans {
            assert_eq!(span.content.text(), span.text());
        }
    }

    #[test]
    fn test_overlapping_matches_map_independently() {
        let spans = spans(&["aa", "a"]);
        let matches = convert_matches(&spans, &[0, 1], 2);
        assert_eq!(matches[0].end, SpanPosition::new(0, 2));
        assert_eq!(matches[1].begin, SpanPosition::new(0, 1));
        assert_eq!(matches[1].end, SpanPosition::new(1, 1));
    }

    #[test]
    fn test_render_noop_cases() {
        let mut spans = spans(&["hello"]);
        let matches = convert_matches(&spans, &[0], 2);

        assert!(render_matches(&mut spans, &[], &all()).is_empty());
        assert!(render_matches(&mut spans, &matches, &HighlightState::default()).is_empty());

        let stale = HighlightState {
            highlight_all: false,
            selected_page: true,
            selected_match: Some(3),
        };
        assert!(render_matches(&mut spans, &matches, &stale).is_empty());
        assert!(spans[0].content.is_plain());
    }

    #[test]
    fn test_only_selected_match_is_painted() {
        let mut spans = spans(&["one two one"]);
        let matches = convert_matches(&spans, &[0, 8], 3);
        let state = HighlightState {
            highlight_all: false,
            selected_page: true,
            selected_match: Some(1),
        };

        render_matches(&mut spans, &matches, &state);
        assert_eq!(
            spans[0].content.fragments,
            vec![
                Fragment::plain("one two "),
                Fragment::highlighted("one", HighlightClass::new(HighlightKind::Whole, true)),
            ]
        );
    }

    #[test]
    fn test_gap_between_matches_in_same_span() {
        let mut spans = spans(&["abcabc"]);
        let matches = convert_matches(&spans, &[0, 3], 2);
        render_matches(&mut spans, &matches, &all());

        let whole = HighlightClass::new(HighlightKind::Whole, false);
        assert_eq!(
            spans[0].content.fragments,
            vec![
                Fragment::highlighted("ab", whole),
                Fragment::plain("c"),
                Fragment::highlighted("ab", whole),
                Fragment::plain("c"),
            ]
        );
    }

    #[test]
    fn test_clear_restores_and_is_idempotent() {
        let mut spans = spans(&["ab", "cd", "ef", "gh"]);
        let matches = convert_matches(&spans, &[1, 6], 2);
        render_matches(&mut spans, &matches, &all());

        let dirty = clear_matches(&mut spans, &matches);
        assert_eq!(dirty, BTreeSet::from([0, 1, 3]));
        assert!(spans.iter().all(|s| s.content == SpanContent::plain(s.text())));

        assert!(clear_matches(&mut spans, &matches).is_empty());
    }

    #[test]
    fn test_overlay_update_clears_previous() {
        let mut spans = spans(&["alpha", "beta", "gamma"]);
        let mut overlay = MatchOverlay::new();

        let first = overlay.update(
            &mut spans,
            Some(MatchRequest {
                offsets: &[0],
                query_len: 3,
                state: all(),
            }),
        );
        assert_eq!(first.dirty, BTreeSet::from([0]));

        let second = overlay.update(
            &mut spans,
            Some(MatchRequest {
                offsets: &[9],
                query_len: 3,
                state: all(),
            }),
        );
        assert_eq!(second.dirty, BTreeSet::from([0, 2]));
        assert!(spans[0].content.is_plain());
        assert!(!spans[2].content.is_plain());

        let cleared = overlay.update(&mut spans, None);
        assert_eq!(cleared.dirty, BTreeSet::from([2]));
        assert!(overlay.matches().is_empty());
        assert!(spans.iter().all(|s| s.content.is_plain()));
    }

    fn random_spans(rng: &mut StdRng) -> Vec<TextSpan> {
        let alphabet = ['a', 'b', 'é', ' '];
        let count = rng.gen_range(1..8);
        let texts: Vec<String> = (0..count)
            .map(|_| {
                let len = rng.gen_range(0..6);
                (0..len).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect()
            })
            .collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        spans(&refs)
    }

    #[test]
    fn test_walk_is_monotonic_and_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let spans = random_spans(&mut rng);
            let text: String = spans.iter().map(TextSpan::text).collect();
            let query = ["a", "ab", "é a", "ba"][rng.gen_range(0..4)];
            let query_len = query.chars().count();
            let offsets = find_all(&text, query);

            let matches = convert_matches(&spans, &offsets, query_len);
            assert_eq!(matches.len(), offsets.len());

            let mut previous: Option<SpanPosition> = None;
            for m in &matches {
                assert!(m.begin <= m.end);
                assert!(m.end.span < spans.len());
                if let Some(prev) = previous {
                    assert!(prev <= m.begin);
                }
                previous = Some(m.begin);

                let mut covered = String::new();
                for id in m.begin.span..=m.end.span {
                    let from = if id == m.begin.span { m.begin.offset } else { 0 };
                    let to = (id == m.end.span).then_some(m.end.offset);
                    covered.push_str(char_slice(spans[id].text(), from, to));
                }
                assert_eq!(covered, query);
            }
        }
    }

    #[test]
    fn test_render_then_clear_round_trip() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let mut spans = random_spans(&mut rng);
            let text: String = spans.iter().map(TextSpan::text).collect();
            let query = ["a", "b", "ab", "a é"][rng.gen_range(0..4)];
            let offsets = find_all(&text, query);
            let matches = convert_matches(&spans, &offsets, query.chars().count());

            render_matches(&mut spans, &matches, &all());
            for span in &spans {
                assert_eq!(span.content.text(), span.text());
            }

            clear_matches(&mut spans, &matches);
            for span in &spans {
                assert_eq!(span.content, SpanContent::plain(span.text()));
            }
            assert!(clear_matches(&mut spans, &matches).is_empty());
        }
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text_metrics::{FontSpec, TextMetrics};

use super::TextBlock;

pub const ELLIPSIS: &str = "\u{2026}";

static BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse markup line breaks and whitespace runs into single spaces.
/// Whitespace-only input becomes empty.
pub fn normalize_label_text(text: &str) -> String {
    let without_breaks = BREAK_RE.replace_all(text, " ");
    SPACE_RE
        .replace_all(&without_breaks, " ")
        .trim()
        .to_string()
}

/// Greedy word wrap. Words wider than `max_width` are split at the longest
/// fitting character prefix; a line always holds at least one character.
pub fn wrap_text<M: TextMetrics + ?Sized>(
    text: &str,
    max_width: f32,
    font_size: f32,
    font: &FontSpec,
    metrics: &M,
) -> Vec<String> {
    let width = |s: &str| metrics.measure(s, font, font_size);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if width(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if width(word) <= max_width {
            current.push_str(word);
            continue;
        }
        let mut rest = word;
        while !rest.is_empty() {
            let cut = longest_fitting_prefix(rest, max_width, &|prefix| width(prefix));
            let (head, tail) = rest.split_at(cut);
            if tail.is_empty() {
                current.push_str(head);
            } else {
                lines.push(head.to_string());
            }
            rest = tail;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Single-line truncation with a trailing ellipsis.
///
/// Returns the text unchanged when it fits (with `force_ellipsis`, the text
/// plus ellipsis). Otherwise keeps the longest prefix that fits together with
/// the ellipsis, never fewer than one character. Returns an empty string only
/// when the ellipsis alone does not fit.
pub fn truncate_text<M: TextMetrics + ?Sized>(
    text: &str,
    max_width: f32,
    font_size: f32,
    font: &FontSpec,
    metrics: &M,
    force_ellipsis: bool,
) -> String {
    let width = |s: &str| metrics.measure(s, font, font_size);
    if !force_ellipsis && width(text) <= max_width {
        return text.to_string();
    }
    if width(ELLIPSIS) > max_width {
        return String::new();
    }
    let trimmed = text.trim();
    if force_ellipsis {
        let with_ellipsis = format!("{}{ELLIPSIS}", trimmed);
        if width(&with_ellipsis) <= max_width {
            return with_ellipsis;
        }
    }
    if trimmed.is_empty() {
        return ELLIPSIS.to_string();
    }

    let ends = prefix_ends(trimmed);
    let fits = |count: usize| {
        let prefix = &trimmed[..byte_end(&ends, count)];
        width(&format!("{}{ELLIPSIS}", prefix.trim_end())) <= max_width
    };
    // Largest char count in [0, len) whose prefix plus ellipsis fits.
    let (mut lo, mut hi) = (0usize, ends.len() - 1);
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let mut prefix = trimmed[..byte_end(&ends, lo)].trim_end();
    if prefix.is_empty() {
        prefix = &trimmed[..ends[0]];
    }
    format!("{prefix}{ELLIPSIS}")
}

/// Wrap, then cap the line count. Overflowing text is folded into the last
/// kept line and truncated with an ellipsis. An empty result means the text
/// cannot be laid out at this width.
pub fn fit_lines<M: TextMetrics + ?Sized>(
    text: &str,
    max_width: f32,
    max_lines: Option<usize>,
    font_size: f32,
    font: &FontSpec,
    metrics: &M,
) -> Vec<String> {
    let mut lines = wrap_text(text, max_width, font_size, font, metrics);
    let Some(max_lines) = max_lines else {
        return lines;
    };
    let max_lines = max_lines.max(1);
    if lines.len() <= max_lines {
        return lines;
    }
    let rest = lines.split_off(max_lines - 1).join(" ");
    let last = truncate_text(&rest, max_width, font_size, font, metrics, true);
    if last.is_empty() {
        return Vec::new();
    }
    lines.push(last);
    lines
}

pub fn measure_block<M: TextMetrics + ?Sized>(
    lines: Vec<String>,
    font_size: f32,
    line_height: f32,
    font: &FontSpec,
    metrics: &M,
) -> TextBlock {
    let width = lines
        .iter()
        .map(|line| metrics.measure(line, font, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

/// Byte offset just past each character.
fn prefix_ends(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(idx, ch)| idx + ch.len_utf8())
        .collect()
}

fn byte_end(ends: &[usize], count: usize) -> usize {
    if count == 0 { 0 } else { ends[count - 1] }
}

/// Byte length of the longest prefix (at least one character) whose width
/// fits `max_width`.
fn longest_fitting_prefix(text: &str, max_width: f32, width: &dyn Fn(&str) -> f32) -> usize {
    let ends = prefix_ends(text);
    if ends.is_empty() {
        return 0;
    }
    let (mut lo, mut hi) = (1usize, ends.len());
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if width(&text[..ends[mid - 1]]) <= max_width {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    ends[lo - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::HeuristicMetrics;

    // 10px font with the heuristic metrics: ~6px per character. Widths sit a
    // hair above whole multiples, so budgets below leave a little slack.
    const SIZE: f32 = 10.0;

    fn wrap(text: &str, max_width: f32) -> Vec<String> {
        wrap_text(text, max_width, SIZE, &FontSpec::default(), &HeuristicMetrics::default())
    }

    fn truncate(text: &str, max_width: f32, force: bool) -> String {
        truncate_text(
            text,
            max_width,
            SIZE,
            &FontSpec::default(),
            &HeuristicMetrics::default(),
            force,
        )
    }

    #[test]
    fn normalize_collapses_breaks_and_whitespace() {
        assert_eq!(normalize_label_text("  a<br/>b <BR> c\n\td  "), "a b c d");
        assert_eq!(normalize_label_text(" \t\n "), "");
    }

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        assert_eq!(wrap("short text", 1000.0), vec!["short text"]);
    }

    #[test]
    fn wrap_breaks_on_words() {
        // 10 chars per line
        assert_eq!(
            wrap("alpha beta gamma delta", 62.0),
            vec!["alpha beta", "gamma", "delta"]
        );
    }

    #[test]
    fn wrap_splits_long_tokens() {
        let lines = wrap("see https://example.com/a/very/long/path", 62.0);
        assert_eq!(lines[0], "see");
        assert!(lines.iter().all(|line| line.chars().count() <= 10));
        assert_eq!(lines[1..].concat(), "https://example.com/a/very/long/path");
    }

    #[test]
    fn wrap_keeps_one_char_floor() {
        let lines = wrap("abc", 1.0);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn wrap_empty_text_yields_no_lines() {
        assert!(wrap("   ", 100.0).is_empty());
    }

    #[test]
    fn truncate_returns_fitting_text_unchanged() {
        assert_eq!(truncate("hello", 31.0, false), "hello");
        assert_eq!(truncate("hello", 37.0, true), "hello\u{2026}");
    }

    #[test]
    fn truncate_adds_ellipsis_to_longest_prefix() {
        // 5 chars budget: 4 chars + ellipsis
        assert_eq!(truncate("hello world", 31.0, false), "hell\u{2026}");
        // trailing whitespace is trimmed before the ellipsis
        assert_eq!(truncate("hell world", 37.0, false), "hell\u{2026}");
    }

    #[test]
    fn truncate_is_idempotent() {
        for max in [6.0, 12.0, 20.0, 30.0, 45.0] {
            let once = truncate("the quick brown fox", max, false);
            assert_eq!(truncate(&once, max, false), once, "max {max}");
        }
    }

    #[test]
    fn truncate_keeps_single_char_floor() {
        assert_eq!(truncate("abcdef", 7.0, false), "a\u{2026}");
        assert_eq!(truncate("abcdef", 5.0, false), "");
    }

    #[test]
    fn fit_lines_folds_overflow_into_last_line() {
        let lines = fit_lines(
            "alpha beta gamma delta",
            62.0,
            Some(2),
            SIZE,
            &FontSpec::default(),
            &HeuristicMetrics::default(),
        );
        assert_eq!(lines, vec!["alpha beta", "gamma del\u{2026}"]);
        let unlimited = fit_lines(
            "alpha beta gamma delta",
            62.0,
            None,
            SIZE,
            &FontSpec::default(),
            &HeuristicMetrics::default(),
        );
        assert_eq!(unlimited.len(), 3);
    }

    #[test]
    fn measure_block_uses_widest_line() {
        let block = measure_block(
            vec!["ab".to_string(), "abcd".to_string()],
            SIZE,
            1.2,
            &FontSpec::default(),
            &HeuristicMetrics::default(),
        );
        assert!((block.width - 24.0).abs() < 1e-4);
        assert!((block.height - 24.0).abs() < 1e-4);
    }
}

//! Text measurement and line breaking
//!
//! Widths are estimated from character counts, not from glyph metrics.
//! Line breaks are therefore approximate; a real metrics backend can be
//! plugged in through [`WidthEstimator`] without touching callers.

use crate::constants::{AVERAGE_CHAR_WIDTH_RATIO, DEFAULT_LINE_HEIGHT};
use crate::layout::ListType;

/// Estimates the advance width of a run of text
pub trait WidthEstimator: Send + Sync {
    fn estimate(&self, text: &str, font_size: f32, font_family: &str) -> f32;
}

/// Constant-width approximation tuned per font family
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    fn family_multiplier(font_family: &str) -> f32 {
        if font_family.contains("Arial") || font_family.contains("Helvetica") {
            0.9
        } else if font_family.contains("Times") || font_family.contains("Serif") {
            1.1
        } else if font_family.contains("Inter") {
            0.95
        } else {
            1.0
        }
    }
}

impl WidthEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str, font_size: f32, font_family: &str) -> f32 {
        text.chars().count() as f32
            * font_size
            * AVERAGE_CHAR_WIDTH_RATIO
            * Self::family_multiplier(font_family)
    }
}

/// Result of wrapping a run of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub line_height: f32,
    pub total_height: f32,
    pub word_count: usize,
}

impl TextLayout {
    fn empty(line_height: f32) -> Self {
        Self {
            lines: Vec::new(),
            line_height: line_height.max(0.0),
            total_height: 0.0,
            word_count: 0,
        }
    }
}

pub struct TextLayoutEngine<E = HeuristicEstimator> {
    estimator: E,
    line_height: f32,
}

impl Default for TextLayoutEngine<HeuristicEstimator> {
    fn default() -> Self {
        Self::new(HeuristicEstimator)
    }
}

impl<E: WidthEstimator> TextLayoutEngine<E> {
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }

    /// Override the line-height multiplier (default 1.2)
    pub fn with_line_height(mut self, multiplier: f32) -> Self {
        self.line_height = multiplier;
        self
    }

    pub fn estimated_width(&self, text: &str, font_size: f32, font_family: &str) -> f32 {
        self.estimator.estimate(text, font_size, font_family)
    }

    /// Greedy word wrap of `text` into lines no wider than `max_width`.
    ///
    /// A single word wider than `max_width` gets a line of its own and is
    /// never split.
    pub fn layout_text(
        &self,
        text: &str,
        font_size: f32,
        max_width: f32,
        font_family: &str,
    ) -> TextLayout {
        let line_height = font_size * self.line_height;
        if text.trim().is_empty() || font_size <= 0.0 || max_width <= 0.0 {
            return TextLayout::empty(line_height);
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in &words {
            let candidate = if current.is_empty() {
                (*word).to_string()
            } else {
                format!("{} {}", current, word)
            };

            if self.estimated_width(&candidate, font_size, font_family) <= max_width {
                current = candidate;
            } else if current.is_empty() {
                lines.push((*word).to_string());
            } else {
                lines.push(std::mem::replace(&mut current, (*word).to_string()));
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }

        TextLayout {
            total_height: lines.len() as f32 * line_height,
            lines,
            line_height,
            word_count: words.len(),
        }
    }

    /// [`format_text`] followed by wrapping each logical line separately
    pub fn layout_paragraphs(
        &self,
        text: &str,
        list_type: ListType,
        font_size: f32,
        max_width: f32,
        font_family: &str,
    ) -> TextLayout {
        let line_height = font_size * self.line_height;
        if font_size <= 0.0 || max_width <= 0.0 {
            return TextLayout::empty(line_height);
        }

        let mut lines = Vec::new();
        let mut word_count = 0;
        for paragraph in format_text(text, list_type) {
            let wrapped = self.layout_text(&paragraph, font_size, max_width, font_family);
            word_count += wrapped.word_count;
            lines.extend(wrapped.lines);
        }

        if lines.is_empty() {
            return TextLayout::empty(line_height);
        }

        TextLayout {
            total_height: lines.len() as f32 * line_height,
            lines,
            line_height,
            word_count,
        }
    }
}

/// Split on newlines, drop blank lines and apply list prefixes
pub fn format_text(text: &str, list_type: ListType) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| match list_type {
            ListType::None => line.to_string(),
            ListType::Bullet => format!("• {}", line),
            ListType::Numbered => format!("{}. {}", i + 1, line),
        })
        .collect()
}

/// Shorten `text` to at most `max_len` characters, ending in "...".
/// Cuts at a word boundary when one falls in the last fifth.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }

    let truncated: String = text.chars().take(max_len - 3).collect();
    if let Some(space) = truncated.rfind(' ') {
        if truncated[..space].chars().count() as f32 > max_len as f32 * 0.8 {
            return format!("{}...", &truncated[..space]);
        }
    }
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_within_width() {
        let engine = TextLayoutEngine::default();
        let layout = engine.layout_text(
            "the quick brown fox jumps over the lazy dog",
            10.0,
            60.0,
            "Courier",
        );
        assert!(layout.lines.len() > 1);
        for line in &layout.lines {
            let single_word = !line.contains(' ');
            assert!(single_word || engine.estimated_width(line, 10.0, "Courier") <= 60.0);
        }
        assert_eq!(layout.word_count, 9);
        assert!((layout.line_height - 12.0).abs() < 1e-5);
        assert!((layout.total_height - layout.lines.len() as f32 * 12.0).abs() < 1e-4);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        let engine = TextLayoutEngine::default();
        let layout = engine.layout_text("a supercalifragilistic b", 10.0, 30.0, "Courier");
        assert_eq!(layout.lines, ["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn degenerate_inputs_give_empty_layout() {
        let engine = TextLayoutEngine::default();
        for layout in [
            engine.layout_text("", 12.0, 100.0, "Inter"),
            engine.layout_text("hello", 0.0, 100.0, "Inter"),
            engine.layout_text("hello", 12.0, 0.0, "Inter"),
            engine.layout_text("hello", 12.0, -5.0, "Inter"),
        ] {
            assert!(layout.lines.is_empty());
            assert_eq!(layout.total_height, 0.0);
            assert_eq!(layout.word_count, 0);
        }
    }

    #[test]
    fn family_multipliers_differ() {
        let e = HeuristicEstimator;
        let sans = e.estimate("abcd", 10.0, "Arial");
        let serif = e.estimate("abcd", 10.0, "Times New Roman");
        let inter = e.estimate("abcd", 10.0, "Inter");
        let other = e.estimate("abcd", 10.0, "Comic");
        assert!(sans < inter && inter < other && other < serif);
    }

    #[test]
    fn line_height_override() {
        let engine = TextLayoutEngine::default().with_line_height(1.5);
        let layout = engine.layout_text("word", 10.0, 100.0, "Inter");
        assert!((layout.line_height - 15.0).abs() < 1e-5);
    }

    #[test]
    fn numbered_and_bullet_lists() {
        assert_eq!(format_text("a\nb", ListType::Numbered), ["1. a", "2. b"]);
        assert_eq!(format_text("a\n\nb", ListType::None), ["a", "b"]);
        assert_eq!(format_text("x\n  \ny", ListType::Bullet), ["• x", "• y"]);
        assert!(format_text("", ListType::Bullet).is_empty());
    }

    #[test]
    fn paragraphs_keep_line_breaks() {
        let engine = TextLayoutEngine::default();
        let layout = engine.layout_paragraphs("one\ntwo", ListType::Numbered, 10.0, 500.0, "Inter");
        assert_eq!(layout.lines, ["1. one", "2. two"]);
        assert_eq!(layout.word_count, 4);
    }

    #[test]
    fn truncation_prefers_word_boundaries() {
        assert_eq!(truncate_text("short", 10), "short");
        let long = "The little fox ran all the way home";
        let cut = truncate_text(long, 20);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 20);
    }
}

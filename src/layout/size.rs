//! Node size estimation.
//!
//! Layout runs before anything is rendered, so sizes are estimated from text
//! length. The only contract is monotonicity (more text never shrinks a
//! node) and determinism; pixel accuracy is not required.

use unicode_width::UnicodeWidthStr;

use crate::map::{NodeRecord, NodeStyle};

/// Estimates the rendered footprint of a node.
pub trait SizeEstimator {
    /// Extent along the depth axis (rendered x).
    fn estimate_width(&self, node: &NodeRecord) -> f64;

    /// Extent along the sibling axis (rendered y).
    fn estimate_height(&self, node: &NodeRecord) -> f64;
}

/// Per-style sizing constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizePolicy {
    /// Wide (CJK) characters per wrapped line; narrow glyphs count half.
    pub per_line_chars: usize,
    /// Width of a node with at most one line of text.
    pub base_width: f64,
    /// Width cap.
    pub max_width: f64,
    /// Fixed chrome height.
    pub height: f64,
}

impl NodeStyle {
    /// Sizing constants for this style.
    pub const fn size_policy(self) -> SizePolicy {
        match self {
            NodeStyle::Nyt => SizePolicy {
                per_line_chars: 14,
                base_width: 220.0,
                max_width: 360.0,
                height: 64.0,
            },
            NodeStyle::Compact => SizePolicy {
                per_line_chars: 18,
                base_width: 180.0,
                max_width: 300.0,
                height: 64.0,
            },
        }
    }
}

impl SizePolicy {
    /// Wrapped line count for `text` at this policy's line budget.
    pub fn wrapped_lines(&self, text: &str) -> usize {
        // Display columns: a CJK glyph is two columns, latin one.
        let columns_per_line = (self.per_line_chars * 2).max(1);
        text.lines()
            .map(|line| UnicodeWidthStr::width(line.trim()))
            .filter(|&w| w > 0)
            .map(|w| w.div_ceil(columns_per_line))
            .sum()
    }

    /// Piecewise width for a total line count.
    pub fn width_for_lines(&self, lines: usize) -> f64 {
        let width = match lines {
            0 | 1 => self.base_width,
            2 | 3 => (self.base_width + self.max_width) / 2.0,
            _ => self.max_width,
        };
        width.clamp(self.base_width, self.max_width.max(self.base_width))
    }
}

/// Default estimator: the node's [`NodeStyle`] picks the [`SizePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleSizeEstimator;

impl SizeEstimator for StyleSizeEstimator {
    fn estimate_width(&self, node: &NodeRecord) -> f64 {
        let policy = node.node_style.size_policy();
        let lines = policy.wrapped_lines(&node.title) + policy.wrapped_lines(&node.description);
        policy.width_for_lines(lines)
    }

    fn estimate_height(&self, node: &NodeRecord) -> f64 {
        node.node_style.size_policy().height
    }
}

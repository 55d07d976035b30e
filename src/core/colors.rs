//! Unified colour system for the dashboard.
//!
//! Providers describe highlights with semantic [`Style`]s; this module is the
//! single place that maps them to terminal colours.
//!
//! # Public API
//! - [`Palette`]: Style to colour mapping, adjustable by providers
//! - [`get_status_color_style`]: Style of a git status code
//!
//! # Colour Scheme
//! - **Staged**: Green
//! - **Modified**: Yellow
//! - **Untracked**: Cyan
//! - **Conflicts**: Red bold
//! - **Hashes**: Yellow, authors blue, relative times muted

use crate::core::git_status::GitStatus;
use crate::dashboard::view_model::{Highlight, HighlightRange, Style};
use colored::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    pub color: Color,
    pub bold: bool,
}

impl Paint {
    pub fn new(color: Color) -> Self {
        Self { color, bold: false }
    }

    pub fn bold(color: Color) -> Self {
        Self { color, bold: true }
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    entries: HashMap<Style, Paint>,
}

impl Default for Palette {
    fn default() -> Self {
        let entries = HashMap::from([
            (Style::Header, Paint::bold(Color::Blue)),
            (Style::Branch, Paint::bold(Color::Magenta)),
            (Style::Staged, Paint::new(Color::Green)),
            (Style::Modified, Paint::new(Color::Yellow)),
            (Style::Untracked, Paint::new(Color::Cyan)),
            (Style::Conflict, Paint::bold(Color::Red)),
            (Style::Added, Paint::new(Color::Green)),
            (Style::Removed, Paint::new(Color::Red)),
            (Style::Hash, Paint::new(Color::Yellow)),
            (Style::Author, Paint::new(Color::Blue)),
            (Style::Muted, Paint::new(Color::BrightBlack)),
        ]);
        Self { entries }
    }
}

impl Palette {
    pub fn set(&mut self, style: Style, paint: Paint) {
        self.entries.insert(style, paint);
    }

    pub fn get(&self, style: Style) -> Paint {
        self.entries
            .get(&style)
            .copied()
            .unwrap_or(Paint::new(Color::White))
    }

    pub fn paint(&self, style: Style, text: &str) -> ColoredString {
        let paint = self.get(style);
        let colored = text.color(paint.color);
        if paint.bold {
            colored.bold()
        } else {
            colored
        }
    }

    /// Apply a line highlight; ranges that are out of order, overlapping or
    /// not on character boundaries are skipped.
    pub fn render_line(&self, text: &str, highlight: Option<&Highlight>) -> String {
        match highlight {
            None => text.to_string(),
            Some(Highlight::WholeLine(style)) => self.paint(*style, text).to_string(),
            Some(Highlight::Ranges(ranges)) => self.render_ranges(text, ranges),
        }
    }

    fn render_ranges(&self, text: &str, ranges: &[HighlightRange]) -> String {
        let mut sorted: Vec<&HighlightRange> = ranges.iter().collect();
        sorted.sort_by_key(|range| range.start);

        let mut rendered = String::with_capacity(text.len());
        let mut cursor = 0;
        for range in sorted {
            let (Some(before), Some(inner)) = (
                text.get(cursor..range.start),
                text.get(range.start..range.end),
            ) else {
                continue;
            };
            rendered.push_str(before);
            rendered.push_str(&self.paint(range.style, inner).to_string());
            cursor = range.end;
        }
        rendered.push_str(text.get(cursor..).unwrap_or_default());
        rendered
    }
}

/// Style for a status code, given whether it sits in the staging area
pub fn get_status_color_style(status: GitStatus, staged: bool) -> Style {
    match status {
        GitStatus::Unmerged => Style::Conflict,
        GitStatus::Untracked => Style::Untracked,
        _ if staged => Style::Staged,
        _ => Style::Modified,
    }
}

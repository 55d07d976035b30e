//! Flattening of section view models into one line-addressable view.
//!
//! [`compose`] walks the section descriptors in order and rebuilds the whole
//! [`ComposedView`] from scratch: header (provider header wins over the static
//! one), content lines, then a blank separator unless the section opts out.
//! Every global line gets exactly one [`LineEntry`], so the index has no gaps.
//! The composer runs no external commands; providers fetch their own data.

use crate::dashboard::provider::{BuildContext, SectionDescriptor, SectionKey};
use crate::dashboard::view_model::{Highlight, Style, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Content,
    Spacing,
}

/// What a global line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub section: SectionKey,
    /// 1-based line within the section's view model, for content lines
    pub local: Option<usize>,
    pub kind: LineKind,
}

/// One section's slice of the composed view
#[derive(Debug, Clone)]
pub struct SectionSpan {
    pub key: SectionKey,
    pub view: ViewModel,
    pub annotation_style: Option<Style>,
    /// First global line (1-based); equals `end + 1` for an empty section
    pub start: usize,
    /// Last global line (1-based), inclusive
    pub end: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ComposedView {
    lines: Vec<String>,
    index: Vec<LineEntry>,
    sections: Vec<SectionSpan>,
}

impl ComposedView {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn index(&self) -> &[LineEntry] {
        &self.index
    }

    pub fn sections(&self) -> &[SectionSpan] {
        &self.sections
    }

    /// Entry of a 1-based global line
    pub fn entry(&self, line: usize) -> Option<&LineEntry> {
        line.checked_sub(1).and_then(|i| self.index.get(i))
    }

    pub fn section(&self, key: SectionKey) -> Option<&SectionSpan> {
        self.sections.iter().find(|span| span.key == key)
    }

    /// Content lines of one section
    pub fn section_lines(&self, key: SectionKey) -> &[String] {
        self.section(key)
            .map(|span| span.view.lines())
            .unwrap_or_default()
    }

    /// Highlight to paint on a global line
    pub fn highlight(&self, line: usize) -> Option<&Highlight> {
        let entry = self.entry(line)?;
        let span = self.section(entry.section)?;
        match entry.kind {
            LineKind::Content => span.view.highlight(entry.local?),
            LineKind::Header | LineKind::Spacing => None,
        }
    }

    /// End-of-line annotation text and its style
    pub fn annotation(&self, line: usize) -> Option<(&str, Option<Style>)> {
        let entry = self.entry(line)?;
        let span = self.section(entry.section)?;
        let text = span.view.annotation(entry.local?)?;
        Some((text, span.annotation_style))
    }

    fn push(&mut self, text: String, entry: LineEntry) {
        self.lines.push(text);
        self.index.push(entry);
    }
}

pub fn compose(sections: &[SectionDescriptor], ctx: &BuildContext<'_>) -> ComposedView {
    let mut composed = ComposedView::default();

    for descriptor in sections {
        let view = descriptor.provider.build(ctx);
        let start = composed.len() + 1;

        if let Some(header) = view.header().or(descriptor.header) {
            composed.push(
                header.to_string(),
                LineEntry {
                    section: descriptor.key,
                    local: None,
                    kind: LineKind::Header,
                },
            );
        }
        for (i, line) in view.lines().iter().enumerate() {
            composed.push(
                line.clone(),
                LineEntry {
                    section: descriptor.key,
                    local: Some(i + 1),
                    kind: LineKind::Content,
                },
            );
        }
        let end = composed.len();

        if descriptor.spacing_after {
            composed.push(
                String::new(),
                LineEntry {
                    section: descriptor.key,
                    local: None,
                    kind: LineKind::Spacing,
                },
            );
        }

        log::debug!(
            "Composed section '{}' at lines {}..={} ({} content lines)",
            descriptor.key,
            start,
            end,
            view.line_count()
        );
        composed.sections.push(SectionSpan {
            key: descriptor.key,
            annotation_style: descriptor.provider.annotation_style(),
            view,
            start,
            end,
        });
    }

    composed
}

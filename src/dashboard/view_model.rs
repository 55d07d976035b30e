//! The data a section provider contributes to one refresh cycle.
//!
//! A [`ViewModel`] holds display lines and, keyed by 1-based local line
//! number, their highlights, actions, metadata and end-of-line annotations.
//! Keys outside `1..=lines.len()` are rejected when set, so every per-line
//! map stays aligned with the line sequence. A line without an entry simply
//! has no action.

use crate::core::error::Result;
use crate::core::git::GitRepo;
use crate::core::pager::DiffPager;
use crate::core::progress::Notifier;
use crate::core::state::StateCache;
use crate::dashboard::host::ViewHost;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Semantic highlight classes; the host maps them to colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Style {
    Header,
    Branch,
    Staged,
    Modified,
    Untracked,
    Conflict,
    Added,
    Removed,
    Hash,
    Author,
    Muted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    /// Byte offset of the first highlighted character
    pub start: usize,
    /// Byte offset one past the last highlighted character
    pub end: usize,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Highlight {
    WholeLine(Style),
    Ranges(Vec<HighlightRange>),
}

/// Input event kinds a line can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Activate,
    Cycle,
    BulkCycle,
    Destroy,
    OpenExternal,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Activate => "activate",
            ActionKind::Cycle => "cycle",
            ActionKind::BulkCycle => "bulk-cycle",
            ActionKind::Destroy => "destroy",
            ActionKind::OpenExternal => "open",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an action may have changed repository state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    Changed,
}

/// What open-externally acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMeta {
    Path(PathBuf),
    Commit(String),
}

/// Everything an action may touch while it runs on the control loop
pub struct ActionContext<'a> {
    pub repo: &'a GitRepo,
    pub cache: &'a mut StateCache,
    pub pager: &'a DiffPager,
    pub host: &'a mut dyn ViewHost,
    pub notifier: &'a mut dyn Notifier,
}

pub type Action = Rc<dyn Fn(&mut ActionContext<'_>) -> Result<Refresh>>;

/// Wrap a closure as an [`Action`]
pub fn action(f: impl Fn(&mut ActionContext<'_>) -> Result<Refresh> + 'static) -> Action {
    Rc::new(f)
}

#[derive(Default, Clone)]
pub struct ViewModel {
    header: Option<String>,
    lines: Vec<String>,
    highlights: BTreeMap<usize, Highlight>,
    actions: BTreeMap<(usize, ActionKind), Action>,
    header_actions: BTreeMap<ActionKind, Action>,
    meta: BTreeMap<usize, LineMeta>,
    annotations: BTreeMap<usize, String>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Append a line, returning its 1-based local number
    pub fn push_line(&mut self, text: impl Into<String>) -> usize {
        self.lines.push(text.into());
        self.lines.len()
    }

    fn contains(&self, line: usize) -> bool {
        let valid = (1..=self.lines.len()).contains(&line);
        if !valid {
            log::warn!("Ignoring entry for line {line} of a {}-line section", self.lines.len());
        }
        valid
    }

    pub fn set_highlight(&mut self, line: usize, highlight: Highlight) {
        if self.contains(line) {
            self.highlights.insert(line, highlight);
        }
    }

    pub fn set_action(&mut self, line: usize, kind: ActionKind, action: Action) {
        if self.contains(line) {
            self.actions.insert((line, kind), action);
        }
    }

    pub fn set_header_action(&mut self, kind: ActionKind, action: Action) {
        self.header_actions.insert(kind, action);
    }

    pub fn set_meta(&mut self, line: usize, meta: LineMeta) {
        if self.contains(line) {
            self.meta.insert(line, meta);
        }
    }

    pub fn annotate(&mut self, line: usize, text: impl Into<String>) {
        if self.contains(line) {
            self.annotations.insert(line, text.into());
        }
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn highlight(&self, line: usize) -> Option<&Highlight> {
        self.highlights.get(&line)
    }

    pub fn action(&self, line: usize, kind: ActionKind) -> Option<Action> {
        self.actions.get(&(line, kind)).cloned()
    }

    pub fn header_action(&self, kind: ActionKind) -> Option<Action> {
        self.header_actions.get(&kind).cloned()
    }

    pub fn meta(&self, line: usize) -> Option<&LineMeta> {
        self.meta.get(&line)
    }

    pub fn annotation(&self, line: usize) -> Option<&str> {
        self.annotations.get(&line).map(String::as_str)
    }

    /// Action kinds available on a line, in a stable order
    pub fn action_kinds(&self, line: usize) -> Vec<ActionKind> {
        self.actions
            .keys()
            .filter(|(action_line, _)| *action_line == line)
            .map(|(_, kind)| *kind)
            .collect()
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("header", &self.header)
            .field("lines", &self.lines)
            .field("highlights", &self.highlights)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("meta", &self.meta)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// Byte range of `needle` within `haystack`, searching from `from`
pub fn find_range(
    haystack: &str,
    needle: &str,
    from: usize,
    style: Style,
) -> Option<HighlightRange> {
    if needle.is_empty() {
        return None;
    }
    let start = from + haystack.get(from..)?.find(needle)?;
    Some(HighlightRange {
        start,
        end: start + needle.len(),
        style,
    })
}

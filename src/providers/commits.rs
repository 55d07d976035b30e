//! Recent history, one commit per line.

use crate::core::colors::{Paint, Palette};
use crate::core::error::{DashboardError, Result};
use crate::core::git::ResetKind;
use crate::core::progress::Level;
use crate::core::state::CommitEntry;
use crate::dashboard::provider::{BuildContext, SectionProvider};
use crate::dashboard::view_model::{
    action, find_range, ActionContext, ActionKind, Highlight, HighlightRange, LineMeta, Refresh,
    Style, ViewModel,
};
use colored::Color;

pub struct CommitsProvider;

/// `3 hours ago` style age of `timestamp` as seen at `now` (Unix seconds)
pub fn relative_time(timestamp: i64, now: i64) -> String {
    let age = chrono::Duration::seconds((now - timestamp).max(0));
    let (count, unit) = if age.num_minutes() < 1 {
        return "just now".to_string();
    } else if age.num_hours() < 1 {
        (age.num_minutes(), "minute")
    } else if age.num_days() < 1 {
        (age.num_hours(), "hour")
    } else if age.num_weeks() < 1 {
        (age.num_days(), "day")
    } else if age.num_days() < 30 {
        (age.num_weeks(), "week")
    } else if age.num_days() < 365 {
        (age.num_days() / 30, "month")
    } else {
        (age.num_days() / 365, "year")
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

pub fn format_commit(commit: &CommitEntry, now: i64) -> String {
    format!(
        "{} {} +{} -{} ({}) {}",
        commit.hash,
        commit.subject,
        commit.added,
        commit.removed,
        commit.author,
        relative_time(commit.timestamp, now)
    )
}

fn commit_highlight(text: &str, commit: &CommitEntry) -> Highlight {
    let mut ranges = vec![HighlightRange {
        start: 0,
        end: commit.hash.len(),
        style: Style::Hash,
    }];
    // Subjects are free text; search for the counts after them
    let from = commit.hash.len() + 1 + commit.subject.len();
    let added = format!("+{}", commit.added);
    let removed = format!("-{}", commit.removed);
    let author = format!("({})", commit.author);
    if let Some(range) = find_range(text, &added, from, Style::Added) {
        let after = range.end;
        ranges.push(range);
        if let Some(range) = find_range(text, &removed, after, Style::Removed) {
            let after = range.end;
            ranges.push(range);
            if let Some(range) = find_range(text, &author, after, Style::Author) {
                let age_start = range.end + 1;
                ranges.push(range);
                ranges.push(HighlightRange {
                    start: age_start,
                    end: text.len(),
                    style: Style::Muted,
                });
            }
        }
    }
    Highlight::Ranges(ranges)
}

fn reset_to_parent(ctx: &mut ActionContext<'_>, commit: &CommitEntry) -> Result<Refresh> {
    let prompt = if commit.is_root() {
        format!(
            "{} is the first commit. Delete this branch's entire history? \
             Its changes stay staged",
            commit.hash
        )
    } else {
        format!(
            "Reset to the parent of {}? It and every later commit leave the history; \
             their changes stay staged",
            commit.hash
        )
    };
    if !ctx.host.confirm(&prompt) {
        return Err(DashboardError::declined(format!("reset to {}~1", commit.hash)));
    }

    match ctx.repo.reset_to_parent(commit)? {
        ResetKind::Parent => ctx
            .notifier
            .notify(Level::Success, &format!("Reset to the parent of {}", commit.hash)),
        ResetKind::HistoryWiped => ctx
            .notifier
            .notify(Level::Success, "Branch history deleted; all changes are staged"),
    }
    Ok(Refresh::Changed)
}

fn show(ctx: &mut ActionContext<'_>, hash: &str, stat_only: bool) -> Result<Refresh> {
    let args = if stat_only {
        vec!["show", "--stat", hash]
    } else {
        vec!["show", hash]
    };
    let paged = ctx.pager.pipeline(&args);
    if let Some(warning) = &paged.warning {
        ctx.notifier.notify(Level::Warning, warning);
    }
    ctx.host.show_command(&format!("Commit {hash}"), paged)?;
    Ok(Refresh::Unchanged)
}

impl SectionProvider for CommitsProvider {
    fn build(&self, ctx: &BuildContext<'_>) -> ViewModel {
        let mut view = ViewModel::new();
        let commits = ctx.repo.recent_commits(ctx.config.commit_count);
        if commits.is_empty() {
            view.push_line("(no commits)");
            return view;
        }

        for commit in commits {
            let text = format_commit(&commit, ctx.now);
            let highlight = commit_highlight(&text, &commit);
            let line = view.push_line(text);
            view.set_highlight(line, highlight);
            view.set_meta(line, LineMeta::Commit(commit.hash.clone()));
            if commit.is_root() {
                view.annotate(line, "root commit");
            }

            let hash = commit.hash.clone();
            view.set_action(
                line,
                ActionKind::Activate,
                action(move |ctx| show(ctx, &hash, true)),
            );
            let hash = commit.hash.clone();
            view.set_action(
                line,
                ActionKind::OpenExternal,
                action(move |ctx| show(ctx, &hash, false)),
            );
            view.set_action(
                line,
                ActionKind::Destroy,
                action(move |ctx| reset_to_parent(ctx, &commit)),
            );
        }
        view
    }

    fn setup_highlights(&self, palette: &mut Palette) {
        palette.set(Style::Hash, Paint::new(Color::Yellow));
        palette.set(Style::Author, Paint::new(Color::Blue));
    }

    fn annotation_style(&self) -> Option<Style> {
        Some(Style::Muted)
    }
}

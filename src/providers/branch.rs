//! The `Head:` line.
//!
//! Shows the current branch and, unless it is the tracking branch itself,
//! how far it is ahead of and behind its comparison point plus how many files
//! conflict or would conflict with the tracking branch.

use crate::core::colors::{Paint, Palette};
use crate::core::error::{DashboardError, Result};
use crate::core::progress::Level;
use crate::core::state::{BranchDetail, BranchStatus};
use crate::dashboard::host::PickOption;
use crate::dashboard::provider::{BuildContext, SectionProvider};
use crate::dashboard::view_model::{
    action, find_range, ActionContext, ActionKind, Highlight, HighlightRange, Refresh, Style,
    ViewModel,
};
use colored::Color;

const PREFIX: &str = "Head: ";

pub struct BranchProvider;

/// Ahead/behind/conflict indicators, `None` when there is nothing to compare
pub fn indicators(status: &BranchStatus, conflicts: usize) -> Option<String> {
    if status.is_tracking_branch() {
        return None;
    }
    if status.tracking.is_none() && status.ahead == 0 && status.behind == 0 && conflicts == 0 {
        return None;
    }
    let mut text = format!("+{} -{}", status.ahead, status.behind);
    if conflicts > 0 {
        text.push_str(&format!(" !{conflicts}"));
    }
    Some(text)
}

fn head_highlight(text: &str, status: &BranchStatus, conflicts: usize) -> Highlight {
    let mut ranges = vec![HighlightRange {
        start: PREFIX.len(),
        end: PREFIX.len() + status.branch.len(),
        style: Style::Branch,
    }];
    let from = PREFIX.len() + status.branch.len();
    ranges.extend(find_range(text, &format!("+{}", status.ahead), from, Style::Added));
    ranges.extend(find_range(text, &format!("-{}", status.behind), from, Style::Removed));
    if conflicts > 0 {
        ranges.extend(find_range(text, &format!("!{conflicts}"), from, Style::Conflict));
    }
    ranges.sort_by_key(|range| range.start);
    Highlight::Ranges(ranges)
}

/// Lines of the branch detail document
pub fn detail_lines(detail: &BranchDetail) -> Vec<String> {
    let mut lines = Vec::new();
    match (&detail.tracking, &detail.merge_base) {
        (Some(tracking), Some(base)) => lines.push(format!(
            "Compared with '{tracking}' since {}",
            &base[..base.len().min(7)]
        )),
        (Some(tracking), None) => lines.push(format!("No common history with '{tracking}'")),
        (None, _) => lines.push("No tracking branch configured".to_string()),
    }

    lines.push(String::new());
    lines.push(format!("Changed files ({})", detail.files.len()));
    for (status, path) in &detail.files {
        lines.push(format!("  {status} {}", path.display()));
    }

    if !detail.conflicts.active.is_empty() {
        lines.push(String::new());
        lines.push(format!("Conflicts ({})", detail.conflicts.active.len()));
        for path in &detail.conflicts.active {
            lines.push(format!("  {}", path.display()));
        }
    }
    if !detail.conflicts.potential.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Would conflict on merge ({})",
            detail.conflicts.potential.len()
        ));
        for path in &detail.conflicts.potential {
            lines.push(format!("  {}", path.display()));
        }
    }
    lines
}

fn show_detail(ctx: &mut ActionContext<'_>) -> Result<Refresh> {
    let detail = ctx.repo.branch_detail();
    ctx.host
        .show_document(&format!("Branch {}", detail.branch), &detail_lines(&detail));
    Ok(Refresh::Unchanged)
}

/// Offer recently checked-out branches and switch to the chosen one
fn switch_branch(ctx: &mut ActionContext<'_>) -> Result<Refresh> {
    let branches = ctx.repo.recent_branches();
    if branches.is_empty() {
        return Err(DashboardError::precondition("No other local branches"));
    }
    let options: Vec<PickOption> = branches.iter().map(PickOption::new).collect();
    let Some(branch) = ctx
        .host
        .pick("Switch branch", &options)
        .and_then(|index| branches.get(index))
    else {
        return Ok(Refresh::Unchanged);
    };

    ctx.repo.checkout_branch(branch)?;
    ctx.notifier
        .notify(Level::Success, &format!("Switched to '{branch}'"));
    Ok(Refresh::Changed)
}

impl SectionProvider for BranchProvider {
    fn build(&self, ctx: &BuildContext<'_>) -> ViewModel {
        let status = ctx.branch_status();
        let conflicts = match status.tracking.as_deref() {
            Some(tracking) if !status.is_tracking_branch() => {
                ctx.conflict_report(tracking).total()
            }
            _ => ctx.snapshot.conflicted().len(),
        };

        let mut text = format!("{PREFIX}{}", status.branch);
        if let Some(indicators) = indicators(status, conflicts) {
            text.push_str(&format!(" ({indicators})"));
        }
        let highlight = head_highlight(&text, status, conflicts);

        let mut view = ViewModel::new();
        let line = view.push_line(text);
        view.set_highlight(line, highlight);
        view.set_action(line, ActionKind::Activate, action(show_detail));
        view.set_action(line, ActionKind::Cycle, action(switch_branch));
        view
    }

    fn setup_highlights(&self, palette: &mut Palette) {
        palette.set(Style::Branch, Paint::bold(Color::Magenta));
    }
}

//! The tracking-branch preference line.

use crate::core::error::{DashboardError, Result};
use crate::core::progress::Level;
use crate::dashboard::host::PickOption;
use crate::dashboard::provider::{BuildContext, SectionProvider};
use crate::dashboard::view_model::{
    action, ActionContext, ActionKind, Highlight, HighlightRange, Refresh, Style, ViewModel,
};

const PREFIX: &str = "Tracking: ";

pub struct TrackingProvider;

/// Pick a local branch and store it as the tracking branch
fn choose_tracking_branch(ctx: &mut ActionContext<'_>) -> Result<Refresh> {
    let branches = ctx.repo.local_branches();
    if branches.is_empty() {
        return Err(DashboardError::precondition("No local branches yet"));
    }
    let configured = ctx.repo.tracking_branch();
    let options: Vec<PickOption> = branches
        .iter()
        .map(|name| PickOption::new(name).marked(configured.as_deref() == Some(name.as_str())))
        .collect();

    let Some(branch) = ctx
        .host
        .pick("Tracking branch", &options)
        .and_then(|index| branches.get(index))
    else {
        return Ok(Refresh::Unchanged);
    };
    ctx.repo.set_tracking_branch(branch)?;
    ctx.notifier
        .notify(Level::Success, &format!("Tracking branch set to '{branch}'"));
    Ok(Refresh::Changed)
}

impl SectionProvider for TrackingProvider {
    fn build(&self, ctx: &BuildContext<'_>) -> ViewModel {
        let mut view = ViewModel::new();
        let status = ctx.branch_status();
        if status.is_tracking_branch() {
            return view;
        }

        let name = status.tracking.as_deref().unwrap_or("(none)");
        let line = view.push_line(format!("{PREFIX}{name}"));
        if status.tracking.is_some() {
            view.set_highlight(
                line,
                Highlight::Ranges(vec![HighlightRange {
                    start: PREFIX.len(),
                    end: PREFIX.len() + name.len(),
                    style: Style::Branch,
                }]),
            );
        }
        view.set_action(line, ActionKind::Activate, action(choose_tracking_branch));
        view
    }
}

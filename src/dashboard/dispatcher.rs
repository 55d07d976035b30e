//! Action dispatch from `(event kind, line)` to provider closures.
//!
//! Lines are resolved through the current [`ComposedView`] before anything
//! runs, so a multi-line input binds every target up front; closures capture
//! paths and hashes, never line numbers, and stay valid while earlier actions
//! change the repository. A [`Refresh::Changed`] result invalidates the state
//! cache. The caller owns the single recompose that follows.

use crate::core::error::{DashboardError, Result};
use crate::core::index_parser::IndexParser;
use crate::dashboard::composer::{ComposedView, LineKind};
use crate::dashboard::view_model::{Action, ActionContext, ActionKind, Refresh};

/// Look up the action bound to `kind` on a 1-based global line
pub fn resolve(view: &ComposedView, kind: ActionKind, line: usize) -> Result<Action> {
    IndexParser::validate(&[line], view.len())?;
    let entry = view
        .entry(line)
        .ok_or_else(|| DashboardError::line_out_of_range(line, view.len()))?;
    let span = view
        .section(entry.section)
        .ok_or_else(|| DashboardError::no_action(kind.as_str(), line))?;

    let action = match (entry.kind, entry.local) {
        (LineKind::Header, _) => span.view.header_action(kind),
        (LineKind::Content, Some(local)) => span.view.action(local, kind),
        _ => None,
    };
    action.ok_or_else(|| DashboardError::no_action(kind.as_str(), line))
}

/// Run one action and invalidate the cache when it reports a change
pub fn invoke(action: &Action, ctx: &mut ActionContext<'_>) -> Result<Refresh> {
    let refresh = action(ctx)?;
    if refresh == Refresh::Changed {
        ctx.cache.invalidate();
    }
    Ok(refresh)
}

/// Resolve and run `kind` on one line
pub fn dispatch(
    view: &ComposedView,
    kind: ActionKind,
    line: usize,
    ctx: &mut ActionContext<'_>,
) -> Result<Refresh> {
    let action = resolve(view, kind, line)?;
    log::debug!("Dispatching {kind} on line {line}");
    invoke(&action, ctx)
}

/// Outcome of a multi-line dispatch
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub refresh: Option<Refresh>,
    pub errors: Vec<DashboardError>,
}

impl DispatchReport {
    pub fn changed(&self) -> bool {
        self.refresh == Some(Refresh::Changed)
    }
}

/// Resolve every line first, then run the actions in order.
///
/// A line without the requested action is reported and skipped; the other
/// lines still run. A failing action does not stop later ones.
pub fn dispatch_lines(
    view: &ComposedView,
    kind: ActionKind,
    lines: &[usize],
    ctx: &mut ActionContext<'_>,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut actions = Vec::with_capacity(lines.len());
    for &line in lines {
        match resolve(view, kind, line) {
            Ok(action) => actions.push((line, action)),
            Err(e) => report.errors.push(e),
        }
    }

    for (line, action) in actions {
        log::debug!("Dispatching {kind} on line {line}");
        match invoke(&action, ctx) {
            Ok(Refresh::Changed) => report.refresh = Some(Refresh::Changed),
            Ok(Refresh::Unchanged) => {
                report.refresh.get_or_insert(Refresh::Unchanged);
            }
            Err(e) => report.errors.push(e),
        }
    }
    report
}

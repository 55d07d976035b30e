use crate::commands::init::{print_invocation_log, CommandInit, GlobalOptions, HostMode};
use crate::core::error::Result;
use crate::core::index_parser::IndexParser;
use crate::core::output::{print_error, print_warning};
use crate::dashboard::view_model::ActionKind;
use clap::ValueEnum;

/// Action kinds as named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActKind {
    Activate,
    Cycle,
    Bulk,
    Destroy,
    Open,
}

impl From<ActKind> for ActionKind {
    fn from(kind: ActKind) -> Self {
        match kind {
            ActKind::Activate => ActionKind::Activate,
            ActKind::Cycle => ActionKind::Cycle,
            ActKind::Bulk => ActionKind::BulkCycle,
            ActKind::Destroy => ActionKind::Destroy,
            ActKind::Open => ActionKind::OpenExternal,
        }
    }
}

/// Dispatch one action kind on the given lines of a freshly composed view.
///
/// Confirmation prompts are answered with `assume_yes`. Every line runs even
/// when an earlier one fails; the first failure becomes the command's error.
pub fn execute_act(
    options: &GlobalOptions,
    kind: ActKind,
    lines: Vec<String>,
    assume_yes: bool,
) -> Result<()> {
    let init = CommandInit::new(options)?;
    let (mut session, _source) = init.into_session(HostMode::Batch { assume_yes });

    session.recompose();
    let lines = IndexParser::parse_lines(&lines.join(" "), session.view().len())?;
    let report = session.dispatch(kind.into(), &lines);
    session.flush_notifications();
    if report.changed() {
        session.render();
    }

    if let Some(log) = session.invocation_log() {
        print_invocation_log(log);
    }

    let mut errors = report.errors.into_iter();
    let Some(first) = errors.next() else {
        return Ok(());
    };
    for error in errors {
        if error.is_warning() {
            print_warning(&error.to_string());
        } else {
            print_error(&error.to_string());
        }
    }
    Err(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_act_kind_maps_to_action_kind() {
        assert_eq!(ActionKind::from(ActKind::Bulk), ActionKind::BulkCycle);
        assert_eq!(ActionKind::from(ActKind::Open), ActionKind::OpenExternal);
        assert_eq!(
            ActKind::from_str("destroy", true).ok(),
            Some(ActKind::Destroy)
        );
    }
}

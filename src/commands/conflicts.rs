use crate::commands::init::{CommandInit, GlobalOptions};
use crate::core::error::Result;
use crate::core::output::{print_info, print_section_header, print_success};

/// Print files that conflict now and files that would conflict on merging
/// the tracking branch
pub fn execute_conflicts(options: &GlobalOptions) -> Result<()> {
    let CommandInit { repo, .. } = CommandInit::new(options)?;

    let tracking = repo.tracking_branch();
    let compare_with = match (&tracking, repo.current_branch()) {
        (Some(tracking), Some(current)) if *tracking == current => None,
        (tracking, _) => tracking.as_deref(),
    };
    let report = repo.conflict_report(compare_with);

    if report.is_empty() {
        print_success("No conflicts");
        return Ok(());
    }
    if !report.active.is_empty() {
        print_section_header(&format!("Conflicts ({})", report.active.len()));
        for path in &report.active {
            print_info(&format!("  {}", path.display()));
        }
    }
    if let (Some(branch), false) = (compare_with, report.potential.is_empty()) {
        print_section_header(&format!("Would conflict when merging '{branch}'"));
        for path in &report.potential {
            print_info(&format!("  {}", path.display()));
        }
    }
    Ok(())
}

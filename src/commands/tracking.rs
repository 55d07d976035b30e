use crate::commands::init::{CommandInit, GlobalOptions};
use crate::core::error::Result;
use crate::core::output::{print_info, print_success};

/// Show the tracking branch, or store `branch` as the new one
pub fn execute_tracking(options: &GlobalOptions, branch: Option<String>) -> Result<()> {
    let CommandInit { repo, .. } = CommandInit::new(options)?;

    match branch {
        Some(branch) => {
            repo.set_tracking_branch(&branch)?;
            print_success(&format!("Tracking branch set to '{branch}'"));
        }
        None => {
            let tracking = repo.tracking_branch();
            print_info(&format!(
                "Tracking: {}",
                tracking.as_deref().unwrap_or("(none)")
            ));
        }
    }
    Ok(())
}

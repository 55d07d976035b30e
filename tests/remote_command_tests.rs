use predicates::prelude::*;

mod common;
use common::{assertions, fixtures::*, repository::*};

#[cfg(test)]
mod remote_command_tests {
    use super::*;

    #[test]
    fn test_push_publishes_branch_and_sets_upstream() -> anyhow::Result<()> {
        let repo = setup_test_repo_with_initial_commit()?;
        let remote = add_bare_origin(&repo)?;

        repo.dashboard()
            .arg("push")
            .assert()
            .success()
            .stdout(predicate::str::contains("Push done"));

        let remote_head = std::process::Command::new("git")
            .args(["rev-parse", "main"])
            .current_dir(&remote)
            .output()?;
        assert_eq!(
            String::from_utf8_lossy(&remote_head.stdout).trim(),
            repo.git(&["rev-parse", "HEAD"])
        );
        assert_eq!(
            repo.git(&["rev-parse", "--abbrev-ref", "@{upstream}"]),
            "origin/main"
        );
        Ok(())
    }

    #[test]
    fn test_push_without_remote_fails() -> anyhow::Result<()> {
        let repo = setup_test_repo_with_initial_commit()?;

        repo.dashboard()
            .arg("push")
            .assert()
            .failure()
            .stdout(assertions::has_warning("Push did not complete"));

        Ok(())
    }

    #[test]
    fn test_pull_fast_forwards_from_upstream() -> anyhow::Result<()> {
        let repo = setup_test_repo_with_initial_commit()?;
        let remote = add_bare_origin(&repo)?;
        repo.git(&["push", "--quiet", "--set-upstream", "origin", "main"]);

        // A second clone pushes a commit the first one does not have
        let other = repo.temp_dir.path().join("other");
        let status = std::process::Command::new("git")
            .args(["clone", "--quiet"])
            .arg(&remote)
            .arg(&other)
            .status()?;
        assert!(status.success());
        for args in [
            vec!["config", "user.name", "Other"],
            vec!["config", "user.email", "other@example.com"],
        ] {
            std::process::Command::new("git")
                .args(&args)
                .current_dir(&other)
                .status()?;
        }
        commit_file(&other, "remote.txt", "remote\n", "Remote commit")?;
        std::process::Command::new("git")
            .args(["push", "--quiet"])
            .current_dir(&other)
            .status()?;

        repo.dashboard()
            .arg("pull")
            .assert()
            .success()
            .stdout(predicate::str::contains("Pull done"));

        assert_eq!(repo.git(&["log", "-1", "--format=%s"]), "Remote commit");
        Ok(())
    }

    #[test]
    fn test_squash_merge_requires_confirmation() -> anyhow::Result<()> {
        let repo = create_feature_branch_repo()?;

        repo.dashboard()
            .arg("squash-merge")
            .assert()
            .failure()
            .stdout(assertions::has_warning("Cancelled"));

        assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "feature");
        Ok(())
    }

    #[test]
    fn test_squash_merge_adds_one_commit_to_tracking_branch() -> anyhow::Result<()> {
        let repo = create_feature_branch_repo()?;

        repo.dashboard()
            .args(["squash-merge", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Squash merge feature into main done"));

        assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "main");
        assert_eq!(repo.git(&["log", "-1", "--format=%s"]), "Squash merge feature");
        assert_eq!(repo.git(&["rev-list", "--count", "main"]), "2");
        Ok(())
    }

    #[test]
    fn test_squash_merge_rolls_back_on_conflict() -> anyhow::Result<()> {
        let repo = create_diverged_repo()?;

        repo.dashboard()
            .args(["squash-merge", "--yes"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("changes rolled back"));

        assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "feature");
        assert_eq!(repo.git(&["status", "--porcelain"]), "");
        Ok(())
    }

    #[test]
    fn test_squash_merge_on_tracking_branch_is_refused() -> anyhow::Result<()> {
        let repo = setup_test_repo_with_initial_commit()?;

        repo.dashboard()
            .args(["squash-merge", "--yes"])
            .assert()
            .failure()
            .stdout(assertions::has_warning("Already on tracking branch 'main'"));

        Ok(())
    }
}

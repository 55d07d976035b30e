//! Repositories in the states the tests keep coming back to

#![allow(dead_code)]

use super::repository::*;
use git_dashboard::core::error::Result;

/// One committed `a.txt` edited to `+3 -1`, and an untracked four-line `b.txt`.
///
/// The dashboard renders it as:
/// ```text
///   1 Head: main
///   2
///   3 Recent commits
///   4 <hash> Initial commit ...
///   5
///   6 Staged changes (0)
///   7   (no files)
///   8
///   9 Changes (1)
///  10   M +3 -1 a.txt
///  11
///  12 Untracked files (1)
///  13   ?? +4 -0 b.txt
/// ```
pub fn create_modified_and_untracked_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    commit_file(&repo.path, "a.txt", "one\ntwo\n", "Initial commit")?;
    create_file(&repo.path, "a.txt", "one\nthree\nfour\nfive\n")?;
    create_file(&repo.path, "b.txt", "1\n2\n3\n4\n")?;
    Ok(repo)
}

/// `main` and `feature` edit the same line of `shared.txt`; `feature` is checked out
pub fn create_diverged_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    commit_file(&repo.path, "shared.txt", "base\n", "Initial commit")?;
    git_checkout_new(&repo.path, "feature")?;
    commit_file(&repo.path, "shared.txt", "feature\n", "Feature edit")?;
    git_checkout(&repo.path, "main")?;
    commit_file(&repo.path, "shared.txt", "main\n", "Main edit")?;
    git_checkout(&repo.path, "feature")?;
    Ok(repo)
}

/// `feature` is two clean commits ahead of `main` and checked out
pub fn create_feature_branch_repo() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    commit_file(&repo.path, "base.txt", "base\n", "Initial commit")?;
    git_checkout_new(&repo.path, "feature")?;
    commit_file(&repo.path, "one.txt", "one\n", "First feature commit")?;
    commit_file(&repo.path, "two.txt", "two\n", "Second feature commit")?;
    Ok(repo)
}

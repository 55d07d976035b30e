//! Git repository queries and mutations.
//!
//! This module provides the dashboard's interface to git through the [`GitRepo`]
//! struct. Repository discovery, branch existence and the tracking-branch
//! preference go through `git2`; everything else shells out to the `git`
//! executable through a [`CommandRunner`] and parses its textual output.
//!
//! # Public API
//! - [`GitRepo`]: Main interface for repository operations
//! - [`ResetKind`]: Which reset path a history rewrite took
//!
//! # Key Features
//! - **Aggregate snapshot**: one fixed set of git calls per [`StatusSnapshot`]
//! - **Fail safe queries**: unparseable or failed query output yields empty data
//! - **Checked mutations**: every mutating call returns the command's failure
//! - **Pipelines**: pull, push and squash-merge as sequential [`Pipeline`]s

use crate::core::{
    config,
    error::{DashboardError, Result},
    git_status::GitStatus,
    parse,
    pipeline::{Pipeline, Step, StepPlan},
    process::{CommandOutput, CommandRunner, ExternalCommand, InvocationLog, ProcessRunner},
    state::{BranchDetail, BranchStatus, CommitEntry, ConflictReport, FileEntry, StatusSnapshot},
};
use git2::{BranchType, Oid, Repository};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Exit status of `git merge-tree --write-tree` when the merge has conflicts
const MERGE_TREE_CONFLICT_STATUS: i32 = 1;

/// How far back the reflog is read for the branch picker
const CHECKOUT_HISTORY_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// HEAD moved to the commit's parent
    Parent,
    /// The commit had no parent; the branch ref was deleted
    HistoryWiped,
}

pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_log(path, None)
    }

    /// Open with a process runner that records into `log` when given
    pub fn open_with_log<P: AsRef<Path>>(path: P, log: Option<Rc<InvocationLog>>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| DashboardError::NotInGitRepo)?;
        let workdir = repo.workdir().ok_or(DashboardError::NoWorkdir)?.to_path_buf();
        let runner = match log {
            Some(log) => ProcessRunner::new(&workdir).with_log(log),
            None => ProcessRunner::new(&workdir),
        };
        Ok(GitRepo {
            repo,
            workdir,
            runner: Box::new(runner),
        })
    }

    /// Open with a custom runner, e.g. a test double
    pub fn with_runner<P: AsRef<Path>>(path: P, runner: Box<dyn CommandRunner>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| DashboardError::NotInGitRepo)?;
        let workdir = repo.workdir().ok_or(DashboardError::NoWorkdir)?.to_path_buf();
        Ok(GitRepo {
            repo,
            workdir,
            runner,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn get_repository(&self) -> &Repository {
        &self.repo
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Run a read-only query; failures are logged and returned as-is
    fn query<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = ExternalCommand::git(args);
        let output = self.runner.run(&command);
        if !output.success() {
            log::debug!("Query `{}` failed: {}", command, output.stderr.trim());
        }
        output
    }

    /// Run a mutating command, converting a non-zero exit into an error
    fn execute_git_command(&self, command: ExternalCommand) -> Result<CommandOutput> {
        self.runner.run(&command).into_result(&command)
    }

    // ---- Repository facts (git2) ----

    pub fn has_head(&self) -> bool {
        self.repo.head().is_ok()
    }

    /// Name of the checked-out branch, including an unborn one
    pub fn current_branch(&self) -> Option<String> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            Ok(_) => None,
            Err(_) => self
                .repo
                .find_reference("HEAD")
                .ok()?
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .map(str::to_string),
        }
    }

    pub fn local_branches(&self) -> Vec<String> {
        let Ok(branches) = self.repo.branches(Some(BranchType::Local)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = branches
            .filter_map(|branch| branch.ok())
            .filter_map(|(branch, _)| branch.name().ok().flatten().map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    pub fn tracking_branch(&self) -> Option<String> {
        config::resolve_tracking_branch(&self.repo)
    }

    pub fn set_tracking_branch(&self, branch: &str) -> Result<()> {
        config::save_tracking_branch(&self.repo, branch)
    }

    fn resolve_commit(&self, spec: &str) -> Option<Oid> {
        self.repo
            .revparse_single(spec)
            .ok()?
            .peel_to_commit()
            .ok()
            .map(|commit| commit.id())
    }

    // ---- Queries ----

    /// One aggregate read of the working tree.
    ///
    /// Issues three git calls regardless of tree size: porcelain status,
    /// staged numstat and unstaged numstat. Untracked line counts are read
    /// from disk.
    pub fn fetch_snapshot(&self) -> StatusSnapshot {
        let status = self.query([
            "-c",
            "core.quotepath=false",
            "status",
            "--porcelain=v1",
            "--untracked-files=all",
        ]);
        if !status.success() {
            log::warn!("Could not read working tree status: {}", status.stderr.trim());
            return StatusSnapshot::default();
        }
        let staged_stats = parse::parse_numstat(
            &self
                .query(["-c", "core.quotepath=false", "diff", "--cached", "--numstat"])
                .stdout,
        );
        let unstaged_stats = parse::parse_numstat(
            &self
                .query(["-c", "core.quotepath=false", "diff", "--numstat"])
                .stdout,
        );

        let mut snapshot = StatusSnapshot::default();
        for entry in parse::parse_porcelain(&status.stdout) {
            if entry.x == '?' && entry.y == '?' {
                let lines = self.count_untracked_lines(&entry.path);
                snapshot.untracked.push(
                    FileEntry::new(GitStatus::Untracked, &entry.path)
                        .with_stats(lines, lines.map(|_| 0)),
                );
                continue;
            }
            if entry.x == '!' {
                continue;
            }
            if GitStatus::is_unmerged_pair(entry.x, entry.y) {
                snapshot
                    .modified
                    .push(FileEntry::new(GitStatus::Unmerged, &entry.path));
                continue;
            }
            if let Some(status) = GitStatus::from_porcelain(entry.x) {
                let stat = staged_stats.get(&entry.path).copied().unwrap_or_default();
                snapshot
                    .staged
                    .push(FileEntry::new(status, &entry.path).with_stats(stat.added, stat.removed));
            }
            if let Some(status) = GitStatus::from_porcelain(entry.y) {
                let stat = unstaged_stats.get(&entry.path).copied().unwrap_or_default();
                snapshot
                    .modified
                    .push(FileEntry::new(status, &entry.path).with_stats(stat.added, stat.removed));
            }
        }
        snapshot
    }

    /// Line count of an untracked file; `None` for binary or unreadable files
    fn count_untracked_lines(&self, path: &str) -> Option<u32> {
        let content = std::fs::read(self.workdir.join(path)).ok()?;
        if content.contains(&0) {
            return None;
        }
        let mut lines = content.iter().filter(|&&byte| byte == b'\n').count();
        if content.last().is_some_and(|&byte| byte != b'\n') {
            lines += 1;
        }
        u32::try_from(lines).ok()
    }

    /// Current branch with its ahead/behind comparison.
    ///
    /// Counts come from the upstream recorded in the status header when there is
    /// one, otherwise from an explicit count against the tracking branch.
    pub fn branch_status(&self) -> BranchStatus {
        let tracking = self.tracking_branch();
        let output = self.query([
            "status",
            "--porcelain=v1",
            "--branch",
            "--untracked-files=no",
        ]);
        let header = parse::parse_branch_header(&output.stdout).unwrap_or_default();

        let mut status = BranchStatus {
            branch: header
                .branch
                .clone()
                .or_else(|| self.current_branch())
                .unwrap_or_else(|| self.detached_label()),
            ahead: header.ahead,
            behind: header.behind,
            tracking,
            detached: header.detached,
            unborn: header.unborn,
        };
        if status.detached {
            status.branch = self.detached_label();
        }

        if header.upstream.is_none() && !status.unborn && !status.detached {
            if let Some(tracking) = status.tracking.clone() {
                if !status.is_tracking_branch() {
                    if let Some((ahead, behind)) = self.count_against(&tracking) {
                        status.ahead = ahead;
                        status.behind = behind;
                    }
                }
            }
        }
        status
    }

    fn detached_label(&self) -> String {
        match self.repo.head().ok().and_then(|head| head.target()) {
            Some(oid) => {
                let hash = oid.to_string();
                format!("detached at {}", &hash[..hash.len().min(7)])
            }
            None => "-none-".to_string(),
        }
    }

    /// `(ahead, behind)` of HEAD relative to `other`
    fn count_against(&self, other: &str) -> Option<(usize, usize)> {
        let output = self.query([
            "rev-list".to_string(),
            "--left-right".to_string(),
            "--count".to_string(),
            format!("HEAD...{other}"),
        ]);
        if !output.success() {
            return None;
        }
        parse::parse_left_right_count(&output.stdout)
    }

    /// Local branches ordered by most recent checkout, current branch excluded
    pub fn recent_branches(&self) -> Vec<String> {
        let current = self.current_branch();
        let local = self.local_branches();
        let output = self.query([
            "reflog".to_string(),
            "show".to_string(),
            "--format=%gs".to_string(),
            format!("--max-count={CHECKOUT_HISTORY_DEPTH}"),
        ]);

        let mut ordered: Vec<String> = parse::parse_checkout_history(&output.stdout)
            .into_iter()
            .filter(|name| local.contains(name))
            .collect();
        for name in &local {
            if !ordered.contains(name) {
                ordered.push(name.clone());
            }
        }
        ordered.retain(|name| Some(name) != current.as_ref());
        ordered
    }

    pub fn recent_commits(&self, count: usize) -> Vec<CommitEntry> {
        if !self.has_head() || count == 0 {
            return Vec::new();
        }
        let output = self.query([
            "-c".to_string(),
            "core.quotepath=false".to_string(),
            "log".to_string(),
            format!("--max-count={count}"),
            "--numstat".to_string(),
            parse::LOG_FORMAT.to_string(),
        ]);
        parse::parse_log(&output.stdout)
            .into_iter()
            .map(|record| CommitEntry {
                hash: record.hash,
                parents: record.parents,
                author: record.author,
                timestamp: record.timestamp,
                subject: record.subject,
                added: record.added,
                removed: record.removed,
            })
            .collect()
    }

    pub fn merge_base(&self, other: &str) -> Option<String> {
        let output = self.query(["merge-base", "HEAD", other]);
        let base = output.stdout.trim();
        (output.success() && !base.is_empty()).then(|| base.to_string())
    }

    /// Active conflicts in the working tree and potential conflicts of a
    /// merge with `tracking`, computed without touching the working tree.
    pub fn conflict_report(&self, tracking: Option<&str>) -> ConflictReport {
        let active: Vec<PathBuf> = self
            .query(["-c", "core.quotepath=false", "diff", "--name-only", "--diff-filter=U"])
            .lines()
            .map(|line| PathBuf::from(line.trim()))
            .collect();

        let potential = match tracking {
            Some(tracking) if self.has_head() => self
                .potential_conflicts(tracking)
                .into_iter()
                .map(PathBuf::from)
                .filter(|path| !active.contains(path))
                .collect(),
            _ => Vec::new(),
        };

        ConflictReport { active, potential }
    }

    fn potential_conflicts(&self, tracking: &str) -> Vec<String> {
        let (Some(head), Some(other)) = (self.resolve_commit("HEAD"), self.resolve_commit(tracking))
        else {
            return Vec::new();
        };
        let Ok(base) = self.repo.merge_base(head, other) else {
            log::debug!("No merge base between HEAD and '{tracking}'");
            return Vec::new();
        };
        if base == head || base == other {
            log::debug!("HEAD and '{tracking}' have not diverged");
            return Vec::new();
        }

        let output = self.query([
            "merge-tree",
            "--write-tree",
            "--name-only",
            "--no-messages",
            "HEAD",
            tracking,
        ]);
        match output.exit_status {
            0 => Vec::new(),
            MERGE_TREE_CONFLICT_STATUS => parse::parse_merge_tree_names(&output.stdout),
            _ => {
                log::debug!("merge-tree --write-tree unsupported, using legacy form");
                let base = base.to_string();
                let legacy = self.query(["merge-tree", base.as_str(), "HEAD", tracking]);
                parse::parse_legacy_merge_tree(&legacy.stdout)
            }
        }
    }

    /// Files changed on this branch since it forked from the tracking branch
    pub fn branch_detail(&self) -> BranchDetail {
        let branch = self
            .current_branch()
            .unwrap_or_else(|| self.detached_label());
        let tracking = self.tracking_branch();
        let merge_base = tracking.as_deref().and_then(|tracking| self.merge_base(tracking));

        let files = match &merge_base {
            Some(base) => self
                .query([
                    "-c".to_string(),
                    "core.quotepath=false".to_string(),
                    "diff".to_string(),
                    "--name-status".to_string(),
                    format!("{base}..HEAD"),
                ])
                .lines()
                .filter_map(parse_name_status_line)
                .collect(),
            None => Vec::new(),
        };
        let conflicts = if tracking.as_deref() == Some(branch.as_str()) {
            ConflictReport::default()
        } else {
            self.conflict_report(tracking.as_deref())
        };

        BranchDetail {
            branch,
            tracking,
            merge_base,
            files,
            conflicts,
        }
    }

    // ---- Mutations ----

    /// Stage a path; a path missing on disk stages its deletion
    pub fn stage(&self, path: &Path) -> Result<()> {
        let path_arg = path.to_string_lossy().into_owned();
        let command = if self.workdir.join(path).symlink_metadata().is_err() {
            ExternalCommand::git(["rm", "--cached", "--quiet", "--", path_arg.as_str()])
        } else {
            ExternalCommand::git(["add", "--", path_arg.as_str()])
        };
        self.execute_git_command(command).map(|_| ())
    }

    pub fn unstage(&self, path: &Path) -> Result<()> {
        let path_arg = path.to_string_lossy().into_owned();
        let command = if self.has_head() {
            ExternalCommand::git(["reset", "--quiet", "HEAD", "--", path_arg.as_str()])
        } else {
            ExternalCommand::git(["rm", "--cached", "-r", "--quiet", "--", path_arg.as_str()])
        };
        self.execute_git_command(command).map(|_| ())
    }

    /// Throw away unstaged changes to a tracked path
    pub fn discard(&self, path: &Path) -> Result<()> {
        let path_arg = path.to_string_lossy().into_owned();
        self.execute_git_command(ExternalCommand::git(["checkout", "--", path_arg.as_str()]))
            .map(|_| ())
    }

    /// Remove an untracked file, or a directory with everything below it
    pub fn delete_untracked(&self, path: &Path) -> Result<()> {
        let full_path = self.workdir.join(path);
        let metadata = full_path
            .symlink_metadata()
            .map_err(|_| DashboardError::file_not_found(path))?;
        if metadata.is_dir() {
            std::fs::remove_dir_all(&full_path)?;
        } else {
            std::fs::remove_file(&full_path)?;
        }
        log::debug!("Deleted {}", full_path.display());
        Ok(())
    }

    /// Rewrite history so `commit` and everything after it are undone.
    ///
    /// Changes from the removed commits stay staged. A root commit has no
    /// parent to reset to, so the branch ref is deleted instead.
    pub fn reset_to_parent(&self, commit: &CommitEntry) -> Result<ResetKind> {
        if commit.is_root() {
            self.execute_git_command(ExternalCommand::git(["update-ref", "-d", "HEAD"]))?;
            return Ok(ResetKind::HistoryWiped);
        }
        let parent = format!("{}~1", commit.hash);
        self.execute_git_command(ExternalCommand::git(["reset", "--soft", parent.as_str()]))?;
        Ok(ResetKind::Parent)
    }

    pub fn checkout_branch(&self, branch: &str) -> Result<()> {
        if self.current_branch().as_deref() == Some(branch) {
            return Err(DashboardError::precondition(format!(
                "Already on '{branch}'"
            )));
        }
        self.execute_git_command(ExternalCommand::git(["checkout", branch]))
            .map(|_| ())
    }

    pub fn commit(&self, message: &str, snapshot: &StatusSnapshot) -> Result<()> {
        if snapshot.staged.is_empty() {
            return Err(DashboardError::precondition("Nothing staged to commit"));
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(DashboardError::precondition("Commit message is empty"));
        }
        self.execute_git_command(ExternalCommand::git(["commit", "--quiet", "-m", message]))
            .map(|_| ())
    }

    // ---- Pipelines ----

    pub fn pull_pipeline(&self) -> Pipeline {
        Pipeline::new("Pull")
            .then(Step::command(
                "fetch",
                ExternalCommand::git(["fetch", "--prune"]),
            ))
            .then(Step::command(
                "fast-forward",
                ExternalCommand::git(["merge", "--ff-only", "@{upstream}"]),
            ))
    }

    /// Push, publishing the branch to `origin` when it has no upstream yet
    pub fn push_pipeline(&self) -> Pipeline {
        Pipeline::new("Push")
            .then(
                Step::command(
                    "check upstream",
                    ExternalCommand::git([
                        "rev-parse",
                        "--abbrev-ref",
                        "--symbolic-full-name",
                        "@{upstream}",
                    ]),
                )
                .allow_failure(),
            )
            .then(Step::new("push", |upstream| {
                if upstream.is_some_and(CommandOutput::success) {
                    StepPlan::Run(ExternalCommand::git(["push"]))
                } else {
                    StepPlan::Run(ExternalCommand::git([
                        "push",
                        "--set-upstream",
                        "origin",
                        "HEAD",
                    ]))
                }
            }))
    }

    /// Squash the current branch into the tracking branch.
    ///
    /// Refused while on the tracking branch or with uncommitted changes. Once
    /// the tracking branch is checked out, any failure resets the merge and
    /// returns to the original branch.
    pub fn squash_merge_pipeline(&self, snapshot: &StatusSnapshot) -> Result<Pipeline> {
        let branch = self
            .current_branch()
            .ok_or_else(|| DashboardError::precondition("Not on a branch"))?;
        let tracking = self
            .tracking_branch()
            .ok_or_else(|| DashboardError::precondition("No tracking branch configured"))?;
        if branch == tracking {
            return Err(DashboardError::precondition(format!(
                "Already on tracking branch '{tracking}'"
            )));
        }
        if !snapshot.staged.is_empty() || !snapshot.modified.is_empty() {
            return Err(DashboardError::precondition(
                "Commit or discard local changes before squash-merging",
            ));
        }

        let message = format!("Squash merge {branch}");
        Ok(Pipeline::new(format!("Squash merge {branch} into {tracking}"))
            .then(
                Step::command(
                    "checkout tracking branch",
                    ExternalCommand::git(["checkout", tracking.as_str()]),
                )
                .arms_rollback(),
            )
            .then(Step::command(
                "squash",
                ExternalCommand::git(["merge", "--squash", branch.as_str()]),
            ))
            .then(Step::command(
                "commit",
                ExternalCommand::git(["commit", "--quiet", "-m", message.as_str()]),
            ))
            .with_rollback(vec![
                ExternalCommand::git(["reset", "--merge"]),
                ExternalCommand::git(["checkout", branch.as_str()]),
            ]))
    }
}

/// `M\tpath` or `R100\told\tnew` into `(status letter, path)`
fn parse_name_status_line(line: &str) -> Option<(String, PathBuf)> {
    let mut fields = line.split('\t');
    let status = fields.next()?.chars().next()?.to_string();
    let path = fields.last()?;
    if path.is_empty() {
        return None;
    }
    Some((status, PathBuf::from(parse::unquote_path(path))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::process::RecordingRunner;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn setup_test_repo() -> Result<(TempDir, GitRepo)> {
        let temp_dir = TempDir::new()?;
        let repo_path = temp_dir.path();

        git(repo_path, &["init", "--initial-branch=main"]);
        git(repo_path, &["config", "user.name", "Test User"]);
        git(repo_path, &["config", "user.email", "test@example.com"]);

        let git_repo = GitRepo::open(repo_path)?;
        Ok((temp_dir, git_repo))
    }

    fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
        std::fs::write(dir.join(name), content).unwrap();
        git(dir, &["add", name]);
        git(dir, &["commit", "-m", message]);
    }

    #[test]
    fn test_open_git_repo() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        assert_eq!(
            git_repo.workdir().canonicalize()?,
            temp_dir.path().canonicalize()?
        );
        Ok(())
    }

    #[test]
    fn test_open_non_git_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("plain");
        std::fs::create_dir(&nested).unwrap();
        // A TempDir may itself live inside a repository; only assert the
        // error kind when discovery actually fails
        if let Err(err) = GitRepo::open(&nested) {
            assert!(matches!(err, DashboardError::NotInGitRepo));
        }
    }

    #[test]
    fn test_snapshot_of_empty_repo() -> Result<()> {
        let (_temp_dir, git_repo) = setup_test_repo()?;
        assert!(git_repo.fetch_snapshot().is_clean());
        assert!(git_repo.recent_commits(5).is_empty());
        assert_eq!(git_repo.current_branch().as_deref(), Some("main"));
        Ok(())
    }

    #[test]
    fn test_snapshot_counts_lines() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "one\ntwo\nthree\n", "Initial commit");

        std::fs::write(dir.join("a.txt"), "one\nTWO\nthree\nfour\nfive\n")?;
        std::fs::write(dir.join("b.txt"), "1\n2\n3\n4\n")?;

        let snapshot = git_repo.fetch_snapshot();
        assert!(snapshot.staged.is_empty());
        assert_eq!(snapshot.modified.len(), 1);
        assert_eq!(snapshot.modified[0].status, GitStatus::Modified);
        assert_eq!(snapshot.modified[0].stat_text().as_deref(), Some("+3 -1"));
        assert_eq!(snapshot.untracked.len(), 1);
        assert_eq!(snapshot.untracked[0].path, PathBuf::from("b.txt"));
        assert_eq!(snapshot.untracked[0].stat_text().as_deref(), Some("+4 -0"));
        Ok(())
    }

    #[test]
    fn test_snapshot_issues_bounded_calls() -> Result<()> {
        let (temp_dir, _git_repo) = setup_test_repo()?;
        let runner = RecordingRunner::new(temp_dir.path()).respond(
            "git -c core.quotepath=false status",
            CommandOutput::ok(" M a.txt\n M b.txt\n M c.txt\n?? d.txt\n"),
        );
        let git_repo = GitRepo::with_runner(temp_dir.path(), Box::new(runner))?;
        let snapshot = git_repo.fetch_snapshot();
        assert_eq!(snapshot.modified.len(), 3);
        assert_eq!(snapshot.untracked.len(), 1);
        Ok(())
    }

    #[test]
    fn test_stage_and_unstage() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "Initial commit");
        std::fs::write(dir.join("a.txt"), "b\n")?;

        git_repo.stage(Path::new("a.txt"))?;
        let snapshot = git_repo.fetch_snapshot();
        assert_eq!(snapshot.staged.len(), 1);
        assert!(snapshot.modified.is_empty());

        git_repo.unstage(Path::new("a.txt"))?;
        let snapshot = git_repo.fetch_snapshot();
        assert!(snapshot.staged.is_empty());
        assert_eq!(snapshot.modified.len(), 1);
        Ok(())
    }

    #[test]
    fn test_stage_deleted_file_records_removal() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "gone.txt", "bye\n", "Add file");
        std::fs::remove_file(dir.join("gone.txt"))?;

        git_repo.stage(Path::new("gone.txt"))?;
        let snapshot = git_repo.fetch_snapshot();
        assert_eq!(snapshot.staged.len(), 1);
        assert_eq!(snapshot.staged[0].status, GitStatus::Deleted);
        assert!(snapshot.modified.is_empty());
        Ok(())
    }

    #[test]
    fn test_stage_missing_path_uses_deletion_call() -> Result<()> {
        let (temp_dir, _git_repo) = setup_test_repo()?;
        let runner = Rc::new(RecordingRunner::new(temp_dir.path()));
        let git_repo = GitRepo::with_runner(temp_dir.path(), Box::new(Rc::clone(&runner)))?;

        git_repo.stage(Path::new("missing.txt"))?;
        std::fs::write(temp_dir.path().join("present.txt"), "x")?;
        git_repo.stage(Path::new("present.txt"))?;

        assert_eq!(
            runner.calls(),
            vec![
                "git rm --cached --quiet -- missing.txt",
                "git add -- present.txt"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unstage_without_head() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        std::fs::write(temp_dir.path().join("new.txt"), "x\n")?;
        git_repo.stage(Path::new("new.txt"))?;
        assert_eq!(git_repo.fetch_snapshot().staged.len(), 1);

        git_repo.unstage(Path::new("new.txt"))?;
        let snapshot = git_repo.fetch_snapshot();
        assert!(snapshot.staged.is_empty());
        assert_eq!(snapshot.untracked.len(), 1);
        Ok(())
    }

    #[test]
    fn test_discard_and_delete() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "Initial commit");
        std::fs::write(dir.join("a.txt"), "changed\n")?;
        std::fs::create_dir_all(dir.join("scratch/inner"))?;
        std::fs::write(dir.join("scratch/inner/x.txt"), "x\n")?;

        git_repo.discard(Path::new("a.txt"))?;
        assert_eq!(std::fs::read_to_string(dir.join("a.txt"))?, "a\n");

        git_repo.delete_untracked(Path::new("scratch"))?;
        assert!(!dir.join("scratch").exists());
        assert!(git_repo.fetch_snapshot().is_clean());
        Ok(())
    }

    #[test]
    fn test_reset_to_parent_and_root() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "First");
        commit_file(dir, "b.txt", "b\n", "Second");

        let commits = git_repo.recent_commits(5);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "Second");
        assert_eq!(commits[0].added, 1);

        assert_eq!(git_repo.reset_to_parent(&commits[0])?, ResetKind::Parent);
        assert_eq!(git_repo.recent_commits(5).len(), 1);

        let root = &git_repo.recent_commits(5)[0];
        assert!(root.is_root());
        assert_eq!(git_repo.reset_to_parent(root)?, ResetKind::HistoryWiped);
        assert!(!git_repo.has_head());
        assert!(git_repo.recent_commits(5).is_empty());
        Ok(())
    }

    #[test]
    fn test_branch_status_against_tracking_branch() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "First");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "b.txt", "b\n", "Feature work");
        commit_file(dir, "c.txt", "c\n", "More feature work");

        let status = git_repo.branch_status();
        assert_eq!(status.branch, "feature");
        assert_eq!(status.tracking.as_deref(), Some("main"));
        assert_eq!((status.ahead, status.behind), (2, 0));
        assert!(!status.is_tracking_branch());
        Ok(())
    }

    #[test]
    fn test_recent_branches_order() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "First");
        git(dir, &["branch", "alpha"]);
        git(dir, &["branch", "beta"]);
        git(dir, &["branch", "gamma"]);
        git(dir, &["checkout", "beta"]);
        git(dir, &["checkout", "alpha"]);
        git(dir, &["checkout", "main"]);

        assert_eq!(git_repo.recent_branches(), vec!["alpha", "beta", "gamma"]);
        Ok(())
    }

    #[test]
    fn test_conflict_report_detects_potential_conflict() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "shared.txt", "line\n", "Base");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "shared.txt", "feature edit\n", "Feature edit");
        git(dir, &["checkout", "main"]);
        commit_file(dir, "shared.txt", "main edit\n", "Main edit");
        git(dir, &["checkout", "feature"]);

        let report = git_repo.conflict_report(Some("main"));
        assert!(report.active.is_empty());
        assert_eq!(report.potential, vec![PathBuf::from("shared.txt")]);
        Ok(())
    }

    #[test]
    fn test_conflict_report_without_divergence_is_empty() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "shared.txt", "line\n", "Base");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "shared.txt", "feature edit\n", "Feature edit");

        assert!(git_repo.conflict_report(Some("main")).is_empty());
        Ok(())
    }

    #[test]
    fn test_branch_detail_lists_changed_files() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "Base");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "b.txt", "b\n", "Add b");

        let detail = git_repo.branch_detail();
        assert_eq!(detail.branch, "feature");
        assert!(detail.merge_base.is_some());
        assert_eq!(detail.files, vec![("A".to_string(), PathBuf::from("b.txt"))]);
        Ok(())
    }

    #[test]
    fn test_commit_preconditions() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let err = git_repo
            .commit("message", &StatusSnapshot::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Nothing staged to commit");

        std::fs::write(temp_dir.path().join("a.txt"), "a\n")?;
        git_repo.stage(Path::new("a.txt"))?;
        let snapshot = git_repo.fetch_snapshot();
        assert!(git_repo.commit("   ", &snapshot).unwrap_err().is_warning());

        git_repo.commit("Add a", &snapshot)?;
        assert_eq!(git_repo.recent_commits(1)[0].subject, "Add a");
        Ok(())
    }

    #[test]
    fn test_squash_merge_pipeline() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "a.txt", "a\n", "Base");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "b.txt", "b\n", "Add b");
        commit_file(dir, "c.txt", "c\n", "Add c");

        let pipeline = git_repo.squash_merge_pipeline(&git_repo.fetch_snapshot())?;
        let outcome = pipeline.run_blocking(git_repo.runner());
        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(git_repo.current_branch().as_deref(), Some("main"));
        assert_eq!(git_repo.recent_commits(1)[0].subject, "Squash merge feature");
        Ok(())
    }

    #[test]
    fn test_squash_merge_refused_on_tracking_branch() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        commit_file(temp_dir.path(), "a.txt", "a\n", "Base");
        let err = git_repo
            .squash_merge_pipeline(&git_repo.fetch_snapshot())
            .err()
            .unwrap();
        assert!(err.is_warning());
        Ok(())
    }

    #[test]
    fn test_squash_merge_restores_branch_on_failure() -> Result<()> {
        let (temp_dir, git_repo) = setup_test_repo()?;
        let dir = temp_dir.path();
        commit_file(dir, "shared.txt", "base\n", "Base");
        git(dir, &["checkout", "-b", "feature"]);
        commit_file(dir, "shared.txt", "feature\n", "Feature edit");
        git(dir, &["checkout", "main"]);
        commit_file(dir, "shared.txt", "main\n", "Main edit");
        git(dir, &["checkout", "feature"]);

        let outcome = git_repo
            .squash_merge_pipeline(&git_repo.fetch_snapshot())?
            .run_blocking(git_repo.runner());
        assert!(!outcome.is_success());
        assert_eq!(outcome.rolled_back(), Some(true));
        assert_eq!(git_repo.current_branch().as_deref(), Some("feature"));
        assert!(git_repo.fetch_snapshot().is_clean());
        Ok(())
    }

    #[test]
    fn test_parse_name_status_line() {
        assert_eq!(
            parse_name_status_line("M\tsrc/lib.rs"),
            Some(("M".to_string(), PathBuf::from("src/lib.rs")))
        );
        assert_eq!(
            parse_name_status_line("R100\told.rs\tnew.rs"),
            Some(("R".to_string(), PathBuf::from("new.rs")))
        );
        assert_eq!(parse_name_status_line(""), None);
    }
}

//! Staged, modified and untracked files.
//!
//! One [`StagingProvider`] per [`StagingArea`]. Every line is
//! `<code>[ +A -D] <path>`; what cycling, destroying and opening a line does
//! depends on the area it sits in.

use crate::core::colors::get_status_color_style;
use crate::core::error::{DashboardError, Result};
use crate::core::git_status::GitStatus;
use crate::core::progress::Level;
use crate::core::state::{FileEntry, StagingArea};
use crate::dashboard::provider::{BuildContext, SectionProvider};
use crate::dashboard::view_model::{
    action, find_range, ActionContext, ActionKind, Highlight, HighlightRange, LineMeta, Refresh,
    Style, ViewModel,
};
use std::path::{Path, PathBuf};

pub struct StagingProvider {
    area: StagingArea,
}

impl StagingProvider {
    pub fn new(area: StagingArea) -> Self {
        Self { area }
    }

    pub fn area(&self) -> StagingArea {
        self.area
    }

    fn title(&self) -> &'static str {
        match self.area {
            StagingArea::Staged => "Staged changes",
            StagingArea::Modified => "Changes",
            StagingArea::Untracked => "Untracked files",
        }
    }
}

/// `  <code> +A -D <path>`, or without counts when git has none
pub fn format_entry(entry: &FileEntry) -> String {
    let code = entry.status.as_str();
    let path = entry.path.display();
    match entry.stat_text() {
        Some(stat) => format!("  {code} {stat} {path}"),
        None => format!("  {code} {path}"),
    }
}

fn entry_highlight(text: &str, entry: &FileEntry, area: StagingArea) -> Highlight {
    let code = entry.status.as_str();
    let mut ranges = vec![HighlightRange {
        start: 2,
        end: 2 + code.len(),
        style: get_status_color_style(entry.status, area == StagingArea::Staged),
    }];
    if let Some(stat) = entry.stat_text() {
        let from = 2 + code.len();
        if let Some((added, removed)) = stat.split_once(' ') {
            ranges.extend(find_range(text, added, from, Style::Added));
            ranges.extend(find_range(text, removed, from + added.len(), Style::Removed));
        }
    }
    Highlight::Ranges(ranges)
}

/// Stage or unstage one path, depending on where it is now
fn cycle(ctx: &mut ActionContext<'_>, area: StagingArea, path: &Path) -> Result<()> {
    match area {
        StagingArea::Staged => ctx.repo.unstage(path),
        StagingArea::Modified | StagingArea::Untracked => ctx.repo.stage(path),
    }
}

fn bulk_cycle(
    ctx: &mut ActionContext<'_>,
    area: StagingArea,
    paths: &[PathBuf],
) -> Result<Refresh> {
    let mut done = 0;
    for path in paths {
        match cycle(ctx, area, path) {
            Ok(()) => done += 1,
            Err(e) => log::warn!("Skipping {}: {e}", path.display()),
        }
    }

    let verb = match area {
        StagingArea::Staged => "Unstaged",
        StagingArea::Modified | StagingArea::Untracked => "Staged",
    };
    let level = if done == paths.len() {
        Level::Success
    } else {
        Level::Warning
    };
    ctx.notifier
        .notify(level, &format!("{verb} {done} of {} files", paths.len()));

    Ok(if done > 0 {
        Refresh::Changed
    } else {
        Refresh::Unchanged
    })
}

fn destroy(ctx: &mut ActionContext<'_>, area: StagingArea, path: &Path) -> Result<Refresh> {
    let shown = path.display();
    let (prompt, what) = match area {
        StagingArea::Staged => (
            format!("Unstage '{shown}'? Its changes stay in the working tree"),
            format!("unstage {shown}"),
        ),
        StagingArea::Modified => (
            format!("Discard all changes to '{shown}'? This cannot be undone"),
            format!("discard {shown}"),
        ),
        StagingArea::Untracked => (
            format!("Delete '{shown}' from disk? This cannot be undone"),
            format!("delete {shown}"),
        ),
    };
    if !ctx.host.confirm(&prompt) {
        return Err(DashboardError::declined(what));
    }

    match area {
        StagingArea::Staged => ctx.repo.unstage(path)?,
        StagingArea::Modified => ctx.repo.discard(path)?,
        StagingArea::Untracked => ctx.repo.delete_untracked(path)?,
    }
    Ok(Refresh::Changed)
}

fn show_diff(
    ctx: &mut ActionContext<'_>,
    area: StagingArea,
    entry: &FileEntry,
) -> Result<Refresh> {
    let lossy = entry.path.to_string_lossy();
    let path: &str = &lossy;
    let args: Vec<&str> = match area {
        StagingArea::Staged => vec!["diff", "--cached", "--", path],
        StagingArea::Modified => vec!["diff", "--", path],
        // Binary or unreadable: nothing a diff can show
        StagingArea::Untracked if entry.added.is_none() => {
            ctx.host.open_path(&entry.path)?;
            return Ok(Refresh::Unchanged);
        }
        StagingArea::Untracked => vec!["diff", "--no-index", "--", "/dev/null", path],
    };

    let paged = ctx.pager.pipeline(&args);
    if let Some(warning) = &paged.warning {
        ctx.notifier.notify(Level::Warning, warning);
    }
    ctx.host.show_command(&format!("Diff of {path}"), paged)?;
    Ok(Refresh::Unchanged)
}

impl SectionProvider for StagingProvider {
    fn build(&self, ctx: &BuildContext<'_>) -> ViewModel {
        let area = self.area;
        let files = ctx.snapshot.files(area);
        let mut view = ViewModel::new().with_header(format!("{} ({})", self.title(), files.len()));
        if files.is_empty() {
            view.push_line("  (no files)");
            return view;
        }

        let paths: Vec<PathBuf> = files.iter().map(|entry| entry.path.clone()).collect();
        let bulk = action(move |ctx| bulk_cycle(ctx, area, &paths));
        view.set_header_action(ActionKind::BulkCycle, bulk.clone());

        for entry in files {
            let text = format_entry(entry);
            let highlight = entry_highlight(&text, entry, area);
            let line = view.push_line(text);
            view.set_highlight(line, highlight);
            view.set_meta(line, LineMeta::Path(entry.path.clone()));
            if entry.status == GitStatus::Unmerged {
                view.annotate(line, "conflict");
            }

            let path = entry.path.clone();
            view.set_action(
                line,
                ActionKind::Cycle,
                action(move |ctx| {
                    cycle(ctx, area, &path)?;
                    Ok(Refresh::Changed)
                }),
            );
            view.set_action(line, ActionKind::BulkCycle, bulk.clone());

            let path = entry.path.clone();
            view.set_action(
                line,
                ActionKind::Destroy,
                action(move |ctx| destroy(ctx, area, &path)),
            );

            let shown = entry.clone();
            view.set_action(
                line,
                ActionKind::Activate,
                action(move |ctx| show_diff(ctx, area, &shown)),
            );

            let path = entry.path.clone();
            view.set_action(
                line,
                ActionKind::OpenExternal,
                action(move |ctx| {
                    ctx.host.open_path(&path)?;
                    Ok(Refresh::Unchanged)
                }),
            );
        }
        view
    }

    fn annotation_style(&self) -> Option<Style> {
        Some(Style::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::host::ScriptedHost;
    use crate::providers::test_support::{build, commit_file, git, setup_repo, Harness};

    #[test]
    fn test_modified_and_untracked_lines() {
        let (dir, repo) = setup_repo();
        commit_file(dir.path(), "a.txt", "one\ntwo\nthree\n", "Initial");
        std::fs::write(dir.path().join("a.txt"), "one\n2\n3\n4\nthree\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "1\n2\n3\n4\n").unwrap();

        let modified = build(&StagingProvider::new(StagingArea::Modified), &repo);
        assert_eq!(modified.header(), Some("Changes (1)"));
        assert_eq!(modified.lines(), &["  M +3 -1 a.txt"]);

        let untracked = build(&StagingProvider::new(StagingArea::Untracked), &repo);
        assert_eq!(untracked.lines(), &["  ?? +4 -0 b.txt"]);

        let staged = build(&StagingProvider::new(StagingArea::Staged), &repo);
        assert_eq!(staged.header(), Some("Staged changes (0)"));
        assert_eq!(staged.lines(), &["  (no files)"]);
        assert!(staged.action_kinds(1).is_empty());
    }

    #[test]
    fn test_highlights_cover_code_and_counts() {
        let entry = FileEntry::new(GitStatus::Modified, "a.txt").with_stats(Some(3), Some(1));
        let text = format_entry(&entry);
        let Highlight::Ranges(ranges) = entry_highlight(&text, &entry, StagingArea::Modified) else {
            panic!("expected ranges");
        };
        let styled: Vec<(&str, Style)> = ranges
            .iter()
            .map(|range| (&text[range.start..range.end], range.style))
            .collect();
        assert_eq!(
            styled,
            vec![("M", Style::Modified), ("+3", Style::Added), ("-1", Style::Removed)]
        );
    }

    #[test]
    fn test_cycle_stages_and_unstages() {
        let (dir, repo) = setup_repo();
        commit_file(dir.path(), "a.txt", "one\n", "Initial");
        std::fs::write(dir.path().join("a.txt"), "two\n").unwrap();
        let mut harness = Harness::new(ScriptedHost::new());

        let modified = build(&StagingProvider::new(StagingArea::Modified), &repo);
        let refresh = harness.run(&repo, &modified, 1, ActionKind::Cycle).unwrap();
        assert_eq!(refresh, Refresh::Changed);
        assert_eq!(repo.fetch_snapshot().staged.len(), 1);

        let staged = build(&StagingProvider::new(StagingArea::Staged), &repo);
        harness.run(&repo, &staged, 1, ActionKind::Cycle).unwrap();
        let snapshot = repo.fetch_snapshot();
        assert!(snapshot.staged.is_empty());
        assert_eq!(snapshot.modified.len(), 1);
    }

    #[test]
    fn test_staging_a_deleted_file_records_the_removal() {
        let (dir, repo) = setup_repo();
        commit_file(dir.path(), "gone.txt", "bye\n", "Initial");
        std::fs::remove_file(dir.path().join("gone.txt")).unwrap();
        let mut harness = Harness::new(ScriptedHost::new());

        let modified = build(&StagingProvider::new(StagingArea::Modified), &repo);
        assert!(modified.lines()[0].starts_with("  D "));
        harness.run(&repo, &modified, 1, ActionKind::Cycle).unwrap();

        let snapshot = repo.fetch_snapshot();
        assert_eq!(snapshot.staged.len(), 1);
        assert_eq!(snapshot.staged[0].status, GitStatus::Deleted);
    }

    #[test]
    fn test_bulk_cycle_reports_count() {
        let (dir, repo) = setup_repo();
        for name in ["x.txt", "y.txt", "z.txt"] {
            std::fs::write(dir.path().join(name), "content\n").unwrap();
        }
        let mut harness = Harness::new(ScriptedHost::new());

        let untracked = build(&StagingProvider::new(StagingArea::Untracked), &repo);
        let refresh = harness
            .run_header(&repo, &untracked, ActionKind::BulkCycle)
            .unwrap();
        assert_eq!(refresh, Refresh::Changed);
        assert_eq!(
            harness.notifications.messages(),
            &[(Level::Success, "Staged 3 of 3 files".to_string())]
        );
        assert_eq!(repo.fetch_snapshot().staged.len(), 3);
    }

    #[test]
    fn test_destroy_requires_confirmation() {
        let (dir, repo) = setup_repo();
        std::fs::write(dir.path().join("junk.txt"), "junk\n").unwrap();
        let untracked = build(&StagingProvider::new(StagingArea::Untracked), &repo);

        let mut declining = Harness::new(ScriptedHost::new());
        let err = declining
            .run(&repo, &untracked, 1, ActionKind::Destroy)
            .unwrap_err();
        assert!(matches!(err, DashboardError::Declined { .. }));
        assert!(dir.path().join("junk.txt").exists());
        assert!(declining.host.prompts[0].contains("cannot be undone"));

        let mut confirming = Harness::new(ScriptedHost::new().answer_confirm(true));
        confirming
            .run(&repo, &untracked, 1, ActionKind::Destroy)
            .unwrap();
        assert!(!dir.path().join("junk.txt").exists());
    }

    #[test]
    fn test_discard_restores_committed_content() {
        let (dir, repo) = setup_repo();
        commit_file(dir.path(), "a.txt", "kept\n", "Initial");
        std::fs::write(dir.path().join("a.txt"), "scratch\n").unwrap();
        let modified = build(&StagingProvider::new(StagingArea::Modified), &repo);

        let mut harness = Harness::new(ScriptedHost::new().answer_confirm(true));
        harness.run(&repo, &modified, 1, ActionKind::Destroy).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "kept\n");
    }

    #[test]
    fn test_activate_hands_off_diff_pipelines() {
        let (dir, repo) = setup_repo();
        commit_file(dir.path(), "a.txt", "one\n", "Initial");
        std::fs::write(dir.path().join("a.txt"), "two\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "new\n").unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0u8, 1, 2]).unwrap();
        git(dir.path(), &["add", "a.txt"]);
        let mut harness = Harness::new(ScriptedHost::new());

        let staged = build(&StagingProvider::new(StagingArea::Staged), &repo);
        harness.run(&repo, &staged, 1, ActionKind::Activate).unwrap();
        let untracked = build(&StagingProvider::new(StagingArea::Untracked), &repo);
        let b_line = untracked
            .lines()
            .iter()
            .position(|line| line.ends_with("b.txt"))
            .unwrap()
            + 1;
        let blob_line = untracked
            .lines()
            .iter()
            .position(|line| line.ends_with("blob.bin"))
            .unwrap()
            + 1;
        harness.run(&repo, &untracked, b_line, ActionKind::Activate).unwrap();
        harness.run(&repo, &untracked, blob_line, ActionKind::Activate).unwrap();

        assert_eq!(
            harness.host.commands,
            vec![
                "git diff --cached -- a.txt | delta --paging=never",
                "git diff --no-index -- /dev/null b.txt | delta --paging=never",
            ]
        );
        assert_eq!(harness.host.opened, vec![PathBuf::from("blob.bin")]);
    }
}

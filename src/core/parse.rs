//! Parsers for the line-oriented output of the wrapped git executable.
//!
//! Every parser here fails safe: lines it does not understand are skipped and
//! empty or garbled input yields an empty result, never a panic or an error.

use std::collections::HashMap;

/// One `XY path` line of `git status --porcelain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PorcelainEntry {
    pub x: char,
    pub y: char,
    pub path: String,
}

/// The `## ...` header line of `git status --porcelain --branch`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchHeader {
    pub branch: Option<String>,
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub detached: bool,
    pub unborn: bool,
}

/// Added/removed counts of one `--numstat` line; `None` for binary files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumStat {
    pub added: Option<u32>,
    pub removed: Option<u32>,
}

/// A commit header of the custom `commit|...` log format plus its summed numstat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub timestamp: i64,
    pub subject: String,
    pub added: u32,
    pub removed: u32,
}

/// Prefix marking commit header lines in [`LOG_FORMAT`] output
pub const LOG_RECORD_PREFIX: &str = "commit|";

/// `--format` argument producing lines understood by [`parse_log`]
pub const LOG_FORMAT: &str = "--format=commit|%h|%p|%an|%ct|%s";

/// Remove git's C-style quoting from a path, if present
pub fn unquote_path(raw: &str) -> String {
    let raw = raw.trim();
    if !(raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"')) {
        return raw.to_string();
    }

    let inner = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}

/// Parse porcelain v1 status lines, skipping the branch header if present
pub fn parse_porcelain(output: &str) -> Vec<PorcelainEntry> {
    output
        .lines()
        .filter(|line| !line.starts_with("## "))
        .filter_map(parse_porcelain_line)
        .collect()
}

fn parse_porcelain_line(line: &str) -> Option<PorcelainEntry> {
    let mut chars = line.chars();
    let x = chars.next()?;
    let y = chars.next()?;
    if !x.is_ascii() || !y.is_ascii() || chars.next()? != ' ' {
        return None;
    }

    let rest = &line[3..];
    // Renames and copies are reported as "old -> new"
    let path = match rest.rsplit_once(" -> ") {
        Some((_, new)) if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') => new,
        _ => rest,
    };
    let path = unquote_path(path);
    if path.is_empty() {
        return None;
    }

    Some(PorcelainEntry { x, y, path })
}

/// Parse the `## branch...upstream [ahead N, behind M]` header line
pub fn parse_branch_header(output: &str) -> Option<BranchHeader> {
    let line = output.lines().find(|line| line.starts_with("## "))?;
    let rest = line[3..].trim();

    let mut header = BranchHeader::default();

    if let Some(name) = rest
        .strip_prefix("No commits yet on ")
        .or_else(|| rest.strip_prefix("Initial commit on "))
    {
        header.branch = Some(name.trim().to_string());
        header.unborn = true;
        return Some(header);
    }

    if rest.starts_with("HEAD (no branch)") {
        header.detached = true;
        return Some(header);
    }

    let (refs, tracking) = match rest.find(" [") {
        Some(pos) if rest.ends_with(']') => {
            (&rest[..pos], Some(&rest[pos + 2..rest.len() - 1]))
        }
        _ => (rest, None),
    };

    match refs.split_once("...") {
        Some((branch, upstream)) => {
            header.branch = Some(branch.to_string());
            header.upstream = Some(upstream.to_string());
        }
        None => header.branch = Some(refs.to_string()),
    }

    if let Some(tracking) = tracking {
        for part in tracking.split(',').map(str::trim) {
            if let Some(count) = part.strip_prefix("ahead ") {
                header.ahead = count.parse().unwrap_or(0);
            } else if let Some(count) = part.strip_prefix("behind ") {
                header.behind = count.parse().unwrap_or(0);
            } else if part == "gone" {
                header.upstream = None;
            }
        }
    }

    Some(header)
}

/// Resolve the destination path of a numstat rename (`a => b`, `dir/{a => b}/f`)
pub fn resolve_rename_path(path: &str) -> String {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            let inner = &path[open + 1..close];
            if let Some((_, new)) = inner.split_once(" => ") {
                let joined = format!("{}{}{}", &path[..open], new, &path[close + 1..]);
                return joined.replace("//", "/");
            }
        }
    }
    match path.split_once(" => ") {
        Some((_, new)) => new.to_string(),
        None => path.to_string(),
    }
}

/// Parse a single `added\tremoved\tpath` line
pub fn parse_numstat_line(line: &str) -> Option<(String, NumStat)> {
    let mut fields = line.splitn(3, '\t');
    let added = fields.next()?;
    let removed = fields.next()?;
    let path = fields.next()?;
    if path.is_empty() {
        return None;
    }

    let parse_count = |field: &str| -> Option<Option<u32>> {
        match field {
            "-" => Some(None),
            number => number.parse().ok().map(Some),
        }
    };

    Some((
        unquote_path(&resolve_rename_path(path)),
        NumStat {
            added: parse_count(added)?,
            removed: parse_count(removed)?,
        },
    ))
}

/// Parse `git diff --numstat` output into a path-keyed map
pub fn parse_numstat(output: &str) -> HashMap<String, NumStat> {
    output.lines().filter_map(parse_numstat_line).collect()
}

/// Parse `git log` output produced with [`LOG_FORMAT`] and `--numstat`
pub fn parse_log(output: &str) -> Vec<LogRecord> {
    let mut records: Vec<LogRecord> = Vec::new();

    for line in output.lines() {
        if let Some(header) = line.strip_prefix(LOG_RECORD_PREFIX) {
            let fields: Vec<&str> = header.splitn(5, '|').collect();
            if fields.len() < 5 {
                continue;
            }
            records.push(LogRecord {
                hash: fields[0].to_string(),
                parents: fields[1].split_whitespace().map(str::to_string).collect(),
                author: fields[2].to_string(),
                timestamp: fields[3].parse().unwrap_or(0),
                subject: fields[4].to_string(),
                added: 0,
                removed: 0,
            });
            continue;
        }

        if let (Some(record), Some((_, stat))) = (records.last_mut(), parse_numstat_line(line)) {
            record.added += stat.added.unwrap_or(0);
            record.removed += stat.removed.unwrap_or(0);
        }
    }

    records
}

/// Parse `git rev-list --left-right --count a...b` into `(left, right)`
pub fn parse_left_right_count(output: &str) -> Option<(usize, usize)> {
    let mut fields = output.split_whitespace();
    let left = fields.next()?.parse().ok()?;
    let right = fields.next()?.parse().ok()?;
    Some((left, right))
}

/// Branch names in most-recently-checked-out order from reflog subjects.
///
/// Each name appears once, at the position of its most recent checkout.
pub fn parse_checkout_history(output: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for line in output.lines() {
        let Some(rest) = line.trim().strip_prefix("checkout: moving from ") else {
            continue;
        };
        let Some((_, to)) = rest.rsplit_once(" to ") else {
            continue;
        };
        let to = to.trim().to_string();
        if !to.is_empty() && !seen.contains(&to) {
            seen.push(to);
        }
    }
    seen
}

/// Conflicted paths from `git merge-tree --write-tree --name-only`.
///
/// The first line is the resulting tree; the conflicted file list follows
/// until the first blank line.
pub fn parse_merge_tree_names(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for line in output.lines().skip(1) {
        if line.trim().is_empty() {
            break;
        }
        let path = unquote_path(line);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Conflicted paths from the legacy three-argument `git merge-tree` output.
///
/// Entries start with a description line ("changed in both") followed by
/// `  base|our|their  <mode> <oid> <path>` lines; a file conflicts when its
/// merged hunk contains a `+<<<<<<<` marker.
pub fn parse_legacy_merge_tree(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        let trimmed = line.trim_start();
        let is_stage_line = line.starts_with("  ")
            && ["base ", "our ", "their ", "result "]
                .iter()
                .any(|stage| trimmed.starts_with(stage));
        if is_stage_line {
            if let Some(path) = trimmed.split_whitespace().nth(3) {
                current = Some(path.to_string());
            }
            continue;
        }
        if !line.starts_with([' ', '+', '-', '@']) {
            current = None;
            continue;
        }
        if line.starts_with("+<<<<<<<") {
            if let Some(path) = &current {
                if !paths.contains(path) {
                    paths.push(path.clone());
                }
            }
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain_basic() {
        let output = "## main\n M src/lib.rs\nA  new.rs\n?? notes.txt\nMM both.rs\n";
        let entries = parse_porcelain(output);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], PorcelainEntry { x: ' ', y: 'M', path: "src/lib.rs".into() });
        assert_eq!(entries[1].x, 'A');
        assert_eq!(entries[2].x, '?');
        assert_eq!(entries[3].path, "both.rs");
    }

    #[test]
    fn test_parse_porcelain_rename_and_quotes() {
        let output = "R  old.rs -> new.rs\n?? \"with space.txt\"\n";
        let entries = parse_porcelain(output);
        assert_eq!(entries[0].path, "new.rs");
        assert_eq!(entries[1].path, "with space.txt");
    }

    #[test]
    fn test_parse_porcelain_garbage_is_skipped() {
        assert!(parse_porcelain("").is_empty());
        assert!(parse_porcelain("x\nfatal: not a git repository\n").is_empty());
    }

    #[test]
    fn test_parse_branch_header_with_tracking() {
        let header =
            parse_branch_header("## feature...origin/feature [ahead 2, behind 1]\n").unwrap();
        assert_eq!(header.branch.as_deref(), Some("feature"));
        assert_eq!(header.upstream.as_deref(), Some("origin/feature"));
        assert_eq!((header.ahead, header.behind), (2, 1));
    }

    #[test]
    fn test_parse_branch_header_variants() {
        let plain = parse_branch_header("## main\n").unwrap();
        assert_eq!(plain.branch.as_deref(), Some("main"));
        assert!(plain.upstream.is_none());

        let unborn = parse_branch_header("## No commits yet on main\n").unwrap();
        assert!(unborn.unborn);
        assert_eq!(unborn.branch.as_deref(), Some("main"));

        let detached = parse_branch_header("## HEAD (no branch)\n").unwrap();
        assert!(detached.detached);
        assert!(detached.branch.is_none());

        let gone = parse_branch_header("## main...origin/main [gone]\n").unwrap();
        assert!(gone.upstream.is_none());

        assert!(parse_branch_header("garbage").is_none());
    }

    #[test]
    fn test_parse_numstat() {
        let stats = parse_numstat("3\t1\ta.txt\n-\t-\timage.png\n10\t0\tsrc/{old => new}/mod.rs\n");
        assert_eq!(stats["a.txt"], NumStat { added: Some(3), removed: Some(1) });
        assert_eq!(stats["image.png"], NumStat { added: None, removed: None });
        assert!(stats.contains_key("src/new/mod.rs"));
    }

    #[test]
    fn test_resolve_rename_path() {
        assert_eq!(resolve_rename_path("a.rs => b.rs"), "b.rs");
        assert_eq!(resolve_rename_path("src/{a => b}/x.rs"), "src/b/x.rs");
        assert_eq!(resolve_rename_path("src/{ => b}/x.rs"), "src/b/x.rs");
        assert_eq!(resolve_rename_path("plain.rs"), "plain.rs");
    }

    #[test]
    fn test_parse_log_sums_numstat() {
        let output = "commit|abc1234|def5678|Ada|1700000000|Fix | pipes in subject\n\
                      \n\
                      3\t1\ta.txt\n\
                      2\t2\tb.txt\n\
                      commit|def5678||Ada|1690000000|Initial\n\
                      \n\
                      -\t-\tlogo.png\n";
        let records = parse_log(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "Fix | pipes in subject");
        assert_eq!((records[0].added, records[0].removed), (5, 3));
        assert_eq!(records[0].parents, vec!["def5678".to_string()]);
        assert!(records[1].parents.is_empty());
        assert_eq!((records[1].added, records[1].removed), (0, 0));
    }

    #[test]
    fn test_parse_left_right_count() {
        assert_eq!(parse_left_right_count("2\t5\n"), Some((2, 5)));
        assert_eq!(parse_left_right_count(""), None);
        assert_eq!(parse_left_right_count("x y"), None);
    }

    #[test]
    fn test_parse_checkout_history_dedups() {
        let output = "checkout: moving from main to feature\n\
                      commit: something\n\
                      checkout: moving from feature to main\n\
                      checkout: moving from topic to feature\n";
        assert_eq!(parse_checkout_history(output), vec!["feature", "main"]);
    }

    #[test]
    fn test_parse_merge_tree_names() {
        let output = "4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                      conflict.txt\nconflict.txt\nother.txt\n\nAuto-merging\n";
        assert_eq!(parse_merge_tree_names(output), vec!["conflict.txt", "other.txt"]);
        assert!(parse_merge_tree_names("4b825dc\n").is_empty());
    }

    #[test]
    fn test_parse_legacy_merge_tree() {
        let output = "changed in both\n\
                      \x20 base   100644 aaa shared.txt\n\
                      \x20 our    100644 bbb shared.txt\n\
                      \x20 their  100644 ccc shared.txt\n\
                      @@ -1 +1,5 @@\n\
                      +<<<<<<< .our\n\
                      \x20ours\n\
                      +=======\n\
                      +theirs\n\
                      +>>>>>>> .their\n\
                      added in remote\n\
                      \x20 their  100644 ddd clean.txt\n\
                      @@ -0,0 +1 @@\n\
                      +hello\n";
        assert_eq!(parse_legacy_merge_tree(output), vec!["shared.txt"]);
    }
}

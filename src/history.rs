use std::collections::HashSet;
use std::path::Path;

use git2::{Repository, TreeWalkMode, TreeWalkResult};
use tracing::warn;

use crate::walk::{has_skipped_dir_component, is_binary_skip};

/// A `(commit_hash, repo_relative_path)` pair awaiting a lazy blob read.
pub struct HistoryEntry {
    pub commit: String,
    pub path: String,
}

/// Enumerate commits reachable from any local branch, remote-tracking
/// branch, tag, or HEAD — the `git2` equivalent of
/// `git rev-list --all --remotes --tags`, which per git's own docs
/// pretends HEAD is listed alongside those refs, optionally capped.
fn list_commits(repo: &Repository, limit: Option<usize>) -> Vec<git2::Oid> {
    let mut revwalk = match repo.revwalk() {
        Ok(rw) => rw,
        Err(err) => {
            warn!(error = %err, "could not start revwalk");
            return Vec::new();
        }
    };

    for glob in ["refs/heads/*", "refs/remotes/*", "refs/tags/*"] {
        if let Err(err) = revwalk.push_glob(glob) {
            warn!(glob, error = %err, "could not push ref glob onto revwalk");
        }
    }
    // Covers a detached HEAD not reachable from any branch/tag/remote ref.
    // An unborn HEAD (no commits yet) errors here; that's fine, there's
    // nothing to walk.
    let _ = revwalk.push_head();

    let mut seen = HashSet::new();
    let mut commits = Vec::new();
    for oid in revwalk.flatten() {
        if !seen.insert(oid) {
            continue;
        }
        commits.push(oid);
        if let Some(limit) = limit {
            if commits.len() >= limit {
                break;
            }
        }
    }
    commits
}

/// Recursively list every blob path tracked at `commit`, applying the same
/// skip rules as the working-tree enumerator.
fn list_commit_files(repo: &Repository, oid: git2::Oid) -> Vec<String> {
    let mut paths = Vec::new();
    let commit = match repo.find_commit(oid) {
        Ok(c) => c,
        Err(_) => return paths,
    };
    let tree = match commit.tree() {
        Ok(t) => t,
        Err(_) => return paths,
    };

    let _ = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return TreeWalkResult::Ok;
        }
        let Some(name) = entry.name() else {
            return TreeWalkResult::Ok;
        };
        let rel = if root.is_empty() {
            name.to_string()
        } else {
            format!("{}{}", root, name)
        };
        let rel_path = Path::new(&rel);
        if !is_binary_skip(rel_path) && !has_skipped_dir_component(rel_path) {
            paths.push(rel);
        }
        TreeWalkResult::Ok
    });

    paths
}

/// Eagerly enumerate every `(commit, path)` pair reachable in `repo_path`'s
/// history, per §4.3. Returns an empty list (never an error) if the path
/// is not a git repository at all — history scanning is additive, not a
/// precondition for a scan.
pub fn enumerate_history(repo_path: &Path, commit_limit: Option<usize>) -> Vec<HistoryEntry> {
    let repo = match Repository::discover(repo_path) {
        Ok(repo) => repo,
        Err(err) => {
            warn!(error = %err, "scan_history requested but no git repository found");
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for oid in list_commits(&repo, commit_limit) {
        let commit_hash = oid.to_string();
        for path in list_commit_files(&repo, oid) {
            entries.push(HistoryEntry {
                commit: commit_hash.clone(),
                path,
            });
        }
    }
    entries
}

/// Fetch a historical blob's text content, gated by a size probe so an
/// oversized blob is never fully read. Returns `None` on any failure
/// (missing blob, oversized, undecodable) — silent skip per §4.3/§4.4.
pub fn read_historical_blob(
    repo_path: &Path,
    commit: &str,
    path: &str,
    max_size: u64,
) -> Option<String> {
    let repo = Repository::discover(repo_path).ok()?;
    let oid = git2::Oid::from_str(commit).ok()?;
    let commit_obj = repo.find_commit(oid).ok()?;
    let tree = commit_obj.tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;

    if blob.size() as u64 > max_size {
        return None;
    }
    if blob.content().contains(&0u8) {
        return None;
    }
    Some(String::from_utf8_lossy(blob.content()).to_string())
}

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::history::{read_historical_blob, HistoryEntry};
use crate::rules::Rule;
use crate::{matchers, metadata, Finding, ScanConfig};

fn worker_count(cap: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cap.min(cpus + 4)
}

fn build_pool(num_threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("failed to build scan worker pool")
}

/// One task's worth of work: read a working-tree file, run the content
/// matchers if it is plain text, and run the metadata extractor if its
/// suffix is `meta_ok`. Swallows every I/O failure; a panic anywhere in
/// here is caught by the caller and logged instead of propagated.
fn scan_workdir_file(path: &Path, repo_path: &Path, rules: &[Rule], cfg: &ScanConfig) -> Vec<Finding> {
    let rel = path
        .strip_prefix(repo_path)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let mut findings = Vec::new();

    if !crate::walk::is_meta_ok(path) {
        if let Some(text) = read_text_file(path, cfg.max_file_size) {
            findings.extend(matchers::scan_content(
                &text,
                "workdir",
                &rel,
                cfg.include_patterns,
                cfg.include_entropy,
                cfg.entropy_threshold,
                rules,
            ));
        }
    } else {
        let mut meta_findings = metadata::scan_metadata(path, cfg.max_file_size);
        for f in &mut meta_findings {
            f.path = rel.clone();
        }
        findings.extend(meta_findings);
    }

    findings
}

fn read_text_file(path: &Path, max_size: u64) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    if meta.len() > max_size {
        return None;
    }
    let bytes = std::fs::read(path).ok()?;
    if bytes.contains(&0u8) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).to_string())
}

/// Run the working-tree matchers over every enumerated file with a
/// `min(32, cpus + 4)`-sized bounded pool, one task per file. A panicking
/// task yields no findings and is logged; sibling tasks continue.
pub fn scan_workdir_parallel(
    files: &[PathBuf],
    repo_path: &Path,
    rules: &[Rule],
    cfg: &ScanConfig,
) -> Vec<Finding> {
    let pool = build_pool(worker_count(32));
    pool.install(|| {
        files
            .par_iter()
            .flat_map(|path| {
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    scan_workdir_file(path, repo_path, rules, cfg)
                })) {
                    Ok(findings) => findings,
                    Err(_) => {
                        warn!(path = %path.display(), "panic while scanning working-tree file");
                        Vec::new()
                    }
                }
            })
            .collect()
    })
}

/// Run the content matchers over every `(commit, path)` pair with a
/// `min(16, cpus + 4)`-sized bounded pool, one task per pair. Entries are
/// enumerated eagerly by the caller before this runs (§5).
pub fn scan_history_parallel(
    entries: &[HistoryEntry],
    repo_path: &Path,
    rules: &[Rule],
    cfg: &ScanConfig,
) -> Vec<Finding> {
    let pool = build_pool(worker_count(16));
    pool.install(|| {
        entries
            .par_iter()
            .flat_map(|entry| {
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    scan_history_entry(entry, repo_path, rules, cfg)
                })) {
                    Ok(findings) => findings,
                    Err(_) => {
                        warn!(commit = %entry.commit, path = %entry.path, "panic while scanning historical blob");
                        Vec::new()
                    }
                }
            })
            .collect()
    })
}

fn scan_history_entry(
    entry: &HistoryEntry,
    repo_path: &Path,
    rules: &[Rule],
    cfg: &ScanConfig,
) -> Vec<Finding> {
    let Some(text) = read_historical_blob(repo_path, &entry.commit, &entry.path, cfg.max_file_size)
    else {
        return Vec::new();
    };
    matchers::scan_content(
        &text,
        &entry.commit,
        &entry.path,
        cfg.include_patterns,
        cfg.include_entropy,
        cfg.entropy_threshold,
        rules,
    )
}

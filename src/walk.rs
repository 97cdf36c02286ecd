use std::path::Path;

use walkdir::WalkDir;

/// Directory components that are never descended into.
const SKIP_DIRS: &[&str] = &[".git", "__pycache__", "node_modules", ".venv", "venv"];

/// Suffixes that are never scanned for content.
pub const BINARY_SUFFIXES: &[&str] = &[
    ".pyc", ".so", ".dll", ".exe", ".zip", ".tar", ".gz", ".7z", ".mp3", ".mp4", ".avi", ".mov",
    ".ogg", ".ico", ".woff", ".woff2",
];

/// Suffixes still eligible for metadata extraction even though they would
/// otherwise match `BINARY_SUFFIXES` (none of these actually collide today,
/// but the exemption is set-based per spec so the two lists may grow
/// independently of each other).
pub const META_OK_SUFFIXES: &[&str] = &[
    ".docx", ".xlsx", ".pptx", ".pdf", ".jpg", ".jpeg", ".png",
];

fn has_suffix(path: &Path, suffixes: &[&str]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    suffixes.iter().any(|s| lower.ends_with(s))
}

/// True if this path must never be read as content or metadata: a binary
/// suffix that isn't exempted by `meta_ok`.
pub fn is_binary_skip(path: &Path) -> bool {
    has_suffix(path, BINARY_SUFFIXES) && !has_suffix(path, META_OK_SUFFIXES)
}

/// True if this path is eligible for metadata extraction (office/PDF/image).
pub fn is_meta_ok(path: &Path) -> bool {
    has_suffix(path, META_OK_SUFFIXES)
}

fn is_skipped_dir_component(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| SKIP_DIRS.contains(&name))
        .unwrap_or(false)
}

/// True if any component of `path` is one of the skipped directory names
/// (`.git`, `__pycache__`, `node_modules`, `.venv`, `venv`). Unlike
/// `is_skipped_dir_component`, this works on a logical path string rather
/// than a live `walkdir::DirEntry`, so the history enumerator (which never
/// touches the filesystem directly for path listing) can apply the same
/// skip rule as the working-tree walk.
pub fn has_skipped_dir_component(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|name| SKIP_DIRS.contains(&name))
            .unwrap_or(false)
    })
}

/// Recursively enumerate working-tree files under `root`, skipping
/// `.git`/`__pycache__`/`node_modules`/`.venv`/`venv` subtrees entirely and
/// excluding files whose suffix is binary-only (not `meta_ok`).
pub fn enumerate_workdir_files(root: &Path) -> Vec<std::path::PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir_component(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !is_binary_skip(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn skips_git_and_binary_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("config"), "x").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join("a.js"), "x").unwrap();
        fs::write(dir.path().join("real.txt"), "hello").unwrap();

        let files = enumerate_workdir_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert!(names.contains(&std::path::PathBuf::from("real.txt")));
        assert!(!names.iter().any(|p| p.starts_with(".git")));
        assert!(!names.iter().any(|p| p.starts_with("node_modules")));
    }

    #[test]
    fn binary_suffix_excluded_unless_meta_ok() {
        assert!(is_binary_skip(Path::new("app.exe")));
        assert!(is_binary_skip(Path::new("archive.zip")));
        assert!(!is_binary_skip(Path::new("report.pdf")));
        assert!(is_meta_ok(Path::new("report.pdf")));
        assert!(!is_meta_ok(Path::new("app.exe")));
    }

    #[test]
    fn skipped_dir_component_detected_on_logical_path() {
        assert!(has_skipped_dir_component(Path::new(
            "node_modules/lib/index.js"
        )));
        assert!(has_skipped_dir_component(Path::new(".venv/bin/activate")));
        assert!(has_skipped_dir_component(Path::new("a/.git/config")));
        assert!(!has_skipped_dir_component(Path::new("src/main.rs")));
    }
}

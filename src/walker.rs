//! Lazy, gitignore-aware traversal of the scan root.
//!
//! The walk is single-threaded and finite. A per-path failure becomes a
//! [`WalkEvent::Error`] and the walk continues; only an unreadable root is
//! fatal, and that is checked before the first entry is produced.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::config::{ScanConfig, CONFIG_FILE_NAME};
use crate::error::{CartographError, Result};

/// Directory names that never contain first-party sources.
const IGNORED_SCOPES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    ".cartograph",
    "node_modules",
    "bower_components",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    ".next",
    ".nuxt",
    ".turbo",
    "dist",
    "build",
    "target",
    "coverage",
];

/// Extensions of files that are never source text.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "gz", "tgz", "bz2", "xz",
    "7z", "tar", "jar", "war", "class", "pyc", "pyo", "so", "dylib", "dll", "exe", "o", "a",
    "lib", "bin", "wasm", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "wav", "ogg",
    "mov", "avi", "db", "sqlite", "sqlite3", "lock",
];

/// A file worth handing to an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute (root-joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the root with `/` separators.
    pub relative: String,
    /// Size reported by the directory entry.
    pub size: u64,
}

/// Why a file was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Larger than the configured limit.
    TooLarge,
    /// Binary by extension.
    Binary,
    /// Matched an ignore glob.
    Ignored,
}

/// One step of the walk.
#[derive(Debug)]
pub enum WalkEvent {
    /// A file to extract.
    File(Candidate),
    /// A file deliberately not extracted.
    Skipped {
        /// Relative path.
        relative: String,
        /// Why.
        reason: SkipReason,
    },
    /// A path that could not be read; the walk carries on.
    Error(CartographError),
}

/// Configured traversal of one root.
#[derive(Debug, Clone)]
pub struct FileWalker {
    root: PathBuf,
    globs: GlobSet,
    max_file_size: u64,
    /// Root-relative location of the generation store, when it lies inside the root.
    out_dir: Option<String>,
}

impl FileWalker {
    /// Prepares a walker for `config.root`.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::FatalRoot`] if the root is missing, not a
    /// directory, or unreadable, and [`CartographError::Config`] for an
    /// invalid ignore glob.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        check_root(&config.root)?;
        Ok(Self {
            root: config.root.clone(),
            globs: compile_globset(&config.ignore)?,
            max_file_size: config.max_file_size,
            out_dir: nested_out_dir(&config.root, &config.out_dir),
        })
    }

    /// Root this walker traverses.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a fresh walk from the root. Entries come in file-name order.
    #[must_use]
    pub fn walk(&self) -> Walk {
        let root = self.root.clone();
        let globs = self.globs.clone();
        let out_dir = self.out_dir.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if out_dir.as_deref() == Some(relative_path(entry.path(), &root).as_str()) {
                debug!(path = %entry.path().display(), "skipping generation store");
                return false;
            }
            !is_ignored_scope(entry.path(), &root, &globs)
        });

        Walk {
            inner: builder.build(),
            root: self.root.clone(),
            globs: self.globs.clone(),
            max_file_size: self.max_file_size,
        }
    }
}

/// Iterator over [`WalkEvent`]s. Not restartable; call [`FileWalker::walk`] again.
pub struct Walk {
    inner: ignore::Walk,
    root: PathBuf,
    globs: GlobSet,
    max_file_size: u64,
}

impl Iterator for Walk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = error_path(&err).unwrap_or_else(|| self.root.clone());
                    warn!(path = %path.display(), error = %err, "skipping unreadable path");
                    return Some(WalkEvent::Error(CartographError::io(path, Box::new(err))));
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = relative_path(path, &self.root);
            if relative == CONFIG_FILE_NAME {
                continue;
            }
            if self.globs.is_match(&relative) {
                debug!(path = %relative, "ignored by glob");
                return Some(WalkEvent::Skipped {
                    relative,
                    reason: SkipReason::Ignored,
                });
            }
            if is_binary(path) {
                debug!(path = %relative, "skipping binary file");
                return Some(WalkEvent::Skipped {
                    relative,
                    reason: SkipReason::Binary,
                });
            }

            let size = match entry.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    warn!(path = %relative, error = %err, "cannot stat file");
                    return Some(WalkEvent::Error(CartographError::io(path, Box::new(err))));
                }
            };
            if size > self.max_file_size {
                debug!(path = %relative, size, limit = self.max_file_size, "skipping large file");
                return Some(WalkEvent::Skipped {
                    relative,
                    reason: SkipReason::TooLarge,
                });
            }

            return Some(WalkEvent::File(Candidate {
                path: path.to_path_buf(),
                relative,
                size,
            }));
        }
    }
}

fn check_root(root: &Path) -> Result<()> {
    let fatal = |reason: String| CartographError::FatalRoot {
        path: root.to_path_buf(),
        reason,
    };
    let meta = std::fs::metadata(root).map_err(|e| fatal(e.to_string()))?;
    if !meta.is_dir() {
        return Err(fatal("not a directory".into()));
    }
    std::fs::read_dir(root).map_err(|e| fatal(e.to_string()))?;
    Ok(())
}

/// The store directory relative to the root, or `None` when it lives
/// elsewhere or does not exist yet.
fn nested_out_dir(root: &Path, out_dir: &Path) -> Option<String> {
    let root = root.canonicalize().ok()?;
    let out_dir = out_dir.canonicalize().ok()?;
    let relative = out_dir.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative_path(relative, Path::new("")))
}

fn compile_globset(globs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for g in globs {
        let glob =
            Glob::new(g).map_err(|e| CartographError::Config(format!("invalid glob {g:?}: {e}")))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| CartographError::Config(format!("invalid ignore globs: {e}")))
}

fn is_ignored_scope(path: &Path, root: &Path, globs: &GlobSet) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let is_dir = path.is_dir();
    let scoped = |scope: &&str| scope.eq_ignore_ascii_case(name);
    if is_dir && IGNORED_SCOPES.iter().any(scoped) {
        return true;
    }
    globs.is_match(name) || (is_dir && globs.is_match(relative_path(path, root)))
}

fn is_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|b| b.eq_ignore_ascii_case(ext))
        })
}

fn relative_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

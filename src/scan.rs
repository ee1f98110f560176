//! Scan stage: walk the tree, extract files on a worker pool, fill the store.
//!
//! The walk runs on one thread and spawns one extraction task per candidate
//! into a pool of `config.workers` threads. Workers share nothing but the
//! store and the counters, both behind a mutex.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::context::ServiceContext;
use crate::error::{CartographError, Result};
use crate::extract::{looks_binary, ExtractorRegistry};
use crate::model::{content_id, Component};
use crate::ports::FileSystem;
use crate::store::{MetadataStore, Upsert};
use crate::walker::{Candidate, FileWalker, WalkEvent};

/// A path that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IoFailure {
    /// Path as reported by the walker or filesystem.
    pub path: String,
    /// Underlying error.
    pub message: String,
}

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Files the walker reported (extracted or skipped).
    pub files_visited: usize,
    /// Files handed to an extractor.
    pub files_extracted: usize,
    /// Files skipped for size, ignore globs, or binary content.
    pub files_skipped: usize,
    /// Per-path read failures, sorted by path.
    pub io_errors: Vec<IoFailure>,
    /// Extractions marked incomplete.
    pub incomplete: usize,
    /// Files whose content duplicated an earlier file.
    pub duplicates: usize,
    /// Worker threads used.
    pub workers: usize,
    /// Wall-clock duration of the scan.
    pub elapsed_ms: u64,
}

/// Result of [`scan`].
#[derive(Debug)]
pub struct ScanOutput {
    /// Every component found.
    pub store: MetadataStore,
    /// Counters.
    pub stats: ScanStats,
}

/// Walks `config.root` and extracts every candidate file.
///
/// Per-file failures are recorded in [`ScanStats::io_errors`] and never stop
/// the scan.
///
/// # Errors
///
/// Returns [`CartographError::FatalRoot`] if the root is missing or not a
/// directory, or [`CartographError::Config`] for bad ignore globs or a worker
/// pool that cannot be started.
pub fn scan(ctx: &ServiceContext, config: &ScanConfig) -> Result<ScanOutput> {
    let started = Instant::now();
    let walker = FileWalker::new(config)?;
    let registry = ExtractorRegistry::new(config.capabilities.clone());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("cartograph-extract-{i}"))
        .build()
        .map_err(|e| CartographError::Config(format!("cannot start worker pool: {e}")))?;

    info!(root = %walker.root().display(), workers = config.workers, "scan started");

    let store = Mutex::new(MetadataStore::new());
    let stats = Mutex::new(ScanStats {
        workers: config.workers,
        ..ScanStats::default()
    });
    let fs: &dyn FileSystem = ctx.fs.as_ref();

    pool.scope(|scope| {
        for event in walker.walk() {
            match event {
                WalkEvent::File(candidate) => {
                    lock(&stats).files_visited += 1;
                    let (registry, store, stats) = (&registry, &store, &stats);
                    scope.spawn(move |_| extract_one(fs, registry, candidate, store, stats));
                }
                WalkEvent::Skipped { relative, reason } => {
                    debug!(path = %relative, ?reason, "skipped");
                    let mut stats = lock(&stats);
                    stats.files_visited += 1;
                    stats.files_skipped += 1;
                }
                WalkEvent::Error(err) => {
                    warn!("{err}");
                    lock(&stats).io_errors.push(failure(&err));
                }
            }
        }
    });

    let store = store.into_inner().unwrap_or_else(PoisonError::into_inner);
    let mut stats = stats.into_inner().unwrap_or_else(PoisonError::into_inner);
    stats.io_errors.sort();
    stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        components = store.len(),
        extracted = stats.files_extracted,
        skipped = stats.files_skipped,
        errors = stats.io_errors.len(),
        elapsed_ms = stats.elapsed_ms,
        "scan finished"
    );
    Ok(ScanOutput { store, stats })
}

fn extract_one(
    fs: &dyn FileSystem,
    registry: &ExtractorRegistry,
    candidate: Candidate,
    store: &Mutex<MetadataStore>,
    stats: &Mutex<ScanStats>,
) {
    let bytes = match fs.read_bytes(&candidate.path) {
        Ok(bytes) => bytes,
        Err(source) => {
            let err = CartographError::io(&candidate.path, source);
            warn!("{err}");
            lock(stats).io_errors.push(failure(&err));
            return;
        }
    };
    if looks_binary(&bytes) {
        debug!(path = %candidate.relative, "skipped binary content");
        lock(stats).files_skipped += 1;
        return;
    }

    let extraction = registry.extract(Path::new(&candidate.relative), &bytes);
    let facts = extraction.facts;
    if facts.incomplete {
        let err = CartographError::Extraction {
            path: candidate.path.clone(),
            reason: facts.notes.join("; "),
        };
        debug!("{err}");
    }

    let component = Component {
        id: content_id(&bytes),
        path: candidate.relative,
        aliases: Vec::new(),
        dialect: extraction.dialect,
        language: facts.language,
        size_bytes: bytes.len() as u64,
        modified_at: fs.modified(&candidate.path),
        declared_ports: facts.declared_ports,
        listen_ports: facts.listen_ports,
        imports: facts.imports,
        exports: facts.exports,
        capabilities: facts.capabilities,
        purpose: facts.purpose,
        incomplete: facts.incomplete,
        notes: facts.notes,
    };

    let incomplete = component.incomplete;
    let outcome = lock(store).upsert(component);
    let mut stats = lock(stats);
    stats.files_extracted += 1;
    if incomplete {
        stats.incomplete += 1;
    }
    if outcome == Upsert::Merged {
        stats.duplicates += 1;
    }
}

fn failure(err: &CartographError) -> IoFailure {
    match err {
        CartographError::Io { path, source } => IoFailure {
            path: path.display().to_string(),
            message: source.to_string(),
        },
        other => IoFailure {
            path: String::new(),
            message: other.to_string(),
        },
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

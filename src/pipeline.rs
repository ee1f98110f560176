//! The full batch: scan, infer, synthesize, detect.
//!
//! Only the scan touches the filesystem and runs in parallel. Everything
//! after it is single-threaded over the finished, read-only store.

use tracing::info;

use crate::config::ScanConfig;
use crate::context::ServiceContext;
use crate::detect::{detect, DetectorConfig};
use crate::error::Result;
use crate::generation::Generation;
use crate::infer::infer;
use crate::model::sort_findings;
use crate::scan::scan;
use crate::synth::{cycle_findings, synthesize};

/// Runs every stage over `config.root` and returns the new generation.
///
/// Nothing is persisted; see [`crate::generation::GenerationStore::save`].
///
/// # Errors
///
/// Fails only when the scan itself cannot start (unreadable root, bad
/// configuration). Per-file problems surface as data in the generation.
pub fn run(ctx: &ServiceContext, config: &ScanConfig) -> Result<Generation> {
    let output = scan(ctx, config)?;
    let store = output.store;

    let inference = infer(&store, config.capability_threshold);
    let topology = synthesize(store.iter(), &inference.relationships, &config.routes);

    let mut findings = detect(&store, &inference, &DetectorConfig::from(config));
    findings.extend(cycle_findings(&topology));
    sort_findings(&mut findings);

    let generation = Generation {
        id: ctx.id_gen.generate_id(),
        created_at: ctx.clock.now(),
        root: config.root.display().to_string(),
        stats: output.stats,
        components: store.into_components(),
        relationships: inference.relationships,
        findings,
        topology,
    };
    info!(
        generation = %generation.id,
        components = generation.components.len(),
        relationships = generation.relationships.len(),
        findings = generation.findings.len(),
        services = generation.topology.services.len(),
        valid = generation.topology.valid,
        "pipeline finished"
    );
    Ok(generation)
}

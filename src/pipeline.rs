//! End-to-end export: resolve → unify → harvest → sink.
//!
//! Data only moves forward. A fatal error at any stage ends the run; the
//! non-fatal outcomes (cross-save warning, a character whose history broke
//! off early) are carried in the returned [`ExportOutcome`].

use std::io;

use crate::api::BungieApi;
use crate::config::Config;
use crate::crosssave::{unify, Unification};
use crate::error::HarvestError;
use crate::export::ActivitySink;
use crate::harvest::{discover_characters, harvest_characters, HarvestOptions, HarvestSummary};
use crate::models::PlayerHandle;
use crate::progress::ProgressReporter;
use crate::resolve::resolve;

/// Everything a completed export produced.
#[derive(Debug)]
pub struct ExportOutcome {
    pub unification: Unification,
    pub summary: HarvestSummary,
}

/// Resolve `handle` and apply cross-save.
pub async fn resolve_identity(
    api: &dyn BungieApi,
    handle: &PlayerHandle,
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<Unification, HarvestError> {
    let identity = resolve(api, handle, &config.harvest.platforms, progress).await?;
    Ok(unify(api, identity, progress).await)
}

/// Run the whole pipeline for `handle`.
///
/// `open_sink` is called only once the account is known to have
/// characters, so a failed lookup leaves no output behind. The sink is
/// finished exactly once after the last character, including when no
/// activities were found.
pub async fn run_export<S, F>(
    api: &dyn BungieApi,
    handle: &PlayerHandle,
    config: &Config,
    open_sink: F,
    progress: &dyn ProgressReporter,
) -> Result<ExportOutcome, HarvestError>
where
    S: ActivitySink,
    F: FnOnce() -> io::Result<S>,
{
    let unification = resolve_identity(api, handle, config, progress).await?;
    let identity = &unification.identity;

    let characters = discover_characters(api, identity).await?;

    let mut sink = open_sink()?;
    let options = HarvestOptions::from_config(config);
    let summary = harvest_characters(api, identity, characters, &options, &mut sink, progress).await?;
    sink.finish()?;

    Ok(ExportOutcome {
        unification,
        summary,
    })
}

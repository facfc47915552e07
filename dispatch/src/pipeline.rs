use crate::{
    catalog::{require_non_empty, ArchiveQuery, EmptyCatalogError, QueryError},
    config::{ConfigErrors, DispatchConfig},
    emitter::{DirectiveSink, DispatchEmitter, EmitError, NodeDirective},
    partition::{NodePartitioner, PartitionError},
    resources::{ResourceBoundsError, ResourceRequestBuilder},
};
use chrono::NaiveDate;
use std::{fs, io, path::PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    EmptyCatalog(#[from] EmptyCatalogError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    ResourceBounds(#[from] ResourceBoundsError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("Output directory {path:?} could not be created: {source}")]
    OutputDirectory { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// accessions were balanced over several nodes
    Balanced { directives: Vec<NodeDirective> },
    /// too few accessions, a single list was written for a local run
    SingleNode { list: PathBuf, accessions: usize },
}

/// Scheduler runs collect results in a fresh directory, an existing one is an error
fn prepare_output(config: &DispatchConfig) -> Result<(), PipelineError> {
    if config.process_configs.on_chtc {
        info!("Configuring run for the HTCondor workload manager");

        let path = &config.directory.output_results;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::OutputDirectory {
                path: path.clone(),
                source,
            })?;
        }
        fs::create_dir(path).map_err(|source| PipelineError::OutputDirectory {
            path: path.clone(),
            source,
        })?;
    } else {
        warn!("Configuring local, non-HTCondor run. Proceed with caution");
    }

    Ok(())
}

/// Validate the config, then query, partition and emit a dispatch
#[instrument(skip_all, level = "info")]
pub fn run(
    config: &DispatchConfig,
    today: NaiveDate,
    query: &dyn ArchiveQuery,
    sink: &mut dyn DirectiveSink,
) -> Result<RunOutcome, PipelineError> {
    if config.preflight_checks(today) {
        return Err(ConfigErrors::PreflightFailed.into());
    }

    prepare_output(config)?;

    let params = config.query_params(today);
    info!(
        window = %params.publication_window(),
        term = %params.search_term(),
        "Querying archive"
    );

    let catalog = require_non_empty(query.query(&params)?, &params)?;
    info!(
        accessions = catalog.len(),
        raw_bytes = catalog.total_raw_size(),
        "Catalog materialized"
    );

    let global = config.global();
    let emitter = DispatchEmitter::from_config(&config.files);

    match NodePartitioner::new(global).partition(catalog.estimate()) {
        Ok(plan) => {
            let requests = ResourceRequestBuilder::new(global).build(&plan.partitions)?;
            let directives = emitter.emit(&plan, &requests, sink)?;

            Ok(RunOutcome::Balanced { directives })
        }
        Err(PartitionError::InsufficientWorkload { count, minimum }) => {
            warn!("Only {count} accessions, balancing needs {minimum}. Falling back to a single node");

            let list = emitter.emit_single_node(&catalog, &params)?;

            Ok(RunOutcome::SingleNode {
                list,
                accessions: count,
            })
        }
        Err(error) => Err(error.into()),
    }
}

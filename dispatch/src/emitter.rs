pub mod sink;


use crate::{
    catalog::{AccessionCatalog, QueryParams},
    config::FilesConfig,
    partition::{NodeId, Partition, PartitionPlan},
    resources::NodeRequest,
};
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use sink::{DirectiveSink, LogSink, ManifestSink, Sinks};

/// file name prefix for per-node accession lists, the node index is appended
pub static LIST_FILE_PREFIX: Lazy<OsString> = Lazy::new(|| {
    let mut string = OsString::new();
    string.push("SRA_set_");
    string
});

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to write {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to serialize submit manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),
    #[error("{partitions} partitions but {requests} resource requests")]
    Misaligned { partitions: usize, requests: usize },
}

impl EmitError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Everything the scheduler needs to launch one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDirective {
    pub node: NodeId,
    pub cpu_request: u32,
    pub disk_request_bytes: u64,
    pub disk_request_gb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<u32>,
    pub accessions: usize,
    pub accession_list: PathBuf,
}

/// Writes accession lists and hands resource directives to a sink
#[derive(Debug, Clone)]
pub struct DispatchEmitter {
    list_folder: PathBuf,
    queue_file: PathBuf,
}

impl DispatchEmitter {
    pub fn new(list_folder: impl Into<PathBuf>, queue_file: impl Into<PathBuf>) -> Self {
        Self {
            list_folder: list_folder.into(),
            queue_file: queue_file.into(),
        }
    }

    pub fn from_config(files: &FilesConfig) -> Self {
        Self::new(&files.sra_list_folder, &files.sra_query_file)
    }

    pub fn list_path(&self, node: NodeId) -> PathBuf {
        let mut file_name = LIST_FILE_PREFIX.clone();
        file_name.push(node.0.to_string());

        self.list_folder.join(file_name)
    }

    /// Remove lists and the queue of a previous dispatch, then recreate the list folder
    pub fn prepare(&self) -> Result<(), EmitError> {
        if self.list_folder.exists() {
            warn!(path = ?self.list_folder, "Removing accession lists of a previous dispatch");
            fs::remove_dir_all(&self.list_folder).map_err(EmitError::io(&self.list_folder))?;
        }

        if self.queue_file.exists() {
            debug!(path = ?self.queue_file, "Removing stale queue file");
            fs::remove_file(&self.queue_file).map_err(EmitError::io(&self.queue_file))?;
        }

        fs::create_dir_all(&self.list_folder).map_err(EmitError::io(&self.list_folder))
    }

    /// Write one list per node and the queue, then submit the directives
    pub fn emit(
        &self,
        plan: &PartitionPlan,
        requests: &[NodeRequest],
        sink: &mut dyn DirectiveSink,
    ) -> Result<Vec<NodeDirective>, EmitError> {
        if plan.partitions.len() != requests.len() {
            return Err(EmitError::Misaligned {
                partitions: plan.partitions.len(),
                requests: requests.len(),
            });
        }

        self.prepare()?;

        let mut directives = Vec::with_capacity(requests.len());
        for (partition, request) in plan.partitions.iter().zip(requests.iter()) {
            if partition.node != request.node {
                return Err(EmitError::Misaligned {
                    partitions: plan.partitions.len(),
                    requests: requests.len(),
                });
            }

            let accession_list = self.write_list(partition)?;

            directives.push(NodeDirective {
                node: partition.node,
                cpu_request: request.cpu_request,
                disk_request_bytes: request.disk_request_bytes,
                disk_request_gb: request.disk_request_gb(),
                memory_request: request.memory_request,
                accessions: partition.len(),
                accession_list,
            });
        }

        self.write_queue(&directives)?;
        sink.submit(&directives)?;

        info!(
            nodes = directives.len(),
            queue = ?self.queue_file,
            "Dispatch written"
        );

        Ok(directives)
    }

    /// Single list with every accession, for runs too small to balance
    pub fn emit_single_node(
        &self,
        catalog: &AccessionCatalog,
        params: &QueryParams,
    ) -> Result<PathBuf, EmitError> {
        // drop lists and the queue of an earlier dispatch
        self.prepare()?;

        let path = self.list_folder.join(params.window_label());
        write_lines(&path, catalog.accession_ids())?;

        warn!(
            path = ?path,
            accessions = catalog.len(),
            "Too few accessions to balance, wrote a single list for a local run instead"
        );

        Ok(path)
    }

    fn write_list(&self, partition: &Partition) -> Result<PathBuf, EmitError> {
        let path = self.list_path(partition.node);
        write_lines(&path, partition.accession_ids())?;

        debug!(node = partition.node.0, path = ?path, accessions = partition.len(), "Wrote accession list");

        Ok(path)
    }

    fn write_queue(&self, directives: &[NodeDirective]) -> Result<(), EmitError> {
        if let Some(parent) = self
            .queue_file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(EmitError::io(parent))?;
        }

        let lists = directives
            .iter()
            .map(|directive| directive.accession_list.to_string_lossy().into_owned())
            .collect_vec();

        write_lines(&self.queue_file, lists.iter().map(String::as_str))
    }
}

/// newline delimited, with a trailing newline
fn write_lines<'a, I>(path: &Path, lines: I) -> Result<(), EmitError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut content = lines.into_iter().join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    fs::File::create(path)
        .and_then(|mut file| file.write_all(content.as_bytes()))
        .map_err(EmitError::io(path))
}

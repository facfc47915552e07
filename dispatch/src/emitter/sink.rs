use super::{EmitError, NodeDirective};
use crate::config::DispatchConfig;
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// Receiver of the per-node resource directives, e.g. a submit-file writer
pub trait DirectiveSink {
    fn submit(&mut self, directives: &[NodeDirective]) -> Result<(), EmitError>;
}

#[derive(Debug, Serialize)]
struct SubmitManifest<'a> {
    queue_file: &'a PathBuf,
    nodes: &'a [NodeDirective],
}

/// Scheduler mode: all directives go into one YAML manifest for the submit-file writer
#[derive(Debug, Clone)]
pub struct ManifestSink {
    path: PathBuf,
    queue_file: PathBuf,
}

impl ManifestSink {
    pub fn new(path: impl Into<PathBuf>, queue_file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue_file: queue_file.into(),
        }
    }
}

impl DirectiveSink for ManifestSink {
    fn submit(&mut self, directives: &[NodeDirective]) -> Result<(), EmitError> {
        let manifest = serde_yaml::to_string(&SubmitManifest {
            queue_file: &self.queue_file,
            nodes: directives,
        })?;

        fs::write(&self.path, manifest).map_err(EmitError::io(&self.path))?;
        info!(path = ?self.path, nodes = directives.len(), "Submit manifest written");

        Ok(())
    }
}

/// Local mode: nothing is handed to a scheduler, directives are only logged
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl DirectiveSink for LogSink {
    fn submit(&mut self, directives: &[NodeDirective]) -> Result<(), EmitError> {
        for directive in directives {
            info!(
                node = directive.node.0,
                cpus = directive.cpu_request,
                disk_gb = directive.disk_request_gb,
                accessions = directive.accessions,
                list = ?directive.accession_list,
                "Node directive"
            );
        }

        Ok(())
    }
}

/// All sink variants, selected from `process_configs.on_chtc`
#[derive(Debug, Clone)]
pub enum Sinks {
    Manifest(ManifestSink),
    Log(LogSink),
}

impl Sinks {
    pub fn load(config: &DispatchConfig) -> Self {
        if config.process_configs.on_chtc {
            Self::Manifest(ManifestSink::new(
                &config.files.submit_manifest,
                &config.files.sra_query_file,
            ))
        } else {
            Self::Log(LogSink)
        }
    }
}

impl DirectiveSink for Sinks {
    fn submit(&mut self, directives: &[NodeDirective]) -> Result<(), EmitError> {
        match self {
            Self::Manifest(sink) => sink.submit(directives),
            Self::Log(sink) => sink.submit(directives),
        }
    }
}

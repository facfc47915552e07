//! Partition archive accessions across compute nodes for unattended
//! download-and-process batch jobs.
//!
//! The flow is query -> estimate -> partition -> resource requests -> emit,
//! see [`pipeline::run`].

pub mod catalog;
pub mod config;
pub mod emitter;
pub mod estimator;
pub mod partition;
pub mod pipeline;
pub mod resources;
pub mod size;

//! Skyhook: remote offload for vector index builds.

pub mod config;
pub mod error;
pub mod local;
pub mod metrics;
pub mod remote;
pub mod repository;
pub mod settings;
pub mod storage;
pub mod types;

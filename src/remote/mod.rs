//! Offloading index builds to a remote builder through object storage.

pub mod blob;
pub mod client;
pub mod path;
pub mod policy;
pub mod request;
pub mod strategy;

pub use client::{HttpRemoteBuilder, RemoteBuildResult, RemoteBuilder, UnconfiguredRemoteBuilder};
pub use path::{build_storage_location, new_build_token, StorageLocation};
pub use policy::should_build_remotely;
pub use request::{compose_request, RemoteBuildRequest};
pub use strategy::{BuildOutcome, RemoteFailure, RemoteIndexBuildStrategy, Stage};

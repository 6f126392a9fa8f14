//! Core building blocks for the scorecard publication service: environment
//! configuration, object-path hygiene, the blob-store facade, the
//! source-host client with commit-membership checks, and the workflow
//! policy engine.

pub mod config;
pub mod forge;
pub mod paths;
pub mod store;
pub mod workflow;

pub use config::ServerConfig;
pub use forge::membership::{CommitCoord, CommitMembershipVerifier};
pub use store::{BlobStore, StoreError, StoreRegistry};

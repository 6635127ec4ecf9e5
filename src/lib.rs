//! lxcfs initializer - injects lxcfs `/proc` mounts into new Deployments
//!
//! The controller watches Deployments that still carry pending initializers. When its own
//! name is at the head of the queue it removes itself from the queue and, if the workload
//! opted in through an annotation, appends host-path mounts for the lxcfs-virtualized
//! `/proc` files to every container so tools inside the container see the container's own
//! CPU and memory limits.
//!
//! # Modules
//!
//! - [`workload`] - Deployment model including `metadata.initializers`
//! - [`policy`] - The fixed mount/volume table
//! - [`config`] - Immutable controller configuration
//! - [`initializer`] - Gate check, annotation decision, mutation, patch synthesis
//! - [`controller`] - Event source, resource store, failure policies and the event loop
//! - [`events`] - Kubernetes Event publishing
//! - [`retry`] - Exponential backoff used by the retry failure policy
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod initializer;
pub mod policy;
pub mod retry;
pub mod telemetry;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default initializer name this controller answers to
pub const DEFAULT_INITIALIZER_NAME: &str = "lxcfs.initializer.kubernetes.io";

/// Default annotation that opts a Deployment into lxcfs injection
pub const DEFAULT_ANNOTATION: &str = "initializer.kubernetes.io/lxcfs";

/// Component name used when reporting Kubernetes Events
pub const CONTROLLER_NAME: &str = "lxcfs-initializer";

//! Immutable initializer configuration
//!
//! Built once at startup from the command line and shared by reference with every call
//! into the initialization pipeline.

use crate::policy::MutationPolicy;
use crate::{Error, Result, DEFAULT_ANNOTATION, DEFAULT_INITIALIZER_NAME};

/// Settings that drive the gate, annotation and mutation decisions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializerConfig {
    /// Gate name this controller owns in `metadata.initializers.pending`
    pub initializer_name: String,
    /// Annotation that opts a workload into mutation
    pub annotation_key: String,
    /// When false every owned workload is mutated regardless of annotations
    pub require_annotation: bool,
    /// Mounts and volumes injected into opted-in workloads
    pub policy: MutationPolicy,
}

impl Default for InitializerConfig {
    fn default() -> Self {
        Self {
            initializer_name: DEFAULT_INITIALIZER_NAME.to_string(),
            annotation_key: DEFAULT_ANNOTATION.to_string(),
            require_annotation: true,
            policy: MutationPolicy::lxcfs(),
        }
    }
}

impl InitializerConfig {
    /// Create a config, rejecting empty identifiers
    pub fn new(
        initializer_name: impl Into<String>,
        annotation_key: impl Into<String>,
        require_annotation: bool,
        policy: MutationPolicy,
    ) -> Result<Self> {
        let initializer_name = initializer_name.into();
        let annotation_key = annotation_key.into();

        if initializer_name.trim().is_empty() {
            return Err(Error::config("initializer name must not be empty"));
        }
        if require_annotation && annotation_key.trim().is_empty() {
            return Err(Error::config(
                "annotation key must not be empty when an annotation is required",
            ));
        }

        Ok(Self {
            initializer_name,
            annotation_key,
            require_annotation,
            policy,
        })
    }
}

//! Controller-specific error types.
//!
//! This module defines error types specific to the SR-IOV agent controller
//! that are not covered by upstream library errors.

use crate::fingerprint::FingerprintError;
use crate::store::StoreError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the SR-IOV agent controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error outside the object store (client setup)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Object store read or write failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Fingerprint could not be computed
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// A resource the pass depends on does not exist
    #[error("{kind} {key} not found")]
    MissingDependency {
        /// Kind of the missing object
        kind: &'static str,
        /// namespace/name of the missing object
        key: String,
    },

    /// Resource has no uid, so owned objects cannot reference it
    #[error("NeutronSriovAgent {0} has no uid, cannot set owner reference")]
    MissingOwnerIdentity(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

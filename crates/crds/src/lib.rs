//! Neutron SR-IOV Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the SR-IOV agent controller.

pub mod neutron_sriov_agent;

pub use neutron_sriov_agent::*;

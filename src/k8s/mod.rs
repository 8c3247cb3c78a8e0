//! Kubernetes object model
//!
//! Thin layer over `k8s-openapi` types:
//! - Workload: the Deployment/StatefulSet/DaemonSet being decorated
//! - AuxiliaryObject: free-standing objects emitted next to it
//! - Quantity, name and label helpers shared by the trait processors

pub mod labels;
pub mod names;
pub mod objects;
pub mod quantity;
pub mod workload;

pub use objects::{AuxiliaryObject, ObjectKey};
pub use quantity::parse_quantity;
pub use workload::Workload;

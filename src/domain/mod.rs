//! Domain model
//!
//! Components and the typed trait schema they carry.

pub mod component;
pub mod traits;

pub use component::Component;
pub use traits::*;

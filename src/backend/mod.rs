//! Backend abstraction layer
//!
//! Provides the traits and descriptor types the cloud passes record against, and the
//! wgpu implementation used on native and web.

pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use traits::*;
pub use types::*;

//! Access policy synthesis.
//!
//! [`PolicyBuilder`] maps a [`crate::principal::Principal`] to the fixed set of
//! allow statements for connect, subscribe, receive and publish. Resource ARNs
//! are rendered from typed [`ResourcePattern`]s.

pub mod builder;
pub mod resource;

pub use builder::{Action, PolicyBuilder, ResourceScope, ScopeStatement};
pub use resource::{ArnContext, ResourceKind, ResourcePattern};

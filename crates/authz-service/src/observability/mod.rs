//! Observability for the authorizer.
//!
//! Provides metrics definitions and the recorder setup used by the binary.

pub mod metrics;

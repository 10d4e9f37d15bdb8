//! Request functions: one function per platform operation.
//!
//! Every function takes a `&PlatformClient` and returns a `Result<T, ClientError>`.
//! No workflow logic: pure request/response mapping.

pub mod datasets;
pub mod experiments;
pub mod prompts;
pub mod scores;

/// Database entity definitions shared across backends.
pub mod models;
/// Quiz repository trait and its backends.
pub mod quiz_store;
/// Backend-agnostic storage error types.
pub mod storage;

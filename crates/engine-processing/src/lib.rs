pub mod consumer;
pub mod error;
pub mod executor;
pub mod partition;
pub mod producer;
pub mod retry;
pub mod source;
pub mod transform;

pub mod error;
pub mod metrics;
pub mod observer;
pub mod retry;
pub mod sink;

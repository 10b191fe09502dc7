pub mod execution;
pub mod partition;
pub mod records;

pub mod chunk;
pub mod processed;
pub mod record;

pub mod chunk;
pub mod state;

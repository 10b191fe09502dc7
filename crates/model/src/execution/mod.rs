pub mod params;
pub mod result;
pub mod status;

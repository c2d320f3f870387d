pub mod params;
pub mod tool;

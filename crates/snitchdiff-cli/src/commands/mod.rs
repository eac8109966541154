pub mod detail;
pub mod fixture;
pub mod render;

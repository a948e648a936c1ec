pub mod document;
pub mod features;
pub mod geometry;
pub mod infill;
pub mod kernel;
pub mod topo;
pub mod units;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

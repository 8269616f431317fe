pub mod config;
pub mod coordinate;
pub mod floats;

pub use config::CatalogConfig;
pub use coordinate::Coordinate;

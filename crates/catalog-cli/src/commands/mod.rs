pub mod apply;
pub mod query;
pub mod snapshot;

pub mod registry;
pub mod sources;

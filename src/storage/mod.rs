pub mod gateway;
pub mod schema;
pub mod diagnostic_probe;

pub use gateway::StorageGateway;

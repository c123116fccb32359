pub mod cached_client;
pub mod client;
pub mod endpoint;
pub mod fixture;
pub mod transport;
pub mod types;

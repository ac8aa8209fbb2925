pub mod api;
pub mod fingerprint;
pub mod gateway;
pub mod types;

pub use api::CatalogApi;
pub use fingerprint::FingerprintResolver;
pub use gateway::GatewayClient;

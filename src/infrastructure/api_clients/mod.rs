//! HTTP clients for external aggregator APIs

pub mod jupiter_client;

pub use jupiter_client::JupiterApiClient;

//! Infrastructure layer - adapters for the aggregator API and the Solana RPC node

pub mod api_clients;
pub mod blockchain;

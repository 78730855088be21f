//! Solana chain access and local signing

pub mod keypair_signer;
pub mod rpc_client;

pub use keypair_signer::KeypairSigner;
pub use rpc_client::SolanaRpcClient;

pub mod rpc;
pub mod wallet;

pub use rpc::SolanaClient;
pub use wallet::{load_wallets, parse_private_key_list, WalletError, WalletManager};

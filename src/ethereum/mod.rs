//! Ethereum interaction module.
//!
//! Contains the Ethereum client, wallet providers, and contract bindings.

pub mod client;
pub mod constants;
pub mod contracts;
pub mod wallet;

pub use client::EthereumClient;
pub use wallet::{
    ConfiguredWalletSource, LocalKeyWallet, NodeWallet, Signer, WalletProvider, WalletSource,
};

//! # VoucherChain Client
//!
//! Everything between a user and the `voucher_ledger` contract:
//!
//! - [`VoucherClient`]: typed, blocking access to a [`Ledger`] backend with
//!   every rejection mapped onto a [`VoucherChainError`] category.
//! - [`VoucherCode`]: code validation, hashing and generation. Plaintext
//!   codes never reach the ledger.
//! - [`EmbeddedWallet`]: email one-time-code and external-address sessions.
//! - [`RedeemFlow`] / [`MintFlow`]: the Redeem page and Agent Dashboard as
//!   UI-independent state machines.
//!
//! ## Backends
//!
//! [`RpcLedger`] talks to a deployed contract through a Soroban RPC server;
//! the HTTP carrier plugs in as an [`RpcTransport`]. `SorobanLedger` runs the
//! real contract in an in-process Soroban host and is built with the
//! `testutils` feature. [`InMemoryLedger`] replicates it in plain Rust.

pub mod amount;
pub mod client;
pub mod code;
pub mod config;
pub mod error;
pub mod flows;
pub mod ledger;
pub mod types;
pub mod wallet;

pub use amount::{format_amount, parse_amount};
pub use client::VoucherClient;
pub use code::{generate_voucher_code, hash_code, VoucherCode, DEFAULT_MIN_CODE_LENGTH};
pub use config::{ClientConfig, ConfigError, TokenEntry};
pub use error::{AuthError, ClientError, InputError, VoucherChainError};
pub use flows::{MintFlow, MintOutcome, MintRequest, RedeemFlow, RedeemState, ValidatedMint};
pub use ledger::{
    InMemoryLedger, Keyring, Ledger, LedgerFailure, LedgerResult, RpcLedger, RpcOptions,
    RpcTransport,
};
#[cfg(any(test, feature = "testutils"))]
pub use ledger::SorobanLedger;
pub use types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    Operation, Receipt, TokenStats, VoucherRecord, VoucherStatus,
};
pub use wallet::{AuthMethod, EmbeddedWallet, WalletProvider};

#[cfg(test)]
mod harness;


#[cfg(test)]
mod error_test;

#[cfg(test)]
mod flows_test;

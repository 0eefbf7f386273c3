//! # Ledger seam
//!
//! The client treats the voucher ledger as a black box behind [`Ledger`].
//! Two backends exist:
//!
//! | Backend            | Executes                                                 |
//! |--------------------|----------------------------------------------------------|
//! | [`RpcLedger`]      | A deployed `voucher_ledger` contract, over Soroban RPC   |
//! | `SorobanLedger`    | The real contract inside an in-process Soroban host      |
//! | [`InMemoryLedger`] | A pure-Rust replica of the same state machine            |
//!
//! `SorobanLedger` needs the `testutils` feature.
//!
//! Every write is blocking: it returns only after the call settled, together
//! with the events the ledger emitted. Failures carry the ledger's own reason
//! string; mapping it to a category is the client's job.

mod memory;
mod rpc;
pub(crate) mod scval;
#[cfg(any(test, feature = "testutils"))]
mod soroban;

pub use memory::InMemoryLedger;
pub use rpc::{Keyring, RpcLedger, RpcOptions, RpcTransport};
#[cfg(any(test, feature = "testutils"))]
pub use soroban::SorobanLedger;

use thiserror::Error;

use crate::types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    TokenStats, VoucherRecord,
};

/// Why a ledger call did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerFailure {
    /// The ledger evaluated the call and rejected it.
    #[error("reverted: {0}")]
    Reverted(String),
    /// The call could not be delivered, or its outcome could not be read.
    #[error("transport: {0}")]
    Transport(String),
    /// An address argument is not an account or contract strkey. Nothing
    /// was sent.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
}

pub type LedgerResult<T> = Result<T, LedgerFailure>;

/// Topics of the ledger's administrative events.
pub(crate) const ADMIN_TOPICS: [&str; 11] = [
    "tok_add", "tok_rm", "fees", "agent", "agent_st", "settled", "minter", "treasury", "paused",
    "unpaused", "owner",
];

/// Fail with [`LedgerFailure::InvalidAddress`] on the first malformed address.
pub(crate) fn require_valid(accounts: &[&Account]) -> LedgerResult<()> {
    match accounts.iter().find(|account| !account.is_valid()) {
        Some(account) => Err(LedgerFailure::InvalidAddress(account.to_string())),
        None => Ok(()),
    }
}

pub trait Ledger {
    /// Current ledger time, in seconds.
    fn now(&self) -> u64;

    /// Address of the ledger contract; this is the spender minters approve.
    fn ledger_address(&self) -> Account;

    /// Provision a fresh account on the ledger.
    fn create_account(&mut self) -> Account;

    // ── Voucher and stats reads ─────────────────────────────

    fn voucher_status(&self, code: &[u8]) -> LedgerResult<VoucherRecord>;
    fn agent_stats(&self, agent: &Account) -> LedgerResult<AgentStats>;
    fn contract_stats(&self) -> LedgerResult<ContractStats>;
    fn config(&self) -> LedgerResult<ConfigSnapshot>;
    fn is_token_supported(&self, token: &Account) -> LedgerResult<bool>;
    fn is_authorized_minter(&self, address: &Account) -> LedgerResult<bool>;
    fn contract_token_balance(&self, token: &Account) -> LedgerResult<i128>;
    fn agent_token_balance(&self, agent: &Account, token: &Account) -> LedgerResult<i128>;
    fn token_stats(&self, token: &Account) -> LedgerResult<TokenStats>;

    // ── Token reads and writes ──────────────────────────────

    fn token_balance(&self, token: &Account, holder: &Account) -> LedgerResult<i128>;
    fn allowance(&self, token: &Account, owner: &Account, spender: &Account) -> LedgerResult<i128>;
    fn approve(
        &mut self,
        owner: &Account,
        token: &Account,
        spender: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>>;
    fn transfer(
        &mut self,
        from: &Account,
        token: &Account,
        to: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>>;

    // ── Voucher lifecycle ───────────────────────────────────

    fn mint_voucher(
        &mut self,
        minter: &Account,
        voucher_hash: &[u8; 32],
        token: &Account,
        token_value: i128,
        expiry_days: u32,
    ) -> LedgerResult<Vec<LedgerEvent>>;

    /// All-or-nothing; returns the number of vouchers minted.
    fn mint_voucher_batch(
        &mut self,
        minter: &Account,
        batch: &MintBatch,
    ) -> LedgerResult<(u32, Vec<LedgerEvent>)>;

    fn redeem_voucher(
        &mut self,
        code: &[u8],
        recipient: &Account,
    ) -> LedgerResult<Vec<LedgerEvent>>;

    fn reclaim_expired_voucher(
        &mut self,
        caller: &Account,
        code: &[u8],
    ) -> LedgerResult<Vec<LedgerEvent>>;

    // ── Administration ──────────────────────────────────────

    fn administer(
        &mut self,
        owner: &Account,
        action: &AdminAction,
    ) -> LedgerResult<Vec<LedgerEvent>>;
}

//! # Types
//!
//! Shared data structures used across all modules of the voucher ledger.
//!
//! ## Voucher lifecycle
//!
//! A voucher is keyed by the SHA-256 digest of its secret code. The plaintext
//! code is never stored; redemption re-hashes the presented code and looks the
//! record up by digest.
//!
//! ```text
//! NonExistent ──mint──► Active ──redeem (not expired)──► Redeemed
//!                          └────reclaim (expired, issuer)──►┘
//! ```
//!
//! `Redeemed` is terminal. Records are never deleted so that a spent code
//! stays distinguishable from one that was never minted.

use soroban_sdk::{contracttype, Address, BytesN, Vec};

/// On-ledger voucher record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Voucher {
    /// SHA-256 of the UTF-8 voucher code.
    pub voucher_hash: BytesN<32>,
    /// Whitelisted token the voucher is denominated in.
    pub token: Address,
    /// Amount held by the ledger for this voucher.
    pub token_value: i128,
    /// Agent that minted the voucher; the only address allowed to reclaim it.
    pub issuer: Address,
    /// Ledger timestamp after which holders can no longer redeem.
    /// Zero means the voucher never expires.
    pub expiry_timestamp: u64,
    /// Set once, by either a redemption or a reclaim.
    pub is_redeemed: bool,
    /// Ledger timestamp at mint time.
    pub created_at: u64,
}

impl Voucher {
    /// `true` once `now` is strictly past a non-zero expiry.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiry_timestamp != 0 && now > self.expiry_timestamp
    }
}

/// Result of `get_voucher_status`, looked up by plaintext code.
///
/// For an unknown code `exists` is `false`, the address fields are `None`
/// and the numeric fields are zero.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoucherStatus {
    pub exists: bool,
    pub is_redeemed: bool,
    pub token: Option<Address>,
    pub token_value: i128,
    pub issuer: Option<Address>,
    pub expiry_timestamp: u64,
}

/// A registered minting agent.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Agent {
    pub is_active: bool,
    /// Commission in basis points.
    pub commission_rate: u32,
    /// Number of vouchers minted.
    pub total_minted: u64,
    /// Cumulative value minted, summed across tokens.
    pub total_value: i128,
    /// Timestamp of the last recorded settlement; zero if never settled.
    pub last_settlement: u64,
}

/// Process-wide configuration, returned in one read so callers get a
/// consistent snapshot.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedgerConfig {
    pub owner: Address,
    /// Receives every minting and redemption fee.
    pub treasury: Address,
    pub minting_fee_rate: u32,
    pub redemption_fee_rate: u32,
    /// Expiry suggested to clients that do not pick one.
    pub default_expiry_days: u32,
    pub paused: bool,
}

/// Contract-wide counters.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    pub total_minted: u64,
    pub total_redeemed: u64,
    pub total_reclaimed: u64,
}

/// Public view returned by `get_contract_stats`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractStats {
    pub total_minted: u64,
    pub total_redeemed: u64,
    pub total_reclaimed: u64,
    pub minting_fee_rate: u32,
    pub redemption_fee_rate: u32,
}

/// Per-token activity.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TokenStats {
    pub vouchers_minted: u64,
    pub vouchers_redeemed: u64,
    /// Gross value of redeemed vouchers, fees included.
    pub value_redeemed: i128,
}

/// Argument of `mint_voucher_batch`: four parallel arrays, one entry per
/// voucher. All lengths must match.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoucherBatch {
    pub voucher_hashes: Vec<BytesN<32>>,
    pub tokens: Vec<Address>,
    pub token_values: Vec<i128>,
    pub expiry_days: Vec<u32>,
}

impl VoucherBatch {
    /// Common length of the four arrays, or `None` if they disagree.
    pub fn uniform_len(&self) -> Option<u32> {
        let len = self.voucher_hashes.len();
        if self.tokens.len() == len
            && self.token_values.len() == len
            && self.expiry_days.len() == len
        {
            Some(len)
        } else {
            None
        }
    }
}

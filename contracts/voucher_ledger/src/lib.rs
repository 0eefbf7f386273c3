//! # VoucherChain Ledger Contract
//!
//! Authoritative store for cash-to-crypto vouchers. An agent takes cash,
//! mints a voucher backed by whitelisted tokens, and hands the secret code to
//! the customer; whoever presents the code can redeem it once.
//!
//! | Phase        | Entry Point(s)                                            |
//! |--------------|-----------------------------------------------------------|
//! | Bootstrap    | [`VoucherLedger::init`]                                   |
//! | Admin        | Token whitelist, fees, treasury, agents, minters, ownership, pause |
//! | Minting      | [`VoucherLedger::mint_voucher`], `mint_voucher_batch`     |
//! | Redemption   | [`VoucherLedger::redeem_voucher`]                         |
//! | Reclaim      | [`VoucherLedger::reclaim_expired_voucher`]                |
//! | Queries      | `get_voucher_status`, `get_voucher`, stats, config, balances |
//!
//! ## Architecture
//!
//! Authorization is delegated to [`access`], storage to [`storage`] and fee
//! arithmetic to [`fees`]. Every failed check panics with an [`Error`],
//! which reverts the whole invocation; that is what makes batch minting
//! all-or-nothing.
//!
//! ## Token flow
//!
//! Minting pulls `value + fee` from the minter through the token allowance
//! granted to this contract, keeps `value`, and forwards `fee` to the
//! treasury. Redemption pays `value - fee` to the recipient and `fee` to the
//! treasury. Reclaim returns the full `value` to the issuer.

#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, panic_with_error, token, Address, Bytes, BytesN, Env,
};

pub mod access;
pub mod events;
pub mod fees;
mod storage;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod fuzz_test;
#[cfg(test)]
mod test_events;

pub use types::{
    Agent, ContractStats, Counters, LedgerConfig, TokenStats, Voucher, VoucherBatch, VoucherStatus,
};

/// Seconds per expiry day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Longest expiry an agent may choose.
pub const MAX_EXPIRY_DAYS: u32 = 365;

/// Most vouchers accepted by one `mint_voucher_batch` call.
pub const MAX_BATCH_SIZE: u32 = 50;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    VoucherNotFound = 1,
    VoucherAlreadyRedeemed = 2,
    VoucherExpired = 3,
    VoucherNotExpired = 4,
    TokenNotSupported = 5,
    UnauthorizedMinter = 6,
    InsufficientBalance = 7,
    InvalidFee = 8,
    InvalidExpiry = 9,
    DuplicateVoucherCode = 10,
    AgentNotActive = 11,
    InvalidBatchSize = 12,
    TokenTransferFailed = 13,
    InvalidAmount = 14,
    NotOwner = 15,
    AlreadyInitialized = 16,
    NotInitialized = 17,
    ContractPaused = 18,
}

#[contract]
pub struct VoucherLedger;

#[contractimpl]
impl VoucherLedger {
    // ─────────────────────────────────────────────────────────
    // Initialisation
    // ─────────────────────────────────────────────────────────

    /// Initialise the ledger.
    ///
    /// Must be called exactly once immediately after deployment.
    /// Subsequent calls panic with `Error::AlreadyInitialized`.
    ///
    /// - `owner` becomes the administrator and must sign the transaction.
    /// - Both fee rates are in basis points and capped at [`fees::MAX_FEE_RATE`].
    pub fn init(
        env: Env,
        owner: Address,
        treasury: Address,
        minting_fee_rate: u32,
        redemption_fee_rate: u32,
        default_expiry_days: u32,
    ) {
        owner.require_auth();
        if storage::has_config(&env) {
            panic_with_error!(&env, Error::AlreadyInitialized);
        }
        Self::require_valid_fees(&env, minting_fee_rate, redemption_fee_rate);
        if default_expiry_days > MAX_EXPIRY_DAYS {
            panic_with_error!(&env, Error::InvalidExpiry);
        }

        storage::save_config(
            &env,
            &LedgerConfig {
                owner,
                treasury,
                minting_fee_rate,
                redemption_fee_rate,
                default_expiry_days,
                paused: false,
            },
        );
        storage::save_counters(&env, &Counters::default());
    }

    // ─────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────

    /// Whitelist `token`. Re-adding a supported token is a no-op.
    pub fn add_supported_token(env: Env, owner: Address, token: Address) {
        access::require_owner(&env, &owner);
        if storage::is_supported(&env, &token) {
            return;
        }
        storage::set_supported(&env, &token);
        events::emit_token_added(&env, token);
    }

    /// Remove `token` from the whitelist. Existing vouchers in that token can
    /// still be redeemed and reclaimed; only new mints are refused.
    pub fn remove_supported_token(env: Env, owner: Address, token: Address) {
        access::require_owner(&env, &owner);
        if !storage::is_supported(&env, &token) {
            return;
        }
        storage::clear_supported(&env, &token);
        events::emit_token_removed(&env, token);
    }

    /// Replace both fee rates. Applies to mints and redemptions from the next
    /// invocation on.
    pub fn update_fees(env: Env, owner: Address, minting_fee_rate: u32, redemption_fee_rate: u32) {
        access::require_owner(&env, &owner);
        Self::require_valid_fees(&env, minting_fee_rate, redemption_fee_rate);
        let mut config = storage::load_config(&env);
        config.minting_fee_rate = minting_fee_rate;
        config.redemption_fee_rate = redemption_fee_rate;
        storage::save_config(&env, &config);
        events::emit_fees_updated(&env, minting_fee_rate, redemption_fee_rate);
    }

    pub fn update_treasury(env: Env, owner: Address, treasury: Address) {
        access::require_owner(&env, &owner);
        let mut config = storage::load_config(&env);
        config.treasury = treasury.clone();
        storage::save_config(&env, &config);
        events::emit_treasury_updated(&env, treasury);
    }

    /// Register `agent` (or update its commission) and mark it active.
    /// Counters of an already registered agent are preserved.
    pub fn register_agent(env: Env, owner: Address, agent: Address, commission_rate: u32) {
        access::require_owner(&env, &owner);
        if !fees::is_valid_commission_rate(commission_rate) {
            panic_with_error!(&env, Error::InvalidFee);
        }
        let record = match storage::load_agent(&env, &agent) {
            Some(mut existing) => {
                existing.commission_rate = commission_rate;
                existing.is_active = true;
                existing
            }
            None => Agent {
                is_active: true,
                commission_rate,
                total_minted: 0,
                total_value: 0,
                last_settlement: 0,
            },
        };
        storage::save_agent(&env, &agent, &record);
        events::emit_agent_registered(&env, agent, commission_rate);
    }

    /// Suspend or reinstate a registered agent. A suspended agent cannot mint
    /// but can still reclaim its expired vouchers.
    pub fn set_agent_active(env: Env, owner: Address, agent: Address, is_active: bool) {
        access::require_owner(&env, &owner);
        let mut record = match storage::load_agent(&env, &agent) {
            Some(record) => record,
            None => panic_with_error!(&env, Error::AgentNotActive),
        };
        record.is_active = is_active;
        storage::save_agent(&env, &agent, &record);
        events::emit_agent_status(&env, agent, is_active);
    }

    /// Stamp the agent's `last_settlement` with the current ledger time.
    pub fn record_settlement(env: Env, owner: Address, agent: Address) {
        access::require_owner(&env, &owner);
        let mut record = match storage::load_agent(&env, &agent) {
            Some(record) => record,
            None => panic_with_error!(&env, Error::AgentNotActive),
        };
        let now = env.ledger().timestamp();
        record.last_settlement = now;
        storage::save_agent(&env, &agent, &record);
        events::emit_settlement(&env, agent, now);
    }

    pub fn add_authorized_minter(env: Env, owner: Address, minter: Address) {
        access::add_minter(&env, &owner, &minter);
    }

    pub fn remove_authorized_minter(env: Env, owner: Address, minter: Address) {
        access::remove_minter(&env, &owner, &minter);
    }

    pub fn transfer_ownership(env: Env, owner: Address, new_owner: Address) {
        access::transfer_ownership(&env, &owner, &new_owner);
    }

    // ─────────────────────────────────────────────────────────
    // Emergency Control
    // ─────────────────────────────────────────────────────────

    /// Halt minting and redemption. Reclaim and admin calls keep working.
    pub fn pause(env: Env, owner: Address) {
        access::require_owner(&env, &owner);
        let mut config = storage::load_config(&env);
        config.paused = true;
        storage::save_config(&env, &config);
        events::emit_paused(&env, owner);
    }

    pub fn unpause(env: Env, owner: Address) {
        access::require_owner(&env, &owner);
        let mut config = storage::load_config(&env);
        config.paused = false;
        storage::save_config(&env, &config);
        events::emit_unpaused(&env, owner);
    }

    pub fn is_paused(env: Env) -> bool {
        storage::load_config(&env).paused
    }

    // ─────────────────────────────────────────────────────────
    // Voucher lifecycle
    // ─────────────────────────────────────────────────────────

    /// Mint one voucher.
    ///
    /// `minter` must be an authorized minter and must have approved this
    /// contract for at least `token_value` plus the minting fee.
    /// `expiry_days == 0` mints a voucher that never expires.
    pub fn mint_voucher(
        env: Env,
        minter: Address,
        voucher_hash: BytesN<32>,
        token: Address,
        token_value: i128,
        expiry_days: u32,
    ) {
        let config = storage::load_config(&env);
        Self::require_not_paused(&env, &config);
        access::require_minter(&env, &minter);
        access::require_active_agent(&env, &minter);

        Self::mint_one(&env, &config, &minter, voucher_hash, token, token_value, expiry_days);
    }

    /// Mint every voucher described by `batch`, or none of them.
    ///
    /// The four arrays must have the same, non-zero length no greater than
    /// [`MAX_BATCH_SIZE`]; otherwise `Error::InvalidBatchSize`. Any failing
    /// entry reverts the entire batch.
    pub fn mint_voucher_batch(env: Env, minter: Address, batch: VoucherBatch) -> u32 {
        let config = storage::load_config(&env);
        Self::require_not_paused(&env, &config);
        access::require_minter(&env, &minter);
        access::require_active_agent(&env, &minter);

        let len = match batch.uniform_len() {
            Some(len) if len > 0 && len <= MAX_BATCH_SIZE => len,
            _ => panic_with_error!(&env, Error::InvalidBatchSize),
        };

        for i in 0..len {
            // Indexes are in range: all four lengths were checked above.
            let hash = batch.voucher_hashes.get_unchecked(i);
            let token = batch.tokens.get_unchecked(i);
            let value = batch.token_values.get_unchecked(i);
            let days = batch.expiry_days.get_unchecked(i);
            Self::mint_one(&env, &config, &minter, hash, token, value, days);
        }
        len
    }

    /// Redeem the voucher identified by `voucher_code` and pay it to
    /// `recipient`, minus the redemption fee.
    ///
    /// No signature is required: possession of the code is the credential.
    pub fn redeem_voucher(env: Env, voucher_code: Bytes, recipient: Address) {
        let config = storage::load_config(&env);
        Self::require_not_paused(&env, &config);

        let hash = Self::hash_code(&env, &voucher_code);
        let mut voucher = Self::load_existing(&env, &hash);
        if voucher.is_redeemed {
            panic_with_error!(&env, Error::VoucherAlreadyRedeemed);
        }
        if voucher.is_expired_at(env.ledger().timestamp()) {
            panic_with_error!(&env, Error::VoucherExpired);
        }

        let (payout, fee) = fees::redemption_split(voucher.token_value, config.redemption_fee_rate);

        // State first, then transfers.
        voucher.is_redeemed = true;
        storage::save_voucher(&env, &voucher);
        storage::sub_held(&env, &voucher.issuer, &voucher.token, voucher.token_value);

        let mut counters = storage::load_counters(&env);
        counters.total_redeemed += 1;
        storage::save_counters(&env, &counters);

        let mut token_stats = storage::load_token_stats(&env, &voucher.token);
        token_stats.vouchers_redeemed += 1;
        token_stats.value_redeemed += voucher.token_value;
        storage::save_token_stats(&env, &voucher.token, &token_stats);

        let token_client = token::Client::new(&env, &voucher.token);
        let this = env.current_contract_address();
        if payout > 0 {
            token_client.transfer(&this, &recipient, &payout);
        }
        if fee > 0 {
            token_client.transfer(&this, &config.treasury, &fee);
        }

        events::emit_voucher_redeemed(
            &env,
            hash,
            voucher.token,
            recipient,
            voucher.token_value,
            fee,
        );
    }

    /// Return an expired, unredeemed voucher's full value to its issuer.
    ///
    /// - `caller` must sign and must be the voucher's issuer.
    /// - Never-expiring vouchers cannot be reclaimed.
    pub fn reclaim_expired_voucher(env: Env, caller: Address, voucher_code: Bytes) {
        caller.require_auth();

        let hash = Self::hash_code(&env, &voucher_code);
        let mut voucher = Self::load_existing(&env, &hash);
        if voucher.issuer != caller {
            panic_with_error!(&env, Error::UnauthorizedMinter);
        }
        if voucher.is_redeemed {
            panic_with_error!(&env, Error::VoucherAlreadyRedeemed);
        }
        if !voucher.is_expired_at(env.ledger().timestamp()) {
            panic_with_error!(&env, Error::VoucherNotExpired);
        }

        voucher.is_redeemed = true;
        storage::save_voucher(&env, &voucher);
        storage::sub_held(&env, &voucher.issuer, &voucher.token, voucher.token_value);

        let mut counters = storage::load_counters(&env);
        counters.total_reclaimed += 1;
        storage::save_counters(&env, &counters);

        let token_client = token::Client::new(&env, &voucher.token);
        token_client.transfer(&env.current_contract_address(), &caller, &voucher.token_value);

        events::emit_voucher_reclaimed(&env, hash, voucher.token, caller, voucher.token_value);
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Look a voucher up by plaintext code.
    pub fn get_voucher_status(env: Env, voucher_code: Bytes) -> VoucherStatus {
        let hash = Self::hash_code(&env, &voucher_code);
        match storage::load_voucher(&env, &hash) {
            Some(v) => VoucherStatus {
                exists: true,
                is_redeemed: v.is_redeemed,
                token: Some(v.token),
                token_value: v.token_value,
                issuer: Some(v.issuer),
                expiry_timestamp: v.expiry_timestamp,
            },
            None => VoucherStatus {
                exists: false,
                is_redeemed: false,
                token: None,
                token_value: 0,
                issuer: None,
                expiry_timestamp: 0,
            },
        }
    }

    /// Look a voucher up by hash.
    pub fn get_voucher(env: Env, voucher_hash: BytesN<32>) -> Option<Voucher> {
        storage::load_voucher(&env, &voucher_hash)
    }

    /// Stats for `agent`; an unregistered address reports an inactive,
    /// all-zero record.
    pub fn get_agent_stats(env: Env, agent: Address) -> Agent {
        storage::load_agent(&env, &agent).unwrap_or(Agent {
            is_active: false,
            commission_rate: 0,
            total_minted: 0,
            total_value: 0,
            last_settlement: 0,
        })
    }

    pub fn get_contract_stats(env: Env) -> ContractStats {
        let config = storage::load_config(&env);
        let counters = storage::load_counters(&env);
        ContractStats {
            total_minted: counters.total_minted,
            total_redeemed: counters.total_redeemed,
            total_reclaimed: counters.total_reclaimed,
            minting_fee_rate: config.minting_fee_rate,
            redemption_fee_rate: config.redemption_fee_rate,
        }
    }

    pub fn get_config(env: Env) -> LedgerConfig {
        storage::load_config(&env)
    }

    pub fn is_token_supported(env: Env, token: Address) -> bool {
        storage::is_supported(&env, &token)
    }

    pub fn is_authorized_minter(env: Env, address: Address) -> bool {
        storage::is_minter(&env, &address)
    }

    /// Sum of outstanding voucher values held in `token`.
    pub fn get_contract_token_balance(env: Env, token: Address) -> i128 {
        storage::get_token_held(&env, &token)
    }

    /// Outstanding value of vouchers minted by `agent` in `token`.
    pub fn get_agent_token_balance(env: Env, agent: Address, token: Address) -> i128 {
        storage::get_agent_held(&env, &agent, &token)
    }

    pub fn get_token_stats(env: Env, token: Address) -> TokenStats {
        storage::load_token_stats(&env, &token)
    }

    // ─────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────

    fn mint_one(
        env: &Env,
        config: &LedgerConfig,
        minter: &Address,
        voucher_hash: BytesN<32>,
        token: Address,
        token_value: i128,
        expiry_days: u32,
    ) {
        if !storage::is_supported(env, &token) {
            panic_with_error!(env, Error::TokenNotSupported);
        }
        if token_value <= 0 || token_value > fees::MAX_TOKEN_VALUE {
            panic_with_error!(env, Error::InvalidAmount);
        }
        if expiry_days > MAX_EXPIRY_DAYS {
            panic_with_error!(env, Error::InvalidExpiry);
        }
        if storage::has_voucher(env, &voucher_hash) {
            panic_with_error!(env, Error::DuplicateVoucherCode);
        }

        let (total, fee) = fees::mint_charge(token_value, config.minting_fee_rate);
        let this = env.current_contract_address();
        let token_client = token::Client::new(env, &token);
        if token_client.balance(minter) < total || token_client.allowance(minter, &this) < total {
            panic_with_error!(env, Error::InsufficientBalance);
        }

        let now = env.ledger().timestamp();
        let expiry_timestamp = if expiry_days == 0 {
            0
        } else {
            now + expiry_days as u64 * SECONDS_PER_DAY
        };

        storage::save_voucher(
            env,
            &Voucher {
                voucher_hash: voucher_hash.clone(),
                token: token.clone(),
                token_value,
                issuer: minter.clone(),
                expiry_timestamp,
                is_redeemed: false,
                created_at: now,
            },
        );
        storage::add_held(env, minter, &token, token_value);

        if let Some(mut agent) = storage::load_agent(env, minter) {
            agent.total_minted += 1;
            agent.total_value += token_value;
            storage::save_agent(env, minter, &agent);
        }

        let mut counters = storage::load_counters(env);
        counters.total_minted += 1;
        storage::save_counters(env, &counters);

        let mut token_stats = storage::load_token_stats(env, &token);
        token_stats.vouchers_minted += 1;
        storage::save_token_stats(env, &token, &token_stats);

        token_client.transfer_from(&this, minter, &this, &total);
        if fee > 0 {
            token_client.transfer(&this, &config.treasury, &fee);
        }

        events::emit_voucher_minted(
            env,
            voucher_hash,
            token,
            token_value,
            minter.clone(),
            expiry_timestamp,
        );
    }

    fn hash_code(env: &Env, voucher_code: &Bytes) -> BytesN<32> {
        env.crypto().sha256(voucher_code).to_bytes()
    }

    fn load_existing(env: &Env, hash: &BytesN<32>) -> Voucher {
        match storage::load_voucher(env, hash) {
            Some(voucher) => voucher,
            None => panic_with_error!(env, Error::VoucherNotFound),
        }
    }

    fn require_valid_fees(env: &Env, minting_fee_rate: u32, redemption_fee_rate: u32) {
        if !fees::is_valid_fee_rate(minting_fee_rate)
            || !fees::is_valid_fee_rate(redemption_fee_rate)
        {
            panic_with_error!(env, Error::InvalidFee);
        }
    }

    fn require_not_paused(env: &Env, config: &LedgerConfig) {
        if config.paused {
            panic_with_error!(env, Error::ContractPaused);
        }
    }
}

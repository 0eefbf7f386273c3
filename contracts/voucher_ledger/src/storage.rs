//! # Storage
//!
//! Provides typed helpers over Soroban's two storage tiers used by the ledger:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key        | Type           | Description                           |
//! |------------|----------------|---------------------------------------|
//! | `Config`   | `LedgerConfig` | Owner, treasury, fee rates, pause flag |
//! | `Counters` | `Counters`     | Contract-wide mint/redeem/reclaim counts |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                        | Type         | Description                          |
//! |----------------------------|--------------|--------------------------------------|
//! | `Voucher(hash)`            | `Voucher`    | Voucher record, never removed        |
//! | `Agent(addr)`              | `Agent`      | Registered agent                     |
//! | `Minter(addr)`             | `bool`       | Authorized-minter membership         |
//! | `Supported(token)`         | `bool`       | Token whitelist membership           |
//! | `TokenHeld(token)`         | `i128`       | Sum of outstanding voucher values    |
//! | `AgentHeld(agent, token)`  | `i128`       | Outstanding value minted by `agent`  |
//! | `TokenStats(token)`        | `TokenStats` | Per-token activity counters          |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.
//! Voucher records must outlive their expiry so issuers can reclaim, which is
//! why they are persistent rather than temporary entries.

use soroban_sdk::{contracttype, panic_with_error, Address, BytesN, Env};

use crate::types::{Agent, Counters, LedgerConfig, TokenStats, Voucher};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

/// Instance storage: bump by 7 days when below 1 day remaining.
const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

/// Persistent storage: bump by 30 days when below 7 days remaining.
const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Global configuration (Instance).
    Config,
    /// Global counters (Instance).
    Counters,
    /// Voucher record keyed by code hash (Persistent).
    Voucher(BytesN<32>),
    /// Agent record (Persistent).
    Agent(Address),
    /// Authorized-minter flag (Persistent).
    Minter(Address),
    /// Whitelist flag (Persistent).
    Supported(Address),
    /// Ledger-held value per token (Persistent).
    TokenHeld(Address),
    /// Outstanding value per (agent, token) (Persistent).
    AgentHeld(Address, Address),
    /// Activity counters per token (Persistent).
    TokenStats(Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn has_config(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

/// Load the configuration. Panics with `NotInitialized` before `init`.
pub fn load_config(env: &Env) -> LedgerConfig {
    bump_instance(env);
    match env.storage().instance().get(&DataKey::Config) {
        Some(config) => config,
        None => panic_with_error!(env, Error::NotInitialized),
    }
}

pub fn save_config(env: &Env, config: &LedgerConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    bump_instance(env);
}

pub fn load_counters(env: &Env) -> Counters {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Counters)
        .unwrap_or_default()
}

pub fn save_counters(env: &Env, counters: &Counters) {
    env.storage().instance().set(&DataKey::Counters, counters);
    bump_instance(env);
}

// ── Persistent Storage Helpers ───────────────────────────────────────

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

/// Read a persistent entry, bumping its TTL only if it exists.
fn read_persistent<V>(env: &Env, key: &DataKey) -> Option<V>
where
    V: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    let value = env.storage().persistent().get(key);
    if value.is_some() {
        bump_persistent(env, key);
    }
    value
}

fn write_persistent<V>(env: &Env, key: &DataKey, value: &V)
where
    V: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
{
    env.storage().persistent().set(key, value);
    bump_persistent(env, key);
}

// ─────────────────────────────────────────────────────────
// Vouchers
// ─────────────────────────────────────────────────────────

pub fn has_voucher(env: &Env, hash: &BytesN<32>) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Voucher(hash.clone()))
}

pub fn load_voucher(env: &Env, hash: &BytesN<32>) -> Option<Voucher> {
    read_persistent(env, &DataKey::Voucher(hash.clone()))
}

pub fn save_voucher(env: &Env, voucher: &Voucher) {
    write_persistent(env, &DataKey::Voucher(voucher.voucher_hash.clone()), voucher);
}

// ─────────────────────────────────────────────────────────
// Agents, minters, whitelist
// ─────────────────────────────────────────────────────────

pub fn load_agent(env: &Env, agent: &Address) -> Option<Agent> {
    read_persistent(env, &DataKey::Agent(agent.clone()))
}

pub fn save_agent(env: &Env, agent: &Address, record: &Agent) {
    write_persistent(env, &DataKey::Agent(agent.clone()), record);
}

pub fn is_minter(env: &Env, address: &Address) -> bool {
    read_persistent(env, &DataKey::Minter(address.clone())).unwrap_or(false)
}

pub fn set_minter(env: &Env, address: &Address) {
    write_persistent(env, &DataKey::Minter(address.clone()), &true);
}

pub fn clear_minter(env: &Env, address: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Minter(address.clone()));
}

pub fn is_supported(env: &Env, token: &Address) -> bool {
    read_persistent(env, &DataKey::Supported(token.clone())).unwrap_or(false)
}

pub fn set_supported(env: &Env, token: &Address) {
    write_persistent(env, &DataKey::Supported(token.clone()), &true);
}

pub fn clear_supported(env: &Env, token: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Supported(token.clone()));
}

// ─────────────────────────────────────────────────────────
// Balances and per-token stats
// ─────────────────────────────────────────────────────────

pub fn get_token_held(env: &Env, token: &Address) -> i128 {
    read_persistent(env, &DataKey::TokenHeld(token.clone())).unwrap_or(0)
}

pub fn get_agent_held(env: &Env, agent: &Address, token: &Address) -> i128 {
    read_persistent(env, &DataKey::AgentHeld(agent.clone(), token.clone())).unwrap_or(0)
}

/// Record `amount` as newly held on behalf of `issuer`.
pub fn add_held(env: &Env, issuer: &Address, token: &Address, amount: i128) {
    let total = get_token_held(env, token) + amount;
    write_persistent(env, &DataKey::TokenHeld(token.clone()), &total);
    let per_agent = get_agent_held(env, issuer, token) + amount;
    write_persistent(env, &DataKey::AgentHeld(issuer.clone(), token.clone()), &per_agent);
}

/// Release `amount` previously recorded with [`add_held`].
pub fn sub_held(env: &Env, issuer: &Address, token: &Address, amount: i128) {
    let total = get_token_held(env, token) - amount;
    write_persistent(env, &DataKey::TokenHeld(token.clone()), &total);
    let per_agent = get_agent_held(env, issuer, token) - amount;
    write_persistent(env, &DataKey::AgentHeld(issuer.clone(), token.clone()), &per_agent);
}

pub fn load_token_stats(env: &Env, token: &Address) -> TokenStats {
    read_persistent(env, &DataKey::TokenStats(token.clone())).unwrap_or_default()
}

pub fn save_token_stats(env: &Env, token: &Address, stats: &TokenStats) {
    write_persistent(env, &DataKey::TokenStats(token.clone()), stats);
}

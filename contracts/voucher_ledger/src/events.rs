//! # Events
//!
//! Voucher lifecycle events carry the voucher hash as their second topic so
//! indexers can follow a single voucher without decoding payloads.
//!
//! | Topics                      | Data               |
//! |-----------------------------|--------------------|
//! | `(minted, voucher_hash)`    | [`VoucherMinted`]   |
//! | `(redeemed, voucher_hash)`  | [`VoucherRedeemed`] |
//! | `(reclaimed, voucher_hash)` | [`VoucherReclaimed`] |
//!
//! Administrative events use a single topic naming the action.

use soroban_sdk::{contracttype, symbol_short, Address, BytesN, Env};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoucherMinted {
    pub voucher_hash: BytesN<32>,
    pub token: Address,
    pub token_value: i128,
    pub issuer: Address,
    pub expiry_timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoucherRedeemed {
    pub voucher_hash: BytesN<32>,
    pub token: Address,
    pub recipient: Address,
    pub token_value: i128,
    pub fee: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VoucherReclaimed {
    pub voucher_hash: BytesN<32>,
    pub token: Address,
    pub issuer: Address,
    pub token_value: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeesUpdated {
    pub minting_fee_rate: u32,
    pub redemption_fee_rate: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AgentRegistered {
    pub agent: Address,
    pub commission_rate: u32,
}

pub fn emit_voucher_minted(
    env: &Env,
    voucher_hash: BytesN<32>,
    token: Address,
    token_value: i128,
    issuer: Address,
    expiry_timestamp: u64,
) {
    let topics = (symbol_short!("minted"), voucher_hash.clone());
    let data = VoucherMinted {
        voucher_hash,
        token,
        token_value,
        issuer,
        expiry_timestamp,
    };
    env.events().publish(topics, data);
}

pub fn emit_voucher_redeemed(
    env: &Env,
    voucher_hash: BytesN<32>,
    token: Address,
    recipient: Address,
    token_value: i128,
    fee: i128,
) {
    let topics = (symbol_short!("redeemed"), voucher_hash.clone());
    let data = VoucherRedeemed {
        voucher_hash,
        token,
        recipient,
        token_value,
        fee,
    };
    env.events().publish(topics, data);
}

pub fn emit_voucher_reclaimed(
    env: &Env,
    voucher_hash: BytesN<32>,
    token: Address,
    issuer: Address,
    token_value: i128,
) {
    let topics = (symbol_short!("reclaimed"), voucher_hash.clone());
    let data = VoucherReclaimed {
        voucher_hash,
        token,
        issuer,
        token_value,
    };
    env.events().publish(topics, data);
}

pub fn emit_token_added(env: &Env, token: Address) {
    env.events().publish((symbol_short!("tok_add"),), token);
}

pub fn emit_token_removed(env: &Env, token: Address) {
    env.events().publish((symbol_short!("tok_rm"),), token);
}

pub fn emit_fees_updated(env: &Env, minting_fee_rate: u32, redemption_fee_rate: u32) {
    let data = FeesUpdated {
        minting_fee_rate,
        redemption_fee_rate,
    };
    env.events().publish((symbol_short!("fees"),), data);
}

pub fn emit_agent_registered(env: &Env, agent: Address, commission_rate: u32) {
    let data = AgentRegistered {
        agent,
        commission_rate,
    };
    env.events().publish((symbol_short!("agent"),), data);
}

pub fn emit_agent_status(env: &Env, agent: Address, is_active: bool) {
    env.events()
        .publish((symbol_short!("agent_st"), agent), is_active);
}

pub fn emit_settlement(env: &Env, agent: Address, timestamp: u64) {
    env.events()
        .publish((symbol_short!("settled"), agent), timestamp);
}

pub fn emit_treasury_updated(env: &Env, treasury: Address) {
    env.events().publish((symbol_short!("treasury"),), treasury);
}

pub fn emit_paused(env: &Env, by: Address) {
    env.events().publish((symbol_short!("paused"),), by);
}

pub fn emit_unpaused(env: &Env, by: Address) {
    env.events().publish((symbol_short!("unpaused"),), by);
}

//! # Access control
//!
//! Two independent gates protect the ledger:
//!
//! ```text
//! Owner             : whitelist, fees, agents, minters, treasury, pause
//! Authorized minter : mint_voucher, mint_voucher_batch
//! ```
//!
//! Redemption carries no caller gate: knowledge of the voucher code is the
//! credential. Reclaim is gated on the voucher's own `issuer` field and lives
//! in `lib.rs`.
//!
//! ## Storage layout
//!
//! - `LedgerConfig.owner`      → the single owner, kept inside the config entry.
//! - `DataKey::Minter(addr)`   → `true` while `addr` may mint.
//!
//! ## Event emissions
//!
//! | Event topic prefix | Trigger |
//! |--------------------|---------|
//! | `minter`           | Minter added (data `true`) or removed (data `false`) |
//! | `owner`            | Ownership transferred |
//!
//! Adding an existing minter or removing an absent one is a no-op and emits
//! nothing.

use soroban_sdk::{symbol_short, Address, Env};

use crate::storage;
use crate::Error;

// ─────────────────────────────────────────────────────────
// Owner
// ─────────────────────────────────────────────────────────

/// Assert that `caller` signed the invocation and is the owner.
/// Panics with `Error::NotOwner` otherwise.
pub fn require_owner(env: &Env, caller: &Address) {
    caller.require_auth();
    let config = storage::load_config(env);
    if &config.owner != caller {
        panic_with_error_access(env, Error::NotOwner);
    }
}

/// Hand ownership to `new_owner`. The previous owner loses every admin right
/// immediately.
pub fn transfer_ownership(env: &Env, current: &Address, new_owner: &Address) {
    require_owner(env, current);
    let mut config = storage::load_config(env);
    config.owner = new_owner.clone();
    storage::save_config(env, &config);
    env.events()
        .publish((symbol_short!("owner"), current.clone()), new_owner.clone());
}

// ─────────────────────────────────────────────────────────
// Authorized minters
// ─────────────────────────────────────────────────────────

pub fn add_minter(env: &Env, owner: &Address, minter: &Address) {
    require_owner(env, owner);
    if storage::is_minter(env, minter) {
        return;
    }
    storage::set_minter(env, minter);
    emit_minter(env, minter, true);
}

pub fn remove_minter(env: &Env, owner: &Address, minter: &Address) {
    require_owner(env, owner);
    if !storage::is_minter(env, minter) {
        return;
    }
    storage::clear_minter(env, minter);
    emit_minter(env, minter, false);
}

/// Assert that `minter` signed the invocation and may mint.
/// Panics with `Error::UnauthorizedMinter` otherwise.
pub fn require_minter(env: &Env, minter: &Address) {
    minter.require_auth();
    if !storage::is_minter(env, minter) {
        panic_with_error_access(env, Error::UnauthorizedMinter);
    }
}

/// Assert that a registered agent is still active. Authorized minters without
/// an agent record are not affected.
pub fn require_active_agent(env: &Env, minter: &Address) {
    if let Some(agent) = storage::load_agent(env, minter) {
        if !agent.is_active {
            panic_with_error_access(env, Error::AgentNotActive);
        }
    }
}

// ─────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────

fn emit_minter(env: &Env, minter: &Address, enabled: bool) {
    env.events()
        .publish((symbol_short!("minter"), minter.clone()), enabled);
}

#[inline(always)]
fn panic_with_error_access(env: &Env, err: Error) -> ! {
    soroban_sdk::panic_with_error!(env, err)
}

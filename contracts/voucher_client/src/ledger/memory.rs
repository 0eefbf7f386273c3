//! In-memory replica of the voucher ledger.
//!
//! Follows the contract's rules, check order and fee arithmetic (the fee
//! functions are shared with the contract crate), keeps its own token
//! balances and allowances, and runs on a clock the caller sets. Each write
//! works on a copy of the state that is committed only on success, so a
//! failed call leaves nothing behind.

use std::collections::{HashMap, HashSet};

use stellar_strkey::{ed25519, Contract};
use voucher_ledger::{fees, Error, MAX_BATCH_SIZE, MAX_EXPIRY_DAYS, SECONDS_PER_DAY};

use super::{require_valid, Ledger, LedgerFailure, LedgerResult};
use crate::code::hash_code;
use crate::types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    TokenStats, VoucherRecord,
};

const LEDGER_KIND: u8 = 0x4c;
const TOKEN_KIND: u8 = 0x54;
const ACCOUNT_KIND: u8 = 0x41;

/// Deterministic 32-byte identity: kind tag first, serial number last.
fn identity(kind: u8, serial: u64) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0] = kind;
    bytes[24..].copy_from_slice(&serial.to_be_bytes());
    bytes
}

#[derive(Clone, Debug)]
struct StoredVoucher {
    token: Account,
    token_value: i128,
    issuer: Account,
    expiry_timestamp: u64,
    is_redeemed: bool,
}

impl StoredVoucher {
    fn is_expired_at(&self, now: u64) -> bool {
        self.expiry_timestamp != 0 && now > self.expiry_timestamp
    }
}

#[derive(Clone, Debug, Default)]
struct Counters {
    total_minted: u64,
    total_redeemed: u64,
    total_reclaimed: u64,
}

#[derive(Clone, Debug)]
struct State {
    ledger: Account,
    config: ConfigSnapshot,
    counters: Counters,
    vouchers: HashMap<[u8; 32], StoredVoucher>,
    agents: HashMap<Account, AgentStats>,
    minters: HashSet<Account>,
    supported: HashSet<Account>,
    token_held: HashMap<Account, i128>,
    agent_held: HashMap<(Account, Account), i128>,
    token_stats: HashMap<Account, TokenStats>,
    /// (token, holder) -> balance
    balances: HashMap<(Account, Account), i128>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<(Account, Account, Account), i128>,
}

#[derive(Debug)]
pub struct InMemoryLedger {
    state: State,
    now: u64,
    next_account: u64,
    next_token: u64,
}

type Step<T> = Result<T, Error>;

fn revert(err: Error) -> LedgerFailure {
    LedgerFailure::Reverted(format!("{err:?}"))
}

impl InMemoryLedger {
    /// Create and initialise a ledger. Fails with the same reasons as the
    /// contract's `init`.
    pub fn new(
        owner: Account,
        treasury: Account,
        minting_fee_rate: u32,
        redemption_fee_rate: u32,
        default_expiry_days: u32,
    ) -> LedgerResult<Self> {
        require_valid(&[&owner, &treasury])?;
        if !fees::is_valid_fee_rate(minting_fee_rate)
            || !fees::is_valid_fee_rate(redemption_fee_rate)
        {
            return Err(revert(Error::InvalidFee));
        }
        if default_expiry_days > MAX_EXPIRY_DAYS {
            return Err(revert(Error::InvalidExpiry));
        }
        Ok(InMemoryLedger {
            state: State {
                ledger: Account::new(Contract(identity(LEDGER_KIND, 0)).to_string()),
                config: ConfigSnapshot {
                    owner,
                    treasury,
                    minting_fee_rate,
                    redemption_fee_rate,
                    default_expiry_days,
                    paused: false,
                },
                counters: Counters::default(),
                vouchers: HashMap::new(),
                agents: HashMap::new(),
                minters: HashSet::new(),
                supported: HashSet::new(),
                token_held: HashMap::new(),
                agent_held: HashMap::new(),
                token_stats: HashMap::new(),
                balances: HashMap::new(),
                allowances: HashMap::new(),
            },
            now: 0,
            next_account: 0,
            next_token: 0,
        })
    }

    pub fn set_time(&mut self, now: u64) {
        self.now = now;
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.now += seconds;
    }

    /// Issue a new token contract address.
    pub fn create_token(&mut self) -> Account {
        self.next_token += 1;
        Account::new(Contract(identity(TOKEN_KIND, self.next_token)).to_string())
    }

    /// Credit `amount` of `token` to `to` out of thin air.
    pub fn fund(&mut self, token: &Account, to: &Account, amount: i128) {
        *self
            .state
            .balances
            .entry((token.clone(), to.clone()))
            .or_insert(0) += amount;
    }

    /// Run `op` against a scratch copy and commit it only if `op` succeeds.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut State, u64, &mut Vec<LedgerEvent>) -> Step<T>,
    ) -> LedgerResult<(T, Vec<LedgerEvent>)> {
        let mut scratch = self.state.clone();
        let mut events = Vec::new();
        let out = op(&mut scratch, self.now, &mut events).map_err(revert)?;
        self.state = scratch;
        Ok((out, events))
    }
}

// ── State transitions ───────────────────────────────────────────────

impl State {
    fn require_owner(&self, caller: &Account) -> Step<()> {
        if &self.config.owner != caller {
            return Err(Error::NotOwner);
        }
        Ok(())
    }

    fn require_not_paused(&self) -> Step<()> {
        if self.config.paused {
            return Err(Error::ContractPaused);
        }
        Ok(())
    }

    fn require_minter(&self, minter: &Account) -> Step<()> {
        if !self.minters.contains(minter) {
            return Err(Error::UnauthorizedMinter);
        }
        if let Some(agent) = self.agents.get(minter) {
            if !agent.is_active {
                return Err(Error::AgentNotActive);
            }
        }
        Ok(())
    }

    fn balance(&self, token: &Account, holder: &Account) -> i128 {
        self.balances
            .get(&(token.clone(), holder.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, token: &Account, owner: &Account, spender: &Account) -> i128 {
        self.allowances
            .get(&(token.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn move_tokens(
        &mut self,
        token: &Account,
        from: &Account,
        to: &Account,
        amount: i128,
    ) -> Step<()> {
        if amount < 0 || self.balance(token, from) < amount {
            return Err(Error::TokenTransferFailed);
        }
        *self.balances.entry((token.clone(), from.clone())).or_insert(0) -= amount;
        *self.balances.entry((token.clone(), to.clone())).or_insert(0) += amount;
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        token: &Account,
        owner: &Account,
        spender: &Account,
        amount: i128,
    ) -> Step<()> {
        let key = (token.clone(), owner.clone(), spender.clone());
        let available = self.allowances.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(Error::TokenTransferFailed);
        }
        self.allowances.insert(key, available - amount);
        Ok(())
    }

    fn adjust_held(&mut self, issuer: &Account, token: &Account, delta: i128) {
        *self.token_held.entry(token.clone()).or_insert(0) += delta;
        *self
            .agent_held
            .entry((issuer.clone(), token.clone()))
            .or_insert(0) += delta;
    }

    fn mint_one(
        &mut self,
        now: u64,
        events: &mut Vec<LedgerEvent>,
        minter: &Account,
        voucher_hash: [u8; 32],
        token: &Account,
        token_value: i128,
        expiry_days: u32,
    ) -> Step<()> {
        if !self.supported.contains(token) {
            return Err(Error::TokenNotSupported);
        }
        if token_value <= 0 || token_value > fees::MAX_TOKEN_VALUE {
            return Err(Error::InvalidAmount);
        }
        if expiry_days > MAX_EXPIRY_DAYS {
            return Err(Error::InvalidExpiry);
        }
        if self.vouchers.contains_key(&voucher_hash) {
            return Err(Error::DuplicateVoucherCode);
        }

        let ledger = self.ledger.clone();
        let (total, fee) = fees::mint_charge(token_value, self.config.minting_fee_rate);
        if self.balance(token, minter) < total || self.allowance(token, minter, &ledger) < total {
            return Err(Error::InsufficientBalance);
        }

        let expiry_timestamp = if expiry_days == 0 {
            0
        } else {
            now + expiry_days as u64 * SECONDS_PER_DAY
        };
        self.vouchers.insert(
            voucher_hash,
            StoredVoucher {
                token: token.clone(),
                token_value,
                issuer: minter.clone(),
                expiry_timestamp,
                is_redeemed: false,
            },
        );
        self.adjust_held(minter, token, token_value);
        if let Some(agent) = self.agents.get_mut(minter) {
            agent.total_minted += 1;
            agent.total_value += token_value;
        }
        self.counters.total_minted += 1;
        self.token_stats.entry(token.clone()).or_default().vouchers_minted += 1;

        self.spend_allowance(token, minter, &ledger, total)?;
        self.move_tokens(token, minter, &ledger, total)?;
        if fee > 0 {
            let treasury = self.config.treasury.clone();
            self.move_tokens(token, &ledger, &treasury, fee)?;
        }

        events.push(LedgerEvent::Minted {
            voucher_hash,
            token: token.clone(),
            token_value,
            issuer: minter.clone(),
            expiry_timestamp,
        });
        Ok(())
    }

    fn redeem(
        &mut self,
        now: u64,
        events: &mut Vec<LedgerEvent>,
        code: &[u8],
        recipient: &Account,
    ) -> Step<()> {
        self.require_not_paused()?;
        let hash = hash_code(code);
        let voucher = self.vouchers.get(&hash).cloned().ok_or(Error::VoucherNotFound)?;
        if voucher.is_redeemed {
            return Err(Error::VoucherAlreadyRedeemed);
        }
        if voucher.is_expired_at(now) {
            return Err(Error::VoucherExpired);
        }

        let (payout, fee) =
            fees::redemption_split(voucher.token_value, self.config.redemption_fee_rate);
        if let Some(stored) = self.vouchers.get_mut(&hash) {
            stored.is_redeemed = true;
        }
        self.adjust_held(&voucher.issuer, &voucher.token, -voucher.token_value);
        self.counters.total_redeemed += 1;
        let stats = self.token_stats.entry(voucher.token.clone()).or_default();
        stats.vouchers_redeemed += 1;
        stats.value_redeemed += voucher.token_value;

        let ledger = self.ledger.clone();
        if payout > 0 {
            self.move_tokens(&voucher.token, &ledger, recipient, payout)?;
        }
        if fee > 0 {
            let treasury = self.config.treasury.clone();
            self.move_tokens(&voucher.token, &ledger, &treasury, fee)?;
        }

        events.push(LedgerEvent::Redeemed {
            voucher_hash: hash,
            token: voucher.token,
            recipient: recipient.clone(),
            token_value: voucher.token_value,
            fee,
        });
        Ok(())
    }

    fn reclaim(
        &mut self,
        now: u64,
        events: &mut Vec<LedgerEvent>,
        caller: &Account,
        code: &[u8],
    ) -> Step<()> {
        let hash = hash_code(code);
        let voucher = self.vouchers.get(&hash).cloned().ok_or(Error::VoucherNotFound)?;
        if &voucher.issuer != caller {
            return Err(Error::UnauthorizedMinter);
        }
        if voucher.is_redeemed {
            return Err(Error::VoucherAlreadyRedeemed);
        }
        if !voucher.is_expired_at(now) {
            return Err(Error::VoucherNotExpired);
        }

        if let Some(stored) = self.vouchers.get_mut(&hash) {
            stored.is_redeemed = true;
        }
        self.adjust_held(&voucher.issuer, &voucher.token, -voucher.token_value);
        self.counters.total_reclaimed += 1;
        let ledger = self.ledger.clone();
        self.move_tokens(&voucher.token, &ledger, caller, voucher.token_value)?;

        events.push(LedgerEvent::Reclaimed {
            voucher_hash: hash,
            token: voucher.token,
            issuer: caller.clone(),
            token_value: voucher.token_value,
        });
        Ok(())
    }

    fn administer(
        &mut self,
        now: u64,
        events: &mut Vec<LedgerEvent>,
        owner: &Account,
        action: &AdminAction,
    ) -> Step<()> {
        self.require_owner(owner)?;
        let topic = match action {
            AdminAction::AddSupportedToken(token) => {
                if !self.supported.insert(token.clone()) {
                    return Ok(());
                }
                "tok_add"
            }
            AdminAction::RemoveSupportedToken(token) => {
                if !self.supported.remove(token) {
                    return Ok(());
                }
                "tok_rm"
            }
            AdminAction::UpdateFees {
                minting_fee_rate,
                redemption_fee_rate,
            } => {
                if !fees::is_valid_fee_rate(*minting_fee_rate)
                    || !fees::is_valid_fee_rate(*redemption_fee_rate)
                {
                    return Err(Error::InvalidFee);
                }
                self.config.minting_fee_rate = *minting_fee_rate;
                self.config.redemption_fee_rate = *redemption_fee_rate;
                "fees"
            }
            AdminAction::UpdateTreasury(treasury) => {
                self.config.treasury = treasury.clone();
                "treasury"
            }
            AdminAction::RegisterAgent {
                agent,
                commission_rate,
            } => {
                if !fees::is_valid_commission_rate(*commission_rate) {
                    return Err(Error::InvalidFee);
                }
                let record = self.agents.entry(agent.clone()).or_default();
                record.commission_rate = *commission_rate;
                record.is_active = true;
                "agent"
            }
            AdminAction::SetAgentActive { agent, is_active } => {
                let record = self.agents.get_mut(agent).ok_or(Error::AgentNotActive)?;
                record.is_active = *is_active;
                "agent_st"
            }
            AdminAction::RecordSettlement(agent) => {
                let record = self.agents.get_mut(agent).ok_or(Error::AgentNotActive)?;
                record.last_settlement = now;
                "settled"
            }
            AdminAction::AddAuthorizedMinter(minter) => {
                if !self.minters.insert(minter.clone()) {
                    return Ok(());
                }
                "minter"
            }
            AdminAction::RemoveAuthorizedMinter(minter) => {
                if !self.minters.remove(minter) {
                    return Ok(());
                }
                "minter"
            }
            AdminAction::TransferOwnership(new_owner) => {
                self.config.owner = new_owner.clone();
                "owner"
            }
            AdminAction::Pause => {
                self.config.paused = true;
                "paused"
            }
            AdminAction::Unpause => {
                self.config.paused = false;
                "unpaused"
            }
        };
        events.push(LedgerEvent::Admin {
            topic: topic.to_string(),
        });
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn now(&self) -> u64 {
        self.now
    }

    fn ledger_address(&self) -> Account {
        self.state.ledger.clone()
    }

    fn create_account(&mut self) -> Account {
        self.next_account += 1;
        Account::new(ed25519::PublicKey(identity(ACCOUNT_KIND, self.next_account)).to_string())
    }

    fn voucher_status(&self, code: &[u8]) -> LedgerResult<VoucherRecord> {
        let record = match self.state.vouchers.get(&hash_code(code)) {
            Some(v) => VoucherRecord {
                exists: true,
                is_redeemed: v.is_redeemed,
                token: Some(v.token.clone()),
                token_value: v.token_value,
                issuer: Some(v.issuer.clone()),
                expiry_timestamp: v.expiry_timestamp,
            },
            None => VoucherRecord {
                exists: false,
                is_redeemed: false,
                token: None,
                token_value: 0,
                issuer: None,
                expiry_timestamp: 0,
            },
        };
        Ok(record)
    }

    fn agent_stats(&self, agent: &Account) -> LedgerResult<AgentStats> {
        require_valid(&[agent])?;
        Ok(self.state.agents.get(agent).cloned().unwrap_or_default())
    }

    fn contract_stats(&self) -> LedgerResult<ContractStats> {
        let counters = &self.state.counters;
        Ok(ContractStats {
            total_minted: counters.total_minted,
            total_redeemed: counters.total_redeemed,
            total_reclaimed: counters.total_reclaimed,
            minting_fee_rate: self.state.config.minting_fee_rate,
            redemption_fee_rate: self.state.config.redemption_fee_rate,
        })
    }

    fn config(&self) -> LedgerResult<ConfigSnapshot> {
        Ok(self.state.config.clone())
    }

    fn is_token_supported(&self, token: &Account) -> LedgerResult<bool> {
        require_valid(&[token])?;
        Ok(self.state.supported.contains(token))
    }

    fn is_authorized_minter(&self, address: &Account) -> LedgerResult<bool> {
        require_valid(&[address])?;
        Ok(self.state.minters.contains(address))
    }

    fn contract_token_balance(&self, token: &Account) -> LedgerResult<i128> {
        require_valid(&[token])?;
        Ok(self.state.token_held.get(token).copied().unwrap_or(0))
    }

    fn agent_token_balance(&self, agent: &Account, token: &Account) -> LedgerResult<i128> {
        require_valid(&[agent, token])?;
        Ok(self
            .state
            .agent_held
            .get(&(agent.clone(), token.clone()))
            .copied()
            .unwrap_or(0))
    }

    fn token_stats(&self, token: &Account) -> LedgerResult<TokenStats> {
        require_valid(&[token])?;
        Ok(self.state.token_stats.get(token).cloned().unwrap_or_default())
    }

    fn token_balance(&self, token: &Account, holder: &Account) -> LedgerResult<i128> {
        require_valid(&[token, holder])?;
        Ok(self.state.balance(token, holder))
    }

    fn allowance(&self, token: &Account, owner: &Account, spender: &Account) -> LedgerResult<i128> {
        require_valid(&[token, owner, spender])?;
        Ok(self.state.allowance(token, owner, spender))
    }

    fn approve(
        &mut self,
        owner: &Account,
        token: &Account,
        spender: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[token, owner, spender])?;
        let (_, events) = self.transact(|state, _, events| {
            if amount < 0 {
                return Err(Error::InvalidAmount);
            }
            state
                .allowances
                .insert((token.clone(), owner.clone(), spender.clone()), amount);
            events.push(LedgerEvent::Approval {
                token: token.clone(),
                owner: owner.clone(),
                spender: spender.clone(),
                amount,
            });
            Ok(())
        })?;
        Ok(events)
    }

    fn transfer(
        &mut self,
        from: &Account,
        token: &Account,
        to: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[token, from, to])?;
        let (_, events) = self.transact(|state, _, events| {
            state.move_tokens(token, from, to, amount)?;
            events.push(LedgerEvent::Transfer {
                token: token.clone(),
                from: from.clone(),
                to: to.clone(),
                amount,
            });
            Ok(())
        })?;
        Ok(events)
    }

    fn mint_voucher(
        &mut self,
        minter: &Account,
        voucher_hash: &[u8; 32],
        token: &Account,
        token_value: i128,
        expiry_days: u32,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[minter, token])?;
        let (_, events) = self.transact(|state, now, events| {
            state.require_not_paused()?;
            state.require_minter(minter)?;
            state.mint_one(now, events, minter, *voucher_hash, token, token_value, expiry_days)
        })?;
        Ok(events)
    }

    fn mint_voucher_batch(
        &mut self,
        minter: &Account,
        batch: &MintBatch,
    ) -> LedgerResult<(u32, Vec<LedgerEvent>)> {
        require_valid(&[minter])?;
        require_valid(&batch.tokens.iter().collect::<Vec<_>>())?;
        self.transact(|state, now, events| {
            state.require_not_paused()?;
            state.require_minter(minter)?;
            let len = match batch.uniform_len() {
                Some(len) if len > 0 && len <= MAX_BATCH_SIZE as usize => len,
                _ => return Err(Error::InvalidBatchSize),
            };
            for i in 0..len {
                state.mint_one(
                    now,
                    events,
                    minter,
                    batch.voucher_hashes[i],
                    &batch.tokens[i],
                    batch.token_values[i],
                    batch.expiry_days[i],
                )?;
            }
            Ok(len as u32)
        })
    }

    fn redeem_voucher(
        &mut self,
        code: &[u8],
        recipient: &Account,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[recipient])?;
        let (_, events) =
            self.transact(|state, now, events| state.redeem(now, events, code, recipient))?;
        Ok(events)
    }

    fn reclaim_expired_voucher(
        &mut self,
        caller: &Account,
        code: &[u8],
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[caller])?;
        let (_, events) =
            self.transact(|state, now, events| state.reclaim(now, events, caller, code))?;
        Ok(events)
    }

    fn administer(
        &mut self,
        owner: &Account,
        action: &AdminAction,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[owner])?;
        if let Some(target) = action.target() {
            require_valid(&[target])?;
        }
        let (_, events) =
            self.transact(|state, now, events| state.administer(now, events, owner, action))?;
        Ok(events)
    }
}

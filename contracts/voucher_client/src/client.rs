//! # Voucher client
//!
//! Typed front door to a [`Ledger`]. Every write blocks until the ledger
//! settles the call and is reported only through a [`Receipt`]; every ledger
//! rejection is mapped onto a [`crate::VoucherChainError`] category.
//!
//! Fee rates and the default expiry are read from a fresh configuration
//! snapshot whenever an operation depends on them.

use voucher_ledger::{fees, MAX_BATCH_SIZE, MAX_EXPIRY_DAYS};

use crate::code::{VoucherCode, DEFAULT_MIN_CODE_LENGTH};
use crate::error::{ClientError, InputError};
use crate::ledger::Ledger;
use crate::types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    Operation, Receipt, TokenStats, VoucherStatus,
};

pub struct VoucherClient<L: Ledger> {
    ledger: L,
    min_code_length: usize,
}

impl<L: Ledger> VoucherClient<L> {
    pub fn new(ledger: L) -> Self {
        VoucherClient {
            ledger,
            min_code_length: DEFAULT_MIN_CODE_LENGTH,
        }
    }

    /// Shortest code [`VoucherClient::mint`] accepts.
    pub fn with_min_code_length(mut self, min_code_length: usize) -> Self {
        self.min_code_length = min_code_length;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Provision a fresh ledger account, e.g. for a new wallet session.
    pub fn create_account(&mut self) -> Account {
        self.ledger.create_account()
    }

    fn receipt(&self, operation: Operation, events: Vec<LedgerEvent>) -> Receipt {
        Receipt {
            operation,
            settled_at: self.ledger.now(),
            events,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Vouchers
    // ─────────────────────────────────────────────────────────

    /// Look `code` up on the ledger. Expiry is judged against ledger time.
    pub fn check_voucher_status(
        &self,
        code: &VoucherCode,
    ) -> Result<VoucherStatus, ClientError> {
        let record = self.ledger.voucher_status(code.as_bytes())?;
        Ok(VoucherStatus::from_record(record, self.ledger.now()))
    }

    /// Redeem `code`, paying `recipient` the voucher value minus the fee.
    pub fn redeem(
        &mut self,
        code: &VoucherCode,
        recipient: &Account,
    ) -> Result<Receipt, ClientError> {
        let events = self.ledger.redeem_voucher(code.as_bytes(), recipient)?;
        Ok(self.receipt(Operation::Redeem, events))
    }

    /// Return an expired voucher's value to its issuer.
    pub fn reclaim(
        &mut self,
        issuer: &Account,
        code: &VoucherCode,
    ) -> Result<Receipt, ClientError> {
        let events = self.ledger.reclaim_expired_voucher(issuer, code.as_bytes())?;
        Ok(self.receipt(Operation::Reclaim, events))
    }

    /// Mint one voucher for `code`. Only the hash leaves the client.
    ///
    /// `expiry_days: None` takes the ledger's current default; `Some(0)`
    /// mints a voucher that never expires.
    pub fn mint(
        &mut self,
        signer: &Account,
        code: &VoucherCode,
        token: &Account,
        token_value: i128,
        expiry_days: Option<u32>,
    ) -> Result<Receipt, ClientError> {
        code.check_length(self.min_code_length)?;
        if token_value <= 0 {
            return Err(InputError::NonPositiveAmount.into());
        }
        let expiry_days = self.resolve_expiry(expiry_days)?;
        let events = self
            .ledger
            .mint_voucher(signer, &code.hash(), token, token_value, expiry_days)?;
        Ok(self.receipt(Operation::Mint, events))
    }

    /// Mint a whole batch or nothing.
    ///
    /// Obvious shape problems are caught locally; the ledger still performs
    /// the authoritative check.
    pub fn mint_batch(
        &mut self,
        signer: &Account,
        batch: &MintBatch,
    ) -> Result<Receipt, ClientError> {
        let len = batch.uniform_len().ok_or(InputError::BatchShape)?;
        if len == 0 || len > MAX_BATCH_SIZE as usize {
            return Err(InputError::BatchSize { max: MAX_BATCH_SIZE }.into());
        }
        let (_, events) = self.ledger.mint_voucher_batch(signer, batch)?;
        Ok(self.receipt(Operation::MintBatch, events))
    }

    /// Allow the ledger to pull up to `amount` of `token` from `signer`.
    /// Replaces any previous allowance; zero revokes it.
    pub fn approve_spending(
        &mut self,
        signer: &Account,
        token: &Account,
        amount: i128,
    ) -> Result<Receipt, ClientError> {
        if amount < 0 {
            return Err(InputError::NegativeAmount.into());
        }
        let spender = self.ledger.ledger_address();
        let events = self.ledger.approve(signer, token, &spender, amount)?;
        Ok(self.receipt(Operation::Approve, events))
    }

    /// What minting a voucher of `token_value` will debit: value plus the
    /// current minting fee.
    pub fn required_deposit(&self, token_value: i128) -> Result<i128, ClientError> {
        if token_value <= 0 {
            return Err(InputError::NonPositiveAmount.into());
        }
        let config = self.ledger.config()?;
        let (total, _) = fees::mint_charge(token_value, config.minting_fee_rate);
        Ok(total)
    }

    /// Plain token transfer signed by `from`.
    pub fn transfer(
        &mut self,
        from: &Account,
        token: &Account,
        to: &Account,
        amount: i128,
    ) -> Result<Receipt, ClientError> {
        if amount <= 0 {
            return Err(InputError::NonPositiveAmount.into());
        }
        let events = self.ledger.transfer(from, token, to, amount)?;
        Ok(self.receipt(Operation::Transfer, events))
    }

    fn resolve_expiry(&self, expiry_days: Option<u32>) -> Result<u32, ClientError> {
        let days = match expiry_days {
            Some(days) => days,
            None => self.ledger.config()?.default_expiry_days,
        };
        if days > MAX_EXPIRY_DAYS {
            return Err(InputError::ExpiryTooLong { max: MAX_EXPIRY_DAYS }.into());
        }
        Ok(days)
    }

    // ─────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────

    pub fn agent_stats(&self, agent: &Account) -> Result<AgentStats, ClientError> {
        Ok(self.ledger.agent_stats(agent)?)
    }

    pub fn contract_stats(&self) -> Result<ContractStats, ClientError> {
        Ok(self.ledger.contract_stats()?)
    }

    pub fn config(&self) -> Result<ConfigSnapshot, ClientError> {
        Ok(self.ledger.config()?)
    }

    pub fn is_token_supported(&self, token: &Account) -> Result<bool, ClientError> {
        Ok(self.ledger.is_token_supported(token)?)
    }

    pub fn is_authorized_minter(&self, address: &Account) -> Result<bool, ClientError> {
        Ok(self.ledger.is_authorized_minter(address)?)
    }

    pub fn contract_token_balance(&self, token: &Account) -> Result<i128, ClientError> {
        Ok(self.ledger.contract_token_balance(token)?)
    }

    pub fn agent_token_balance(
        &self,
        agent: &Account,
        token: &Account,
    ) -> Result<i128, ClientError> {
        Ok(self.ledger.agent_token_balance(agent, token)?)
    }

    pub fn token_stats(&self, token: &Account) -> Result<TokenStats, ClientError> {
        Ok(self.ledger.token_stats(token)?)
    }

    pub fn token_balance(&self, token: &Account, holder: &Account) -> Result<i128, ClientError> {
        Ok(self.ledger.token_balance(token, holder)?)
    }

    pub fn allowance(&self, token: &Account, owner: &Account) -> Result<i128, ClientError> {
        let spender = self.ledger.ledger_address();
        Ok(self.ledger.allowance(token, owner, &spender)?)
    }

    // ─────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────

    /// Submit an owner-only call on behalf of `owner`.
    pub fn administer(
        &mut self,
        owner: &Account,
        action: AdminAction,
    ) -> Result<Receipt, ClientError> {
        let events = self.ledger.administer(owner, &action)?;
        Ok(self.receipt(Operation::Admin, events))
    }

    pub fn add_supported_token(
        &mut self,
        owner: &Account,
        token: &Account,
    ) -> Result<Receipt, ClientError> {
        self.administer(owner, AdminAction::AddSupportedToken(token.clone()))
    }

    pub fn remove_supported_token(
        &mut self,
        owner: &Account,
        token: &Account,
    ) -> Result<Receipt, ClientError> {
        self.administer(owner, AdminAction::RemoveSupportedToken(token.clone()))
    }

    pub fn update_fees(
        &mut self,
        owner: &Account,
        minting_fee_rate: u32,
        redemption_fee_rate: u32,
    ) -> Result<Receipt, ClientError> {
        self.administer(
            owner,
            AdminAction::UpdateFees {
                minting_fee_rate,
                redemption_fee_rate,
            },
        )
    }

    pub fn register_agent(
        &mut self,
        owner: &Account,
        agent: &Account,
        commission_rate: u32,
    ) -> Result<Receipt, ClientError> {
        self.administer(
            owner,
            AdminAction::RegisterAgent {
                agent: agent.clone(),
                commission_rate,
            },
        )
    }

    pub fn add_authorized_minter(
        &mut self,
        owner: &Account,
        minter: &Account,
    ) -> Result<Receipt, ClientError> {
        self.administer(owner, AdminAction::AddAuthorizedMinter(minter.clone()))
    }
}

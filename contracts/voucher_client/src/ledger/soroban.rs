//! Ledger backend that runs the real `voucher_ledger` contract inside a
//! Soroban host.
//!
//! Calls go through the contract's generated client using its `try_` entry
//! points, so a rejected call comes back as the contract error instead of a
//! panic. Authorization is mocked: the host accepts whichever signer the
//! caller names, which leaves identity to the wallet layer.

use std::fmt::Debug;

use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events as _, Ledger as _},
    token, Address, Bytes, BytesN, Env, InvokeError, String as SorobanString, Symbol, TryFromVal,
    Val, Vec as SorobanVec,
};
use voucher_ledger::events::{VoucherMinted, VoucherReclaimed, VoucherRedeemed};
use voucher_ledger::{VoucherBatch, VoucherLedger, VoucherLedgerClient};

use super::{Ledger, LedgerFailure, LedgerResult, ADMIN_TOPICS};
use crate::types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    TokenStats, VoucherRecord,
};

/// Allowances granted through this backend stay live for ~30 days of ledgers.
const APPROVAL_LEDGERS: u32 = 30 * 17_280;

pub struct SorobanLedger {
    env: Env,
    contract_id: Address,
}

impl SorobanLedger {
    /// Register a fresh, uninitialised ledger contract in a new host.
    pub fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        let contract_id = env.register(VoucherLedger, ());
        SorobanLedger { env, contract_id }
    }

    /// Run the contract's one-time `init`.
    pub fn init(
        &mut self,
        owner: &Account,
        treasury: &Account,
        minting_fee_rate: u32,
        redemption_fee_rate: u32,
        default_expiry_days: u32,
    ) -> LedgerResult<()> {
        let owner = self.address(owner)?;
        let treasury = self.address(treasury)?;
        settle(self.client().try_init(
            &owner,
            &treasury,
            &minting_fee_rate,
            &redemption_fee_rate,
            &default_expiry_days,
        ))
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn set_time(&mut self, now: u64) {
        self.env.ledger().set_timestamp(now);
    }

    pub fn advance_time(&mut self, seconds: u64) {
        let now = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(now + seconds);
    }

    /// Deploy a Stellar asset contract to act as a voucher token.
    pub fn create_token(&mut self) -> Account {
        let admin = Address::generate(&self.env);
        let sac = self.env.register_stellar_asset_contract_v2(admin);
        self.account(&sac.address())
    }

    /// Mint `amount` of a token created with [`SorobanLedger::create_token`].
    pub fn fund(&mut self, token: &Account, to: &Account, amount: i128) -> LedgerResult<()> {
        let token = self.address(token)?;
        let to = self.address(to)?;
        let admin = token::StellarAssetClient::new(&self.env, &token);
        settle_token(admin.try_mint(&to, &amount))
    }

    fn client(&self) -> VoucherLedgerClient<'_> {
        VoucherLedgerClient::new(&self.env, &self.contract_id)
    }

    /// The host panics on a malformed strkey, so addresses are checked first.
    fn address(&self, account: &Account) -> LedgerResult<Address> {
        if !account.is_valid() {
            return Err(LedgerFailure::InvalidAddress(account.to_string()));
        }
        let strkey = SorobanString::from_str(&self.env, account.as_str());
        Ok(Address::from_string(&strkey))
    }

    fn account(&self, address: &Address) -> Account {
        let strkey = address.to_string();
        let mut buf = vec![0u8; strkey.len() as usize];
        strkey.copy_into_slice(&mut buf);
        Account::new(String::from_utf8_lossy(&buf).into_owned())
    }

    fn code(&self, code: &[u8]) -> Bytes {
        Bytes::from_slice(&self.env, code)
    }

    /// Invoke `call` and decode the ledger events it emitted.
    fn write<T>(
        &self,
        call: impl FnOnce(&VoucherLedgerClient<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<(T, Vec<LedgerEvent>)> {
        let out = call(&self.client())?;
        Ok((out, self.decode_events()))
    }

    /// Ledger events of the last top-level call. The host clears its event
    /// buffer at the start of every top-level invocation.
    fn decode_events(&self) -> Vec<LedgerEvent> {
        self.env
            .events()
            .all()
            .iter()
            .filter(|(contract, _, _)| *contract == self.contract_id)
            .filter_map(|(_, topics, data)| self.decode_event(&topics, &data))
            .collect()
    }

    fn decode_event(&self, topics: &SorobanVec<Val>, data: &Val) -> Option<LedgerEvent> {
        let topic = Symbol::try_from_val(&self.env, &topics.get(0)?).ok()?;
        if topic == symbol_short!("minted") {
            let e = VoucherMinted::try_from_val(&self.env, data).ok()?;
            return Some(LedgerEvent::Minted {
                voucher_hash: e.voucher_hash.to_array(),
                token: self.account(&e.token),
                token_value: e.token_value,
                issuer: self.account(&e.issuer),
                expiry_timestamp: e.expiry_timestamp,
            });
        }
        if topic == symbol_short!("redeemed") {
            let e = VoucherRedeemed::try_from_val(&self.env, data).ok()?;
            return Some(LedgerEvent::Redeemed {
                voucher_hash: e.voucher_hash.to_array(),
                token: self.account(&e.token),
                recipient: self.account(&e.recipient),
                token_value: e.token_value,
                fee: e.fee,
            });
        }
        if topic == symbol_short!("reclaimed") {
            let e = VoucherReclaimed::try_from_val(&self.env, data).ok()?;
            return Some(LedgerEvent::Reclaimed {
                voucher_hash: e.voucher_hash.to_array(),
                token: self.account(&e.token),
                issuer: self.account(&e.issuer),
                token_value: e.token_value,
            });
        }
        ADMIN_TOPICS
            .iter()
            .find(|name| topic == Symbol::new(&self.env, name))
            .map(|name| LedgerEvent::Admin {
                topic: name.to_string(),
            })
    }
}

impl Default for SorobanLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a generated `try_` result for a ledger call. A contract rejection
/// arrives as `Error(Contract, #N)`.
fn settle<T, C: Debug, E: Debug>(
    result: Result<Result<T, C>, Result<E, InvokeError>>,
) -> LedgerResult<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(conversion)) => Err(LedgerFailure::Transport(format!(
            "undecodable result: {conversion:?}"
        ))),
        Err(Ok(err)) => Err(LedgerFailure::Reverted(format!("{err:?}"))),
        Err(Err(InvokeError::Contract(code))) => {
            Err(LedgerFailure::Reverted(format!("Error(Contract, #{code})")))
        }
        Err(Err(InvokeError::Abort)) => {
            Err(LedgerFailure::Reverted("host aborted the call".into()))
        }
    }
}

/// Flatten a token contract result. Token error codes are not ledger error
/// codes, so every rejection is reported as a failed transfer.
fn settle_token<T, C: Debug, E: Debug>(
    result: Result<Result<T, C>, Result<E, InvokeError>>,
) -> LedgerResult<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(conversion)) => Err(LedgerFailure::Transport(format!(
            "undecodable result: {conversion:?}"
        ))),
        Err(err) => Err(LedgerFailure::Reverted(format!("TokenTransferFailed: {err:?}"))),
    }
}

impl Ledger for SorobanLedger {
    fn now(&self) -> u64 {
        self.env.ledger().timestamp()
    }

    fn ledger_address(&self) -> Account {
        self.account(&self.contract_id)
    }

    fn create_account(&mut self) -> Account {
        let address = Address::generate(&self.env);
        self.account(&address)
    }

    fn voucher_status(&self, code: &[u8]) -> LedgerResult<VoucherRecord> {
        let status = settle(self.client().try_get_voucher_status(&self.code(code)))?;
        Ok(VoucherRecord {
            exists: status.exists,
            is_redeemed: status.is_redeemed,
            token: status.token.as_ref().map(|t| self.account(t)),
            token_value: status.token_value,
            issuer: status.issuer.as_ref().map(|i| self.account(i)),
            expiry_timestamp: status.expiry_timestamp,
        })
    }

    fn agent_stats(&self, agent: &Account) -> LedgerResult<AgentStats> {
        let agent = settle(self.client().try_get_agent_stats(&self.address(agent)?))?;
        Ok(AgentStats {
            is_active: agent.is_active,
            commission_rate: agent.commission_rate,
            total_minted: agent.total_minted,
            total_value: agent.total_value,
            last_settlement: agent.last_settlement,
        })
    }

    fn contract_stats(&self) -> LedgerResult<ContractStats> {
        let stats = settle(self.client().try_get_contract_stats())?;
        Ok(ContractStats {
            total_minted: stats.total_minted,
            total_redeemed: stats.total_redeemed,
            total_reclaimed: stats.total_reclaimed,
            minting_fee_rate: stats.minting_fee_rate,
            redemption_fee_rate: stats.redemption_fee_rate,
        })
    }

    fn config(&self) -> LedgerResult<ConfigSnapshot> {
        let config = settle(self.client().try_get_config())?;
        Ok(ConfigSnapshot {
            owner: self.account(&config.owner),
            treasury: self.account(&config.treasury),
            minting_fee_rate: config.minting_fee_rate,
            redemption_fee_rate: config.redemption_fee_rate,
            default_expiry_days: config.default_expiry_days,
            paused: config.paused,
        })
    }

    fn is_token_supported(&self, token: &Account) -> LedgerResult<bool> {
        settle(self.client().try_is_token_supported(&self.address(token)?))
    }

    fn is_authorized_minter(&self, address: &Account) -> LedgerResult<bool> {
        settle(self.client().try_is_authorized_minter(&self.address(address)?))
    }

    fn contract_token_balance(&self, token: &Account) -> LedgerResult<i128> {
        settle(self.client().try_get_contract_token_balance(&self.address(token)?))
    }

    fn agent_token_balance(&self, agent: &Account, token: &Account) -> LedgerResult<i128> {
        let (agent, token) = (self.address(agent)?, self.address(token)?);
        settle(self.client().try_get_agent_token_balance(&agent, &token))
    }

    fn token_stats(&self, token: &Account) -> LedgerResult<TokenStats> {
        let stats = settle(self.client().try_get_token_stats(&self.address(token)?))?;
        Ok(TokenStats {
            vouchers_minted: stats.vouchers_minted,
            vouchers_redeemed: stats.vouchers_redeemed,
            value_redeemed: stats.value_redeemed,
        })
    }

    fn token_balance(&self, token: &Account, holder: &Account) -> LedgerResult<i128> {
        let client = token::Client::new(&self.env, &self.address(token)?);
        settle_token(client.try_balance(&self.address(holder)?))
    }

    fn allowance(&self, token: &Account, owner: &Account, spender: &Account) -> LedgerResult<i128> {
        let client = token::Client::new(&self.env, &self.address(token)?);
        settle_token(client.try_allowance(&self.address(owner)?, &self.address(spender)?))
    }

    fn approve(
        &mut self,
        owner: &Account,
        token: &Account,
        spender: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let client = token::Client::new(&self.env, &self.address(token)?);
        let (from, to) = (self.address(owner)?, self.address(spender)?);
        let live_until = self.env.ledger().sequence() + APPROVAL_LEDGERS;
        settle_token(client.try_approve(&from, &to, &amount, &live_until))?;
        Ok(vec![LedgerEvent::Approval {
            token: token.clone(),
            owner: owner.clone(),
            spender: spender.clone(),
            amount,
        }])
    }

    fn transfer(
        &mut self,
        from: &Account,
        token: &Account,
        to: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let client = token::Client::new(&self.env, &self.address(token)?);
        settle_token(client.try_transfer(&self.address(from)?, &self.address(to)?, &amount))?;
        Ok(vec![LedgerEvent::Transfer {
            token: token.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        }])
    }

    fn mint_voucher(
        &mut self,
        minter: &Account,
        voucher_hash: &[u8; 32],
        token: &Account,
        token_value: i128,
        expiry_days: u32,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let minter = self.address(minter)?;
        let hash = BytesN::from_array(&self.env, voucher_hash);
        let token = self.address(token)?;
        let (_, events) = self.write(|client| {
            settle(client.try_mint_voucher(&minter, &hash, &token, &token_value, &expiry_days))
        })?;
        Ok(events)
    }

    fn mint_voucher_batch(
        &mut self,
        minter: &Account,
        batch: &MintBatch,
    ) -> LedgerResult<(u32, Vec<LedgerEvent>)> {
        let minter = self.address(minter)?;
        let mut voucher_hashes = SorobanVec::new(&self.env);
        for hash in &batch.voucher_hashes {
            voucher_hashes.push_back(BytesN::from_array(&self.env, hash));
        }
        let mut tokens = SorobanVec::new(&self.env);
        for token in &batch.tokens {
            tokens.push_back(self.address(token)?);
        }
        let mut token_values = SorobanVec::new(&self.env);
        for value in &batch.token_values {
            token_values.push_back(*value);
        }
        let mut expiry_days = SorobanVec::new(&self.env);
        for days in &batch.expiry_days {
            expiry_days.push_back(*days);
        }
        let batch = VoucherBatch {
            voucher_hashes,
            tokens,
            token_values,
            expiry_days,
        };
        self.write(|client| settle(client.try_mint_voucher_batch(&minter, &batch)))
    }

    fn redeem_voucher(
        &mut self,
        code: &[u8],
        recipient: &Account,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let code = self.code(code);
        let recipient = self.address(recipient)?;
        let (_, events) =
            self.write(|client| settle(client.try_redeem_voucher(&code, &recipient)))?;
        Ok(events)
    }

    fn reclaim_expired_voucher(
        &mut self,
        caller: &Account,
        code: &[u8],
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let caller = self.address(caller)?;
        let code = self.code(code);
        let (_, events) =
            self.write(|client| settle(client.try_reclaim_expired_voucher(&caller, &code)))?;
        Ok(events)
    }

    fn administer(
        &mut self,
        owner: &Account,
        action: &AdminAction,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let owner = self.address(owner)?;
        let (_, events) = self.write(|client| match action {
            AdminAction::AddSupportedToken(token) => {
                settle(client.try_add_supported_token(&owner, &self.address(token)?))
            }
            AdminAction::RemoveSupportedToken(token) => {
                settle(client.try_remove_supported_token(&owner, &self.address(token)?))
            }
            AdminAction::UpdateFees {
                minting_fee_rate,
                redemption_fee_rate,
            } => settle(client.try_update_fees(&owner, minting_fee_rate, redemption_fee_rate)),
            AdminAction::UpdateTreasury(treasury) => {
                settle(client.try_update_treasury(&owner, &self.address(treasury)?))
            }
            AdminAction::RegisterAgent {
                agent,
                commission_rate,
            } => settle(client.try_register_agent(&owner, &self.address(agent)?, commission_rate)),
            AdminAction::SetAgentActive { agent, is_active } => {
                settle(client.try_set_agent_active(&owner, &self.address(agent)?, is_active))
            }
            AdminAction::RecordSettlement(agent) => {
                settle(client.try_record_settlement(&owner, &self.address(agent)?))
            }
            AdminAction::AddAuthorizedMinter(minter) => {
                settle(client.try_add_authorized_minter(&owner, &self.address(minter)?))
            }
            AdminAction::RemoveAuthorizedMinter(minter) => {
                settle(client.try_remove_authorized_minter(&owner, &self.address(minter)?))
            }
            AdminAction::TransferOwnership(new_owner) => {
                settle(client.try_transfer_ownership(&owner, &self.address(new_owner)?))
            }
            AdminAction::Pause => settle(client.try_pause(&owner)),
            AdminAction::Unpause => settle(client.try_unpause(&owner)),
        })?;
        Ok(events)
    }
}

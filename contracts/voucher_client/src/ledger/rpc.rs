//! Ledger backend for a deployed `voucher_ledger` contract, reached through a
//! Soroban JSON-RPC server.
//!
//! Reads are simulated and never submitted. A write runs the full cycle and
//! returns only once the network settled it:
//!
//! ```text
//! getLedgerEntries(source) ─► simulateTransaction ─► sign ─► sendTransaction ─► getTransaction*
//! ```
//!
//! The HTTP carrier belongs to the embedding application and plugs in as an
//! [`RpcTransport`]. Signing keys live in a [`Keyring`]; the signer of a
//! write is also its transaction source, so the simulated authorization
//! entries need no separate signatures.

use std::cell::Cell;
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use stellar_strkey::{ed25519, Strkey};
use stellar_xdr::curr::{
    AccountId, ContractEvent, ContractEventBody, ContractEventType, DecoratedSignature, Hash,
    HostFunction, InvokeContractArgs, InvokeHostFunctionOp, LedgerEntryData, LedgerKey,
    LedgerKeyAccount, Limits, Memo, MuxedAccount, Operation, OperationBody, Preconditions,
    PublicKey, ReadXdr, ScAddress, ScSymbol, ScVal, SequenceNumber, Signature, SignatureHint,
    SorobanAuthorizationEntry, SorobanCredentials, SorobanTransactionData, Transaction,
    TransactionEnvelope, TransactionExt, TransactionMeta, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, Uint256, VecM, WriteXdr,
};
use zeroize::Zeroizing;

use super::scval::{self, Fields};
use super::{require_valid, Ledger, LedgerFailure, LedgerResult, ADMIN_TOPICS};
use crate::config::{ClientConfig, ConfigError};
use crate::error::InputError;
use crate::types::{
    Account, AdminAction, AgentStats, ConfigSnapshot, ContractStats, LedgerEvent, MintBatch,
    TokenStats, VoucherRecord,
};

/// Allowances granted through this backend stay live for ~30 days of ledgers.
const APPROVAL_LEDGERS: u32 = 30 * 17_280;

/// Source of simulated reads. Simulation never checks its sequence number or
/// signature.
const SIMULATION_SOURCE: [u8; 32] = [0; 32];

/// Carries one JSON-RPC request to the server and brings back its response.
pub trait RpcTransport {
    /// POST `body` to `endpoint` and return the decoded JSON response body.
    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcOptions {
    /// Inclusion fee in stroops, added to the simulated resource fee.
    pub base_fee: u32,
    pub poll_interval: Duration,
    /// `getTransaction` calls before a submitted write counts as lost.
    pub poll_attempts: u32,
}

impl Default for RpcOptions {
    fn default() -> Self {
        RpcOptions {
            base_fee: 100,
            poll_interval: Duration::from_secs(1),
            poll_attempts: 30,
        }
    }
}

/// Ed25519 signing keys by account. Keys are wiped on drop.
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<Account, SigningKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and return the account it signs for.
    pub fn insert(&mut self, key: SigningKey) -> Account {
        let account = Account::new(ed25519::PublicKey(key.verifying_key().to_bytes()).to_string());
        self.keys.insert(account.clone(), key);
        account
    }

    /// Import an `S...` secret seed.
    pub fn import_secret(&mut self, secret: &str) -> Result<Account, InputError> {
        match Strkey::from_string(secret.trim()) {
            Ok(Strkey::PrivateKeyEd25519(ed25519::PrivateKey(seed))) => {
                let seed = Zeroizing::new(seed);
                Ok(self.insert(SigningKey::from_bytes(&seed)))
            }
            _ => Err(InputError::InvalidSecret),
        }
    }

    /// Create a fresh random key.
    pub fn generate(&mut self) -> Account {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut seed[..]);
        self.insert(SigningKey::from_bytes(&seed))
    }

    pub fn contains(&self, account: &Account) -> bool {
        self.keys.contains_key(account)
    }

    fn get(&self, account: &Account) -> LedgerResult<&SigningKey> {
        self.keys
            .get(account)
            .ok_or_else(|| LedgerFailure::Transport(format!("no signing key for {account}")))
    }
}

// ── Wire shapes ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Simulation {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    transaction_data: Option<String>,
    #[serde(default)]
    min_resource_fee: Option<String>,
    #[serde(default)]
    results: Vec<SimulationResult>,
}

#[derive(Debug, Deserialize)]
struct SimulationResult {
    #[serde(default)]
    auth: Vec<String>,
    xdr: String,
}

#[derive(Debug, Deserialize)]
struct LedgerEntries {
    #[serde(default)]
    entries: Vec<LedgerEntryResult>,
}

#[derive(Debug, Deserialize)]
struct LedgerEntryResult {
    xdr: String,
}

#[derive(Debug, Deserialize)]
struct LatestLedger {
    sequence: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Submission {
    status: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    error_result_xdr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionStatus {
    status: String,
    #[serde(default)]
    result_meta_xdr: Option<String>,
}

/// One contract invocation, before it is wrapped in a transaction.
struct Call {
    contract: [u8; 32],
    function: &'static str,
    args: Vec<ScVal>,
}

fn xdr_failure(err: impl std::fmt::Display) -> LedgerFailure {
    LedgerFailure::Transport(format!("xdr: {err}"))
}

pub struct RpcLedger<T: RpcTransport> {
    transport: T,
    endpoint: String,
    contract: Account,
    contract_hash: [u8; 32],
    network_id: [u8; 32],
    keys: Keyring,
    options: RpcOptions,
    next_id: Cell<u64>,
}

impl<T: RpcTransport> RpcLedger<T> {
    /// Bind to the contract, server and network named in `config`.
    pub fn new(config: &ClientConfig, transport: T, keys: Keyring) -> Result<Self, ConfigError> {
        let contract_hash = match Strkey::from_string(config.contract_id.trim()) {
            Ok(Strkey::Contract(stellar_strkey::Contract(hash))) => hash,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "contract_id `{}` is not a contract address",
                    config.contract_id
                )))
            }
        };
        Ok(RpcLedger {
            transport,
            endpoint: config.rpc_url.clone(),
            contract: Account::new(config.contract_id.trim()),
            contract_hash,
            network_id: Sha256::digest(config.network_passphrase.as_bytes()).into(),
            keys,
            options: RpcOptions::default(),
            next_id: Cell::new(1),
        })
    }

    pub fn with_options(mut self, options: RpcOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn keys(&self) -> &Keyring {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut Keyring {
        &mut self.keys
    }

    // ── JSON-RPC ────────────────────────────────────────────

    fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> LedgerResult<R> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let mut response = self
            .transport
            .post(&self.endpoint, &body)
            .map_err(|err| LedgerFailure::Transport(format!("{method}: {err}")))?;
        if let Some(error) = response.get("error") {
            return Err(LedgerFailure::Transport(format!("{method}: {error}")));
        }
        let result = response
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| LedgerFailure::Transport(format!("{method}: response has no result")))?;
        serde_json::from_value(result)
            .map_err(|err| LedgerFailure::Transport(format!("{method}: {err}")))
    }

    fn latest_sequence(&self) -> LedgerResult<u32> {
        let latest: LatestLedger = self.request("getLatestLedger", json!({}))?;
        Ok(latest.sequence)
    }

    fn account_sequence(&self, account: [u8; 32]) -> LedgerResult<i64> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(account))),
        });
        let key = key.to_xdr_base64(Limits::none()).map_err(xdr_failure)?;
        let found: LedgerEntries = self.request("getLedgerEntries", json!({ "keys": [key] }))?;
        let entry = found.entries.first().ok_or_else(|| {
            let strkey = ed25519::PublicKey(account).to_string();
            LedgerFailure::Transport(format!("source account {strkey} does not exist"))
        })?;
        match LedgerEntryData::from_xdr_base64(&entry.xdr, Limits::none()).map_err(xdr_failure)? {
            LedgerEntryData::Account(account) => Ok(account.seq_num.0),
            other => Err(xdr_failure(format!("expected account entry, got {}", other.name()))),
        }
    }

    // ── Transactions ────────────────────────────────────────

    fn transaction(
        &self,
        source: [u8; 32],
        seq_num: i64,
        call: &Call,
        auth: Vec<SorobanAuthorizationEntry>,
    ) -> LedgerResult<Transaction> {
        let function = call.function.try_into().map_err(xdr_failure)?;
        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(InvokeContractArgs {
                    contract_address: ScAddress::Contract(Hash(call.contract)),
                    function_name: ScSymbol(function),
                    args: call.args.clone().try_into().map_err(xdr_failure)?,
                }),
                auth: auth.try_into().map_err(xdr_failure)?,
            }),
        };
        Ok(Transaction {
            source_account: MuxedAccount::Ed25519(Uint256(source)),
            fee: self.options.base_fee,
            seq_num: SequenceNumber(seq_num),
            cond: Preconditions::None,
            memo: Memo::None,
            operations: vec![operation].try_into().map_err(xdr_failure)?,
            ext: TransactionExt::V0,
        })
    }

    fn simulate(&self, tx: &Transaction) -> LedgerResult<Simulation> {
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: tx.clone(),
            signatures: VecM::default(),
        });
        let envelope = envelope.to_xdr_base64(Limits::none()).map_err(xdr_failure)?;
        let simulation: Simulation =
            self.request("simulateTransaction", json!({ "transaction": envelope }))?;
        match simulation.error {
            Some(reason) => Err(LedgerFailure::Reverted(reason)),
            None => Ok(simulation),
        }
    }

    /// Hash the network signs for `tx`; its hex form is the transaction id.
    fn transaction_hash(&self, tx: &Transaction) -> LedgerResult<[u8; 32]> {
        let payload = TransactionSignaturePayload {
            network_id: Hash(self.network_id),
            tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
        };
        let payload = payload.to_xdr(Limits::none()).map_err(xdr_failure)?;
        Ok(Sha256::digest(payload).into())
    }

    fn sign(
        &self,
        tx: Transaction,
        key: &SigningKey,
    ) -> LedgerResult<(TransactionEnvelope, String)> {
        let hash = self.transaction_hash(&tx)?;
        let public = key.verifying_key().to_bytes();
        let signature = key.sign(&hash).to_bytes();
        let decorated = DecoratedSignature {
            hint: SignatureHint([public[28], public[29], public[30], public[31]]),
            signature: Signature(signature.to_vec().try_into().map_err(xdr_failure)?),
        };
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: vec![decorated].try_into().map_err(xdr_failure)?,
        });
        Ok((envelope, hex::encode(hash)))
    }

    /// Evaluate a read-only call.
    fn read(&self, call: Call) -> LedgerResult<ScVal> {
        let tx = self.transaction(SIMULATION_SOURCE, 1, &call, Vec::new())?;
        let simulation = self.simulate(&tx)?;
        let result = simulation
            .results
            .first()
            .ok_or_else(|| LedgerFailure::Transport("simulation returned no result".into()))?;
        ScVal::from_xdr_base64(&result.xdr, Limits::none()).map_err(xdr_failure)
    }

    /// Simulate, sign, submit and wait for `call`; returns its value and the
    /// events it emitted.
    fn submit(&self, signer: &Account, call: Call) -> LedgerResult<(ScVal, Vec<ContractEvent>)> {
        let key = self.keys.get(signer)?;
        let source = key.verifying_key().to_bytes();
        let seq_num = self.account_sequence(source)? + 1;

        let draft = self.transaction(source, seq_num, &call, Vec::new())?;
        let simulation = self.simulate(&draft)?;
        let auth = match simulation.results.first() {
            Some(result) => result
                .auth
                .iter()
                .map(|entry| SorobanAuthorizationEntry::from_xdr_base64(entry, Limits::none()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(xdr_failure)?,
            None => Vec::new(),
        };
        if auth
            .iter()
            .any(|entry| !matches!(entry.credentials, SorobanCredentials::SourceAccount))
        {
            return Err(LedgerFailure::Transport(format!(
                "{} needs authorization from an account other than {signer}",
                call.function
            )));
        }
        let data = simulation
            .transaction_data
            .as_deref()
            .ok_or_else(|| LedgerFailure::Transport("simulation returned no footprint".into()))?;
        let data =
            SorobanTransactionData::from_xdr_base64(data, Limits::none()).map_err(xdr_failure)?;
        let resource_fee: u32 = simulation
            .min_resource_fee
            .as_deref()
            .unwrap_or("0")
            .parse()
            .map_err(|err| LedgerFailure::Transport(format!("minResourceFee: {err}")))?;

        let mut tx = self.transaction(source, seq_num, &call, auth)?;
        tx.fee = tx.fee.saturating_add(resource_fee);
        tx.ext = TransactionExt::V1(data);

        let (envelope, hash) = self.sign(tx, key)?;
        self.send(&envelope, &hash)?;
        self.settle(&hash)
    }

    fn send(&self, envelope: &TransactionEnvelope, hash: &str) -> LedgerResult<()> {
        let envelope = envelope.to_xdr_base64(Limits::none()).map_err(xdr_failure)?;
        let submission: Submission =
            self.request("sendTransaction", json!({ "transaction": envelope }))?;
        if let Some(reported) = &submission.hash {
            if !reported.eq_ignore_ascii_case(hash) {
                return Err(LedgerFailure::Transport(format!(
                    "server reported transaction {reported}, expected {hash}"
                )));
            }
        }
        match submission.status.as_str() {
            "PENDING" | "DUPLICATE" => Ok(()),
            "TRY_AGAIN_LATER" => {
                Err(LedgerFailure::Transport("server busy, try again later".into()))
            }
            status => Err(LedgerFailure::Reverted(format!(
                "transaction {hash} refused ({status}): {}",
                submission.error_result_xdr.unwrap_or_default()
            ))),
        }
    }

    fn settle(&self, hash: &str) -> LedgerResult<(ScVal, Vec<ContractEvent>)> {
        for attempt in 0..self.options.poll_attempts {
            if attempt > 0 {
                thread::sleep(self.options.poll_interval);
            }
            let status: TransactionStatus =
                self.request("getTransaction", json!({ "hash": hash }))?;
            match status.status.as_str() {
                "SUCCESS" => {
                    let meta = status.result_meta_xdr.ok_or_else(|| {
                        LedgerFailure::Transport(format!("transaction {hash} has no result meta"))
                    })?;
                    return outcome(&meta);
                }
                "FAILED" => {
                    return Err(LedgerFailure::Reverted(format!("transaction {hash} failed")))
                }
                _ => {}
            }
        }
        Err(LedgerFailure::Transport(format!(
            "transaction {hash} not settled after {} polls",
            self.options.poll_attempts
        )))
    }

    // ── Calls ───────────────────────────────────────────────

    fn ledger_call(&self, function: &'static str, args: Vec<ScVal>) -> Call {
        Call {
            contract: self.contract_hash,
            function,
            args,
        }
    }

    fn token_call(
        &self,
        token: &Account,
        function: &'static str,
        args: Vec<ScVal>,
    ) -> LedgerResult<Call> {
        match scval::sc_address(token)? {
            ScAddress::Contract(Hash(contract)) => Ok(Call {
                contract,
                function,
                args,
            }),
            ScAddress::Account(_) => Err(LedgerFailure::InvalidAddress(token.to_string())),
        }
    }

    /// Submit a voucher ledger call and decode its events.
    fn write(&self, signer: &Account, call: Call) -> LedgerResult<(ScVal, Vec<LedgerEvent>)> {
        require_valid(&[signer])?;
        let (value, events) = self.submit(signer, call)?;
        let events = events
            .iter()
            .filter(|event| event.contract_id == Some(Hash(self.contract_hash)))
            .filter(|event| event.type_ == ContractEventType::Contract)
            .filter_map(decode_event)
            .collect();
        Ok((value, events))
    }

    /// Token contract failures carry the token's own error codes.
    fn write_token(&self, signer: &Account, call: Call) -> LedgerResult<()> {
        require_valid(&[signer])?;
        match self.submit(signer, call) {
            Ok(_) => Ok(()),
            Err(LedgerFailure::Reverted(reason)) => {
                Err(LedgerFailure::Reverted(format!("TokenTransferFailed: {reason}")))
            }
            Err(other) => Err(other),
        }
    }
}

fn outcome(meta: &str) -> LedgerResult<(ScVal, Vec<ContractEvent>)> {
    match TransactionMeta::from_xdr_base64(meta, Limits::none()).map_err(xdr_failure)? {
        TransactionMeta::V3(meta) => match meta.soroban_meta {
            Some(soroban) => Ok((soroban.return_value, soroban.events.to_vec())),
            None => Err(xdr_failure("result meta carries no contract outcome")),
        },
        other => Err(xdr_failure(format!("unsupported result meta {}", other.name()))),
    }
}

fn decode_event(event: &ContractEvent) -> Option<LedgerEvent> {
    let ContractEventBody::V0(body) = &event.body;
    let topic = scval::symbol_name(body.topics.first()?)?;
    let data = Fields::of(&body.data);
    let decoded = match topic.as_str() {
        "minted" => {
            let e = data.ok()?;
            LedgerEvent::Minted {
                voucher_hash: e.hash("voucher_hash").ok()?,
                token: e.account("token").ok()?,
                token_value: e.i128("token_value").ok()?,
                issuer: e.account("issuer").ok()?,
                expiry_timestamp: e.u64("expiry_timestamp").ok()?,
            }
        }
        "redeemed" => {
            let e = data.ok()?;
            LedgerEvent::Redeemed {
                voucher_hash: e.hash("voucher_hash").ok()?,
                token: e.account("token").ok()?,
                recipient: e.account("recipient").ok()?,
                token_value: e.i128("token_value").ok()?,
                fee: e.i128("fee").ok()?,
            }
        }
        "reclaimed" => {
            let e = data.ok()?;
            LedgerEvent::Reclaimed {
                voucher_hash: e.hash("voucher_hash").ok()?,
                token: e.account("token").ok()?,
                issuer: e.account("issuer").ok()?,
                token_value: e.i128("token_value").ok()?,
            }
        }
        other => {
            let topic = ADMIN_TOPICS.iter().find(|name| **name == other)?;
            LedgerEvent::Admin {
                topic: topic.to_string(),
            }
        }
    };
    Some(decoded)
}

fn voucher_record(val: &ScVal) -> LedgerResult<VoucherRecord> {
    let f = Fields::of(val)?;
    Ok(VoucherRecord {
        exists: f.bool("exists")?,
        is_redeemed: f.bool("is_redeemed")?,
        token: f.optional_account("token")?,
        token_value: f.i128("token_value")?,
        issuer: f.optional_account("issuer")?,
        expiry_timestamp: f.u64("expiry_timestamp")?,
    })
}

impl<T: RpcTransport> Ledger for RpcLedger<T> {
    /// Wall-clock time. Network ledgers close every few seconds, so this
    /// tracks ledger time closely.
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }

    fn ledger_address(&self) -> Account {
        self.contract.clone()
    }

    /// A fresh local key. The account only exists on the network once
    /// someone funds it.
    fn create_account(&mut self) -> Account {
        self.keys.generate()
    }

    fn voucher_status(&self, code: &[u8]) -> LedgerResult<VoucherRecord> {
        let val = self.read(self.ledger_call("get_voucher_status", vec![scval::bytes(code)?]))?;
        voucher_record(&val)
    }

    fn agent_stats(&self, agent: &Account) -> LedgerResult<AgentStats> {
        let val = self.read(self.ledger_call("get_agent_stats", vec![scval::address(agent)?]))?;
        let f = Fields::of(&val)?;
        Ok(AgentStats {
            is_active: f.bool("is_active")?,
            commission_rate: f.u32("commission_rate")?,
            total_minted: f.u64("total_minted")?,
            total_value: f.i128("total_value")?,
            last_settlement: f.u64("last_settlement")?,
        })
    }

    fn contract_stats(&self) -> LedgerResult<ContractStats> {
        let val = self.read(self.ledger_call("get_contract_stats", Vec::new()))?;
        let f = Fields::of(&val)?;
        Ok(ContractStats {
            total_minted: f.u64("total_minted")?,
            total_redeemed: f.u64("total_redeemed")?,
            total_reclaimed: f.u64("total_reclaimed")?,
            minting_fee_rate: f.u32("minting_fee_rate")?,
            redemption_fee_rate: f.u32("redemption_fee_rate")?,
        })
    }

    fn config(&self) -> LedgerResult<ConfigSnapshot> {
        let val = self.read(self.ledger_call("get_config", Vec::new()))?;
        let f = Fields::of(&val)?;
        Ok(ConfigSnapshot {
            owner: f.account("owner")?,
            treasury: f.account("treasury")?,
            minting_fee_rate: f.u32("minting_fee_rate")?,
            redemption_fee_rate: f.u32("redemption_fee_rate")?,
            default_expiry_days: f.u32("default_expiry_days")?,
            paused: f.bool("paused")?,
        })
    }

    fn is_token_supported(&self, token: &Account) -> LedgerResult<bool> {
        let args = vec![scval::address(token)?];
        scval::as_bool(&self.read(self.ledger_call("is_token_supported", args))?)
    }

    fn is_authorized_minter(&self, address: &Account) -> LedgerResult<bool> {
        let args = vec![scval::address(address)?];
        scval::as_bool(&self.read(self.ledger_call("is_authorized_minter", args))?)
    }

    fn contract_token_balance(&self, token: &Account) -> LedgerResult<i128> {
        let args = vec![scval::address(token)?];
        scval::as_i128(&self.read(self.ledger_call("get_contract_token_balance", args))?)
    }

    fn agent_token_balance(&self, agent: &Account, token: &Account) -> LedgerResult<i128> {
        let args = vec![scval::address(agent)?, scval::address(token)?];
        scval::as_i128(&self.read(self.ledger_call("get_agent_token_balance", args))?)
    }

    fn token_stats(&self, token: &Account) -> LedgerResult<TokenStats> {
        let val = self.read(self.ledger_call("get_token_stats", vec![scval::address(token)?]))?;
        let f = Fields::of(&val)?;
        Ok(TokenStats {
            vouchers_minted: f.u64("vouchers_minted")?,
            vouchers_redeemed: f.u64("vouchers_redeemed")?,
            value_redeemed: f.i128("value_redeemed")?,
        })
    }

    fn token_balance(&self, token: &Account, holder: &Account) -> LedgerResult<i128> {
        let call = self.token_call(token, "balance", vec![scval::address(holder)?])?;
        scval::as_i128(&self.read(call)?)
    }

    fn allowance(&self, token: &Account, owner: &Account, spender: &Account) -> LedgerResult<i128> {
        let args = vec![scval::address(owner)?, scval::address(spender)?];
        scval::as_i128(&self.read(self.token_call(token, "allowance", args)?)?)
    }

    fn approve(
        &mut self,
        owner: &Account,
        token: &Account,
        spender: &Account,
        amount: i128,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        require_valid(&[owner, token, spender])?;
        let live_until = self.latest_sequence()?.saturating_add(APPROVAL_LEDGERS);
        let args = vec![
            scval::address(owner)?,
            scval::address(spender)?,
            scval::i128(amount),
            ScVal::U32(live_until),
        ];
        self.write_token(owner, self.token_call(token, "approve", args)?)?;
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
        let args = vec![scval::address(from)?, scval::address(to)?, scval::i128(amount)];
        self.write_token(from, self.token_call(token, "transfer", args)?)?;
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
        let args = vec![
            scval::address(minter)?,
            scval::bytes(voucher_hash)?,
            scval::address(token)?,
            scval::i128(token_value),
            ScVal::U32(expiry_days),
        ];
        let (_, events) = self.write(minter, self.ledger_call("mint_voucher", args))?;
        Ok(events)
    }

    fn mint_voucher_batch(
        &mut self,
        minter: &Account,
        batch: &MintBatch,
    ) -> LedgerResult<(u32, Vec<LedgerEvent>)> {
        let hashes = batch
            .voucher_hashes
            .iter()
            .map(|hash| scval::bytes(hash))
            .collect::<LedgerResult<Vec<_>>>()?;
        let tokens = batch
            .tokens
            .iter()
            .map(scval::address)
            .collect::<LedgerResult<Vec<_>>>()?;
        let values = batch.token_values.iter().map(|v| scval::i128(*v)).collect();
        let days = batch.expiry_days.iter().map(|d| ScVal::U32(*d)).collect();
        let batch = scval::record(vec![
            ("voucher_hashes", scval::vec(hashes)?),
            ("tokens", scval::vec(tokens)?),
            ("token_values", scval::vec(values)?),
            ("expiry_days", scval::vec(days)?),
        ])?;
        let args = vec![scval::address(minter)?, batch];
        let (minted, events) = self.write(minter, self.ledger_call("mint_voucher_batch", args))?;
        Ok((scval::as_u32(&minted)?, events))
    }

    fn redeem_voucher(
        &mut self,
        code: &[u8],
        recipient: &Account,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let args = vec![scval::bytes(code)?, scval::address(recipient)?];
        let (_, events) = self.write(recipient, self.ledger_call("redeem_voucher", args))?;
        Ok(events)
    }

    fn reclaim_expired_voucher(
        &mut self,
        caller: &Account,
        code: &[u8],
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let args = vec![scval::address(caller)?, scval::bytes(code)?];
        let (_, events) = self.write(caller, self.ledger_call("reclaim_expired_voucher", args))?;
        Ok(events)
    }

    fn administer(
        &mut self,
        owner: &Account,
        action: &AdminAction,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        let by = scval::address(owner)?;
        let (function, args) = match action {
            AdminAction::AddSupportedToken(token) => {
                ("add_supported_token", vec![by, scval::address(token)?])
            }
            AdminAction::RemoveSupportedToken(token) => {
                ("remove_supported_token", vec![by, scval::address(token)?])
            }
            AdminAction::UpdateFees {
                minting_fee_rate,
                redemption_fee_rate,
            } => (
                "update_fees",
                vec![by, ScVal::U32(*minting_fee_rate), ScVal::U32(*redemption_fee_rate)],
            ),
            AdminAction::UpdateTreasury(treasury) => {
                ("update_treasury", vec![by, scval::address(treasury)?])
            }
            AdminAction::RegisterAgent {
                agent,
                commission_rate,
            } => (
                "register_agent",
                vec![by, scval::address(agent)?, ScVal::U32(*commission_rate)],
            ),
            AdminAction::SetAgentActive { agent, is_active } => (
                "set_agent_active",
                vec![by, scval::address(agent)?, ScVal::Bool(*is_active)],
            ),
            AdminAction::RecordSettlement(agent) => {
                ("record_settlement", vec![by, scval::address(agent)?])
            }
            AdminAction::AddAuthorizedMinter(minter) => {
                ("add_authorized_minter", vec![by, scval::address(minter)?])
            }
            AdminAction::RemoveAuthorizedMinter(minter) => {
                ("remove_authorized_minter", vec![by, scval::address(minter)?])
            }
            AdminAction::TransferOwnership(new_owner) => {
                ("transfer_ownership", vec![by, scval::address(new_owner)?])
            }
            AdminAction::Pause => ("pause", vec![by]),
            AdminAction::Unpause => ("unpause", vec![by]),
        };
        let (_, events) = self.write(owner, self.ledger_call(function, args))?;
        Ok(events)
    }
}

//! # Types
//!
//! Strongly typed records the client hands to callers. Ledger backends map
//! whatever shape the ledger returns into these at the boundary; nothing
//! untyped travels further.

use std::fmt;

use serde::{Deserialize, Serialize};
use stellar_strkey::Strkey;

use crate::error::InputError;

/// A ledger address: an account, a token contract or the ledger itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(String);

impl Account {
    pub fn new(address: impl Into<String>) -> Self {
        Account(address.into())
    }

    /// Accept an account (`G...`) or contract (`C...`) strkey, ignoring
    /// surrounding whitespace.
    pub fn parse(address: &str) -> Result<Self, InputError> {
        let address = address.trim();
        match Strkey::from_string(address) {
            Ok(Strkey::PublicKeyEd25519(_)) | Ok(Strkey::Contract(_)) => {
                Ok(Account(address.to_string()))
            }
            _ => Err(InputError::InvalidAddress(address.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is an account or contract strkey, exactly as stored.
    pub fn is_valid(&self) -> bool {
        matches!(
            Strkey::from_string(&self.0),
            Ok(Strkey::PublicKeyEd25519(_)) | Ok(Strkey::Contract(_))
        )
    }

    pub fn is_contract(&self) -> bool {
        matches!(Strkey::from_string(&self.0), Ok(Strkey::Contract(_)))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Account {
    fn from(address: &str) -> Self {
        Account::new(address)
    }
}

/// Voucher record as the ledger reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoucherRecord {
    pub exists: bool,
    pub is_redeemed: bool,
    pub token: Option<Account>,
    pub token_value: i128,
    pub issuer: Option<Account>,
    /// Zero means the voucher never expires.
    pub expiry_timestamp: u64,
}

/// Result of a status check, with expiry evaluated against ledger time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoucherStatus {
    pub exists: bool,
    pub is_redeemed: bool,
    pub token: Option<Account>,
    pub token_value: i128,
    pub issuer: Option<Account>,
    pub expiry_timestamp: u64,
    pub is_expired: bool,
}

impl VoucherStatus {
    pub fn from_record(record: VoucherRecord, now: u64) -> Self {
        let is_expired = record.expiry_timestamp > 0 && now > record.expiry_timestamp;
        VoucherStatus {
            exists: record.exists,
            is_redeemed: record.is_redeemed,
            token: record.token,
            token_value: record.token_value,
            issuer: record.issuer,
            expiry_timestamp: record.expiry_timestamp,
            is_expired,
        }
    }

    /// Exists, unspent and not past expiry.
    pub fn is_redeemable(&self) -> bool {
        self.exists && !self.is_redeemed && !self.is_expired
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub is_active: bool,
    pub commission_rate: u32,
    pub total_minted: u64,
    pub total_value: i128,
    pub last_settlement: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractStats {
    pub total_minted: u64,
    pub total_redeemed: u64,
    pub total_reclaimed: u64,
    pub minting_fee_rate: u32,
    pub redemption_fee_rate: u32,
}

/// Ledger configuration read in a single call. Fetched per operation and
/// never cached, so admin changes are always picked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub owner: Account,
    pub treasury: Account,
    pub minting_fee_rate: u32,
    pub redemption_fee_rate: u32,
    pub default_expiry_days: u32,
    pub paused: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenStats {
    pub vouchers_minted: u64,
    pub vouchers_redeemed: u64,
    pub value_redeemed: i128,
}

/// Column-oriented batch, mirroring the ledger's batch argument.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MintBatch {
    pub voucher_hashes: Vec<[u8; 32]>,
    pub tokens: Vec<Account>,
    pub token_values: Vec<i128>,
    pub expiry_days: Vec<u32>,
}

impl MintBatch {
    pub fn push(
        &mut self,
        voucher_hash: [u8; 32],
        token: Account,
        token_value: i128,
        expiry_days: u32,
    ) {
        self.voucher_hashes.push(voucher_hash);
        self.tokens.push(token);
        self.token_values.push(token_value);
        self.expiry_days.push(expiry_days);
    }

    /// Common column length, or `None` if the columns disagree.
    pub fn uniform_len(&self) -> Option<usize> {
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

/// Administrative calls, all of which require the owner's signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminAction {
    AddSupportedToken(Account),
    RemoveSupportedToken(Account),
    UpdateFees {
        minting_fee_rate: u32,
        redemption_fee_rate: u32,
    },
    UpdateTreasury(Account),
    RegisterAgent {
        agent: Account,
        commission_rate: u32,
    },
    SetAgentActive {
        agent: Account,
        is_active: bool,
    },
    RecordSettlement(Account),
    AddAuthorizedMinter(Account),
    RemoveAuthorizedMinter(Account),
    TransferOwnership(Account),
    Pause,
    Unpause,
}

impl AdminAction {
    /// The address the action is about, if any.
    pub fn target(&self) -> Option<&Account> {
        use AdminAction::*;
        match self {
            AddSupportedToken(a) | RemoveSupportedToken(a) | UpdateTreasury(a) => Some(a),
            RecordSettlement(a) | AddAuthorizedMinter(a) | RemoveAuthorizedMinter(a) => Some(a),
            TransferOwnership(a) => Some(a),
            RegisterAgent { agent, .. } | SetAgentActive { agent, .. } => Some(agent),
            UpdateFees { .. } | Pause | Unpause => None,
        }
    }
}

/// Event emitted by the ledger during a settled call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Minted {
        voucher_hash: [u8; 32],
        token: Account,
        token_value: i128,
        issuer: Account,
        expiry_timestamp: u64,
    },
    Redeemed {
        voucher_hash: [u8; 32],
        token: Account,
        recipient: Account,
        token_value: i128,
        fee: i128,
    },
    Reclaimed {
        voucher_hash: [u8; 32],
        token: Account,
        issuer: Account,
        token_value: i128,
    },
    /// Administrative event, identified by its topic (`fees`, `tok_add`, ...).
    Admin { topic: String },
    /// Token movement performed directly through a wallet.
    Transfer {
        token: Account,
        from: Account,
        to: Account,
        amount: i128,
    },
    Approval {
        token: Account,
        owner: Account,
        spender: Account,
        amount: i128,
    },
}

/// Which client operation a [`Receipt`] settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Mint,
    MintBatch,
    Redeem,
    Reclaim,
    Approve,
    Transfer,
    Admin,
}

/// Proof that a write settled on the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub operation: Operation,
    /// Ledger time observed right after the call settled.
    pub settled_at: u64,
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    /// Voucher hashes minted by this call, in order.
    pub fn minted_hashes(&self) -> Vec<[u8; 32]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::Minted { voucher_hash, .. } => Some(*voucher_hash),
                _ => None,
            })
            .collect()
    }

    /// Amount paid to the recipient by a redemption.
    pub fn redeemed_payout(&self) -> Option<i128> {
        self.events.iter().rev().find_map(|event| match event {
            LedgerEvent::Redeemed { token_value, fee, .. } => Some(token_value - fee),
            _ => None,
        })
    }
}

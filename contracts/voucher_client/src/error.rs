//! # Errors
//!
//! Three layers, kept apart so a caller can always tell where a failure came
//! from:
//!
//! | Type                | Raised                                   |
//! |---------------------|------------------------------------------|
//! | [`InputError`]      | Client-side, before any ledger call      |
//! | [`VoucherChainError`] | After a round trip the ledger rejected |
//! | [`ClientError`]     | Wrapper returned by every client method  |
//!
//! Ledger failures arrive as free-form reasons. [`VoucherChainError::from_reason`]
//! maps them onto a fixed set of categories and falls back to
//! [`VoucherChainError::Unknown`] instead of guessing.

use thiserror::Error;

use crate::config::ConfigError;
use crate::ledger::LedgerFailure;

/// Ledger rejection categories, one per contract error code plus a transport
/// failure and a catch-all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoucherChainError {
    #[error("voucher not found")]
    VoucherNotFound,
    #[error("voucher already redeemed")]
    VoucherAlreadyRedeemed,
    #[error("voucher expired")]
    VoucherExpired,
    #[error("voucher not expired")]
    VoucherNotExpired,
    #[error("token not supported")]
    TokenNotSupported,
    #[error("unauthorized minter")]
    UnauthorizedMinter,
    #[error("insufficient balance or allowance")]
    InsufficientBalance,
    #[error("invalid fee")]
    InvalidFee,
    #[error("invalid expiry")]
    InvalidExpiry,
    #[error("duplicate voucher code")]
    DuplicateVoucherCode,
    #[error("agent not active")]
    AgentNotActive,
    #[error("invalid batch size")]
    InvalidBatchSize,
    #[error("token transfer failed")]
    TokenTransferFailed,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("caller is not the owner")]
    NotOwner,
    #[error("ledger already initialized")]
    AlreadyInitialized,
    #[error("ledger not initialized")]
    NotInitialized,
    #[error("ledger paused")]
    ContractPaused,
    /// The call never reached a verdict, or its result could not be decoded.
    /// The resulting ledger state is unknown.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unrecognized ledger failure: {0}")]
    Unknown(String),
}

/// Category names in the order they are tried against a failure reason.
/// Longer names come first so that a name which contains another never loses
/// to the shorter one.
const CATEGORIES: [(&str, VoucherChainError); 18] = {
    use VoucherChainError::*;
    [
        ("VoucherAlreadyRedeemed", VoucherAlreadyRedeemed),
        ("DuplicateVoucherCode", DuplicateVoucherCode),
        ("InsufficientBalance", InsufficientBalance),
        ("TokenTransferFailed", TokenTransferFailed),
        ("AlreadyInitialized", AlreadyInitialized),
        ("UnauthorizedMinter", UnauthorizedMinter),
        ("VoucherNotExpired", VoucherNotExpired),
        ("TokenNotSupported", TokenNotSupported),
        ("InvalidBatchSize", InvalidBatchSize),
        ("VoucherNotFound", VoucherNotFound),
        ("NotInitialized", NotInitialized),
        ("AgentNotActive", AgentNotActive),
        ("VoucherExpired", VoucherExpired),
        ("ContractPaused", ContractPaused),
        ("InvalidExpiry", InvalidExpiry),
        ("InvalidAmount", InvalidAmount),
        ("InvalidFee", InvalidFee),
        ("NotOwner", NotOwner),
    ]
};

impl VoucherChainError {
    /// Map a ledger failure reason onto a category.
    ///
    /// Named categories are matched first; a bare contract error code of the
    /// form `Error(Contract, #N)` is accepted as well. Anything else becomes
    /// [`VoucherChainError::Unknown`] carrying the raw reason.
    pub fn from_reason(reason: &str) -> Self {
        for (name, category) in CATEGORIES.iter() {
            if reason.contains(name) {
                return category.clone();
            }
        }
        if let Some(code) = contract_code(reason) {
            if let Some(category) = Self::from_code(code) {
                return category;
            }
        }
        VoucherChainError::Unknown(reason.to_string())
    }

    /// Category for a numeric contract error code.
    pub fn from_code(code: u32) -> Option<Self> {
        use VoucherChainError::*;
        let category = match code {
            1 => VoucherNotFound,
            2 => VoucherAlreadyRedeemed,
            3 => VoucherExpired,
            4 => VoucherNotExpired,
            5 => TokenNotSupported,
            6 => UnauthorizedMinter,
            7 => InsufficientBalance,
            8 => InvalidFee,
            9 => InvalidExpiry,
            10 => DuplicateVoucherCode,
            11 => AgentNotActive,
            12 => InvalidBatchSize,
            13 => TokenTransferFailed,
            14 => InvalidAmount,
            15 => NotOwner,
            16 => AlreadyInitialized,
            17 => NotInitialized,
            18 => ContractPaused,
            _ => return None,
        };
        Some(category)
    }

    /// Fixed text shown to end users. Never includes the raw failure reason.
    pub fn user_message(&self) -> &'static str {
        use VoucherChainError::*;
        match self {
            VoucherNotFound => "Invalid voucher code",
            VoucherAlreadyRedeemed => "Voucher has already been redeemed",
            VoucherExpired => "Voucher has expired",
            VoucherNotExpired => "Voucher has not expired yet",
            TokenNotSupported => "Token not supported",
            UnauthorizedMinter => "Not authorized to mint vouchers",
            InsufficientBalance => "Insufficient token balance",
            InvalidFee => "Invalid fee amount",
            InvalidExpiry => "Invalid expiry date",
            DuplicateVoucherCode => "Voucher code already exists",
            AgentNotActive => "Agent account is not active",
            InvalidBatchSize => "Invalid batch size",
            TokenTransferFailed => "Token transfer failed",
            InvalidAmount => "Invalid token amount",
            NotOwner => "Only the contract owner can do this",
            AlreadyInitialized => "Contract is already initialized",
            NotInitialized => "Contract is not initialized",
            ContractPaused => "Voucher operations are temporarily paused",
            Transport(_) => "Network error. Check the voucher status before trying again",
            Unknown(_) => "An error occurred",
        }
    }

    /// Whether the failed call may be resubmitted blindly.
    ///
    /// Always `false`: a mint or redemption that timed out may still have
    /// been accepted, so callers must read the resulting state first.
    pub fn is_retry_safe(&self) -> bool {
        false
    }
}

/// Extract `N` from `... Error(Contract, #N) ...`.
fn contract_code(reason: &str) -> Option<u32> {
    let start = reason.find("Error(Contract, #")? + "Error(Contract, #".len();
    let digits: String = reason[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

impl From<LedgerFailure> for VoucherChainError {
    fn from(failure: LedgerFailure) -> Self {
        match failure {
            LedgerFailure::Reverted(reason) => VoucherChainError::from_reason(&reason),
            LedgerFailure::Transport(detail) => VoucherChainError::Transport(detail),
            LedgerFailure::InvalidAddress(address) => {
                VoucherChainError::Unknown(format!("invalid address `{address}`"))
            }
        }
    }
}

/// Problems caught before anything is sent to the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("voucher code is empty")]
    EmptyCode,
    #[error("voucher code must be at least {min} characters")]
    CodeTooShort { min: usize },
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("`{0}` is not a valid amount")]
    MalformedAmount(String),
    #[error("amount has more than {decimals} decimal places")]
    TooManyDecimals { decimals: u32 },
    #[error("quantity must be between 1 and {max}")]
    InvalidQuantity { max: u32 },
    #[error("unknown token `{0}`")]
    UnknownToken(String),
    #[error("expiry must be at most {max} days")]
    ExpiryTooLong { max: u32 },
    #[error("batch must hold between 1 and {max} vouchers")]
    BatchSize { max: u32 },
    #[error("batch columns have different lengths")]
    BatchShape,
    #[error("`{0}` is not a valid address")]
    InvalidAddress(String),
    #[error("amount must not be negative")]
    NegativeAmount,
    #[error("not a secret key")]
    InvalidSecret,
}

/// Wallet sign-in failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("no login code was requested for this email")]
    NoPendingCode,
    #[error("login code does not match")]
    WrongCode,
    #[error("`{0}` is not a valid wallet address")]
    InvalidAddress(String),
}

/// Error returned by every client operation.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("no wallet connected")]
    NotConnected,

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("ledger rejected the call: {0}")]
    Rejected(#[from] VoucherChainError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Fixed text shown to end users.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::InvalidInput(err) => capitalize(&err.to_string()),
            ClientError::NotConnected => "Please connect your wallet first".to_string(),
            ClientError::Auth(err) => capitalize(&err.to_string()),
            ClientError::Rejected(err) => err.user_message().to_string(),
            ClientError::Config(_) => "The client is misconfigured".to_string(),
        }
    }
}

impl From<LedgerFailure> for ClientError {
    fn from(failure: LedgerFailure) -> Self {
        match failure {
            LedgerFailure::InvalidAddress(address) => {
                ClientError::InvalidInput(InputError::InvalidAddress(address))
            }
            other => ClientError::Rejected(other.into()),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

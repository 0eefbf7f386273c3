//! # Page flows
//!
//! UI-independent state machines behind the Redeem page and the Agent
//! Dashboard. A flow never reports success before the ledger settled the
//! call, and keeps client-side input problems apart from ledger rejections.
//!
//! ## Redeem
//!
//! ```text
//! NotChecked ──check()──► InvalidInput | Checked(status) | Rejected
//! Checked    ──redeem()─► Redeemed(receipt) | Rejected
//! ```
//!
//! `check()` always queries the ledger. `redeem()` needs a signed-in wallet;
//! the payout goes to the session address.
//!
//! ## Mint
//!
//! validate ─► generate codes ─► approve deposit (settled) ─► mint ─► codes

use std::collections::HashSet;

use voucher_ledger::{MAX_BATCH_SIZE, MAX_EXPIRY_DAYS};

use crate::amount::parse_amount;
use crate::client::VoucherClient;
use crate::code::{generate_voucher_code, VoucherCode};
use crate::config::ClientConfig;
use crate::error::{ClientError, InputError, VoucherChainError};
use crate::ledger::Ledger;
use crate::types::{Account, MintBatch, Receipt, VoucherStatus};
use crate::wallet::WalletProvider;

// ─────────────────────────────────────────────────────────
// Redeem
// ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedeemState {
    NotChecked,
    InvalidInput(InputError),
    Checked(VoucherStatus),
    Redeemed(Receipt),
    Rejected(VoucherChainError),
}

pub struct RedeemFlow {
    min_code_length: usize,
    input: VoucherCode,
    state: RedeemState,
}

impl RedeemFlow {
    pub fn new(min_code_length: usize) -> Self {
        RedeemFlow {
            min_code_length,
            input: VoucherCode::new(String::new()),
            state: RedeemState::NotChecked,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.min_code_length)
    }

    pub fn state(&self) -> &RedeemState {
        &self.state
    }

    /// Replace the entered code. Any earlier result no longer applies.
    pub fn set_code(&mut self, input: &str) {
        self.input = VoucherCode::new(input);
        self.state = RedeemState::NotChecked;
    }

    /// Validate the entered code and look it up on the ledger.
    pub fn check<L: Ledger>(&mut self, client: &VoucherClient<L>) -> &RedeemState {
        self.state = match VoucherCode::parse(self.input.expose(), self.min_code_length) {
            Err(err) => RedeemState::InvalidInput(err),
            Ok(code) => match client.check_voucher_status(&code) {
                Ok(status) => RedeemState::Checked(status),
                Err(err) => RedeemState::Rejected(rejection(err)),
            },
        };
        &self.state
    }

    /// Redeem the entered code to the signed-in wallet.
    ///
    /// Fails with [`ClientError::NotConnected`] without touching the state
    /// when nobody is signed in.
    pub fn redeem<L: Ledger, W: WalletProvider>(
        &mut self,
        client: &mut VoucherClient<L>,
        wallet: &W,
    ) -> Result<&RedeemState, ClientError> {
        let recipient = wallet.current_address().ok_or(ClientError::NotConnected)?;
        self.state = match VoucherCode::parse(self.input.expose(), self.min_code_length) {
            Err(err) => RedeemState::InvalidInput(err),
            Ok(code) => match client.redeem(&code, &recipient) {
                Ok(receipt) => RedeemState::Redeemed(receipt),
                Err(ClientError::InvalidInput(err)) => RedeemState::InvalidInput(err),
                Err(err) => RedeemState::Rejected(rejection(err)),
            },
        };
        Ok(&self.state)
    }

    /// Text for the current state, if there is anything to show.
    pub fn message(&self) -> Option<String> {
        match &self.state {
            RedeemState::NotChecked => None,
            RedeemState::InvalidInput(err) => Some(ClientError::from(err.clone()).user_message()),
            RedeemState::Checked(status) => Some(status_message(status).to_string()),
            RedeemState::Redeemed(_) => Some("Voucher redeemed successfully".to_string()),
            RedeemState::Rejected(err) => Some(err.user_message().to_string()),
        }
    }
}

fn status_message(status: &VoucherStatus) -> &'static str {
    if !status.exists {
        VoucherChainError::VoucherNotFound.user_message()
    } else if status.is_redeemed {
        VoucherChainError::VoucherAlreadyRedeemed.user_message()
    } else if status.is_expired {
        VoucherChainError::VoucherExpired.user_message()
    } else {
        "Voucher is valid and ready to redeem"
    }
}

/// Ledger-side failure as a category. Anything that is not a ledger verdict
/// lands in the catch-all.
fn rejection(err: ClientError) -> VoucherChainError {
    match err {
        ClientError::Rejected(category) => category,
        other => VoucherChainError::Unknown(other.to_string()),
    }
}

// ─────────────────────────────────────────────────────────
// Mint
// ─────────────────────────────────────────────────────────

/// Agent Dashboard form input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintRequest {
    pub token_symbol: String,
    /// Per-voucher amount in whole tokens, e.g. `"50"` or `"12.5"`.
    pub amount: String,
    pub quantity: u32,
    /// `None` uses the ledger's default expiry.
    pub expiry_days: Option<u32>,
}

/// A request that passed client-side validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedMint {
    pub token: Account,
    pub token_value: i128,
    pub quantity: u32,
    pub expiry_days: Option<u32>,
}

/// Result of a successful mint. The plaintext codes are handed out once, by
/// [`MintOutcome::into_codes`].
pub struct MintOutcome {
    codes: Vec<VoucherCode>,
    pub approval: Receipt,
    pub mint: Receipt,
}

impl MintOutcome {
    pub fn into_codes(self) -> Vec<VoucherCode> {
        self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

pub struct MintFlow<'a> {
    config: &'a ClientConfig,
}

impl<'a> MintFlow<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        MintFlow { config }
    }

    pub fn validate(&self, request: &MintRequest) -> Result<ValidatedMint, InputError> {
        let entry = self
            .config
            .token(&request.token_symbol)
            .ok_or_else(|| InputError::UnknownToken(request.token_symbol.trim().to_string()))?;
        let token_value = parse_amount(&request.amount, entry.decimals)?;
        if request.quantity == 0 || request.quantity > MAX_BATCH_SIZE {
            return Err(InputError::InvalidQuantity { max: MAX_BATCH_SIZE });
        }
        if let Some(days) = request.expiry_days {
            if days > MAX_EXPIRY_DAYS {
                return Err(InputError::ExpiryTooLong { max: MAX_EXPIRY_DAYS });
            }
        }
        Ok(ValidatedMint {
            token: entry.address.clone(),
            token_value,
            quantity: request.quantity,
            expiry_days: request.expiry_days,
        })
    }

    /// Validate, approve the full deposit, wait for the approval to settle,
    /// then mint every voucher in one call.
    pub fn execute<L: Ledger, W: WalletProvider>(
        &self,
        client: &mut VoucherClient<L>,
        wallet: &W,
        request: &MintRequest,
    ) -> Result<MintOutcome, ClientError> {
        let signer = wallet.current_address().ok_or(ClientError::NotConnected)?;
        let mint = self.validate(request)?;

        let per_voucher = client.required_deposit(mint.token_value)?;
        let deposit = per_voucher
            .checked_mul(mint.quantity as i128)
            .ok_or_else(|| InputError::MalformedAmount(request.amount.clone()))?;

        let codes = fresh_codes(mint.quantity as usize);
        let approval = client.approve_spending(&signer, &mint.token, deposit)?;

        let receipt = if codes.len() == 1 {
            client.mint(&signer, &codes[0], &mint.token, mint.token_value, mint.expiry_days)?
        } else {
            let days = match mint.expiry_days {
                Some(days) => days,
                None => client.config()?.default_expiry_days,
            };
            let mut batch = MintBatch::default();
            for code in &codes {
                batch.push(code.hash(), mint.token.clone(), mint.token_value, days);
            }
            client.mint_batch(&signer, &batch)?
        };

        Ok(MintOutcome {
            codes,
            approval,
            mint: receipt,
        })
    }
}

/// `count` random codes with pairwise distinct hashes.
fn fresh_codes(count: usize) -> Vec<VoucherCode> {
    let mut seen = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);
    while codes.len() < count {
        let code = generate_voucher_code();
        if seen.insert(code.hash()) {
            codes.push(code);
        }
    }
    codes
}

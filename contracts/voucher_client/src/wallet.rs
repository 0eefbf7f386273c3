//! # Wallet sessions
//!
//! [`WalletProvider`] is the identity seam: it says who is signed in and
//! signs transfers for them. [`EmbeddedWallet`] is the in-process provider
//! with two sign-in paths:
//!
//! ```text
//! send_code(email) ──► one-time code ──► authenticate(EmailCode { email, code })
//! authenticate(External(address))
//! ```
//!
//! An email is bound to a ledger account the first time it signs in and keeps
//! that account for later sessions.

use std::collections::HashMap;

use rand::Rng;
use zeroize::Zeroizing;

use crate::client::VoucherClient;
use crate::error::{AuthError, ClientError};
use crate::ledger::Ledger;
use crate::types::{Account, Receipt};

const LOGIN_CODE_DIGITS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// Complete an email login started with [`EmbeddedWallet::send_code`].
    EmailCode { email: String, code: String },
    /// Use an address controlled by an external wallet.
    External(Account),
}

pub trait WalletProvider {
    /// Start a session. Returns the session's ledger address.
    fn authenticate<L: Ledger>(
        &mut self,
        client: &mut VoucherClient<L>,
        method: AuthMethod,
    ) -> Result<Account, ClientError>;

    fn current_address(&self) -> Option<Account>;

    fn logout(&mut self);

    /// Transfer `value` of `token` from the session address to `to`.
    fn send_transaction<L: Ledger>(
        &mut self,
        client: &mut VoucherClient<L>,
        to: &Account,
        token: &Account,
        value: i128,
    ) -> Result<Receipt, ClientError>;
}

#[derive(Default)]
pub struct EmbeddedWallet {
    session: Option<Account>,
    /// Outstanding one-time codes per normalized email.
    pending: HashMap<String, Zeroizing<String>>,
    /// Accounts bound to emails on first login.
    accounts: HashMap<String, Account>,
}

impl EmbeddedWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a one-time login code for `email`, replacing any earlier one.
    ///
    /// There is no mail transport in-process, so the code is returned to the
    /// caller for delivery.
    pub fn send_code(&mut self, email: &str) -> Result<String, AuthError> {
        self.send_code_with(email, &mut rand::thread_rng())
    }

    pub fn send_code_with<R: Rng + ?Sized>(
        &mut self,
        email: &str,
        rng: &mut R,
    ) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        let code: String = (0..LOGIN_CODE_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        self.pending.insert(email, Zeroizing::new(code.clone()));
        Ok(code)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl WalletProvider for EmbeddedWallet {
    fn authenticate<L: Ledger>(
        &mut self,
        client: &mut VoucherClient<L>,
        method: AuthMethod,
    ) -> Result<Account, ClientError> {
        let address = match method {
            AuthMethod::EmailCode { email, code } => {
                let email = normalize_email(&email)?;
                let expected = self.pending.get(&email).ok_or(AuthError::NoPendingCode)?;
                if expected.as_str() != code.trim() {
                    return Err(AuthError::WrongCode.into());
                }
                self.pending.remove(&email);
                self.accounts
                    .entry(email)
                    .or_insert_with(|| client.create_account())
                    .clone()
            }
            AuthMethod::External(address) => Account::parse(address.as_str())
                .map_err(|_| AuthError::InvalidAddress(address.to_string()))?,
        };
        self.session = Some(address.clone());
        Ok(address)
    }

    fn current_address(&self) -> Option<Account> {
        self.session.clone()
    }

    fn logout(&mut self) {
        self.session = None;
    }

    fn send_transaction<L: Ledger>(
        &mut self,
        client: &mut VoucherClient<L>,
        to: &Account,
        token: &Account,
        value: i128,
    ) -> Result<Receipt, ClientError> {
        let from = self.session.clone().ok_or(ClientError::NotConnected)?;
        client.transfer(&from, token, to, value)
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::InvalidEmail(email));
    }
    Ok(email)
}

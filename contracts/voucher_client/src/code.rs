//! Voucher codes: validation, hashing and generation.
//!
//! The ledger only ever stores `SHA-256(utf8(code))`. The plaintext lives in a
//! [`VoucherCode`], which never prints itself and wipes its buffer on drop.

use std::fmt;

use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::InputError;

/// Shortest code the redeem page accepts.
pub const DEFAULT_MIN_CODE_LENGTH: usize = 12;

const CODE_PREFIX: &str = "VC";
const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

/// Upper-case letters and digits without the look-alikes `0 O 1 I`.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Wrap a code without validating it.
    pub fn new(code: impl Into<String>) -> Self {
        VoucherCode(code.into())
    }

    /// Validate user input: surrounding whitespace is ignored, the rest must
    /// be non-empty and at least `min_len` characters.
    pub fn parse(input: &str, min_len: usize) -> Result<Self, InputError> {
        let code = VoucherCode(input.trim().to_string());
        code.check_length(min_len)?;
        Ok(code)
    }

    /// Fail unless the code is non-empty and at least `min_len` characters.
    pub fn check_length(&self, min_len: usize) -> Result<(), InputError> {
        if self.0.trim().is_empty() {
            return Err(InputError::EmptyCode);
        }
        if self.0.chars().count() < min_len {
            return Err(InputError::CodeTooShort { min: min_len });
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The plaintext. Only for handing the code to its holder.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Ledger key for this code.
    pub fn hash(&self) -> [u8; 32] {
        hash_code(self.as_bytes())
    }

}

impl fmt::Debug for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VoucherCode(<redacted>)")
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted voucher code>")
    }
}

/// SHA-256 of the raw code bytes; identical to the ledger's own digest.
pub fn hash_code(code: &[u8]) -> [u8; 32] {
    Sha256::digest(code).into()
}

/// Fresh random code of the form `VC-XXXX-XXXX-XXXX`.
pub fn generate_voucher_code() -> VoucherCode {
    generate_voucher_code_with(&mut rand::thread_rng())
}

pub fn generate_voucher_code_with<R: Rng + ?Sized>(rng: &mut R) -> VoucherCode {
    let mut code = String::with_capacity(CODE_PREFIX.len() + GROUPS * (GROUP_LEN + 1));
    code.push_str(CODE_PREFIX);
    for _ in 0..GROUPS {
        code.push('-');
        for _ in 0..GROUP_LEN {
            let idx = rng.gen_range(0..ALPHABET.len());
            code.push(ALPHABET[idx] as char);
        }
    }
    VoucherCode(code)
}

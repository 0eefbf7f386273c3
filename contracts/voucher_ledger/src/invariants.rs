#![allow(dead_code)]

extern crate std;

use crate::fees::{BPS_DENOMINATOR, MAX_TOKEN_VALUE};
use crate::types::{Voucher, VoucherStatus};

/// INV-1: A stored voucher always holds a positive value within the cap.
pub fn assert_value_in_range(voucher: &Voucher) {
    assert!(
        voucher.token_value > 0 && voucher.token_value <= MAX_TOKEN_VALUE,
        "INV-1 violated: voucher value {} out of range",
        voucher.token_value
    );
}

/// INV-2: Expiry is either "never" or strictly after creation.
pub fn assert_expiry_consistent(voucher: &Voucher) {
    assert!(
        voucher.expiry_timestamp == 0 || voucher.expiry_timestamp > voucher.created_at,
        "INV-2 violated: expiry {} not after creation {}",
        voucher.expiry_timestamp,
        voucher.created_at
    );
}

/// INV-3: `is_redeemed` only ever moves false -> true.
pub fn assert_redeemed_monotonic(before: &VoucherStatus, after: &VoucherStatus) {
    assert!(
        !(before.is_redeemed && !after.is_redeemed),
        "INV-3 violated: voucher went from redeemed back to unredeemed"
    );
}

/// INV-4: Fields fixed at mint time never change.
pub fn assert_immutable_fields(original: &VoucherStatus, current: &VoucherStatus) {
    assert_eq!(original.exists, current.exists, "INV-4 violated: existence changed");
    assert_eq!(original.token, current.token, "INV-4 violated: token changed");
    assert_eq!(
        original.token_value, current.token_value,
        "INV-4 violated: token_value changed"
    );
    assert_eq!(original.issuer, current.issuer, "INV-4 violated: issuer changed");
    assert_eq!(
        original.expiry_timestamp, current.expiry_timestamp,
        "INV-4 violated: expiry changed"
    );
}

/// INV-5: Mint debit is value plus the floored minting fee.
pub fn assert_mint_debit(debited: i128, value: i128, minting_fee_rate: u32) {
    let expected = value + value * minting_fee_rate as i128 / BPS_DENOMINATOR as i128;
    assert_eq!(
        debited, expected,
        "INV-5 violated: debited {} for value {} at {} bps",
        debited, value, minting_fee_rate
    );
}

/// INV-6: Redemption payout and fee sum to the voucher value exactly.
pub fn assert_redemption_split(payout: i128, fee: i128, value: i128, redemption_fee_rate: u32) {
    assert_eq!(
        fee,
        value * redemption_fee_rate as i128 / BPS_DENOMINATOR as i128,
        "INV-6 violated: fee {} for value {} at {} bps",
        fee,
        value,
        redemption_fee_rate
    );
    assert_eq!(
        payout + fee,
        value,
        "INV-6 violated: payout {} + fee {} != value {}",
        payout,
        fee,
        value
    );
}

/// INV-7: The ledger's tracked balance equals the sum of outstanding voucher
/// values and matches what the token contract reports for the ledger.
pub fn assert_held_matches(tracked: i128, outstanding: i128, on_token: i128) {
    assert_eq!(
        tracked, outstanding,
        "INV-7 violated: tracked {} != outstanding {}",
        tracked, outstanding
    );
    assert_eq!(
        tracked, on_token,
        "INV-7 violated: tracked {} != token balance {}",
        tracked, on_token
    );
}

//! # Fees
//!
//! Integer basis-point arithmetic shared by minting and redemption.
//!
//! A fee is `amount * rate_bps / 10_000`, truncated toward zero. Amounts are
//! capped at [`MAX_TOKEN_VALUE`] and rates at [`BPS_DENOMINATOR`], so the
//! intermediate product stays far below `i128::MAX`.

/// One whole in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Upper bound accepted for either protocol fee rate (5 %).
pub const MAX_FEE_RATE: u32 = 500;

/// Largest voucher value accepted by the ledger (10^30 base units).
pub const MAX_TOKEN_VALUE: i128 = 1_000_000_000_000_000_000_000_000_000_000;

/// Fee owed on `amount` at `rate_bps`.
pub fn fee_for(amount: i128, rate_bps: u32) -> i128 {
    amount * rate_bps as i128 / BPS_DENOMINATOR as i128
}

/// Total an agent pays to mint a voucher worth `value`: `(total, fee)`.
pub fn mint_charge(value: i128, minting_fee_rate: u32) -> (i128, i128) {
    let fee = fee_for(value, minting_fee_rate);
    (value + fee, fee)
}

/// Split a redeemed `value` into `(payout, fee)`; the two always sum to `value`.
pub fn redemption_split(value: i128, redemption_fee_rate: u32) -> (i128, i128) {
    let fee = fee_for(value, redemption_fee_rate);
    (value - fee, fee)
}

/// `true` if `rate` is an acceptable protocol fee rate.
pub fn is_valid_fee_rate(rate: u32) -> bool {
    rate <= MAX_FEE_RATE
}

/// `true` if `rate` is an acceptable agent commission rate.
pub fn is_valid_commission_rate(rate: u32) -> bool {
    rate <= BPS_DENOMINATOR
}

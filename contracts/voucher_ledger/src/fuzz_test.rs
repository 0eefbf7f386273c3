extern crate std;
use std::vec::Vec;

use proptest::prelude::*;
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, Address, Bytes, BytesN, Env,
};

use crate::invariants::*;
use crate::test::rejected;
use crate::{Error, VoucherLedger, VoucherLedgerClient, SECONDS_PER_DAY};

// ── Helpers ─────────────────────────────────────────────────────────

struct Fixture {
    env: Env,
    client: VoucherLedgerClient<'static>,
    owner: Address,
    treasury: Address,
    agent: Address,
    token: token::Client<'static>,
}

fn setup_env(agent_funds: i128) -> Fixture {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register(VoucherLedger, ());
    let client = VoucherLedgerClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let treasury = Address::generate(&env);
    client.init(&owner, &treasury, &200, &100, &30);

    let token = create_token(&env, &Address::generate(&env));
    client.add_supported_token(&owner, &token.address);

    let agent = Address::generate(&env);
    client.add_authorized_minter(&owner, &agent);
    token::StellarAssetClient::new(&env, &token.address).mint(&agent, &agent_funds);
    let live_until = env.ledger().sequence() + 10_000;
    token.approve(&agent, &contract_id, &agent_funds, &live_until);

    Fixture {
        env,
        client,
        owner,
        treasury,
        agent,
        token,
    }
}

fn create_token<'a>(env: &Env, admin: &Address) -> token::Client<'a> {
    let addr = env.register_stellar_asset_contract_v2(admin.clone());
    token::Client::new(env, &addr.address())
}

fn code_for(env: &Env, n: u32) -> Bytes {
    Bytes::from_slice(env, std::format!("VC-FUZZ-{:08}", n).as_bytes())
}

fn hash_of(env: &Env, code: &Bytes) -> BytesN<32> {
    env.crypto().sha256(code).to_bytes()
}

// ── 1. Fee Arithmetic ───────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn fuzz_mint_and_redeem_fee_split(
        value in 1i128..=1_000_000_000_000i128,
        minting_rate in 0u32..=500,
        redemption_rate in 0u32..=500,
    ) {
        let f = setup_env(value * 2);
        f.client.update_fees(&f.owner, &minting_rate, &redemption_rate);

        let code = code_for(&f.env, 1);
        let before = f.token.balance(&f.agent);
        f.client.mint_voucher(&f.agent, &hash_of(&f.env, &code), &f.token.address, &value, &0);
        let debited = before - f.token.balance(&f.agent);
        assert_mint_debit(debited, value, minting_rate);
        let mint_fee = f.token.balance(&f.treasury);

        let user = Address::generate(&f.env);
        f.client.redeem_voucher(&code, &user);
        let payout = f.token.balance(&user);
        let fee = f.token.balance(&f.treasury) - mint_fee;
        assert_redemption_split(payout, fee, value, redemption_rate);
        assert_eq!(f.token.balance(&f.client.address), 0);
    }
}

// ── 2. Uniqueness ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fuzz_duplicate_hash_always_rejected(
        seed in any::<[u8; 32]>(),
        first_value in 1i128..=1_000i128,
        second_value in 1i128..=1_000i128,
        days in 0u32..=365,
    ) {
        let f = setup_env(10_000);
        let hash = BytesN::from_array(&f.env, &seed);

        f.client.mint_voucher(&f.agent, &hash, &f.token.address, &first_value, &0);
        let again = f
            .client
            .try_mint_voucher(&f.agent, &hash, &f.token.address, &second_value, &days);
        prop_assert_eq!(again, Err(Ok(rejected(Error::DuplicateVoucherCode))));

        let stored = f.client.get_voucher(&hash).unwrap();
        prop_assert_eq!(stored.token_value, first_value);
        prop_assert_eq!(f.client.get_contract_stats().total_minted, 1);
    }
}

// ── 3. Custody ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Interleaved mints and redemptions keep the tracked balance equal to
    /// the sum of outstanding vouchers and to the token-side balance.
    #[test]
    fn fuzz_held_balance_tracks_outstanding(
        values in prop::collection::vec(1i128..=10_000i128, 1..12),
        redeem_mask in prop::collection::vec(any::<bool>(), 12),
    ) {
        let f = setup_env(1_000_000);
        let user = Address::generate(&f.env);
        let mut outstanding = 0i128;
        let mut minted: Vec<(Bytes, i128)> = Vec::new();

        for (i, value) in values.iter().enumerate() {
            let code = code_for(&f.env, i as u32);
            f.client.mint_voucher(&f.agent, &hash_of(&f.env, &code), &f.token.address, value, &0);
            outstanding += value;
            minted.push((code, *value));

            assert_held_matches(
                f.client.get_contract_token_balance(&f.token.address),
                outstanding,
                f.token.balance(&f.client.address),
            );
        }

        for ((code, value), redeem) in minted.iter().zip(redeem_mask.iter()) {
            if !redeem {
                continue;
            }
            f.client.redeem_voucher(code, &user);
            outstanding -= value;

            assert_held_matches(
                f.client.get_contract_token_balance(&f.token.address),
                outstanding,
                f.token.balance(&f.client.address),
            );
        }

        prop_assert_eq!(
            f.client.get_agent_token_balance(&f.agent, &f.token.address),
            outstanding
        );
    }
}

// ── 4. Single Use ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fuzz_redeem_at_most_once(value in 1i128..=100_000i128, attempts in 2usize..6) {
        let f = setup_env(1_000_000);
        let code = code_for(&f.env, 7);
        f.client.mint_voucher(&f.agent, &hash_of(&f.env, &code), &f.token.address, &value, &30);
        let minted_status = f.client.get_voucher_status(&code);

        let mut previous = minted_status.clone();
        let mut successes = 0;
        for _ in 0..attempts {
            let user = Address::generate(&f.env);
            match f.client.try_redeem_voucher(&code, &user) {
                Ok(_) => successes += 1,
                Err(err) => prop_assert_eq!(err, Ok(rejected(Error::VoucherAlreadyRedeemed))),
            }
            let current = f.client.get_voucher_status(&code);
            assert_redeemed_monotonic(&previous, &current);
            assert_immutable_fields(&minted_status, &current);
            previous = current;
        }
        prop_assert_eq!(successes, 1);
        prop_assert_eq!(f.client.get_contract_stats().total_redeemed, 1);
    }
}

// ── 5. Expiry ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn fuzz_expiry_boundary(days in 1u32..=365, offset in 0u64..=2 * 86_400) {
        let f = setup_env(10_000);
        f.env.ledger().set_timestamp(1_000_000);
        let code = code_for(&f.env, 3);
        let hash = hash_of(&f.env, &code);
        f.client.mint_voucher(&f.agent, &hash, &f.token.address, &100, &days);

        let voucher = f.client.get_voucher(&hash).unwrap();
        assert_value_in_range(&voucher);
        assert_expiry_consistent(&voucher);
        prop_assert_eq!(voucher.expiry_timestamp, 1_000_000 + days as u64 * SECONDS_PER_DAY);

        // Land somewhere between one day before and one day after expiry.
        let at = voucher.expiry_timestamp - 86_400 + offset;
        f.env.ledger().set_timestamp(at);

        let user = Address::generate(&f.env);
        let result = f.client.try_redeem_voucher(&code, &user);
        if at > voucher.expiry_timestamp {
            prop_assert_eq!(result, Err(Ok(rejected(Error::VoucherExpired))));
            f.client.reclaim_expired_voucher(&f.agent, &code);
            prop_assert!(f.client.get_voucher_status(&code).is_redeemed);
        } else {
            prop_assert!(result.is_ok());
            let reclaim = f.client.try_reclaim_expired_voucher(&f.agent, &code);
            prop_assert_eq!(reclaim, Err(Ok(rejected(Error::VoucherAlreadyRedeemed))));
        }
    }
}

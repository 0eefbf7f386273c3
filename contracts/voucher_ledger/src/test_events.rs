extern crate std;

use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events, Ledger},
    token, vec, Address, Bytes, BytesN, Env, IntoVal, TryIntoVal,
};

use crate::events::{FeesUpdated, VoucherMinted, VoucherReclaimed, VoucherRedeemed};
use crate::{VoucherLedger, VoucherLedgerClient};

fn setup() -> (Env, VoucherLedgerClient<'static>, Address, Address, token::Client<'static>) {
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
    token::StellarAssetClient::new(&env, &token.address).mint(&agent, &10_000);
    let live_until = env.ledger().sequence() + 10_000;
    token.approve(&agent, &contract_id, &10_000, &live_until);

    (env, client, owner, agent, token)
}

fn create_token<'a>(env: &Env, admin: &Address) -> token::Client<'a> {
    let addr = env.register_stellar_asset_contract_v2(admin.clone());
    token::Client::new(env, &addr.address())
}

fn hash_of(env: &Env, code: &Bytes) -> BytesN<32> {
    env.crypto().sha256(code).to_bytes()
}

#[test]
fn test_voucher_minted_event() {
    let (env, client, _owner, agent, token) = setup();
    let code = Bytes::from_slice(&env, b"VC-AAAA-BBBB-CCCC");
    let hash = hash_of(&env, &code);

    client.mint_voucher(&agent, &hash, &token.address, &500, &0);

    let all_events = env.events().all();
    let last_event = all_events.last().expect("No events found");

    // Topic: (symbol_short!("minted"), voucher_hash)
    assert_eq!(last_event.0, client.address);
    let expected_topics = vec![&env, symbol_short!("minted").into_val(&env), hash.into_val(&env)];
    assert_eq!(last_event.1, expected_topics);

    let event_data: VoucherMinted = last_event.2.try_into_val(&env).unwrap();
    assert_eq!(
        event_data,
        VoucherMinted {
            voucher_hash: hash.clone(),
            token: token.address.clone(),
            token_value: 500,
            issuer: agent.clone(),
            expiry_timestamp: 0,
        }
    );
}

#[test]
fn test_voucher_redeemed_event() {
    let (env, client, _owner, agent, token) = setup();
    let code = Bytes::from_slice(&env, b"VC-AAAA-BBBB-CCCC");
    let hash = hash_of(&env, &code);
    let recipient = Address::generate(&env);

    client.mint_voucher(&agent, &hash, &token.address, &500, &0);
    client.redeem_voucher(&code, &recipient);

    let all_events = env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, client.address);
    let expected_topics = vec![&env, symbol_short!("redeemed").into_val(&env), hash.into_val(&env)];
    assert_eq!(last_event.1, expected_topics);

    let event_data: VoucherRedeemed = last_event.2.try_into_val(&env).unwrap();
    assert_eq!(
        event_data,
        VoucherRedeemed {
            voucher_hash: hash.clone(),
            token: token.address.clone(),
            recipient: recipient.clone(),
            token_value: 500,
            fee: 5,
        }
    );
}

#[test]
fn test_voucher_reclaimed_event() {
    let (env, client, _owner, agent, token) = setup();
    let code = Bytes::from_slice(&env, b"VC-AAAA-BBBB-CCCC");
    let hash = hash_of(&env, &code);

    client.mint_voucher(&agent, &hash, &token.address, &500, &1);
    env.ledger().set_timestamp(2 * crate::SECONDS_PER_DAY);
    client.reclaim_expired_voucher(&agent, &code);

    let all_events = env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, client.address);
    let expected_topics = vec![
        &env,
        symbol_short!("reclaimed").into_val(&env),
        hash.into_val(&env),
    ];
    assert_eq!(last_event.1, expected_topics);

    let event_data: VoucherReclaimed = last_event.2.try_into_val(&env).unwrap();
    assert_eq!(
        event_data,
        VoucherReclaimed {
            voucher_hash: hash.clone(),
            token: token.address.clone(),
            issuer: agent.clone(),
            token_value: 500,
        }
    );
}

#[test]
fn test_fees_updated_event() {
    let (env, client, owner, _agent, _token) = setup();
    client.update_fees(&owner, &150, &50);

    let all_events = env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, client.address);
    let expected_topics = vec![&env, symbol_short!("fees").into_val(&env)];
    assert_eq!(last_event.1, expected_topics);

    let event_data: FeesUpdated = last_event.2.try_into_val(&env).unwrap();
    assert_eq!(
        event_data,
        FeesUpdated {
            minting_fee_rate: 150,
            redemption_fee_rate: 50,
        }
    );
}

#[test]
fn test_token_added_event() {
    let (env, client, owner, _agent, _token) = setup();
    let other = Address::generate(&env);
    client.add_supported_token(&owner, &other);

    let all_events = env.events().all();
    let last_event = all_events.last().expect("No events found");

    assert_eq!(last_event.0, client.address);
    let expected_topics = vec![&env, symbol_short!("tok_add").into_val(&env)];
    assert_eq!(last_event.1, expected_topics);
    let data: Address = last_event.2.try_into_val(&env).unwrap();
    assert_eq!(data, other);
}

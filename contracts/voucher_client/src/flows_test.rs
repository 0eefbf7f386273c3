use std::collections::BTreeMap;

use rand::{rngs::StdRng, SeedableRng};

use crate::harness::{both_backends, world, TestLedger, World, AGENT_FUNDS, DAY};
use crate::{
    Account, AuthError, AuthMethod, ClientConfig, ClientError, EmbeddedWallet, InputError, Ledger,
    MintFlow, MintRequest, Receipt, RedeemFlow, RedeemState, TokenEntry, VoucherChainError,
    VoucherClient, WalletProvider,
};

fn config_for<L: TestLedger>(w: &World<L>) -> ClientConfig {
    let mut tokens = BTreeMap::new();
    tokens.insert(
        "ETN".to_string(),
        TokenEntry {
            address: w.token.clone(),
            decimals: 2,
        },
    );
    ClientConfig {
        contract_id: w.client.ledger().ledger_address().to_string(),
        rpc_url: "http://localhost:8000".to_string(),
        network_passphrase: "Standalone Network ; February 2017".to_string(),
        min_code_length: 12,
        tokens,
    }
}

fn request(amount: &str, quantity: u32, expiry_days: Option<u32>) -> MintRequest {
    MintRequest {
        token_symbol: "etn".to_string(),
        amount: amount.to_string(),
        quantity,
        expiry_days,
    }
}

fn signed_in<L: TestLedger>(w: &mut World<L>, address: &Account) -> EmbeddedWallet {
    let mut wallet = EmbeddedWallet::new();
    wallet
        .authenticate(&mut w.client, AuthMethod::External(address.clone()))
        .unwrap();
    wallet
}

// ─── Wallet ──────────────────────────────────────────────

both_backends! {
    email_login_binds_one_account => email_login_binds_one_account;
    email_login_rejects_bad_codes => email_login_rejects_bad_codes;
    wallet_sends_tokens => wallet_sends_tokens;
    external_login_rejects_malformed_address => external_login_rejects_malformed_address;
}

fn email_login_binds_one_account<L: TestLedger>() {
    let mut w = world::<L>();
    let mut rng = StdRng::seed_from_u64(42);
    let mut wallet = EmbeddedWallet::new();
    assert!(!wallet.is_connected());

    let code = wallet.send_code_with("  Ada@Example.com ", &mut rng).unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));

    let first = wallet
        .authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "ada@example.com".into(),
                code,
            },
        )
        .unwrap();
    assert!(wallet.is_connected());
    assert_eq!(wallet.current_address(), Some(first.clone()));

    wallet.logout();
    assert_eq!(wallet.current_address(), None);

    let code = wallet.send_code_with("ada@example.com", &mut rng).unwrap();
    let second = wallet
        .authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "ADA@example.com".into(),
                code,
            },
        )
        .unwrap();
    assert_eq!(first, second);
}

fn email_login_rejects_bad_codes<L: TestLedger>() {
    let mut w = world::<L>();
    let mut wallet = EmbeddedWallet::new();

    assert_eq!(
        wallet.send_code("not-an-email"),
        Err(AuthError::InvalidEmail("not-an-email".into()))
    );
    assert!(matches!(
        wallet.authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "bob@example.com".into(),
                code: "123456".into(),
            },
        ),
        Err(ClientError::Auth(AuthError::NoPendingCode))
    ));

    let code = wallet.send_code("bob@example.com").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };
    assert!(matches!(
        wallet.authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "bob@example.com".into(),
                code: wrong.into(),
            },
        ),
        Err(ClientError::Auth(AuthError::WrongCode))
    ));
    assert!(!wallet.is_connected());

    // A wrong guess does not burn the code.
    wallet
        .authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "bob@example.com".into(),
                code: code.clone(),
            },
        )
        .unwrap();

    // It is single use.
    wallet.logout();
    assert!(matches!(
        wallet.authenticate(
            &mut w.client,
            AuthMethod::EmailCode {
                email: "bob@example.com".into(),
                code,
            },
        ),
        Err(ClientError::Auth(AuthError::NoPendingCode))
    ));
}

fn wallet_sends_tokens<L: TestLedger>() {
    let mut w = world::<L>();
    let (agent, token) = (w.agent.clone(), w.token.clone());
    let friend = w.client.create_account();

    let mut wallet = EmbeddedWallet::new();
    assert!(matches!(
        wallet.send_transaction(&mut w.client, &friend, &token, 10),
        Err(ClientError::NotConnected)
    ));

    let mut wallet = signed_in(&mut w, &agent);
    wallet.send_transaction(&mut w.client, &friend, &token, 500).unwrap();
    assert_eq!(w.balance(&friend), 500);
    assert_eq!(w.balance(&agent), AGENT_FUNDS - 500);
}

fn external_login_rejects_malformed_address<L: TestLedger>() {
    let mut w = world::<L>();
    let mut wallet = EmbeddedWallet::new();
    for bad in ["0xabc", "", "GABC"] {
        assert!(matches!(
            wallet.authenticate(&mut w.client, AuthMethod::External(Account::new(bad))),
            Err(ClientError::Auth(AuthError::InvalidAddress(_)))
        ));
        assert!(!wallet.is_connected());
    }

    let agent = w.agent.clone();
    let padded = Account::new(format!("  {agent} "));
    let address = wallet
        .authenticate(&mut w.client, AuthMethod::External(padded))
        .unwrap();
    assert_eq!(address, agent);
}

/// A wallet whose session address was never checked.
struct UncheckedWallet(Account);

impl WalletProvider for UncheckedWallet {
    fn authenticate<L: Ledger>(
        &mut self,
        _client: &mut VoucherClient<L>,
        _method: AuthMethod,
    ) -> Result<Account, ClientError> {
        Ok(self.0.clone())
    }

    fn current_address(&self) -> Option<Account> {
        Some(self.0.clone())
    }

    fn logout(&mut self) {}

    fn send_transaction<L: Ledger>(
        &mut self,
        client: &mut VoucherClient<L>,
        to: &Account,
        token: &Account,
        value: i128,
    ) -> Result<Receipt, ClientError> {
        client.transfer(&self.0, token, to, value)
    }
}

// ─── Redeem flow ─────────────────────────────────────────

both_backends! {
    redeem_flow_happy_path => redeem_flow_happy_path;
    redeem_flow_input_problems => redeem_flow_input_problems;
    redeem_flow_needs_wallet => redeem_flow_needs_wallet;
    redeem_flow_reports_expired => redeem_flow_reports_expired;
    redeem_flow_rejects_malformed_recipient => redeem_flow_rejects_malformed_recipient;
}

fn redeem_flow_happy_path<L: TestLedger>() {
    let mut w = world::<L>();
    let code = w.minted("VC-FLOW-FLOW-FLOW", 100, Some(7));
    let recipient = w.client.create_account();
    let wallet = signed_in(&mut w, &recipient);

    let mut flow = RedeemFlow::from_config(&config_for(&w));
    assert_eq!(flow.state(), &RedeemState::NotChecked);
    assert_eq!(flow.message(), None);

    flow.set_code(&format!("  {}  ", code.expose()));
    match flow.check(&w.client) {
        RedeemState::Checked(status) => {
            assert!(status.is_redeemable());
            assert_eq!(status.token_value, 100);
        }
        other => panic!("unexpected state {other:?}"),
    }
    assert_eq!(
        flow.message().as_deref(),
        Some("Voucher is valid and ready to redeem")
    );

    match flow.redeem(&mut w.client, &wallet).unwrap() {
        RedeemState::Redeemed(receipt) => assert_eq!(receipt.redeemed_payout(), Some(99)),
        other => panic!("unexpected state {other:?}"),
    }
    assert_eq!(w.balance(&recipient), 99);

    // Same code again: the ledger says no.
    let state = flow.redeem(&mut w.client, &wallet).unwrap();
    assert_eq!(
        state,
        &RedeemState::Rejected(VoucherChainError::VoucherAlreadyRedeemed)
    );
    assert_eq!(
        flow.message().as_deref(),
        Some("Voucher has already been redeemed")
    );
    assert_eq!(w.balance(&recipient), 99);
}

fn redeem_flow_input_problems<L: TestLedger>() {
    let w = world::<L>();
    let mut flow = RedeemFlow::new(12);

    flow.set_code("   ");
    assert_eq!(
        flow.check(&w.client),
        &RedeemState::InvalidInput(InputError::EmptyCode)
    );

    flow.set_code("VC-SHORT");
    assert_eq!(
        flow.check(&w.client),
        &RedeemState::InvalidInput(InputError::CodeTooShort { min: 12 })
    );
    assert!(flow.message().unwrap().contains("12"));

    flow.set_code("VC-UNKN-OWNC-ODEX");
    match flow.check(&w.client) {
        RedeemState::Checked(status) => assert!(!status.exists),
        other => panic!("unexpected state {other:?}"),
    }
    assert_eq!(flow.message().as_deref(), Some("Invalid voucher code"));
}

fn redeem_flow_needs_wallet<L: TestLedger>() {
    let mut w = world::<L>();
    let code = w.minted("VC-NOWA-LLET-XXXX", 100, Some(7));
    let wallet = EmbeddedWallet::new();

    let mut flow = RedeemFlow::new(12);
    flow.set_code(code.expose());
    flow.check(&w.client);
    assert!(matches!(
        flow.redeem(&mut w.client, &wallet),
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(flow.state(), RedeemState::Checked(_)));
    assert!(w.client.check_voucher_status(&code).unwrap().is_redeemable());
}

fn redeem_flow_reports_expired<L: TestLedger>() {
    let mut w = world::<L>();
    let code = w.minted("VC-OLDV-OUCH-ERXX", 100, Some(1));
    w.warp(2 * DAY);
    let recipient = w.client.create_account();
    let wallet = signed_in(&mut w, &recipient);

    let mut flow = RedeemFlow::new(12);
    flow.set_code(code.expose());
    flow.check(&w.client);
    assert_eq!(flow.message().as_deref(), Some("Voucher has expired"));

    let state = flow.redeem(&mut w.client, &wallet).unwrap();
    assert_eq!(state, &RedeemState::Rejected(VoucherChainError::VoucherExpired));
    assert_eq!(w.balance(&recipient), 0);
}

fn redeem_flow_rejects_malformed_recipient<L: TestLedger>() {
    let mut w = world::<L>();
    let code = w.minted("VC-BADR-ECIP-IENT", 100, Some(7));
    let wallet = UncheckedWallet(Account::new("0xabc"));

    let mut flow = RedeemFlow::new(12);
    flow.set_code(code.expose());
    let state = flow.redeem(&mut w.client, &wallet).unwrap();
    assert_eq!(
        state,
        &RedeemState::InvalidInput(InputError::InvalidAddress("0xabc".into()))
    );
    assert!(flow.message().unwrap().contains("0xabc"));
    assert!(w.client.check_voucher_status(&code).unwrap().is_redeemable());
    assert_eq!(w.held(), 100);
}

// ─── Mint flow ───────────────────────────────────────────

both_backends! {
    mint_flow_single_voucher => mint_flow_single_voucher;
    mint_flow_batch => mint_flow_batch;
    mint_flow_validation => mint_flow_validation;
}

fn mint_flow_single_voucher<L: TestLedger>() {
    let mut w = world::<L>();
    let config = config_for(&w);
    let agent = w.agent.clone();
    let wallet = signed_in(&mut w, &agent);

    let outcome = MintFlow::new(&config)
        .execute(&mut w.client, &wallet, &request("1", 1, None))
        .unwrap();
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.mint.minted_hashes().len(), 1);
    let codes = outcome.into_codes();

    let status = w.client.check_voucher_status(&codes[0]).unwrap();
    assert!(status.is_redeemable());
    assert_eq!(status.token_value, 100);
    assert_eq!(status.issuer, Some(agent.clone()));
    assert_eq!(w.balance(&agent), AGENT_FUNDS - 102);
}

fn mint_flow_batch<L: TestLedger>() {
    let mut w = world::<L>();
    let config = config_for(&w);
    let agent = w.agent.clone();
    let wallet = signed_in(&mut w, &agent);

    let outcome = MintFlow::new(&config)
        .execute(&mut w.client, &wallet, &request("0.5", 4, Some(3)))
        .unwrap();
    assert_eq!(outcome.mint.minted_hashes().len(), 4);
    let codes = outcome.into_codes();
    assert_eq!(codes.len(), 4);
    for code in &codes {
        let status = w.client.check_voucher_status(code).unwrap();
        assert_eq!(status.token_value, 50);
        assert_eq!(status.expiry_timestamp, 3 * DAY);
    }
    // 50 + 1 fee, four times; the approval is used up exactly.
    assert_eq!(w.balance(&agent), AGENT_FUNDS - 204);
    assert_eq!(w.client.allowance(&w.token, &agent).unwrap(), 0);
    assert_eq!(w.held(), 200);
}

fn mint_flow_validation<L: TestLedger>() {
    let mut w = world::<L>();
    let config = config_for(&w);
    let flow = MintFlow::new(&config);

    let mut unknown = request("1", 1, None);
    unknown.token_symbol = "BTC".into();
    assert_eq!(
        flow.validate(&unknown),
        Err(InputError::UnknownToken("BTC".into()))
    );
    assert_eq!(
        flow.validate(&request("0.001", 1, None)),
        Err(InputError::TooManyDecimals { decimals: 2 })
    );
    assert_eq!(
        flow.validate(&request("0", 1, None)),
        Err(InputError::NonPositiveAmount)
    );
    assert_eq!(
        flow.validate(&request("1", 0, None)),
        Err(InputError::InvalidQuantity { max: 50 })
    );
    assert_eq!(
        flow.validate(&request("1", 51, None)),
        Err(InputError::InvalidQuantity { max: 50 })
    );
    assert_eq!(
        flow.validate(&request("1", 1, Some(366))),
        Err(InputError::ExpiryTooLong { max: 365 })
    );
    let ok = flow.validate(&request("2.25", 2, Some(0))).unwrap();
    assert_eq!(ok.token_value, 225);
    assert_eq!(ok.token, w.token);

    // Nobody signed in: nothing reaches the ledger.
    let wallet = EmbeddedWallet::new();
    assert!(matches!(
        flow.execute(&mut w.client, &wallet, &request("1", 1, None)),
        Err(ClientError::NotConnected)
    ));
    assert_eq!(w.client.contract_stats().unwrap().total_minted, 0);
}

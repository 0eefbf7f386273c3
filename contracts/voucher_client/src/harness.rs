//! Shared fixtures for the client tests. Every scenario runs once per ledger
//! backend through [`both_backends!`].

use stellar_strkey::ed25519;

use crate::{Account, InMemoryLedger, Ledger, SorobanLedger, VoucherClient, VoucherCode};

pub const MINTING_FEE: u32 = 200; // 2 %
pub const REDEMPTION_FEE: u32 = 100; // 1 %
pub const DEFAULT_EXPIRY_DAYS: u32 = 30;
pub const AGENT_FUNDS: i128 = 10_000;
pub const DAY: u64 = 86_400;

/// Backend-specific setup the [`Ledger`] trait does not cover.
pub trait TestLedger: Ledger + Sized {
    /// Initialised ledger plus its owner and treasury.
    fn boot() -> (Self, Account, Account);
    fn new_token(&mut self) -> Account;
    fn credit(&mut self, token: &Account, to: &Account, amount: i128);
    fn warp(&mut self, seconds: u64);
}

impl TestLedger for InMemoryLedger {
    fn boot() -> (Self, Account, Account) {
        let owner = Account::new(ed25519::PublicKey([0xA1; 32]).to_string());
        let treasury = Account::new(ed25519::PublicKey([0xA2; 32]).to_string());
        let ledger = InMemoryLedger::new(
            owner.clone(),
            treasury.clone(),
            MINTING_FEE,
            REDEMPTION_FEE,
            DEFAULT_EXPIRY_DAYS,
        )
        .unwrap();
        (ledger, owner, treasury)
    }

    fn new_token(&mut self) -> Account {
        self.create_token()
    }

    fn credit(&mut self, token: &Account, to: &Account, amount: i128) {
        self.fund(token, to, amount);
    }

    fn warp(&mut self, seconds: u64) {
        self.advance_time(seconds);
    }
}

impl TestLedger for SorobanLedger {
    fn boot() -> (Self, Account, Account) {
        let mut ledger = SorobanLedger::new();
        let owner = ledger.create_account();
        let treasury = ledger.create_account();
        ledger
            .init(&owner, &treasury, MINTING_FEE, REDEMPTION_FEE, DEFAULT_EXPIRY_DAYS)
            .unwrap();
        (ledger, owner, treasury)
    }

    fn new_token(&mut self) -> Account {
        self.create_token()
    }

    fn credit(&mut self, token: &Account, to: &Account, amount: i128) {
        self.fund(token, to, amount).unwrap();
    }

    fn warp(&mut self, seconds: u64) {
        self.advance_time(seconds);
    }
}

pub struct World<L: TestLedger> {
    pub client: VoucherClient<L>,
    pub owner: Account,
    pub treasury: Account,
    pub agent: Account,
    pub token: Account,
}

/// Initialised ledger with one whitelisted token and one registered,
/// authorized, funded agent. No allowance is granted yet.
pub fn world<L: TestLedger>() -> World<L> {
    let (mut ledger, owner, treasury) = L::boot();
    let token = ledger.new_token();
    let agent = ledger.create_account();
    ledger.credit(&token, &agent, AGENT_FUNDS);

    let mut client = VoucherClient::new(ledger);
    client.add_supported_token(&owner, &token).unwrap();
    client.register_agent(&owner, &agent, 100).unwrap();
    client.add_authorized_minter(&owner, &agent).unwrap();

    World {
        client,
        owner,
        treasury,
        agent,
        token,
    }
}

impl<L: TestLedger> World<L> {
    pub fn warp(&mut self, seconds: u64) {
        self.client.ledger_mut().warp(seconds);
    }

    /// Let the ledger pull all of the agent's funds.
    pub fn approve_all(&mut self) {
        let (agent, token) = (self.agent.clone(), self.token.clone());
        self.client.approve_spending(&agent, &token, AGENT_FUNDS).unwrap();
    }

    /// Approve and mint `code` as the agent.
    pub fn minted(&mut self, code: &str, value: i128, expiry_days: Option<u32>) -> VoucherCode {
        self.approve_all();
        let code = VoucherCode::new(code);
        let (agent, token) = (self.agent.clone(), self.token.clone());
        self.client
            .mint(&agent, &code, &token, value, expiry_days)
            .unwrap();
        code
    }

    pub fn balance(&self, holder: &Account) -> i128 {
        self.client.token_balance(&self.token, holder).unwrap()
    }

    pub fn held(&self) -> i128 {
        self.client.contract_token_balance(&self.token).unwrap()
    }
}

/// Expand each `name => scenario;` into a module with one test per backend.
macro_rules! both_backends {
    ($($name:ident => $scenario:ident;)*) => {
        $(
            mod $name {
                #[test]
                fn in_memory() {
                    super::$scenario::<crate::InMemoryLedger>();
                }

                #[test]
                fn soroban() {
                    super::$scenario::<crate::SorobanLedger>();
                }
            }
        )*
    };
}

pub(crate) use both_backends;

//! Conversions between client types and the XDR values a deployed ledger
//! contract takes and returns.
//!
//! Contract structs travel as symbol-keyed maps with keys in ascending
//! order, `Option::None` as `Void`, and `BytesN<32>` as plain bytes.

use stellar_strkey::{ed25519, Contract, Strkey};
use stellar_xdr::curr::{
    AccountId, Hash, Int128Parts, PublicKey, ScAddress, ScBytes, ScMap, ScMapEntry, ScSymbol,
    ScVal, ScVec, Uint256,
};

use super::{LedgerFailure, LedgerResult};
use crate::types::Account;

fn malformed(what: impl std::fmt::Display) -> LedgerFailure {
    LedgerFailure::Transport(format!("undecodable result: {what}"))
}

// ── Encoding ────────────────────────────────────────────────

pub(crate) fn address(account: &Account) -> LedgerResult<ScVal> {
    Ok(ScVal::Address(sc_address(account)?))
}

pub(crate) fn sc_address(account: &Account) -> LedgerResult<ScAddress> {
    match Strkey::from_string(account.as_str()) {
        Ok(Strkey::PublicKeyEd25519(ed25519::PublicKey(key))) => Ok(ScAddress::Account(
            AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key))),
        )),
        Ok(Strkey::Contract(Contract(hash))) => Ok(ScAddress::Contract(Hash(hash))),
        _ => Err(LedgerFailure::InvalidAddress(account.to_string())),
    }
}

pub(crate) fn bytes(data: &[u8]) -> LedgerResult<ScVal> {
    let data = data.to_vec().try_into().map_err(malformed)?;
    Ok(ScVal::Bytes(ScBytes(data)))
}

pub(crate) fn i128(value: i128) -> ScVal {
    ScVal::I128(Int128Parts {
        hi: (value >> 64) as i64,
        lo: value as u64,
    })
}

pub(crate) fn vec(items: Vec<ScVal>) -> LedgerResult<ScVal> {
    let items = items.try_into().map_err(malformed)?;
    Ok(ScVal::Vec(Some(ScVec(items))))
}

/// Struct-shaped map; entries are sorted by key.
pub(crate) fn record(mut fields: Vec<(&str, ScVal)>) -> LedgerResult<ScVal> {
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let entries = fields
        .into_iter()
        .map(|(name, val)| Ok(ScMapEntry { key: symbol(name)?, val }))
        .collect::<LedgerResult<Vec<_>>>()?;
    let entries = entries.try_into().map_err(malformed)?;
    Ok(ScVal::Map(Some(ScMap(entries))))
}

pub(crate) fn symbol(name: &str) -> LedgerResult<ScVal> {
    let name = name.try_into().map_err(malformed)?;
    Ok(ScVal::Symbol(ScSymbol(name)))
}

// ── Decoding ────────────────────────────────────────────────

pub(crate) fn account_of(address: &ScAddress) -> Account {
    match address {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(key)))) => {
            Account::new(ed25519::PublicKey(*key).to_string())
        }
        ScAddress::Contract(Hash(hash)) => Account::new(Contract(*hash).to_string()),
    }
}

pub(crate) fn symbol_name(val: &ScVal) -> Option<String> {
    match val {
        ScVal::Symbol(ScSymbol(name)) => name.to_utf8_string().ok(),
        _ => None,
    }
}

pub(crate) fn as_bool(val: &ScVal) -> LedgerResult<bool> {
    match val {
        ScVal::Bool(b) => Ok(*b),
        other => Err(malformed(format!("expected bool, got {}", other.name()))),
    }
}

pub(crate) fn as_u32(val: &ScVal) -> LedgerResult<u32> {
    match val {
        ScVal::U32(n) => Ok(*n),
        other => Err(malformed(format!("expected u32, got {}", other.name()))),
    }
}

pub(crate) fn as_u64(val: &ScVal) -> LedgerResult<u64> {
    match val {
        ScVal::U64(n) => Ok(*n),
        other => Err(malformed(format!("expected u64, got {}", other.name()))),
    }
}

pub(crate) fn as_i128(val: &ScVal) -> LedgerResult<i128> {
    match val {
        ScVal::I128(Int128Parts { hi, lo }) => Ok(((*hi as i128) << 64) | *lo as i128),
        other => Err(malformed(format!("expected i128, got {}", other.name()))),
    }
}

pub(crate) fn as_account(val: &ScVal) -> LedgerResult<Account> {
    match val {
        ScVal::Address(address) => Ok(account_of(address)),
        other => Err(malformed(format!("expected address, got {}", other.name()))),
    }
}

pub(crate) fn as_hash(val: &ScVal) -> LedgerResult<[u8; 32]> {
    match val {
        ScVal::Bytes(ScBytes(data)) => data
            .as_slice()
            .try_into()
            .map_err(|_| malformed(format!("expected 32 bytes, got {}", data.len()))),
        other => Err(malformed(format!("expected bytes, got {}", other.name()))),
    }
}

/// Field access on a struct-shaped map.
pub(crate) struct Fields<'a>(&'a ScMap);

impl<'a> Fields<'a> {
    pub(crate) fn of(val: &'a ScVal) -> LedgerResult<Self> {
        match val {
            ScVal::Map(Some(map)) => Ok(Fields(map)),
            other => Err(malformed(format!("expected struct, got {}", other.name()))),
        }
    }

    pub(crate) fn get(&self, name: &str) -> LedgerResult<&'a ScVal> {
        self.0
            .iter()
            .find(|entry| symbol_name(&entry.key).as_deref() == Some(name))
            .map(|entry| &entry.val)
            .ok_or_else(|| malformed(format!("missing field `{name}`")))
    }

    pub(crate) fn bool(&self, name: &str) -> LedgerResult<bool> {
        as_bool(self.get(name)?)
    }

    pub(crate) fn u32(&self, name: &str) -> LedgerResult<u32> {
        as_u32(self.get(name)?)
    }

    pub(crate) fn u64(&self, name: &str) -> LedgerResult<u64> {
        as_u64(self.get(name)?)
    }

    pub(crate) fn i128(&self, name: &str) -> LedgerResult<i128> {
        as_i128(self.get(name)?)
    }

    pub(crate) fn account(&self, name: &str) -> LedgerResult<Account> {
        as_account(self.get(name)?)
    }

    pub(crate) fn optional_account(&self, name: &str) -> LedgerResult<Option<Account>> {
        match self.get(name)? {
            ScVal::Void => Ok(None),
            other => as_account(other).map(Some),
        }
    }

    pub(crate) fn hash(&self, name: &str) -> LedgerResult<[u8; 32]> {
        as_hash(self.get(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_account(seed: u8) -> Account {
        Account::new(ed25519::PublicKey([seed; 32]).to_string())
    }

    #[test]
    fn test_i128_keeps_sign_and_magnitude() {
        for value in [0, 1, -1, i128::MAX, i128::MIN, 1 << 70, -(1 << 70) + 3] {
            assert_eq!(as_i128(&i128(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_addresses_keep_their_kind() {
        let account = key_account(7);
        let contract = Account::new(Contract([9; 32]).to_string());
        assert!(matches!(sc_address(&account), Ok(ScAddress::Account(_))));
        assert!(matches!(sc_address(&contract), Ok(ScAddress::Contract(_))));
        assert_eq!(as_account(&address(&account).unwrap()).unwrap(), account);
        assert_eq!(as_account(&address(&contract).unwrap()).unwrap(), contract);
    }

    #[test]
    fn test_non_strkey_address_is_rejected() {
        assert_eq!(
            address(&Account::new("0xabc")),
            Err(LedgerFailure::InvalidAddress("0xabc".into()))
        );
        let secret = stellar_strkey::ed25519::PrivateKey([3; 32]).to_string();
        assert!(matches!(
            address(&Account::new(secret)),
            Err(LedgerFailure::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_sorts_keys_and_reads_back() {
        let val = record(vec![
            ("voucher_hashes", vec(vec![bytes(&[1; 32]).unwrap()]).unwrap()),
            ("tokens", ScVal::Void),
            ("token_values", i128(5)),
            ("expiry_days", ScVal::U32(3)),
        ])
        .unwrap();
        let ScVal::Map(Some(map)) = &val else {
            panic!("not a map");
        };
        let keys: Vec<String> = map.iter().filter_map(|e| symbol_name(&e.key)).collect();
        assert_eq!(keys, ["expiry_days", "token_values", "tokens", "voucher_hashes"]);

        let fields = Fields::of(&val).unwrap();
        assert_eq!(fields.u32("expiry_days").unwrap(), 3);
        assert_eq!(fields.i128("token_values").unwrap(), 5);
        assert_eq!(fields.optional_account("tokens").unwrap(), None);
        assert!(matches!(fields.get("missing"), Err(LedgerFailure::Transport(_))));
        assert!(matches!(fields.bool("expiry_days"), Err(LedgerFailure::Transport(_))));
    }
}

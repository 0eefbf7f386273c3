use proptest::prelude::*;

use crate::{ClientError, InputError, LedgerFailure, VoucherChainError};

#[test]
fn test_every_contract_error_maps_by_name_and_code() {
    use voucher_ledger::Error;
    let all = [
        (Error::VoucherNotFound, VoucherChainError::VoucherNotFound),
        (Error::VoucherAlreadyRedeemed, VoucherChainError::VoucherAlreadyRedeemed),
        (Error::VoucherExpired, VoucherChainError::VoucherExpired),
        (Error::VoucherNotExpired, VoucherChainError::VoucherNotExpired),
        (Error::TokenNotSupported, VoucherChainError::TokenNotSupported),
        (Error::UnauthorizedMinter, VoucherChainError::UnauthorizedMinter),
        (Error::InsufficientBalance, VoucherChainError::InsufficientBalance),
        (Error::InvalidFee, VoucherChainError::InvalidFee),
        (Error::InvalidExpiry, VoucherChainError::InvalidExpiry),
        (Error::DuplicateVoucherCode, VoucherChainError::DuplicateVoucherCode),
        (Error::AgentNotActive, VoucherChainError::AgentNotActive),
        (Error::InvalidBatchSize, VoucherChainError::InvalidBatchSize),
        (Error::TokenTransferFailed, VoucherChainError::TokenTransferFailed),
        (Error::InvalidAmount, VoucherChainError::InvalidAmount),
        (Error::NotOwner, VoucherChainError::NotOwner),
        (Error::AlreadyInitialized, VoucherChainError::AlreadyInitialized),
        (Error::NotInitialized, VoucherChainError::NotInitialized),
        (Error::ContractPaused, VoucherChainError::ContractPaused),
    ];
    for (error, category) in all {
        assert_eq!(VoucherChainError::from_reason(&format!("{error:?}")), category);
        let code = error as u32;
        assert_eq!(
            VoucherChainError::from_reason(&format!("HostError: Error(Contract, #{code})")),
            category
        );
        assert_eq!(VoucherChainError::from_code(code), Some(category));
    }
}

#[test]
fn test_named_category_beats_embedded_code() {
    assert_eq!(
        VoucherChainError::from_reason("TokenTransferFailed: Error(Contract, #10)"),
        VoucherChainError::TokenTransferFailed
    );
}

#[test]
fn test_unrecognized_reason_is_unknown() {
    let reason = "host aborted the call";
    assert_eq!(
        VoucherChainError::from_reason(reason),
        VoucherChainError::Unknown(reason.to_string())
    );
    assert_eq!(
        VoucherChainError::from_reason("Error(Contract, #99)"),
        VoucherChainError::Unknown("Error(Contract, #99)".to_string())
    );
    assert_eq!(VoucherChainError::from_code(0), None);
    assert_eq!(
        VoucherChainError::Unknown(reason.to_string()).user_message(),
        "An error occurred"
    );
}

#[test]
fn test_transport_failure_is_kept_apart() {
    let err = VoucherChainError::from(LedgerFailure::Transport("timeout".into()));
    assert_eq!(err, VoucherChainError::Transport("timeout".into()));
    assert!(!err.is_retry_safe());
    assert!(!VoucherChainError::VoucherNotFound.is_retry_safe());
}

#[test]
fn test_malformed_address_is_an_input_problem() {
    let err = ClientError::from(LedgerFailure::InvalidAddress("0xabc".into()));
    assert!(matches!(
        err,
        ClientError::InvalidInput(InputError::InvalidAddress(ref a)) if a == "0xabc"
    ));
    assert_eq!(err.user_message(), "`0xabc` is not a valid address");
    assert!(matches!(
        VoucherChainError::from(LedgerFailure::InvalidAddress("0xabc".into())),
        VoucherChainError::Unknown(_)
    ));
}

#[test]
fn test_user_messages() {
    assert_eq!(
        VoucherChainError::VoucherNotFound.user_message(),
        "Invalid voucher code"
    );
    assert_eq!(
        VoucherChainError::VoucherAlreadyRedeemed.user_message(),
        "Voucher has already been redeemed"
    );
    assert_eq!(
        VoucherChainError::VoucherExpired.user_message(),
        "Voucher has expired"
    );
    assert_eq!(
        ClientError::NotConnected.user_message(),
        "Please connect your wallet first"
    );
    assert_eq!(
        ClientError::from(InputError::EmptyCode).user_message(),
        "Voucher code is empty"
    );
    assert_eq!(
        ClientError::from(LedgerFailure::Reverted("DuplicateVoucherCode".into())).user_message(),
        "Voucher code already exists"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Any reason maps to some category; a reason that names no category
    /// and carries no known code is always Unknown with the raw text kept.
    #[test]
    fn prop_mapping_is_total(reason in ".*") {
        let category = VoucherChainError::from_reason(&reason);
        prop_assert!(!category.user_message().is_empty());
        if let VoucherChainError::Unknown(raw) = &category {
            prop_assert_eq!(raw, &reason);
        }
    }

    #[test]
    fn prop_reason_with_noise_still_maps(
        prefix in "[a-z :]{0,20}",
        suffix in "[a-z :]{0,20}",
        code in 1u32..=18,
    ) {
        let expected = VoucherChainError::from_code(code).unwrap();
        let reason = format!("{prefix}Error(Contract, #{code}){suffix}");
        prop_assert_eq!(VoucherChainError::from_reason(&reason), expected);
    }
}

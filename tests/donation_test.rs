//! Donation planning: gas-buffered native transfers and token transfers

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Bytes, TxKind, U256};
use common::{MockWallet, ALICE, CONTRACT, RECIPIENT};
use conjure::donation::{DonationError, DonationPlanner};
use conjure::engine::ConfirmPolicy;
use conjure::session::Signer;

const ONE_ETHER: u64 = 1_000_000_000_000_000_000;
const TWENTY_GWEI: u128 = 20_000_000_000;

fn planner(wallet: &MockWallet) -> DonationPlanner<'_> {
    DonationPlanner::new(wallet, RECIPIENT).with_confirm(ConfirmPolicy {
        timeout: Duration::from_millis(250),
        poll_interval: Duration::from_millis(1),
    })
}

fn signer(wallet: &Arc<MockWallet>) -> Signer {
    Signer::new(wallet.clone(), ALICE, 31337)
}

fn encode_uint(value: u64) -> Bytes {
    Bytes::from(
        DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(value), 256)]).abi_encode_params(),
    )
}

#[tokio::test]
async fn test_plan_native_donate_all() {
    let wallet = MockWallet::new();
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(ONE_ETHER));
        state.gas_estimate = 21_000;
        state.gas_price = Some(TWENTY_GWEI);
    }

    let plan = planner(&wallet).plan_native(ALICE, None).await.unwrap();

    // 21000 * 20 gwei * 1.5
    assert_eq!(plan.buffered_cost, U256::from(630_000_000_000_000u64));
    assert_eq!(plan.amount, U256::from(999_370_000_000_000_000u64));
    assert_eq!(plan.gas_limit, 21_000);
    assert_eq!(plan.gas_price, TWENTY_GWEI);
    assert_eq!(plan.recipient, RECIPIENT);
}

#[tokio::test]
async fn test_plan_native_requested_exceeds_balance() {
    let wallet = MockWallet::new();
    wallet.lock().balances.insert(ALICE, U256::from(500u64));

    let err = planner(&wallet)
        .plan_native(ALICE, Some(U256::from(1000u64)))
        .await
        .unwrap_err();

    // fails regardless of the gas buffer
    assert!(matches!(err, DonationError::InsufficientFunds { .. }));
}

#[tokio::test]
async fn test_plan_native_balance_eaten_by_gas() {
    let wallet = MockWallet::new();
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(100_000u64));
        state.gas_price = Some(TWENTY_GWEI);
    }

    let err = planner(&wallet).plan_native(ALICE, None).await.unwrap_err();
    assert!(matches!(err, DonationError::InsufficientFunds { .. }));
}

#[tokio::test]
async fn test_fee_fallback_order() {
    let wallet = MockWallet::new();
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(ONE_ETHER));
        state.gas_price = None;
        state.max_fee_per_gas = Some(7_000_000_000);
    }
    let plan = planner(&wallet).plan_native(ALICE, None).await.unwrap();
    assert_eq!(plan.gas_price, 7_000_000_000);

    // with neither source available, the fixed 20 gwei default applies
    wallet.lock().max_fee_per_gas = None;
    let plan = planner(&wallet).plan_native(ALICE, None).await.unwrap();
    assert_eq!(plan.gas_price, TWENTY_GWEI);
}

#[tokio::test]
async fn test_plan_native_requested_within_balance() {
    let wallet = MockWallet::new();
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(ONE_ETHER));
        state.gas_price = Some(TWENTY_GWEI);
    }

    let requested = U256::from(ONE_ETHER / 2);
    let plan = planner(&wallet)
        .plan_native(ALICE, Some(requested))
        .await
        .unwrap();
    assert_eq!(plan.amount, requested, "requested amounts transfer exactly");
}

#[tokio::test]
async fn test_execute_native_sends_planned_amount() {
    let wallet = Arc::new(MockWallet::new());
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(ONE_ETHER));
        state.gas_price = Some(TWENTY_GWEI);
    }

    let plan = planner(&wallet).plan_native(ALICE, None).await.unwrap();
    let tx_hash = planner(&wallet)
        .execute_native(&signer(&wallet), &plan)
        .await
        .unwrap();

    let state = wallet.lock();
    assert_eq!(state.sent.len(), 1);
    assert_eq!(state.sent[0].to, Some(TxKind::Call(RECIPIENT)));
    assert_eq!(state.sent[0].value, Some(plan.amount));
    assert!(state.receipts.contains_key(&tx_hash));
}

#[tokio::test]
async fn test_execute_native_reverted() {
    let wallet = Arc::new(MockWallet::new());
    {
        let mut state = wallet.lock();
        state.balances.insert(ALICE, U256::from(ONE_ETHER));
        state.revert_receipts = true;
    }

    let plan = planner(&wallet).plan_native(ALICE, None).await.unwrap();
    let err = planner(&wallet)
        .execute_native(&signer(&wallet), &plan)
        .await
        .unwrap_err();
    assert_eq!(err, DonationError::Reverted);
}

#[tokio::test]
async fn test_token_info_reads_metadata_and_balance() {
    let wallet = MockWallet::new();
    {
        let mut state = wallet.lock();
        state
            .call_responses
            .insert([0x70, 0xa0, 0x82, 0x31], encode_uint(500_000)); // balanceOf
        state
            .call_responses
            .insert([0x31, 0x3c, 0xe5, 0x67], encode_uint(6)); // decimals
        state.call_responses.insert(
            [0x95, 0xd8, 0x9b, 0x41], // symbol
            Bytes::from(
                DynSolValue::Tuple(vec![DynSolValue::String("USDC".to_string())])
                    .abi_encode_params(),
            ),
        );
    }

    let info = planner(&wallet).token_info(CONTRACT, ALICE).await.unwrap();
    assert_eq!(info.symbol, "USDC");
    assert_eq!(info.decimals, 6);
    assert_eq!(info.balance, U256::from(500_000u64));
    assert!(wallet.lock().sent.is_empty(), "metadata reads never submit");
}

#[tokio::test]
async fn test_plan_token_donate_all_takes_full_balance() {
    let wallet = MockWallet::new();
    wallet
        .lock()
        .call_responses
        .insert([0x70, 0xa0, 0x82, 0x31], encode_uint(500_000));

    let plan = planner(&wallet)
        .plan_token(CONTRACT, ALICE, None)
        .await
        .unwrap();
    // no gas deduction from the token amount
    assert_eq!(plan.amount, U256::from(500_000u64));
    assert_eq!(plan.token, CONTRACT);
}

#[tokio::test]
async fn test_plan_token_requested_checked_against_balance() {
    let wallet = MockWallet::new();
    wallet
        .lock()
        .call_responses
        .insert([0x70, 0xa0, 0x82, 0x31], encode_uint(1_000));

    let plan = planner(&wallet)
        .plan_token(CONTRACT, ALICE, Some(U256::from(900u64)))
        .await
        .unwrap();
    assert_eq!(plan.amount, U256::from(900u64));

    let err = planner(&wallet)
        .plan_token(CONTRACT, ALICE, Some(U256::from(1_001u64)))
        .await
        .unwrap_err();
    assert!(matches!(err, DonationError::InsufficientFunds { .. }));
}

#[tokio::test]
async fn test_plan_token_donate_all_with_zero_balance() {
    let wallet = MockWallet::new();
    wallet
        .lock()
        .call_responses
        .insert([0x70, 0xa0, 0x82, 0x31], encode_uint(0));

    let err = planner(&wallet)
        .plan_token(CONTRACT, ALICE, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DonationError::InsufficientFunds { .. }));
}

#[tokio::test]
async fn test_execute_token_sends_transfer_calldata() {
    let wallet = Arc::new(MockWallet::new());
    wallet
        .lock()
        .call_responses
        .insert([0x70, 0xa0, 0x82, 0x31], encode_uint(1_000));

    let plan = planner(&wallet)
        .plan_token(CONTRACT, ALICE, None)
        .await
        .unwrap();
    planner(&wallet)
        .execute_token(&signer(&wallet), &plan)
        .await
        .unwrap();

    let state = wallet.lock();
    assert_eq!(state.sent.len(), 1);
    assert_eq!(state.sent[0].to, Some(TxKind::Call(CONTRACT)));
    let input = state.sent[0].input.input().unwrap();
    // transfer(address,uint256)
    assert_eq!(&input[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    assert_eq!(input.len(), 4 + 64);
}

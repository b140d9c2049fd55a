use payledger::application::settlement::SettlementEngine;
use payledger::domain::money::{Amount, Balance};
use payledger::domain::order::{CaptureRequest, OrderStatus};
use payledger::domain::signature::{sign, SignatureVerifier};
use payledger::error::PaymentError;
use payledger::infrastructure::gateway::mock::MockGateway;
use payledger::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryOrderRegistry};

const SECRET: &str = "settlement_test_secret";

fn engine(gateway: MockGateway) -> SettlementEngine {
    SettlementEngine::new(
        Box::new(gateway),
        Box::new(InMemoryOrderRegistry::new()),
        Box::new(InMemoryLedgerStore::new()),
        SignatureVerifier::new(SECRET).unwrap(),
    )
}

fn signed_capture(order_id: &str, payment_id: &str) -> CaptureRequest {
    CaptureRequest {
        order_id: order_id.to_string(),
        payment_id: Some(payment_id.to_string()),
        signature: Some(sign(SECRET, order_id, payment_id)),
        user_id: None,
    }
}

#[tokio::test]
async fn test_full_settlement_flow() {
    let engine = engine(MockGateway::hosted());
    let amount = Amount::from_minor_units(1000).unwrap();

    let order = engine.create_order(amount, "u1").await.unwrap();
    assert_eq!(order.status, OrderStatus::Created);

    let settlement = engine
        .capture_order(signed_capture(&order.order_id, "pay_xyz"))
        .await
        .unwrap();
    assert!(!settlement.replayed);
    assert_eq!(settlement.amount, amount);

    assert_eq!(engine.balance("u1").await.unwrap(), Balance::new(1000));
    let orders = engine.all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Captured);
}

#[tokio::test]
async fn test_retried_callback_settles_once() {
    let engine = engine(MockGateway::hosted());
    let amount = Amount::from_minor_units(1000).unwrap();
    let order = engine.create_order(amount, "u1").await.unwrap();

    let request = signed_capture(&order.order_id, "pay_xyz");
    engine.capture_order(request.clone()).await.unwrap();
    let replay = engine.capture_order(request).await.unwrap();

    assert!(replay.replayed);
    assert_eq!(engine.balance("u1").await.unwrap(), Balance::new(1000));
}

#[tokio::test]
async fn test_signature_over_other_payment_rejected() {
    let engine = engine(MockGateway::hosted());
    let amount = Amount::from_minor_units(1000).unwrap();
    let order = engine.create_order(amount, "u1").await.unwrap();

    let request = CaptureRequest {
        order_id: order.order_id.clone(),
        payment_id: Some("pay_xyz".to_string()),
        signature: Some(sign(SECRET, &order.order_id, "pay_other")),
        user_id: None,
    };
    assert!(matches!(
        engine.capture_order(request).await,
        Err(PaymentError::SignatureInvalid)
    ));
    assert_eq!(engine.balance("u1").await.unwrap(), Balance::ZERO);
}

#[tokio::test]
async fn test_many_users_settle_independently() {
    let engine = engine(MockGateway::hosted());

    for i in 1..=20u32 {
        let amount = Amount::from_minor_units(i64::from(i)).unwrap();
        let order = engine
            .create_order(amount, &format!("user_{i}"))
            .await
            .unwrap();
        engine
            .capture_order(signed_capture(&order.order_id, &format!("pay_{i}")))
            .await
            .unwrap();
    }

    let accounts = engine.all_accounts().await.unwrap();
    assert_eq!(accounts.len(), 20);
    for i in 1..=20u32 {
        assert_eq!(
            engine.balance(&format!("user_{i}")).await.unwrap(),
            Balance::new(i64::from(i))
        );
    }
    assert!(engine
        .all_orders()
        .await
        .unwrap()
        .iter()
        .all(|order| order.status == OrderStatus::Captured));
}

#[tokio::test]
async fn test_random_amounts_settle_to_their_sum() {
    use rand::Rng;

    let engine = engine(MockGateway::hosted());
    let mut rng = rand::thread_rng();
    let mut expected: i64 = 0;

    for i in 1..=50u32 {
        let minor_units = rng.gen_range(1..=1_000_000i64);
        expected += minor_units;
        let amount = Amount::from_minor_units(minor_units).unwrap();
        let order = engine.create_order(amount, "u1").await.unwrap();
        engine
            .capture_order(signed_capture(&order.order_id, &format!("pay_{i}")))
            .await
            .unwrap();
    }

    assert_eq!(engine.balance("u1").await.unwrap(), Balance::new(expected));
}

#[tokio::test]
async fn test_trusted_gateway_flow() {
    let engine = engine(MockGateway::direct());
    let amount = Amount::from_minor_units(500).unwrap();
    let order = engine.create_order(amount, "u9").await.unwrap();

    let request = CaptureRequest {
        order_id: order.order_id,
        payment_id: None,
        signature: None,
        user_id: Some("u9".to_string()),
    };
    let settlement = engine.capture_order(request).await.unwrap();
    assert_eq!(settlement.user_id, "u9");
    assert_eq!(engine.balance("u9").await.unwrap(), Balance::new(500));
}

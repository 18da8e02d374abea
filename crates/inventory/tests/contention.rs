//! Reservation behaviour under concurrent load.

use domain::{Money, OrderLineItem};
use futures_util::future::join_all;
use inventory::{ReservationCoordinator, ReservationError};
use store::{InMemoryStore, Product, ProductId, ProductStore};

async fn seeded(products: &[(&str, i64)]) -> InMemoryStore {
    let store = InMemoryStore::new();
    for (id, stock) in products {
        store
            .insert_product(Product::new(
                *id,
                "V1",
                format!("Product {id}"),
                Money::from_cents(100),
                *stock,
            ))
            .await
            .unwrap();
    }
    store
}

fn line(product: &str, quantity: u32) -> OrderLineItem {
    OrderLineItem::new(product, "V1", product, quantity, Money::from_cents(100))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_goes_to_exactly_one_order() {
    let store = seeded(&[("LAST", 1)]).await;
    let coordinator = ReservationCoordinator::new(store.clone());

    let attempts = (0..16).map(|_| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            match coordinator.reserve(&[line("LAST", 1)]).await {
                Ok(reservation) => reservation.commit().await.map(|_| true).unwrap(),
                Err(ReservationError::InsufficientStock { .. }) => false,
                Err(e) => panic!("unexpected error: {e}"),
            }
        })
    });

    let winners = join_all(attempts)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(winners, 1);
    assert_eq!(store.stock_of(&ProductId::new("LAST")).await, Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_orders_in_opposite_order_do_not_deadlock() {
    let store = seeded(&[("A", 1000), ("B", 1000)]).await;
    let coordinator = ReservationCoordinator::new(store.clone());

    let tasks = (0..200).map(|i| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let items = if i % 2 == 0 {
                vec![line("A", 1), line("B", 1)]
            } else {
                vec![line("B", 1), line("A", 1)]
            };
            coordinator.reserve(&items).await.unwrap().commit().await.unwrap();
        })
    });

    let results = tokio::time::timeout(std::time::Duration::from_secs(10), join_all(tasks))
        .await
        .expect("reservations deadlocked");
    assert!(results.iter().all(|r| r.is_ok()));

    assert_eq!(store.stock_of(&ProductId::new("A")).await, Some(800));
    assert_eq!(store.stock_of(&ProductId::new("B")).await, Some(800));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_reservations_leave_no_trace_under_contention() {
    let store = seeded(&[("A", 10), ("SCARCE", 3)]).await;
    let coordinator = ReservationCoordinator::new(store.clone());

    let tasks = (0..10).map(|_| {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            match coordinator.reserve(&[line("A", 1), line("SCARCE", 1)]).await {
                Ok(reservation) => {
                    reservation.commit().await.unwrap();
                    true
                }
                Err(_) => false,
            }
        })
    });

    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count() as i64;

    assert_eq!(succeeded, 3);
    assert_eq!(store.stock_of(&ProductId::new("A")).await, Some(10 - succeeded));
    assert_eq!(store.stock_of(&ProductId::new("SCARCE")).await, Some(0));
}

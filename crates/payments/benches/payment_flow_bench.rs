use std::sync::Arc;

use chrono::Utc;
use common::{EventId, Money, TicketNumber, TransactionStatus, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use gateway::InMemoryGateway;
use payments::{Collaborators, CreateIntent, InMemoryNotifier, OrderFinalizer, PaymentIntentCreator};
use store::{Country, Event, InMemoryProfileCache, InMemoryStore, Reservation, UserProfile};

struct Fixture {
    store: InMemoryStore,
    gateway: InMemoryGateway,
    creator: PaymentIntentCreator,
    finalizer: OrderFinalizer,
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let user = UserProfile {
        user_id: UserId::new("bench-user"),
        full_name: "Bench User".to_string(),
        email: "bench@example.com".to_string(),
        mobile_number: "628111111111".to_string(),
    };
    store.insert_user(user.clone()).await;
    store
        .insert_event(Event {
            event_id: EventId::new("EVT-BENCH"),
            name: "Bench Fest".to_string(),
            date_time: Utc::now(),
            country: Country::default(),
            description: String::new(),
            tag: String::new(),
        })
        .await;

    let cache = InMemoryProfileCache::new();
    cache.insert_profile(&user);
    let gateway = InMemoryGateway::new();
    let deps = Collaborators::from_store(
        store.clone(),
        Arc::new(cache),
        Arc::new(gateway.clone()),
        Arc::new(InMemoryNotifier::new()),
    );

    Fixture {
        store,
        gateway,
        creator: PaymentIntentCreator::new(deps.clone()),
        finalizer: OrderFinalizer::new(deps),
    }
}

async fn seed_reservation(store: &InMemoryStore, ticket: &str) {
    store
        .insert_reservation(Reservation {
            ticket_number: TicketNumber::new(ticket),
            event_id: EventId::new("EVT-BENCH"),
            ticket_id: "TKT-REG".to_string(),
            ticket_type: "REGULAR".to_string(),
            seat_number: 1,
            price: Money::from_rupiah(100_000),
            user_id: UserId::new("bench-user"),
            queue_id: "Q-1".to_string(),
            country_code: "ID".to_string(),
            payment_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await;
}

fn bench_create_intent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("payments/create_intent", |b| {
        b.iter(|| {
            rt.block_on(async {
                let f = fixture().await;
                seed_reservation(&f.store, "TIX-1").await;
                f.creator
                    .create(CreateIntent {
                        ticket_number: TicketNumber::new("TIX-1"),
                        event_id: EventId::new("EVT-BENCH"),
                        user_id: UserId::new("bench-user"),
                        bank: "bca".to_string(),
                    })
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_then_finalize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("payments/create_then_finalize", |b| {
        b.iter(|| {
            rt.block_on(async {
                let f = fixture().await;
                seed_reservation(&f.store, "TIX-1").await;
                let created = f
                    .creator
                    .create(CreateIntent {
                        ticket_number: TicketNumber::new("TIX-1"),
                        event_id: EventId::new("EVT-BENCH"),
                        user_id: UserId::new("bench-user"),
                        bank: "bni".to_string(),
                    })
                    .await
                    .unwrap();
                f.gateway
                    .set_status(created.payment_id, TransactionStatus::Settlement)
                    .await;
                f.finalizer.finalize(created.payment_id).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_create_intent, bench_create_then_finalize);
criterion_main!(benches);

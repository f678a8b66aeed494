//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{HolderId, ShowtimeId};
use domain::{DomainEvent, Reservation, ReservationItem, Seat, SeatStatus, Showtime};
use sqlx::PgPool;
use store::{PostgresStore, ReservationStore, StagedEvent, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_booking_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE outbox_events, reservation_items, reservations, seats, showtimes")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn seed_showtime(store: &PostgresStore) -> (ShowtimeId, Vec<Seat>) {
    let showtime_id = ShowtimeId::new();
    let showtime = Showtime::new(showtime_id, "Integration Screening", Utc::now());
    let seats = vec![
        Seat::new(showtime_id, "A", 1),
        Seat::new(showtime_id, "A", 2),
        Seat::new(showtime_id, "B", 1),
    ];
    store
        .create_showtime(showtime, seats.clone())
        .await
        .unwrap();
    (showtime_id, seats)
}

fn reserved(showtime_id: ShowtimeId, seats: &[Seat], holder: HolderId) -> (Vec<Seat>, Reservation) {
    let mut held = seats.to_vec();
    for seat in &mut held {
        seat.reserve(holder).unwrap();
    }
    let items: Vec<ReservationItem> = held.iter().map(ReservationItem::from_seat).collect();
    let reservation = Reservation::new(showtime_id, holder, items, Utc::now()).unwrap();
    (held, reservation)
}

#[tokio::test]
async fn showtime_and_seats_round_trip() {
    let store = get_test_store().await;
    let (showtime_id, seats) = seed_showtime(&store).await;

    let loaded = store.showtime(showtime_id).await.unwrap().unwrap();
    assert_eq!(loaded.movie_title, "Integration Screening");

    let all = store.seats_for_showtime(showtime_id).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|s| s.status() == SeatStatus::Available));

    let some = store
        .seats_by_id(showtime_id, &[seats[0].id(), seats[2].id()])
        .await
        .unwrap();
    assert_eq!(some.len(), 2);
}

#[tokio::test]
async fn seats_by_id_excludes_foreign_showtime() {
    let store = get_test_store().await;
    let (showtime_id, _) = seed_showtime(&store).await;
    let (_, other_seats) = seed_showtime(&store).await;

    let found = store
        .seats_by_id(showtime_id, &[other_seats[0].id()])
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn commit_reservation_persists_everything_atomically() {
    let store = get_test_store().await;
    let (showtime_id, seats) = seed_showtime(&store).await;
    let holder = HolderId::new();

    let (held, reservation) = reserved(showtime_id, &seats[..2], holder);
    let event =
        DomainEvent::seats_reserved(showtime_id, reservation.id(), holder, reservation.items());
    let staged = StagedEvent::stage(&event, Utc::now()).unwrap();

    store
        .commit_reservation(&reservation, &held, staged)
        .await
        .unwrap();

    let loaded = store.reservation(reservation.id()).await.unwrap().unwrap();
    assert_eq!(loaded.items().len(), 2);
    assert_eq!(loaded.holder_id(), holder);

    let stored_seats = store
        .seats_by_id(showtime_id, &[seats[0].id(), seats[1].id()])
        .await
        .unwrap();
    for seat in stored_seats {
        assert_eq!(seat.status(), SeatStatus::Reserved);
        assert_eq!(seat.reserver_id(), Some(holder));
        assert_eq!(seat.version(), 1);
    }

    let pending = store.undelivered_events(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].event_type, "SeatsReserved");
}

#[tokio::test]
async fn stale_commit_rolls_back_whole_batch() {
    let store = get_test_store().await;
    let (showtime_id, seats) = seed_showtime(&store).await;

    // Winner takes seat A1.
    let (held, reservation) = reserved(showtime_id, &seats[..1], HolderId::new());
    let event = DomainEvent::seats_reserved(
        showtime_id,
        reservation.id(),
        reservation.holder_id(),
        reservation.items(),
    );
    store
        .commit_reservation(
            &reservation,
            &held,
            StagedEvent::stage(&event, Utc::now()).unwrap(),
        )
        .await
        .unwrap();

    // Loser raced with stale copies of A1 and A2.
    let (stale, stale_reservation) = reserved(showtime_id, &seats[..2], HolderId::new());
    let event = DomainEvent::seats_reserved(
        showtime_id,
        stale_reservation.id(),
        stale_reservation.holder_id(),
        stale_reservation.items(),
    );
    let err = store
        .commit_reservation(
            &stale_reservation,
            &stale,
            StagedEvent::stage(&event, Utc::now()).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));

    // A2 must be untouched and only the winner's event staged.
    let a2 = store
        .seats_by_id(showtime_id, &[seats[1].id()])
        .await
        .unwrap();
    assert_eq!(a2[0].status(), SeatStatus::Available);
    assert_eq!(a2[0].version(), 0);
    assert_eq!(store.undelivered_events(10).await.unwrap().len(), 1);
    assert!(store
        .reservation(stale_reservation.id())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn expiry_releases_seats_and_stages_event() {
    let store = get_test_store().await;
    let (showtime_id, seats) = seed_showtime(&store).await;
    let holder = HolderId::new();

    let (held, reservation) = reserved(showtime_id, &seats[..2], holder);
    let event =
        DomainEvent::seats_reserved(showtime_id, reservation.id(), holder, reservation.items());
    store
        .commit_reservation(
            &reservation,
            &held,
            StagedEvent::stage(&event, Utc::now()).unwrap(),
        )
        .await
        .unwrap();

    let cutoff = Utc::now() + Duration::minutes(5);
    let expired = store.expired_reservations(cutoff).await.unwrap();
    assert_eq!(expired.len(), 1);

    let mut expiring = expired.into_iter().next().unwrap();
    expiring.mark_expired().unwrap();
    let mut releasing = store
        .seats_by_id(showtime_id, &expiring.seat_ids())
        .await
        .unwrap();
    for seat in &mut releasing {
        seat.release();
    }
    let event = DomainEvent::reservation_expired(expiring.id(), showtime_id, expiring.seat_ids());
    store
        .commit_expiry(
            &expiring,
            &releasing,
            Some(StagedEvent::stage(&event, Utc::now()).unwrap()),
        )
        .await
        .unwrap();

    let released = store
        .seats_by_id(showtime_id, &expiring.seat_ids())
        .await
        .unwrap();
    for seat in released {
        assert_eq!(seat.status(), SeatStatus::Available);
        assert_eq!(seat.reserver_id(), None);
        assert_eq!(seat.version(), 2);
    }

    // No longer pending.
    assert!(store.expired_reservations(cutoff).await.unwrap().is_empty());

    let events = store.undelivered_events(10).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "ReservationExpired");
}

#[tokio::test]
async fn mark_delivered_removes_from_backlog() {
    let store = get_test_store().await;
    let (showtime_id, seats) = seed_showtime(&store).await;

    let (held, reservation) = reserved(showtime_id, &seats[..1], HolderId::new());
    let event = DomainEvent::seats_reserved(
        showtime_id,
        reservation.id(),
        reservation.holder_id(),
        reservation.items(),
    );
    store
        .commit_reservation(
            &reservation,
            &held,
            StagedEvent::stage(&event, Utc::now()).unwrap(),
        )
        .await
        .unwrap();

    let pending = store.undelivered_events(10).await.unwrap();
    assert_eq!(pending.len(), 1);

    store
        .mark_delivered(pending[0].event_id, Utc::now())
        .await
        .unwrap();
    assert!(store.undelivered_events(10).await.unwrap().is_empty());
}

//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, HolderId, ReservationId, SeatId, ShowtimeId};
use domain::{Reservation, ReservationItem, ReservationStatus, Seat, SeatStatus, Showtime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::outbox::StagedEvent;
use crate::store::ReservationStore;
use crate::{Result, StoreError};

/// Authoritative store backed by PostgreSQL.
///
/// Seat writes are conditional updates (`WHERE version = $loaded`); a commit
/// whose condition matches no row is rolled back and reported as a version
/// conflict. Reservation, items and outbox rows share the seat transaction.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_seat(row: &PgRow) -> Result<Seat> {
        let status_text: String = row.try_get("status")?;
        let status = SeatStatus::parse(&status_text).ok_or_else(|| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
                "unknown seat status: {status_text}"
            ))))
        })?;

        Ok(Seat::from_parts(
            SeatId::from_uuid(row.try_get::<Uuid, _>("id")?),
            ShowtimeId::from_uuid(row.try_get::<Uuid, _>("showtime_id")?),
            row.try_get("seat_row")?,
            row.try_get("seat_number")?,
            status,
            row.try_get::<Option<Uuid>, _>("reserver_id")?
                .map(HolderId::from_uuid),
            row.try_get("version")?,
        ))
    }

    fn row_to_staged_event(row: &PgRow) -> Result<StagedEvent> {
        Ok(StagedEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            showtime_id: ShowtimeId::from_uuid(row.try_get::<Uuid, _>("showtime_id")?),
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    }

    async fn items_for_reservation(&self, id: ReservationId) -> Result<Vec<ReservationItem>> {
        let rows = sqlx::query(
            "SELECT seat_id, seat_row, seat_number FROM reservation_items \
             WHERE reservation_id = $1 ORDER BY seat_row, seat_number",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ReservationItem {
                    seat_id: SeatId::from_uuid(row.try_get::<Uuid, _>("seat_id")?),
                    row: row.try_get("seat_row")?,
                    number: row.try_get("seat_number")?,
                })
            })
            .collect()
    }

    /// Applies the conditional seat updates inside an open transaction.
    async fn update_seats(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        seats: &[Seat],
    ) -> Result<()> {
        for seat in seats {
            let updated = sqlx::query(
                "UPDATE seats SET status = $1, reserver_id = $2, version = version + 1 \
                 WHERE id = $3 AND version = $4",
            )
            .bind(seat.status().as_str())
            .bind(seat.reserver_id().map(|h| h.as_uuid()))
            .bind(seat.id().as_uuid())
            .bind(seat.version())
            .execute(&mut **tx)
            .await?
            .rows_affected();

            if updated == 0 {
                return Err(StoreError::VersionConflict {
                    seat_id: seat.id(),
                    expected: seat.version(),
                });
            }
        }
        Ok(())
    }

    async fn insert_staged_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        staged: &StagedEvent,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO outbox_events (id, event_type, showtime_id, payload, created_at, delivered_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(staged.event_id.as_uuid())
        .bind(&staged.event_type)
        .bind(staged.showtime_id.as_uuid())
        .bind(&staged.payload)
        .bind(staged.created_at)
        .bind(staged.delivered_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn create_showtime(&self, showtime: Showtime, seats: Vec<Seat>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO showtimes (id, movie_title, start_time) VALUES ($1, $2, $3)")
            .bind(showtime.id.as_uuid())
            .bind(&showtime.movie_title)
            .bind(showtime.start_time)
            .execute(&mut *tx)
            .await?;

        for seat in &seats {
            sqlx::query(
                "INSERT INTO seats (id, showtime_id, seat_row, seat_number, status, reserver_id, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(seat.id().as_uuid())
            .bind(seat.showtime_id().as_uuid())
            .bind(seat.row())
            .bind(seat.number())
            .bind(seat.status().as_str())
            .bind(seat.reserver_id().map(|h| h.as_uuid()))
            .bind(seat.version())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn showtime(&self, id: ShowtimeId) -> Result<Option<Showtime>> {
        let row = sqlx::query("SELECT id, movie_title, start_time FROM showtimes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Showtime::new(
                ShowtimeId::from_uuid(row.try_get::<Uuid, _>("id")?),
                row.try_get::<String, _>("movie_title")?,
                row.try_get::<DateTime<Utc>, _>("start_time")?,
            ))
        })
        .transpose()
    }

    async fn seats_for_showtime(&self, showtime_id: ShowtimeId) -> Result<Vec<Seat>> {
        let rows = sqlx::query(
            "SELECT id, showtime_id, seat_row, seat_number, status, reserver_id, version \
             FROM seats WHERE showtime_id = $1 ORDER BY seat_row, seat_number",
        )
        .bind(showtime_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_seat).collect()
    }

    async fn seats_by_id(&self, showtime_id: ShowtimeId, seat_ids: &[SeatId]) -> Result<Vec<Seat>> {
        let ids: Vec<Uuid> = seat_ids.iter().map(SeatId::as_uuid).collect();

        // Filtering by showtime as well prevents a valid seat id of a
        // different showtime from slipping through.
        let rows = sqlx::query(
            "SELECT id, showtime_id, seat_row, seat_number, status, reserver_id, version \
             FROM seats WHERE showtime_id = $1 AND id = ANY($2)",
        )
        .bind(showtime_id.as_uuid())
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_seat).collect()
    }

    async fn reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            "SELECT id, showtime_id, holder_id, status, created_at FROM reservations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_text: String = row.try_get("status")?;
        let status = ReservationStatus::parse(&status_text).ok_or_else(|| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(format!(
                "unknown reservation status: {status_text}"
            ))))
        })?;

        let items = self.items_for_reservation(id).await?;

        Ok(Some(Reservation::from_parts(
            id,
            ShowtimeId::from_uuid(row.try_get::<Uuid, _>("showtime_id")?),
            HolderId::from_uuid(row.try_get::<Uuid, _>("holder_id")?),
            status,
            row.try_get("created_at")?,
            items,
        )))
    }

    #[tracing::instrument(
        skip(self, reservation, seats, staged),
        fields(reservation_id = %reservation.id(), seats = seats.len())
    )]
    async fn commit_reservation(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: StagedEvent,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::update_seats(&mut tx, seats).await?;

        sqlx::query(
            "INSERT INTO reservations (id, showtime_id, holder_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.showtime_id().as_uuid())
        .bind(reservation.holder_id().as_uuid())
        .bind(reservation.status().as_str())
        .bind(reservation.created_at())
        .execute(&mut *tx)
        .await?;

        for item in reservation.items() {
            sqlx::query(
                "INSERT INTO reservation_items (reservation_id, seat_id, seat_row, seat_number) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(reservation.id().as_uuid())
            .bind(item.seat_id.as_uuid())
            .bind(&item.row)
            .bind(item.number)
            .execute(&mut *tx)
            .await?;
        }

        Self::insert_staged_event(&mut tx, &staged).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn expired_reservations(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            "SELECT id, showtime_id, holder_id, status, created_at FROM reservations \
             WHERE status = 'Pending' AND created_at < $1 ORDER BY created_at",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut reservations = Vec::with_capacity(rows.len());
        for row in rows {
            let id = ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = self.items_for_reservation(id).await?;
            reservations.push(Reservation::from_parts(
                id,
                ShowtimeId::from_uuid(row.try_get::<Uuid, _>("showtime_id")?),
                HolderId::from_uuid(row.try_get::<Uuid, _>("holder_id")?),
                ReservationStatus::Pending,
                row.try_get("created_at")?,
                items,
            ));
        }
        Ok(reservations)
    }

    #[tracing::instrument(
        skip(self, reservation, seats, staged),
        fields(reservation_id = %reservation.id(), seats = seats.len())
    )]
    async fn commit_expiry(
        &self,
        reservation: &Reservation,
        seats: &[Seat],
        staged: Option<StagedEvent>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::update_seats(&mut tx, seats).await?;

        sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
            .bind(reservation.status().as_str())
            .bind(reservation.id().as_uuid())
            .execute(&mut *tx)
            .await?;

        if let Some(staged) = &staged {
            Self::insert_staged_event(&mut tx, staged).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn undelivered_events(&self, limit: usize) -> Result<Vec<StagedEvent>> {
        let rows = sqlx::query(
            "SELECT id, event_type, showtime_id, payload, created_at, delivered_at \
             FROM outbox_events WHERE delivered_at IS NULL ORDER BY seq LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_staged_event).collect()
    }

    async fn mark_delivered(&self, event_id: EventId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE outbox_events SET delivered_at = $1 WHERE id = $2")
            .bind(at)
            .bind(event_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

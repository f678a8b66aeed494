//! Showtime read-model endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ShowtimeId;
use projections::ShowtimeDocument;
use seat_locks::SeatLockService;
use store::ReservationStore;

use crate::error::ApiError;
use crate::routes::reservations::AppState;

/// GET /api/showtimes/:id — current seat map document for a showtime.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<ShowtimeId>,
) -> Result<Json<ShowtimeDocument>, ApiError>
where
    S: ReservationStore + 'static,
    L: SeatLockService + 'static,
{
    state
        .showtime_view
        .document(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Showtime {id} not found")))
}

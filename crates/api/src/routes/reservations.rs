//! Seat reservation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::{HolderId, SeatId, ShowtimeId};
use projections::ShowtimeView;
use reservation::{ReservationOrchestrator, ReservationReceipt};
use seat_locks::SeatLockService;
use serde::Deserialize;
use store::ReservationStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ReservationStore, L: SeatLockService> {
    pub orchestrator: ReservationOrchestrator<S, L>,
    pub showtime_view: Arc<ShowtimeView>,
}

#[derive(Deserialize)]
pub struct ReserveRequest {
    pub showtime_id: ShowtimeId,
    pub seat_ids: Vec<SeatId>,
    /// Anonymous callers get a fresh holder identity.
    pub holder_id: Option<HolderId>,
}

/// POST /api/reservations — reserve a batch of seats, all-or-nothing.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ReservationReceipt>, ApiError>
where
    S: ReservationStore + 'static,
    L: SeatLockService + 'static,
{
    let holder_id = req.holder_id.unwrap_or_default();

    let receipt = state
        .orchestrator
        .reserve(req.showtime_id, req.seat_ids, holder_id)
        .await?;

    Ok(Json(receipt))
}

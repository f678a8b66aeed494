//! HTTP API server with observability for the seat reservation system.
//!
//! Exposes the reserve endpoint and the showtime read model, with
//! structured logging (tracing) and Prometheus metrics. Background workers
//! (outbox relay, reclamation sweeper, projection processor) are created
//! here and spawned by the binary.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::Router;
use axum::routing::{get, post};
use chrono::{Duration, Utc};
use common::{Clock, ShowtimeId, SystemClock};
use domain::{Seat, Showtime};
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::{InMemoryBroker, OutboxRelay};
use projections::{InMemoryNotifier, ProjectionProcessor, ShowtimeView};
use reservation::{ReclamationSweeper, ReservationOrchestrator};
use seat_locks::{InMemorySeatLocks, SeatLockService};
use store::{InMemoryStore, ReservationStore, StagedEvent};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::reservations::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L>(state: Arc<AppState<S, L>>, metrics_handle: PrometheusHandle) -> Router
where
    S: ReservationStore + 'static,
    L: SeatLockService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/reservations", post(routes::reservations::create::<S, L>))
        .route("/api/showtimes/{id}", get(routes::showtimes::get::<S, L>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Background workers wired to the same store and broker as the app state.
///
/// Returned unspawned so tests can drive them deterministically; the binary
/// calls [`Workers::spawn`].
pub struct Workers {
    pub relay: OutboxRelay<InMemoryStore, InMemoryBroker>,
    pub sweeper: ReclamationSweeper<InMemoryStore>,
    pub processor: ProjectionProcessor,
    pub events: mpsc::UnboundedReceiver<StagedEvent>,
}

impl Workers {
    /// Spawns every worker onto the runtime.
    pub fn spawn(self, config: &Config) {
        tokio::spawn(self.relay.run(StdDuration::from_millis(config.relay_poll_ms)));
        tokio::spawn(
            self.sweeper
                .run(StdDuration::from_secs(config.sweep_interval_secs)),
        );
        tokio::spawn(self.processor.run(self.events));
    }
}

/// Seeds a demo showtime with an A-E × 1-8 seat grid into the store and the
/// read model.
pub async fn seed_demo_showtime(store: &InMemoryStore, view: &ShowtimeView) -> ShowtimeId {
    let showtime_id = ShowtimeId::new();
    let showtime = Showtime::new(
        showtime_id,
        "The Midnight Run",
        Utc::now() + Duration::hours(6),
    );

    let mut seats = Vec::new();
    for row in ["A", "B", "C", "D", "E"] {
        for number in 1..=8 {
            seats.push(Seat::new(showtime_id, row, number));
        }
    }

    store
        .create_showtime(showtime.clone(), seats.clone())
        .await
        .expect("in-memory seeding cannot fail");
    view.seed_showtime(&showtime, &seats).await;

    tracing::info!(%showtime_id, seats = seats.len(), "seeded demo showtime");
    showtime_id
}

/// Creates the default application state backed by in-memory
/// implementations, plus the background workers and the demo showtime id.
pub async fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryStore, InMemorySeatLocks>>,
    Workers,
    ShowtimeId,
) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = Arc::new(InMemoryStore::new());
    let locks = Arc::new(InMemorySeatLocks::new(
        clock.clone(),
        Duration::seconds(config.lock_ttl_secs as i64),
    ));
    let broker = Arc::new(InMemoryBroker::new());

    let showtime_view = Arc::new(ShowtimeView::new());
    let showtime_id = seed_demo_showtime(&store, &showtime_view).await;

    let orchestrator = ReservationOrchestrator::new(store.clone(), locks, clock.clone());

    let relay = OutboxRelay::new(
        store.clone(),
        broker.clone(),
        clock.clone(),
        config.relay_batch_size,
    );
    let sweeper = ReclamationSweeper::new(
        store.clone(),
        clock,
        Duration::seconds(config.expiry_threshold_secs),
    );

    let events = broker.subscribe().await;
    let notifier = Arc::new(InMemoryNotifier::new());
    let mut processor = ProjectionProcessor::new(notifier);
    processor.register(showtime_view.clone());

    let state = Arc::new(AppState {
        orchestrator,
        showtime_view,
    });

    let workers = Workers {
        relay,
        sweeper,
        processor,
        events,
    };

    (state, workers, showtime_id)
}

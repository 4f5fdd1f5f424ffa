use axum::{routing::get, Router};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_system::{
    config::Config,
    controllers,
    events::Event,
    services::cleanup::CleanupService,
    services::waitlist::WaitlistService,
    AppState,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting seat hold & waitlist service");

    // Connect the database, Redis, event bus and outbound clients
    let app_state = AppState::new(config)
        .await
        .expect("Failed to initialize application state");
    info!("Database, Redis and event bus connected");

    // --- Wire the reassignment engine to seat availability events ---
    // Both events mean "this seat is free"; subscribe() resolves only once
    // delivery is active, so no availability event can slip past startup.
    let engine = WaitlistService::new(app_state.clone());
    for channel in ["seat.released", "seat.hold.expired"] {
        let engine = engine.clone();
        app_state
            .bus
            .subscribe(
                channel,
                Arc::new(move |event: Event| {
                    let engine = engine.clone();
                    Box::pin(async move { handle_seat_available(engine, event).await })
                }),
            )
            .await
            .expect("Failed to subscribe to seat availability events");
    }
    info!("Reassignment engine subscribed to seat.released and seat.hold.expired");

    // --- Start background tasks ---

    // Task to reclaim expired seat holds
    let sweeper = CleanupService::new(app_state.clone());
    let sweep_interval = Duration::from_secs(app_state.config.hold.sweep_interval_seconds);
    task::spawn(async move {
        loop {
            sweeper.sweep_expired_holds().await;
            tokio::time::sleep(sweep_interval).await;
        }
    });

    // Task to drop expired waitlist entries
    let cleanup = CleanupService::new(app_state.clone());
    let cleanup_interval =
        Duration::from_secs(app_state.config.waitlist.cleanup_interval_seconds);
    task::spawn(async move {
        loop {
            cleanup.cleanup_expired_waitlist_entries().await;
            tokio::time::sleep(cleanup_interval).await;
        }
    });

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "Seat System API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], app_state.config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}

async fn handle_seat_available(engine: WaitlistService, event: Event) {
    let seat_id = event.payload.get("seatId").and_then(|v| v.as_str());
    let flight_id = event.payload.get("flightId").and_then(|v| v.as_str());

    match (seat_id, flight_id) {
        (Some(seat_id), Some(flight_id)) => {
            if let Err(e) = engine.process_seat_available(seat_id, flight_id).await {
                error!(
                    "waitlist promotion failed for {} on {}: {}",
                    seat_id, flight_id, e
                );
            }
        }
        _ => error!(
            "seat availability event {} is missing seatId/flightId",
            event.event_id
        ),
    }
}

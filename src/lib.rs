pub mod config;
pub mod database;
pub mod redis_client;
pub mod models;
pub mod controllers;
pub mod cache;
pub mod services;
pub mod events;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub bus: events::EventBus,
    pub config: config::Config,
    pub checkin: services::checkin::CheckInClient,
    pub notifier: services::notify::NotificationClient,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db =
            database::Database::new(&config.database.url, config.database.pool_size).await?;

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        let cache =
            cache::CacheService::new(redis.clone(), config.cache.seatmap_ttl_seconds);
        let bus =
            events::EventBus::connect(&config.redis.url, &config.app.service_name).await?;

        let checkin = services::checkin::CheckInClient::new(
            &config.services.checkin_url,
            Duration::from_secs(config.services.checkin_timeout_seconds),
        );
        let notifier = services::notify::NotificationClient::new(
            &config.services.notification_url,
            Duration::from_secs(config.services.notification_timeout_seconds),
        );

        Ok(Arc::new(Self {
            db,
            redis,
            cache,
            bus,
            config,
            checkin,
            notifier,
        }))
    }
}

use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub hold: HoldConfig,
    pub cache: CacheConfig,
    pub waitlist: WaitlistConfig,
    pub services: ServicesConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub service_name: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Настройки удержания мест
#[derive(Debug, Clone, Deserialize)]
pub struct HoldConfig {
    pub duration_seconds: u64,
    pub sweep_interval_seconds: u64,
}

// Настройки кеша карты мест
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub seatmap_ttl_seconds: u64,
}

// Настройки листа ожидания
#[derive(Debug, Clone, Deserialize)]
pub struct WaitlistConfig {
    pub entry_ttl_hours: i64,
    pub cleanup_interval_seconds: u64,
}

// Адреса внешних сервисов
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    pub checkin_url: String,
    pub checkin_timeout_seconds: u64,
    pub notification_url: String,
    pub notification_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "seat-system".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "seat_system=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            },
            hold: HoldConfig {
                duration_seconds: env::var("SEAT_HOLD_DURATION_SECONDS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .expect("SEAT_HOLD_DURATION_SECONDS must be a valid number"),
                sweep_interval_seconds: env::var("HOLD_SWEEP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("HOLD_SWEEP_INTERVAL_SECONDS must be a valid number"),
            },
            cache: CacheConfig {
                seatmap_ttl_seconds: env::var("CACHE_SEATMAP_TTL_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("CACHE_SEATMAP_TTL_SECONDS must be a valid number"),
            },
            waitlist: WaitlistConfig {
                entry_ttl_hours: env::var("WAITLIST_ENTRY_TTL_HOURS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("WAITLIST_ENTRY_TTL_HOURS must be a valid number"),
                cleanup_interval_seconds: env::var("WAITLIST_CLEANUP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("WAITLIST_CLEANUP_INTERVAL_SECONDS must be a valid number"),
            },
            services: ServicesConfig {
                checkin_url: env::var("CHECKIN_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:3002".to_string()),
                checkin_timeout_seconds: env::var("CHECKIN_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("CHECKIN_TIMEOUT_SECONDS must be a valid number"),
                notification_url: env::var("NOTIFICATION_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:3005".to_string()),
                notification_timeout_seconds: env::var("NOTIFICATION_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("NOTIFICATION_TIMEOUT_SECONDS must be a valid number"),
            },
        }
    }
}

use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::models::seat::SeatMapView;
use crate::redis_client::RedisClient;

// Read-through кеш карты мест. Короткий TTL поглощает read-трафик,
// а каждый мутирующий путь инвалидирует ключ явно.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn key(flight_id: &str) -> String {
        format!("seatmap:{}", flight_id)
    }

    // Если Redis недоступен - ведем себя как cache miss и идем в БД.
    pub async fn get_seat_map(&self, flight_id: &str) -> Option<SeatMapView> {
        let mut conn = self.redis.conn.clone();
        let cached: Option<String> = match conn.get(Self::key(flight_id)).await {
            Ok(value) => value,
            Err(e) => {
                warn!("seat map cache read failed for {}: {}", flight_id, e);
                return None;
            }
        };

        let raw = cached?;
        match serde_json::from_str(&raw) {
            Ok(map) => {
                debug!("Cache hit for flight {}", flight_id);
                Some(map)
            }
            Err(e) => {
                warn!("corrupt seat map cache entry for {}: {}", flight_id, e);
                None
            }
        }
    }

    pub async fn store_seat_map(&self, flight_id: &str, map: &SeatMapView) {
        let data = match serde_json::to_string(map) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to serialize seat map for {}: {}", flight_id, e);
                return;
            }
        };
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> =
            conn.set_ex(Self::key(flight_id), data, self.ttl_seconds).await;
        if let Err(e) = result {
            warn!("seat map cache write failed for {}: {}", flight_id, e);
        } else {
            debug!("Cached seat map for flight {} ({}s)", flight_id, self.ttl_seconds);
        }
    }

    // Безусловный DEL: писатели форсируют консистентность, не дожидаясь TTL.
    pub async fn invalidate_seat_map(&self, flight_id: &str) {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<()> = conn.del(Self::key(flight_id)).await;
        if let Err(e) = result {
            warn!("seat map cache invalidation failed for {}: {}", flight_id, e);
        } else {
            debug!("Invalidated seat map cache for flight {}", flight_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_per_flight() {
        assert_eq!(CacheService::key("SK123"), "seatmap:SK123");
        assert_ne!(CacheService::key("SK123"), CacheService::key("SK124"));
    }
}

use redis::{aio::ConnectionManager, Client};

// Общее подключение к Redis. ConnectionManager сам переподключается
// после обрыва, поэтому клонируется во все сервисы без обвязки.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisClient { conn })
    }
}

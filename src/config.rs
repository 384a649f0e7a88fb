use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    /// Default search radius for proximity queries, in kilometers.
    pub match_radius_km: f64,
    /// Maximum number of candidate drivers returned per query.
    pub match_limit: u64,
    /// Pending trips older than this are expired. The same window bounds the
    /// recency filter of the driver-facing pending feed, so the two never
    /// disagree about which requests are still live.
    pub pending_timeout_minutes: i64,
    /// Optional webhook endpoint for rider/driver notifications. When unset,
    /// notifications are dropped (logged only).
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            match_radius_km: env::var("MATCH_RADIUS_KM")
                .unwrap_or_else(|_| "5.0".to_string())
                .parse()
                .expect("MATCH_RADIUS_KM must be a number"),
            match_limit: env::var("MATCH_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("MATCH_LIMIT must be a number"),
            pending_timeout_minutes: env::var("PENDING_TIMEOUT_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("PENDING_TIMEOUT_MINUTES must be a number"),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

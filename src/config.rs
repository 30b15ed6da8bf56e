// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Number of weakest disciplines targeted by weakness-mode simulations.
pub const WEAK_DISCIPLINE_COUNT: usize = 3;

/// Minimum difficulty band for "difficult" simulations.
pub const DIFFICULT_MIN_DIFFICULTY: i32 = 4;

/// Study-group limits.
pub const GROUP_MAX_MEMBERS: i32 = 20;
pub const GROUP_CREATE_LIMIT: i64 = 2;
pub const GROUP_LIST_LIMIT: i64 = 20;

/// Chat window returned per message fetch.
pub const MESSAGE_PAGE_SIZE: i64 = 30;

/// How long an active A/B test may be served from the in-memory cache.
pub const AB_TEST_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// XP required per level.
pub const LEVEL_XP_STEP: i64 = 250;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}

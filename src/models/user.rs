// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// Premium subscribers may create study groups.
    pub is_premium: bool,

    /// Total experience points earned across practice and simulations.
    pub xp: i64,

    /// Ranking points. Only ever incremented through the progress recorder.
    pub score: i64,

    /// Consecutive study days.
    pub streak: i64,

    pub exams_completed: i64,

    pub last_study_date: Option<chrono::NaiveDate>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub is_premium: bool,
    pub xp: i64,
    pub level: i64,
    pub score: i64,
    pub streak: i64,
    pub exams_completed: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Per-discipline ranking points, keyed by discipline id.
    pub discipline_scores: std::collections::HashMap<i64, i64>,
    /// Ids of badges the user has earned, computed from the counters above.
    pub badges: Vec<&'static str>,
}

/// A single row of the global leaderboard.
#[derive(Debug, Serialize, FromRow)]
pub struct RankingEntry {
    pub username: String,
    pub score: i64,
    pub xp: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

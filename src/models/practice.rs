// src/models/practice.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A thematic block of sessions within a discipline ('practice_sections').
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeSection {
    pub id: i64,
    pub discipline_id: i64,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub is_premium: bool,
}

/// A gamified practice session ('practice_sessions').
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: i64,
    pub discipline_id: i64,
    pub section_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub level: i32,
    pub xp_reward: i64,

    /// 'quiz', 'review' or 'challenge'.
    pub session_type: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A question inside a practice session ('practice_questions').
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub id: i64,
    pub session_id: i64,
    pub statement: String,
    pub options: Json<Vec<String>>,
    pub correct_option: String,
    pub explanation: Option<String>,

    /// 'multiple_choice' or 'boolean'.
    pub question_type: String,

    pub xp: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per (user, session) progress row ('session_progress').
/// `score` holds the best score ever achieved and never decreases.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionProgress {
    pub user_id: i64,
    pub session_id: i64,
    pub discipline_id: i64,
    pub completed: bool,
    pub score: i64,
    pub xp_earned: i64,
    pub streak: i64,
    pub last_active: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a finished session attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveProgressRequest {
    pub session_id: i64,
    pub discipline_id: i64,
    #[validate(range(min = 0))]
    pub score: i64,
    #[validate(range(min = 0))]
    pub xp_earned: i64,
    /// In-session answer streak reported by the quiz runner.
    #[serde(default)]
    pub streak: i64,
}

/// DTO for creating a practice section. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSectionRequest {
    pub discipline_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_premium: bool,
}

/// DTO for updating a practice section. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
    pub is_premium: Option<bool>,
}

/// DTO for creating a practice session. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub discipline_id: i64,
    pub section_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[validate(range(min = 1))]
    pub level: Option<i32>,
    #[validate(range(min = 0))]
    pub xp_reward: i64,
    pub session_type: Option<String>,
}

/// DTO for updating a practice session. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<i32>,
    pub level: Option<i32>,
    pub xp_reward: Option<i64>,
    pub session_type: Option<String>,
}

/// DTO for creating a practice question. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePracticeQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub statement: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 1000))]
    pub correct_option: String,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    pub question_type: Option<String>,
    #[validate(range(min = 0))]
    pub xp: i64,
}

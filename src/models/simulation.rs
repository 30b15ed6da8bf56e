// src/models/simulation.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// How the generator picks candidate questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Target the user's lowest-scored disciplines.
    Weaknesses,
    /// Re-ask questions the user last answered incorrectly.
    Revision,
    /// Top difficulty band within the configured disciplines.
    Difficult,
    Random,
    /// Explicit discipline selection chosen in the UI.
    Custom,
}

impl SimulationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationMode::Weaknesses => "weaknesses",
            SimulationMode::Revision => "revision",
            SimulationMode::Difficult => "difficult",
            SimulationMode::Random => "random",
            SimulationMode::Custom => "custom",
        }
    }
}

/// DTO for requesting a generated simulation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SimulationConfig {
    pub mode: SimulationMode,

    #[validate(range(min = 1, max = 120))]
    pub question_count: i64,

    /// Explicit discipline selection. Ignored when `include_all_disciplines`.
    #[serde(default)]
    pub discipline_ids: Vec<i64>,

    #[serde(default)]
    pub include_all_disciplines: bool,

    /// 'UEM', 'UP' or 'both'. Absent and 'both' mean no scoping.
    pub university: Option<String>,
}

impl SimulationConfig {
    /// Custom mode needs an explicit discipline selection or the
    /// all-disciplines flag; every other mode can resolve its own targets.
    pub fn is_satisfiable(&self) -> bool {
        self.mode != SimulationMode::Custom
            || self.include_all_disciplines
            || !self.discipline_ids.is_empty()
    }
}

/// View model returned to the quiz runner: the question plus the user's
/// prior-attempt flags. Derived at selection time, not stored.
#[derive(Debug, Serialize)]
pub struct SimulationQuestion {
    pub id: i64,
    pub exam_id: Option<i64>,
    pub discipline_id: i64,
    pub statement: String,
    pub options: Json<Vec<String>>,
    pub correct_option: String,
    pub explanation: Option<String>,
    pub difficulty: Option<i32>,
    pub previously_answered: bool,
    pub previously_correct: bool,
}

/// Per (user, question) attempt history ('question_history').
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionHistory {
    pub user_id: i64,
    pub question_id: i64,
    pub attempts: i64,
    pub correct_attempts: i64,
    pub last_answer: String,
    pub was_correct: bool,
    pub last_attempt: chrono::DateTime<chrono::Utc>,
}

/// A finished simulation run ('simulations').
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: i64,
    pub user_id: i64,
    pub mode: String,
    pub total_questions: i32,
    pub correct_count: i32,
    pub score: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting the answers of a generated simulation.
#[derive(Debug, Deserialize)]
pub struct SubmitSimulationRequest {
    pub mode: SimulationMode,

    /// Key: question id. Value: the option the user picked, by value.
    pub answers: std::collections::HashMap<i64, String>,
}

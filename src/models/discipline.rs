// src/models/discipline.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'disciplines' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Discipline {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// University scope: 'UEM', 'UP' or 'both'.
    pub university: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'exams' table: a past exam paper within a discipline.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub discipline_id: i64,

    /// e.g. "Exame 2014 - 1a epoca".
    pub name: String,
    pub year: i32,
    pub season: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing disciplines.
#[derive(Debug, Deserialize)]
pub struct DisciplineListParams {
    /// Restrict to a university ('UEM' or 'UP'). 'both' and absence mean no filter.
    pub university: Option<String>,
}

/// DTO for creating a discipline. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDisciplineRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub university: Option<String>,
}

/// DTO for updating a discipline. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateDisciplineRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub university: Option<String>,
}

/// DTO for creating an exam. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub discipline_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1990, max = 2100))]
    pub year: i32,
    #[validate(length(max = 50))]
    pub season: Option<String>,
}

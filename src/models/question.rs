// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table: a past-exam question used by the
/// simulation generator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Exam this question originally appeared in, if known.
    pub exam_id: Option<i64>,

    pub discipline_id: i64,

    /// Statement text. May embed math markup and image references.
    pub statement: String,

    /// Answer options. Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct option, by value (not index). Always a member of `options`.
    pub correct_option: String,

    pub explanation: Option<String>,

    /// 1 (easy) to 5 (hard). Optional while content is being tagged.
    pub difficulty: Option<i32>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new exam question. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: Option<i64>,
    pub discipline_id: i64,
    #[validate(length(min = 1, max = 5000))]
    pub statement: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 1000))]
    pub correct_option: String,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: Option<i32>,
}

impl CreateQuestionRequest {
    /// The correct option must be present, by value, in the options list.
    pub fn correct_option_is_member(&self) -> bool {
        self.options.iter().any(|o| o == &self.correct_option)
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub statement: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_option: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Option<i32>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 1000 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: Vec<&str>, correct: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            exam_id: None,
            discipline_id: 1,
            statement: "2 + 2 = ?".to_string(),
            options: options.into_iter().map(String::from).collect(),
            correct_option: correct.to_string(),
            explanation: None,
            difficulty: Some(1),
        }
    }

    #[test]
    fn correct_option_must_be_a_member() {
        assert!(request(vec!["3", "4"], "4").correct_option_is_member());
        assert!(!request(vec!["3", "4"], "5").correct_option_is_member());
    }

    #[test]
    fn rejects_single_option() {
        let req = request(vec!["4"], "4");
        assert!(req.validate().is_err());
    }
}

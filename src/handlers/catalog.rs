// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        discipline::{Discipline, DisciplineListParams, Exam},
        question::Question,
    },
};

/// Lists disciplines, optionally scoped to one university.
/// Disciplines marked 'both' always match.
pub async fn list_disciplines(
    State(pool): State<PgPool>,
    Query(params): Query<DisciplineListParams>,
) -> Result<impl IntoResponse, AppError> {
    let disciplines: Vec<Discipline> = match params.university.as_deref() {
        Some(u) if u != "both" => {
            sqlx::query_as(
                r#"
                SELECT id, name, description, university, created_at
                FROM disciplines
                WHERE university = $1 OR university = 'both'
                ORDER BY name ASC
                "#,
            )
            .bind(u)
            .fetch_all(&pool)
            .await?
        }
        _ => {
            sqlx::query_as(
                r#"
                SELECT id, name, description, university, created_at
                FROM disciplines
                ORDER BY name ASC
                "#,
            )
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(disciplines))
}

/// Lists the past exams of a discipline, newest first.
pub async fn list_exams(
    State(pool): State<PgPool>,
    Path(discipline_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exams: Vec<Exam> = sqlx::query_as(
        r#"
        SELECT id, discipline_id, name, year, season, created_at
        FROM exams
        WHERE discipline_id = $1
        ORDER BY year DESC, season ASC
        "#,
    )
    .bind(discipline_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

/// Lists the questions of one exam paper, in original order.
pub async fn list_exam_questions(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let questions: Vec<Question> = sqlx::query_as(
        r#"
        SELECT id, exam_id, discipline_id, statement, options, correct_option,
               explanation, difficulty, created_at
        FROM questions
        WHERE exam_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

// src/handlers/admin.rs
//
// Back-office CRUD for content (disciplines, exams, questions, practice
// material), users and A/B tests. All routes are behind the auth + admin
// middleware pair.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        ab_test::{AbTest, CreateAbTestRequest, UpdateAbTestStatusRequest},
        discipline::{CreateDisciplineRequest, CreateExamRequest, UpdateDisciplineRequest},
        practice::{
            CreatePracticeQuestionRequest, CreateSectionRequest, CreateSessionRequest,
            UpdateSectionRequest, UpdateSessionRequest,
        },
        question::{CreateQuestionRequest, UpdateQuestionRequest},
        user::User,
    },
    state::AbTestCache,
    utils::{hash::hash_password, html::clean_html, jwt::Claims},
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Lists all users in the system.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = sqlx::query_as(
        r#"
        SELECT id, username, password, role, is_premium, xp, score, streak,
               exams_completed, last_study_date, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<String>,
    pub is_premium: Option<bool>,
    pub password: Option<String>,
}

/// Updates a user's role, premium flag or password.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    exists.ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(new_role) = payload.role {
        if new_role != "user" && new_role != "admin" {
            return Err(AppError::BadRequest("Invalid role".to_string()));
        }
        sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(new_role)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(is_premium) = payload.is_premium {
        sqlx::query("UPDATE users SET is_premium = $1 WHERE id = $2")
            .bind(is_premium)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_password) = payload.password {
        let hashed = hash_password(&new_password)?;
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(hashed)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Disciplines & exams
// ---------------------------------------------------------------------------

/// Creates a new discipline.
pub async fn create_discipline(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateDisciplineRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let university = payload.university.unwrap_or_else(|| "both".to_string());
    if !matches!(university.as_str(), "UEM" | "UP" | "both") {
        return Err(AppError::BadRequest(
            "university must be 'UEM', 'UP' or 'both'".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO disciplines (name, description, university) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.name)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(&university)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a discipline by ID. Fields are optional.
pub async fn update_discipline(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDisciplineRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.is_none() && payload.description.is_none() && payload.university.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE disciplines SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(university) = payload.university {
        separated.push("university = ");
        separated.push_bind_unseparated(university);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update discipline: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Discipline not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a discipline by ID. Cascades to its exams, questions and
/// practice material.
pub async fn delete_discipline(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM disciplines WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Discipline not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates an exam paper entry.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO exams (discipline_id, name, year, season) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(payload.discipline_id)
    .bind(&payload.name)
    .bind(payload.year)
    .bind(payload.season.as_deref().unwrap_or(""))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes an exam by ID.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Exam questions
// ---------------------------------------------------------------------------

/// Creates a new exam question. The statement and explanation are
/// sanitized; the correct option must be one of the options.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if !payload.correct_option_is_member() {
        return Err(AppError::BadRequest(
            "correct_option must be one of the options".to_string(),
        ));
    }

    let options_json = serde_json::to_value(&payload.options)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (exam_id, discipline_id, statement, options, correct_option, explanation, difficulty)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(payload.exam_id)
    .bind(payload.discipline_id)
    .bind(clean_html(&payload.statement))
    .bind(options_json)
    .bind(&payload.correct_option)
    .bind(payload.explanation.as_deref().map(clean_html))
    .bind(payload.difficulty)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question by ID. Fields are optional.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.statement.is_none()
        && payload.options.is_none()
        && payload.correct_option.is_none()
        && payload.explanation.is_none()
        && payload.difficulty.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(statement) = payload.statement {
        separated.push("statement = ");
        separated.push_bind_unseparated(clean_html(&statement));
    }

    if let Some(options) = payload.options {
        separated.push("options = ");
        separated.push_bind_unseparated(serde_json::to_value(options)?);
    }

    if let Some(correct_option) = payload.correct_option {
        separated.push("correct_option = ");
        separated.push_bind_unseparated(correct_option);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(clean_html(&explanation));
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an exam question by ID.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Practice material
// ---------------------------------------------------------------------------

/// Creates a practice section within a discipline.
pub async fn create_section(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO practice_sections (discipline_id, title, description, position, is_premium)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(payload.discipline_id)
    .bind(&payload.title)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(payload.position)
    .bind(payload.is_premium)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a practice section by ID. Fields are optional.
pub async fn update_section(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none()
        && payload.description.is_none()
        && payload.position.is_none()
        && payload.is_premium.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE practice_sections SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(position) = payload.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position);
    }

    if let Some(is_premium) = payload.is_premium {
        separated.push("is_premium = ");
        separated.push_bind_unseparated(is_premium);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Section not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a practice section. Cascades to its sessions and questions.
pub async fn delete_section(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM practice_sections WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Section not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a practice session.
pub async fn create_session(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let session_type = payload.session_type.unwrap_or_else(|| "quiz".to_string());
    if !matches!(session_type.as_str(), "quiz" | "review" | "challenge") {
        return Err(AppError::BadRequest(
            "session_type must be 'quiz', 'review' or 'challenge'".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO practice_sessions
            (discipline_id, section_id, title, description, position, level, xp_reward, session_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.discipline_id)
    .bind(payload.section_id)
    .bind(&payload.title)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(payload.position)
    .bind(payload.level.unwrap_or(1))
    .bind(payload.xp_reward)
    .bind(&session_type)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a practice session by ID. Fields are optional.
pub async fn update_session(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none()
        && payload.description.is_none()
        && payload.position.is_none()
        && payload.level.is_none()
        && payload.xp_reward.is_none()
        && payload.session_type.is_none()
    {
        return Ok(StatusCode::OK);
    }

    if let Some(session_type) = payload.session_type.as_deref() {
        if !matches!(session_type, "quiz" | "review" | "challenge") {
            return Err(AppError::BadRequest(
                "session_type must be 'quiz', 'review' or 'challenge'".to_string(),
            ));
        }
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE practice_sessions SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(position) = payload.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position);
    }

    if let Some(level) = payload.level {
        separated.push("level = ");
        separated.push_bind_unseparated(level);
    }

    if let Some(xp_reward) = payload.xp_reward {
        separated.push("xp_reward = ");
        separated.push_bind_unseparated(xp_reward);
    }

    if let Some(session_type) = payload.session_type {
        separated.push("session_type = ");
        separated.push_bind_unseparated(session_type);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a practice session. Cascades to its questions and progress rows.
pub async fn delete_session(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM practice_sessions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a question inside a practice session.
pub async fn create_practice_question(
    State(pool): State<PgPool>,
    Path(session_id): Path<i64>,
    Json(payload): Json<CreatePracticeQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if !payload.options.iter().any(|o| o == &payload.correct_option) {
        return Err(AppError::BadRequest(
            "correct_option must be one of the options".to_string(),
        ));
    }

    let session: Option<i64> = sqlx::query_scalar("SELECT id FROM practice_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_optional(&pool)
        .await?;
    session.ok_or(AppError::NotFound("Session not found".to_string()))?;

    let options_json = serde_json::to_value(&payload.options)?;
    let question_type = payload
        .question_type
        .unwrap_or_else(|| "multiple_choice".to_string());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO practice_questions
            (session_id, statement, options, correct_option, explanation, question_type, xp)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(session_id)
    .bind(clean_html(&payload.statement))
    .bind(options_json)
    .bind(&payload.correct_option)
    .bind(payload.explanation.as_deref().map(clean_html))
    .bind(&question_type)
    .bind(payload.xp)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Deletes a practice question by ID.
pub async fn delete_practice_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM practice_questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// A/B tests
// ---------------------------------------------------------------------------

/// Lists all A/B tests with their counters.
pub async fn list_ab_tests(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let tests: Vec<AbTest> = sqlx::query_as(
        r#"
        SELECT id, name, location, status, variant_a, variant_b,
               views_a, clicks_a, conversions_a, views_b, clicks_b, conversions_b,
               created_at, updated_at
        FROM ab_tests
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(tests))
}

/// Creates an A/B test in draft status.
pub async fn create_ab_test(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateAbTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO ab_tests (name, location, variant_a, variant_b)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.location)
    .bind(&payload.variant_a)
    .bind(&payload.variant_b)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Changes a test's status and evicts the location from the active-test
/// cache so the change shows without waiting for the TTL.
pub async fn update_ab_test_status(
    State(pool): State<PgPool>,
    State(cache): State<AbTestCache>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAbTestStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(payload.status.as_str(), "draft" | "active" | "finished") {
        return Err(AppError::BadRequest(
            "status must be 'draft', 'active' or 'finished'".to_string(),
        ));
    }

    let location: Option<String> = sqlx::query_scalar(
        "UPDATE ab_tests SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING location",
    )
    .bind(&payload.status)
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let location = location.ok_or(AppError::NotFound("Test not found".to_string()))?;

    cache.write().await.remove(&location);

    Ok(StatusCode::OK)
}

/// Deletes an A/B test and evicts its location from the cache.
pub async fn delete_ab_test(
    State(pool): State<PgPool>,
    State(cache): State<AbTestCache>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let location: Option<String> =
        sqlx::query_scalar("DELETE FROM ab_tests WHERE id = $1 RETURNING location")
            .bind(id)
            .fetch_optional(&pool)
            .await?;

    let location = location.ok_or(AppError::NotFound("Test not found".to_string()))?;

    cache.write().await.remove(&location);

    Ok(StatusCode::NO_CONTENT)
}

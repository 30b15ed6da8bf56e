// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    badges::{BadgeFacts, earned_badges, level_for_xp},
    error::AppError,
    models::user::{MeResponse, User},
    utils::jwt::Claims,
};

/// Get current user's profile: counters, level, per-discipline scores and
/// the badge set computed from them.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user: User = sqlx::query_as(
        r#"
        SELECT id, username, password, role, is_premium, xp, score, streak,
               exams_completed, last_study_date, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let scores: Vec<(i64, i64)> =
        sqlx::query_as("SELECT discipline_id, score FROM discipline_scores WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&pool)
            .await?;

    let facts = BadgeFacts {
        xp: user.xp,
        streak: user.streak,
        exams_completed: user.exams_completed,
    };

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        is_premium: user.is_premium,
        xp: user.xp,
        level: level_for_xp(user.xp),
        score: user.score,
        streak: user.streak,
        exams_completed: user.exams_completed,
        created_at: user.created_at,
        discipline_scores: scores.into_iter().collect(),
        badges: earned_badges(&facts),
    }))
}

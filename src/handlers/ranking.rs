// src/handlers/ranking.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{error::AppError, models::user::RankingEntry};

/// Retrieves the top 50 users by ranking score.
pub async fn get_ranking(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let ranking: Vec<RankingEntry> = sqlx::query_as(
        r#"
        SELECT username, score, xp
        FROM users
        ORDER BY score DESC, xp DESC
        LIMIT 50
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch ranking: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(ranking))
}

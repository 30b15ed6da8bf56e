// src/handlers/practice.rs
//
// Practice-path reads plus the progress recorder: replay-aware XP and
// ranking-score accumulation with a monotonic best score.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::practice::{
        PracticeQuestion, PracticeSection, PracticeSession, SaveProgressRequest, SessionProgress,
    },
    utils::jwt::Claims,
};

/// Lists the sections of a discipline, in display order.
pub async fn list_sections(
    State(pool): State<PgPool>,
    Path(discipline_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sections: Vec<PracticeSection> = sqlx::query_as(
        r#"
        SELECT id, discipline_id, title, description, position, is_premium
        FROM practice_sections
        WHERE discipline_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(discipline_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sections))
}

/// Lists the sessions of a section, in display order.
pub async fn list_sessions(
    State(pool): State<PgPool>,
    Path(section_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sessions: Vec<PracticeSession> = sqlx::query_as(
        r#"
        SELECT id, discipline_id, section_id, title, description, position,
               level, xp_reward, session_type, created_at
        FROM practice_sessions
        WHERE section_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(section_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(sessions))
}

/// Lists the questions of a session.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions: Vec<PracticeQuestion> = sqlx::query_as(
        r#"
        SELECT id, session_id, statement, options, correct_option,
               explanation, question_type, xp, created_at
        FROM practice_questions
        WHERE session_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// All of the current user's progress rows within a discipline, keyed by
/// session id so the path view can mark completed steps in one pass.
pub async fn my_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(discipline_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let rows: Vec<SessionProgress> = sqlx::query_as(
        r#"
        SELECT user_id, session_id, discipline_id, completed, score,
               xp_earned, streak, last_active
        FROM session_progress
        WHERE user_id = $1 AND discipline_id = $2
        "#,
    )
    .bind(claims.user_id())
    .bind(discipline_id)
    .fetch_all(&pool)
    .await?;

    let by_session: std::collections::HashMap<i64, SessionProgress> =
        rows.into_iter().map(|p| (p.session_id, p)).collect();

    Ok(Json(by_session))
}

/// Resolved rewards for one session attempt.
#[derive(Debug, PartialEq, Eq)]
pub struct RewardOutcome {
    pub xp_granted: i64,
    pub score_granted: i64,
    pub best_score: i64,
    pub improved: bool,
}

/// The replay decision table.
///
/// First completion grants the full XP and the full attempt score as
/// ranking points. A replay that beats the prior best grants half the XP
/// and no ranking points; a replay that does not beat the prior best
/// grants nothing. The stored best score never decreases.
pub fn resolve_reward(prior: Option<&SessionProgress>, score: i64, xp_earned: i64) -> RewardOutcome {
    match prior {
        Some(p) if p.completed => {
            if score > p.score {
                RewardOutcome {
                    xp_granted: xp_earned / 2,
                    score_granted: 0,
                    best_score: score,
                    improved: true,
                }
            } else {
                RewardOutcome {
                    xp_granted: 0,
                    score_granted: 0,
                    best_score: p.score,
                    improved: false,
                }
            }
        }
        _ => RewardOutcome {
            xp_granted: xp_earned,
            score_granted: score,
            best_score: score,
            improved: false,
        },
    }
}

/// Daily streak transition: consecutive day increments, same day holds,
/// a gap (or first study day) resets to 1.
pub fn next_streak(last_study: Option<NaiveDate>, today: NaiveDate, current: i64) -> i64 {
    match last_study {
        Some(last) if last == today => current,
        Some(last) if today.signed_duration_since(last).num_days() == 1 => current + 1,
        _ => 1,
    }
}

/// Records a finished session attempt.
///
/// Reads the prior progress, resolves the reward per the replay rules,
/// upserts the progress row with the monotonic best score and a fresh
/// last-active timestamp, then additively increments the user's XP,
/// ranking score, discipline score and daily streak. The prior read is
/// deliberately outside the write transaction; concurrent replays of the
/// same session can race on it.
pub async fn save_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    let prior: Option<SessionProgress> = sqlx::query_as(
        r#"
        SELECT user_id, session_id, discipline_id, completed, score,
               xp_earned, streak, last_active
        FROM session_progress
        WHERE user_id = $1 AND session_id = $2
        "#,
    )
    .bind(user_id)
    .bind(req.session_id)
    .fetch_optional(&pool)
    .await?;

    let outcome = resolve_reward(prior.as_ref(), req.score, req.xp_earned);

    let (last_study, current_streak): (Option<NaiveDate>, i64) =
        sqlx::query_as("SELECT last_study_date, streak FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))?;

    let today = chrono::Utc::now().date_naive();
    let streak = next_streak(last_study, today, current_streak);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO session_progress
            (user_id, session_id, discipline_id, completed, score, xp_earned, streak, last_active)
        VALUES ($1, $2, $3, TRUE, $4, $5, $6, NOW())
        ON CONFLICT (user_id, session_id) DO UPDATE SET
            completed = TRUE,
            score = EXCLUDED.score,
            xp_earned = EXCLUDED.xp_earned,
            streak = EXCLUDED.streak,
            last_active = NOW()
        "#,
    )
    .bind(user_id)
    .bind(req.session_id)
    .bind(req.discipline_id)
    .bind(outcome.best_score)
    .bind(req.xp_earned)
    .bind(req.streak)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE users
        SET xp = xp + $1,
            score = score + $2,
            streak = $3,
            last_study_date = $4
        WHERE id = $5
        "#,
    )
    .bind(outcome.xp_granted)
    .bind(outcome.score_granted)
    .bind(streak)
    .bind(today)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if outcome.score_granted > 0 {
        sqlx::query(
            r#"
            INSERT INTO discipline_scores (user_id, discipline_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, discipline_id) DO UPDATE SET
                score = discipline_scores.score + EXCLUDED.score
            "#,
        )
        .bind(user_id)
        .bind(req.discipline_id)
        .bind(outcome.score_granted)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "xp_granted": outcome.xp_granted,
        "score_granted": outcome.score_granted,
        "best_score": outcome.best_score,
        "score_improved": outcome.improved,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior(completed: bool, score: i64) -> SessionProgress {
        SessionProgress {
            user_id: 1,
            session_id: 10,
            discipline_id: 2,
            completed,
            score,
            xp_earned: 40,
            streak: 0,
            last_active: chrono::Utc::now(),
        }
    }

    #[test]
    fn first_completion_grants_full_rewards() {
        let outcome = resolve_reward(None, 80, 40);
        assert_eq!(
            outcome,
            RewardOutcome {
                xp_granted: 40,
                score_granted: 80,
                best_score: 80,
                improved: false,
            }
        );
    }

    #[test]
    fn improved_replay_grants_half_xp_and_no_ranking_score() {
        let p = prior(true, 80);
        let outcome = resolve_reward(Some(&p), 90, 40);
        assert_eq!(
            outcome,
            RewardOutcome {
                xp_granted: 20,
                score_granted: 0,
                best_score: 90,
                improved: true,
            }
        );
    }

    #[test]
    fn unimproved_replay_grants_nothing_and_keeps_best() {
        let p = prior(true, 90);
        let outcome = resolve_reward(Some(&p), 70, 40);
        assert_eq!(
            outcome,
            RewardOutcome {
                xp_granted: 0,
                score_granted: 0,
                best_score: 90,
                improved: false,
            }
        );
    }

    #[test]
    fn equal_score_replay_is_not_an_improvement() {
        let p = prior(true, 80);
        let outcome = resolve_reward(Some(&p), 80, 40);
        assert_eq!(outcome.xp_granted, 0);
        assert_eq!(outcome.best_score, 80);
    }

    #[test]
    fn incomplete_prior_row_counts_as_first_completion() {
        let p = prior(false, 30);
        let outcome = resolve_reward(Some(&p), 60, 40);
        assert_eq!(outcome.xp_granted, 40);
        assert_eq!(outcome.score_granted, 60);
        assert_eq!(outcome.best_score, 60);
    }

    #[test]
    fn replay_xp_rounds_down() {
        let p = prior(true, 10);
        let outcome = resolve_reward(Some(&p), 20, 45);
        assert_eq!(outcome.xp_granted, 22);
    }

    #[test]
    fn streak_transitions() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let last_week = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        assert_eq!(next_streak(None, today, 0), 1);
        assert_eq!(next_streak(Some(yesterday), today, 4), 5);
        assert_eq!(next_streak(Some(today), today, 4), 4);
        assert_eq!(next_streak(Some(last_week), today, 4), 1);
    }
}

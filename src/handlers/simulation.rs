// src/handlers/simulation.rs
//
// Simulation generation: per-mode candidate retrieval, shortfall backfill,
// dedup, shuffle, and prior-attempt annotation.

use std::collections::{HashMap, HashSet};

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::Rng;
use rand::seq::SliceRandom;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::{DIFFICULT_MIN_DIFFICULTY, WEAK_DISCIPLINE_COUNT},
    error::AppError,
    models::{
        question::Question,
        simulation::{
            SimulationConfig, SimulationMode, SimulationQuestion, SimulationResult,
            SubmitSimulationRequest,
        },
    },
    utils::jwt::Claims,
};

/// Generates a personalized simulation for the current user.
///
/// Candidate questions are fetched per mode, topped up with random picks
/// when the mode undersupplies, deduplicated, shuffled and sliced to the
/// requested count. Each selected question carries the user's
/// prior-attempt flags. Returning fewer questions than requested (even
/// zero) means the content pool is exhausted; it is not an error.
pub async fn generate(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(config): Json<SimulationConfig>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = config.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if !config.is_satisfiable() {
        return Err(AppError::BadRequest(
            "Custom mode requires disciplines or the all-disciplines flag".to_string(),
        ));
    }

    let user_id = claims.user_id();

    let mut candidates = match config.mode {
        SimulationMode::Weaknesses => fetch_weakness_questions(&pool, user_id, &config).await?,
        SimulationMode::Revision => fetch_revision_questions(&pool, user_id, &config).await?,
        SimulationMode::Difficult => fetch_difficult_questions(&pool, &config).await?,
        SimulationMode::Random | SimulationMode::Custom => {
            fetch_random_questions(&pool, &config, config.question_count).await?
        }
    };

    // Top up undersupplied modes with random picks, skipping ids we
    // already hold.
    if (candidates.len() as i64) < config.question_count {
        let shortfall = config.question_count - candidates.len() as i64;
        tracing::debug!(
            mode = config.mode.as_str(),
            found = candidates.len(),
            shortfall,
            "mode undersupplied, backfilling with random questions"
        );
        let extra = fetch_random_questions(&pool, &config, shortfall * 2).await?;
        merge_backfill(&mut candidates, extra);
    }

    let selected = finalize_selection(
        candidates,
        config.question_count as usize,
        &mut rand::thread_rng(),
    );

    let with_history = attach_history(&pool, user_id, selected).await?;

    Ok(Json(with_history))
}

/// Records a finished simulation: persists the result, updates the
/// per-question attempt history and the per-discipline score map, and
/// bumps the user's completed-simulations counter.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitSimulationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let user_id = claims.user_id();
    let question_ids: Vec<i64> = req.answers.keys().cloned().collect();

    let keys = fetch_answer_keys(&pool, &question_ids).await?;

    let mut correct_count: i64 = 0;
    let mut discipline_correct: HashMap<i64, i64> = HashMap::new();

    let mut tx = pool.begin().await?;

    for (q_id, user_answer) in &req.answers {
        let Some(key) = keys.get(q_id) else {
            // Unknown id in the payload: skip rather than fail the whole run.
            continue;
        };
        let was_correct = user_answer == &key.correct_option;
        if was_correct {
            correct_count += 1;
            *discipline_correct.entry(key.discipline_id).or_insert(0) += 1;
        }

        sqlx::query(
            r#"
            INSERT INTO question_history
                (user_id, question_id, attempts, correct_attempts, last_answer, was_correct, last_attempt)
            VALUES ($1, $2, 1, $3, $4, $5, NOW())
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                attempts = question_history.attempts + 1,
                correct_attempts = question_history.correct_attempts + EXCLUDED.correct_attempts,
                last_answer = EXCLUDED.last_answer,
                was_correct = EXCLUDED.was_correct,
                last_attempt = NOW()
            "#,
        )
        .bind(user_id)
        .bind(q_id)
        .bind(if was_correct { 1i64 } else { 0i64 })
        .bind(user_answer)
        .bind(was_correct)
        .execute(&mut *tx)
        .await?;
    }

    for (discipline_id, correct) in &discipline_correct {
        sqlx::query(
            r#"
            INSERT INTO discipline_scores (user_id, discipline_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, discipline_id) DO UPDATE SET
                score = discipline_scores.score + EXCLUDED.score
            "#,
        )
        .bind(user_id)
        .bind(discipline_id)
        .bind(correct)
        .execute(&mut *tx)
        .await?;
    }

    let total = keys.len() as i64;
    let score = if total > 0 {
        correct_count * 100 / total
    } else {
        0
    };

    let result: SimulationResult = sqlx::query_as(
        r#"
        INSERT INTO simulations (user_id, mode, total_questions, correct_count, score)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, mode, total_questions, correct_count, score, created_at
        "#,
    )
    .bind(user_id)
    .bind(req.mode.as_str())
    .bind(total as i32)
    .bind(correct_count as i32)
    .bind(score)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET exams_completed = exams_completed + 1 WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": result.id,
            "score": score,
            "correct_count": correct_count,
            "total_questions": total,
        })),
    ))
}

/// Lists the current user's recent simulation results (most recent first).
pub async fn list_mine(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results: Vec<SimulationResult> = sqlx::query_as(
        r#"
        SELECT id, user_id, mode, total_questions, correct_count, score, created_at
        FROM simulations
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT 10
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

// ---------------------------------------------------------------------------
// Per-mode candidate retrieval
// ---------------------------------------------------------------------------

const QUESTION_COLUMNS: &str = "id, exam_id, discipline_id, statement, options, \
     correct_option, explanation, difficulty, created_at";

/// Weakness mode: the user's three lowest-scored disciplines, falling back
/// to the configured list when no discipline has been scored yet.
async fn fetch_weakness_questions(
    pool: &PgPool,
    user_id: i64,
    config: &SimulationConfig,
) -> Result<Vec<Question>, AppError> {
    let scores: Vec<(i64, i64)> =
        sqlx::query_as("SELECT discipline_id, score FROM discipline_scores WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let weak = weakest_disciplines(&scores, WEAK_DISCIPLINE_COUNT);
    let targets = if weak.is_empty() {
        config.discipline_ids.clone()
    } else {
        weak
    };

    if targets.is_empty() {
        // Nothing to target; the generator's backfill will fill the run.
        return Ok(Vec::new());
    }

    let quota = per_discipline_quota(config.question_count, targets.len());
    let mut questions = Vec::new();
    for discipline_id in targets {
        questions.extend(fetch_by_discipline(pool, discipline_id, quota).await?);
    }
    Ok(questions)
}

/// Revision mode: questions whose last recorded answer was wrong, most
/// recent first, capped at twice the requested count.
async fn fetch_revision_questions(
    pool: &PgPool,
    user_id: i64,
    config: &SimulationConfig,
) -> Result<Vec<Question>, AppError> {
    let wrong_ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT question_id
        FROM question_history
        WHERE user_id = $1 AND was_correct = FALSE
        ORDER BY last_attempt DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(config.question_count * 2)
    .fetch_all(pool)
    .await?;

    if wrong_ids.is_empty() {
        return fetch_random_questions(pool, config, config.question_count).await;
    }

    fetch_by_ids(pool, &wrong_ids).await
}

/// Difficult mode: the top difficulty band within the configured
/// disciplines, topped up with random picks when the band undersupplies.
async fn fetch_difficult_questions(
    pool: &PgPool,
    config: &SimulationConfig,
) -> Result<Vec<Question>, AppError> {
    let targets = resolve_discipline_ids(pool, config).await?;
    if targets.is_empty() {
        return fetch_random_questions(pool, config, config.question_count).await;
    }

    let quota = per_discipline_quota(config.question_count, targets.len());
    let mut questions = Vec::new();
    for discipline_id in &targets {
        let batch: Vec<Question> = sqlx::query_as(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions \
             WHERE discipline_id = $1 AND difficulty >= $2 \
             ORDER BY RANDOM() LIMIT $3"
        ))
        .bind(discipline_id)
        .bind(DIFFICULT_MIN_DIFFICULTY)
        .bind(quota)
        .fetch_all(pool)
        .await?;
        questions.extend(batch);
    }

    if (questions.len() as i64) < config.question_count {
        let remainder = config.question_count - questions.len() as i64;
        let extra = fetch_random_questions(pool, config, remainder).await?;
        merge_backfill(&mut questions, extra);
    }

    Ok(questions)
}

/// Random / custom / default path. Resolves the discipline set (explicit
/// list, all disciplines scoped by university, or no filter at all) and
/// fetches roughly twice the per-discipline quota to leave room for the
/// later dedup and shuffle.
async fn fetch_random_questions(
    pool: &PgPool,
    config: &SimulationConfig,
    count: i64,
) -> Result<Vec<Question>, AppError> {
    let mut discipline_ids = resolve_discipline_ids(pool, config).await?;

    if discipline_ids.is_empty() {
        match config.university.as_deref() {
            Some(u) if u != "both" => {
                discipline_ids = all_discipline_ids(pool, Some(u)).await?;
            }
            _ => {
                // No discipline scoping at all: sample the whole pool.
                let questions: Vec<Question> = sqlx::query_as(&format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY RANDOM() LIMIT $1"
                ))
                .bind(count * 3)
                .fetch_all(pool)
                .await?;
                return Ok(questions);
            }
        }
        if discipline_ids.is_empty() {
            return Ok(Vec::new());
        }
    }

    let quota = per_discipline_quota(count, discipline_ids.len());
    let mut questions = Vec::new();
    for discipline_id in discipline_ids {
        questions.extend(fetch_by_discipline(pool, discipline_id, quota * 2).await?);
    }
    Ok(questions)
}

async fn fetch_by_discipline(
    pool: &PgPool,
    discipline_id: i64,
    limit: i64,
) -> Result<Vec<Question>, AppError> {
    let questions: Vec<Question> = sqlx::query_as(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions \
         WHERE discipline_id = $1 ORDER BY RANDOM() LIMIT $2"
    ))
    .bind(discipline_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

async fn fetch_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Question>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
    ));
    let mut separated = builder.separated(",");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let questions: Vec<Question> = builder.build_query_as().fetch_all(pool).await?;
    Ok(questions)
}

/// The discipline set a config addresses: the explicit list, or every
/// discipline (scoped by university) when the all-disciplines flag is set.
async fn resolve_discipline_ids(
    pool: &PgPool,
    config: &SimulationConfig,
) -> Result<Vec<i64>, AppError> {
    if config.include_all_disciplines {
        all_discipline_ids(pool, config.university.as_deref()).await
    } else {
        Ok(config.discipline_ids.clone())
    }
}

async fn all_discipline_ids(
    pool: &PgPool,
    university: Option<&str>,
) -> Result<Vec<i64>, AppError> {
    let ids: Vec<i64> = match university {
        Some(u) if u != "both" => {
            sqlx::query_scalar(
                "SELECT id FROM disciplines WHERE university = $1 OR university = 'both'",
            )
            .bind(u)
            .fetch_all(pool)
            .await?
        }
        _ => {
            sqlx::query_scalar("SELECT id FROM disciplines")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Selection pipeline (pure)
// ---------------------------------------------------------------------------

/// Candidate quota per target discipline: the requested count divided
/// evenly among the disciplines, rounded up.
fn per_discipline_quota(count: i64, disciplines: usize) -> i64 {
    let n = disciplines.max(1) as i64;
    (count + n - 1) / n
}

/// Discipline ids ranked ascending by score, lowest (weakest) first.
fn weakest_disciplines(scores: &[(i64, i64)], take: usize) -> Vec<i64> {
    let mut sorted = scores.to_vec();
    sorted.sort_by_key(|&(_, score)| score);
    sorted.into_iter().take(take).map(|(id, _)| id).collect()
}

/// Drops questions whose id was already seen, keeping first occurrences.
/// Duplicate entries in the configured discipline list make duplicates
/// across per-discipline fetches possible.
fn dedup_by_id(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id))
        .collect()
}

/// Appends backfill questions whose ids are not already selected.
fn merge_backfill(selected: &mut Vec<Question>, extra: Vec<Question>) {
    let existing: HashSet<i64> = selected.iter().map(|q| q.id).collect();
    selected.extend(extra.into_iter().filter(|q| !existing.contains(&q.id)));
}

/// Dedup, unbiased shuffle, then slice to the requested count. The shuffle
/// removes any positional bias left by the order the fetches returned in.
fn finalize_selection<R: Rng>(candidates: Vec<Question>, count: usize, rng: &mut R) -> Vec<Question> {
    let mut unique = dedup_by_id(candidates);
    unique.shuffle(rng);
    unique.truncate(count);
    unique
}

/// Looks up the user's attempt history for the selected questions and
/// builds the final view models. Missing history means both flags false.
async fn attach_history(
    pool: &PgPool,
    user_id: i64,
    questions: Vec<Question>,
) -> Result<Vec<SimulationQuestion>, AppError> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT question_id, was_correct FROM question_history WHERE user_id = ",
    );
    builder.push_bind(user_id);
    builder.push(" AND question_id IN (");
    let mut separated = builder.separated(",");
    for q in &questions {
        separated.push_bind(q.id);
    }
    separated.push_unseparated(")");

    let rows: Vec<(i64, bool)> = builder.build_query_as().fetch_all(pool).await?;
    let history: HashMap<i64, bool> = rows.into_iter().collect();

    Ok(questions
        .into_iter()
        .map(|q| {
            let prior = history.get(&q.id);
            SimulationQuestion {
                id: q.id,
                exam_id: q.exam_id,
                discipline_id: q.discipline_id,
                statement: q.statement,
                options: q.options,
                correct_option: q.correct_option,
                explanation: q.explanation,
                difficulty: q.difficulty,
                previously_answered: prior.is_some(),
                previously_correct: prior.copied().unwrap_or(false),
            }
        })
        .collect())
}

#[derive(sqlx::FromRow)]
struct AnswerKey {
    id: i64,
    discipline_id: i64,
    correct_option: String,
}

async fn fetch_answer_keys(
    pool: &PgPool,
    ids: &[i64],
) -> Result<HashMap<i64, AnswerKey>, AppError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id, discipline_id, correct_option FROM questions WHERE id IN (",
    );
    let mut separated = builder.separated(",");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let keys: Vec<AnswerKey> = builder.build_query_as().fetch_all(pool).await?;
    Ok(keys.into_iter().map(|k| (k.id, k)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sqlx::types::Json;

    fn question(id: i64, discipline_id: i64) -> Question {
        Question {
            id,
            exam_id: None,
            discipline_id,
            statement: format!("Question {}", id),
            options: Json(vec!["A".to_string(), "B".to_string()]),
            correct_option: "A".to_string(),
            explanation: None,
            difficulty: None,
            created_at: None,
        }
    }

    #[test]
    fn quota_divides_evenly_rounding_up() {
        assert_eq!(per_discipline_quota(10, 3), 4);
        assert_eq!(per_discipline_quota(10, 5), 2);
        assert_eq!(per_discipline_quota(1, 3), 1);
        // Degenerate discipline count must not divide by zero.
        assert_eq!(per_discipline_quota(10, 0), 10);
    }

    #[test]
    fn weakest_disciplines_rank_ascending_by_score() {
        // A:10, B:50, C:5 => C and A outrank B.
        let scores = vec![(1, 10), (2, 50), (3, 5)];
        let weak = weakest_disciplines(&scores, 2);
        assert_eq!(weak, vec![3, 1]);

        let weak3 = weakest_disciplines(&scores, 3);
        assert_eq!(weak3, vec![3, 1, 2]);
    }

    #[test]
    fn weakest_disciplines_empty_when_unscored() {
        assert!(weakest_disciplines(&[], 3).is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let questions = vec![question(1, 1), question(2, 1), question(1, 2), question(3, 2)];
        let unique = dedup_by_id(questions);
        let ids: Vec<i64> = unique.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // First occurrence wins: id 1 stays with discipline 1.
        assert_eq!(unique[0].discipline_id, 1);
    }

    #[test]
    fn merge_backfill_skips_existing_ids() {
        let mut selected = vec![question(1, 1), question(2, 1)];
        merge_backfill(&mut selected, vec![question(2, 1), question(3, 1)]);
        let ids: Vec<i64> = selected.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn selection_returns_exactly_count_when_supply_suffices() {
        let candidates: Vec<Question> = (1..=20).map(|i| question(i, 1)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let selected = finalize_selection(candidates, 10, &mut rng);
        assert_eq!(selected.len(), 10);

        let ids: HashSet<i64> = selected.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 10, "selected ids must be unique");
    }

    #[test]
    fn selection_returns_all_available_when_undersupplied() {
        let candidates: Vec<Question> = (1..=4).map(|i| question(i, 1)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let selected = finalize_selection(candidates, 10, &mut rng);
        assert_eq!(selected.len(), 4, "must not fabricate entries");
    }

    #[test]
    fn shuffle_is_a_permutation_of_deduped_candidates() {
        let mut candidates: Vec<Question> = (1..=50).map(|i| question(i, 1)).collect();
        candidates.push(question(3, 1));
        candidates.push(question(17, 1));

        let mut rng = StdRng::seed_from_u64(42);
        // No truncation: the result must be exactly the deduped id multiset.
        let selected = finalize_selection(candidates, usize::MAX, &mut rng);

        let mut ids: Vec<i64> = selected.iter().map(|q| q.id).collect();
        ids.sort_unstable();
        let expected: Vec<i64> = (1..=50).collect();
        assert_eq!(ids, expected);
    }
}

// src/handlers/group.rs
//
// Study groups with membership rules and a chat message store. Realtime
// delivery is the client's concern; this is the ordered source of truth.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, Transaction};
use validator::Validate;

use crate::{
    config::{GROUP_CREATE_LIMIT, GROUP_LIST_LIMIT, GROUP_MAX_MEMBERS, MESSAGE_PAGE_SIZE},
    error::AppError,
    models::group::{CreateGroupRequest, GroupMember, GroupMessage, SendMessageRequest, StudyGroup},
    utils::jwt::Claims,
};

const GROUP_COLUMNS: &str = "id, name, description, discipline_id, created_by, \
     is_private, members_count, max_members, created_at";

/// Creates a study group. Premium-only; premium users may own at most two
/// groups at a time. Admins are exempt from both rules. The creator joins
/// immediately as the group admin.
pub async fn create_group(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    let is_admin = claims.role == "admin";

    if !is_admin {
        let is_premium: Option<bool> =
            sqlx::query_scalar("SELECT is_premium FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&pool)
                .await?;

        if !is_premium.unwrap_or(false) {
            return Err(AppError::Forbidden(
                "Only premium users can create groups".to_string(),
            ));
        }

        let created: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM study_groups WHERE created_by = $1")
                .bind(user_id)
                .fetch_one(&pool)
                .await?;

        if created >= GROUP_CREATE_LIMIT {
            return Err(AppError::Forbidden(format!(
                "You already created {} groups. Delete one to create another.",
                GROUP_CREATE_LIMIT
            )));
        }
    }

    let mut tx = pool.begin().await?;

    let group: StudyGroup = sqlx::query_as(&format!(
        "INSERT INTO study_groups \
             (name, description, discipline_id, created_by, is_private, members_count, max_members) \
         VALUES ($1, $2, $3, $4, $5, 1, $6) \
         RETURNING {GROUP_COLUMNS}"
    ))
    .bind(&payload.name)
    .bind(payload.description.as_deref().unwrap_or(""))
    .bind(payload.discipline_id)
    .bind(user_id)
    .bind(payload.is_private)
    .bind(GROUP_MAX_MEMBERS)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, 'admin')")
        .bind(group.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// Lists public groups open for joining, most recent first.
pub async fn list_groups(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let groups: Vec<StudyGroup> = sqlx::query_as(&format!(
        "SELECT {GROUP_COLUMNS} FROM study_groups \
         WHERE is_private = FALSE \
         ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(GROUP_LIST_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(groups))
}

/// Lists the groups the current user belongs to, most recent first.
pub async fn list_my_groups(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let groups: Vec<StudyGroup> = sqlx::query_as(
        r#"
        SELECT g.id, g.name, g.description, g.discipline_id, g.created_by,
               g.is_private, g.members_count, g.max_members, g.created_at
        FROM study_groups g
        JOIN group_members m ON m.group_id = g.id
        WHERE m.user_id = $1
        ORDER BY g.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(groups))
}

/// Lists the members of a group.
pub async fn list_members(
    State(pool): State<PgPool>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let members: Vec<GroupMember> = sqlx::query_as(
        r#"
        SELECT m.user_id, u.username, m.role, m.joined_at
        FROM group_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.group_id = $1
        ORDER BY m.joined_at ASC
        "#,
    )
    .bind(group_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(members))
}

/// Joins a group. Rejects full groups and duplicate memberships, bumps the
/// member counter and posts a system message, all in one transaction.
pub async fn join_group(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let group: StudyGroup =
        sqlx::query_as(&format!("SELECT {GROUP_COLUMNS} FROM study_groups WHERE id = $1"))
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;

    if group.members_count >= group.max_members {
        return Err(AppError::Conflict("This group is full".to_string()));
    }

    let already: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if already.is_some() {
        return Err(AppError::Conflict("You are already in this group".to_string()));
    }

    sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, 'member')")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE study_groups SET members_count = members_count + 1 WHERE id = $1")
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

    let username = fetch_username(&mut tx, user_id).await?;
    send_system_message(&mut tx, group_id, &format!("{} joined the group.", username)).await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Leaves a group, decrementing the member counter and posting a system
/// message.
pub async fn leave_group(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if removed.rows_affected() == 0 {
        return Err(AppError::NotFound("You are not in this group".to_string()));
    }

    sqlx::query(
        "UPDATE study_groups SET members_count = GREATEST(0, members_count - 1) WHERE id = $1",
    )
    .bind(group_id)
    .execute(&mut *tx)
    .await?;

    let username = fetch_username(&mut tx, user_id).await?;
    send_system_message(&mut tx, group_id, &format!("{} left the group.", username)).await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a group. Only the creator or a site admin may do this.
pub async fn delete_group(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let created_by: Option<i64> =
        sqlx::query_scalar("SELECT created_by FROM study_groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&pool)
            .await?;

    let created_by = created_by.ok_or(AppError::NotFound("Group not found".to_string()))?;

    if created_by != claims.user_id() && claims.role != "admin" {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this group".to_string(),
        ));
    }

    sqlx::query("DELETE FROM study_groups WHERE id = $1")
        .bind(group_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the most recent chat window (30 messages), oldest first so the
/// client renders top-down.
pub async fn list_messages(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_membership(&pool, group_id, claims.user_id()).await?;

    let mut messages: Vec<GroupMessage> = sqlx::query_as(
        r#"
        SELECT m.id, m.group_id, m.user_id, u.username, m.body, m.is_system, m.created_at
        FROM group_messages m
        LEFT JOIN users u ON u.id = m.user_id
        WHERE m.group_id = $1
        ORDER BY m.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(group_id)
    .bind(MESSAGE_PAGE_SIZE)
    .fetch_all(&pool)
    .await?;

    messages.reverse();

    Ok(Json(messages))
}

/// Posts a chat message. Members only.
pub async fn send_message(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<i64>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    require_membership(&pool, group_id, user_id).await?;

    let body = payload.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Message is empty".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO group_messages (group_id, user_id, body) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(body)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn require_membership(pool: &PgPool, group_id: i64, user_id: i64) -> Result<(), AppError> {
    let member: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    if member.is_none() {
        return Err(AppError::Forbidden(
            "You are not a member of this group".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_username(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
) -> Result<String, AppError> {
    let username: Option<String> = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    username.ok_or(AppError::NotFound("User not found".to_string()))
}

async fn send_system_message(
    tx: &mut Transaction<'_, Postgres>,
    group_id: i64,
    body: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO group_messages (group_id, user_id, body, is_system) VALUES ($1, NULL, $2, TRUE)",
    )
    .bind(group_id)
    .bind(body)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

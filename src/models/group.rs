// src/models/group.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'study_groups' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub description: String,

    /// NULL means the group spans all disciplines.
    pub discipline_id: Option<i64>,

    pub created_by: i64,
    pub is_private: bool,
    pub members_count: i32,
    pub max_members: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A group membership row, joined with the member's username.
#[derive(Debug, Serialize, FromRow)]
pub struct GroupMember {
    pub user_id: i64,
    pub username: String,

    /// 'admin' (the creator) or 'member'.
    pub role: String,

    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// A chat message, joined with the author's username.
/// System messages ("x joined the group") have no author.
#[derive(Debug, Serialize, FromRow)]
pub struct GroupMessage {
    pub id: i64,
    pub group_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub body: String,
    pub is_system: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a study group.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub discipline_id: Option<i64>,
    #[serde(default)]
    pub is_private: bool,
}

/// DTO for sending a chat message.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 1000))]
    pub body: String,
}

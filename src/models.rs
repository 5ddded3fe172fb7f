use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user as reported by the remote auth service.
/// Non-authoritative; the backend owns the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: ProfileMetadata,
    pub created_at: Option<DateTime<Utc>>,
}

/// Profile metadata attached at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Publisher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Publisher => "publisher",
        }
    }
}

/// Row shape of the `user_roles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleRow {
    pub user_id: String,
    pub role: Role,
}

/// Row shape of the `user_preferences` table. One row per user, replaced
/// wholesale on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub selected_categories: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row shape of the `categories` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Row shape of the `posts` table. `author_id` is the byline Author record;
/// `publisher_id` is the account that created the post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub publisher_id: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert shape for `posts` (ids and timestamps are assigned remotely).
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub publisher_id: String,
    pub thumbnail_url: Option<String>,
}

/// Row shape of the `authors` table. A byline entity, managed separately
/// from publisher accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for `authors`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAuthor {
    pub name: String,
    pub avatar_url: Option<String>,
}

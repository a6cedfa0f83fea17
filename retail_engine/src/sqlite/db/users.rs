use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewUser, UserProfile};

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn user_exists(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(found.is_some())
}

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<UserProfile, sqlx::Error> {
    let user: UserProfile = sqlx::query_as(
        "INSERT INTO users (email, first_name, last_name, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user.email)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User {} inserted with id {}", user.email, user.id);
    Ok(user)
}

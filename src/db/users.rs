use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::models::User;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    employee_id: &str,
    full_name: &str,
    password_hash: &str,
    position: &str,
    location: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (employee_id, full_name, password_hash, position, location)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(employee_id)
    .bind(full_name)
    .bind(password_hash)
    .bind(position)
    .bind(location)
    .fetch_one(executor)
    .await
}

pub async fn find_by_employee_id(
    pool: &PgPool,
    employee_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE employee_id = $1")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_password(
    pool: &PgPool,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Update the mutable profile fields. `employee_id` is immutable after
/// creation and deliberately not updatable here.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    position: Option<&str>,
    location: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            full_name = COALESCE($2, full_name),
            position = COALESCE($3, position),
            location = COALESCE($4, location)
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(full_name)
    .bind(position)
    .bind(location)
    .fetch_optional(pool)
    .await
}

pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

fn push_filters(qb: &mut QueryBuilder<'_, sqlx::Postgres>, params: &ListParams) {
    if let Some(search) = &params.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR employee_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR position ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(position) = &params.position {
        qb.push(" AND position = ").push_bind(position.clone());
    }
    if let Some(location) = &params.location {
        qb.push(" AND location = ").push_bind(location.clone());
    }
    if let Some(is_active) = params.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
}

pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<User>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM users WHERE TRUE");
    push_filters(&mut qb, params);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset);
    qb.build_query_as::<User>().fetch_all(pool).await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
    push_filters(&mut qb, params);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_position: Vec<(String, i64)>,
    pub by_location: Vec<(String, i64)>,
}

pub async fn stats(pool: &PgPool) -> Result<UserStats, sqlx::Error> {
    let (total, active): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM users",
    )
    .fetch_one(pool)
    .await?;

    let by_position: Vec<(String, i64)> =
        sqlx::query_as("SELECT position, COUNT(*) FROM users GROUP BY position")
            .fetch_all(pool)
            .await?;

    let by_location: Vec<(String, i64)> =
        sqlx::query_as("SELECT location, COUNT(*) FROM users GROUP BY location")
            .fetch_all(pool)
            .await?;

    Ok(UserStats {
        total,
        active,
        inactive: total - active,
        by_position,
        by_location,
    })
}

use chrono::{DateTime, Datelike, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::models::{NewFlightOrder, NewHotelOrder, Order, OrderKind, OrderStatus, Priority, User};

// Advisory lock keys serializing order-number generation per kind.
const FLIGHT_SEQ_LOCK: i64 = 0x43445f464c; // "CD_FL"
const HOTEL_SEQ_LOCK: i64 = 0x43445f4854; // "CD_HT"

async fn next_order_number(
    tx: &mut Transaction<'_, Postgres>,
    kind: OrderKind,
) -> Result<String, sqlx::Error> {
    let lock_key = match kind {
        OrderKind::Flight => FLIGHT_SEQ_LOCK,
        OrderKind::Hotel => HOTEL_SEQ_LOCK,
    };
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(lock_key)
        .execute(&mut **tx)
        .await?;

    // The sequence must never go backwards, even when cascade-deleting a
    // user removes their orders, so it is derived from the highest suffix
    // already issued this year rather than a row count.
    let prefix = format!("{}-{}-", kind.order_number_prefix(), Utc::now().year());
    let (max_suffix,): (i32,) = sqlx::query_as(
        "SELECT COALESCE(MAX(split_part(order_number, '-', 3)::INTEGER), 0)
         FROM orders WHERE order_number LIKE $1 || '%'",
    )
    .bind(&prefix)
    .fetch_one(&mut **tx)
    .await?;

    Ok(format!("{prefix}{:04}", max_suffix + 1))
}

/// Insert a flight order for `submitter`, snapshotting their employee id
/// and full name as they are right now.
pub async fn create_flight(
    pool: &PgPool,
    submitter: &User,
    req: &NewFlightOrder,
) -> Result<Order, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let order_number = next_order_number(&mut tx, OrderKind::Flight).await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders
            (order_number, kind, user_id, employee_id, full_name,
             departure_city, arrival_city, departure_date, departure_time,
             arrival_date, arrival_time, flight_number, airline, purpose,
             priority, passengers, luggage_info, special_requests)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         RETURNING *",
    )
    .bind(&order_number)
    .bind(OrderKind::Flight)
    .bind(submitter.id)
    .bind(&submitter.employee_id)
    .bind(&submitter.full_name)
    .bind(&req.departure_city)
    .bind(&req.arrival_city)
    .bind(req.departure_date)
    .bind(&req.departure_time)
    .bind(req.arrival_date)
    .bind(&req.arrival_time)
    .bind(&req.flight_number)
    .bind(&req.airline)
    .bind(&req.purpose)
    .bind(req.priority)
    .bind(req.passengers)
    .bind(&req.luggage_info)
    .bind(&req.special_requests)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(order)
}

pub async fn create_hotel(
    pool: &PgPool,
    submitter: &User,
    req: &NewHotelOrder,
) -> Result<Order, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let order_number = next_order_number(&mut tx, OrderKind::Hotel).await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders
            (order_number, kind, user_id, employee_id, full_name,
             city, check_in_date, check_in_time, check_out_date, check_out_time,
             flight_date, flight_number)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING *",
    )
    .bind(&order_number)
    .bind(OrderKind::Hotel)
    .bind(submitter.id)
    .bind(&submitter.employee_id)
    .bind(&submitter.full_name)
    .bind(&req.city)
    .bind(req.check_in_date)
    .bind(&req.check_in_time)
    .bind(req.check_out_date)
    .bind(&req.check_out_time)
    .bind(req.flight_date)
    .bind(&req.flight_number)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(order)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Compare-and-swap status update. Returns `None` when the order no longer
/// has `from` as its current status, i.e. a concurrent transition won the
/// race; the caller maps that to a `Conflict`.
///
/// Notes are only ever written together with `processed_by`/`processed_at`;
/// when no notes accompany the transition the previous notes are kept.
pub async fn transition(
    pool: &PgPool,
    id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    actor_id: Uuid,
    notes: Option<&str>,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET
            status = $1,
            processed_by = $2,
            processed_at = now(),
            admin_notes = COALESCE($3, admin_notes),
            updated_at = now()
         WHERE id = $4 AND status = $5
         RETURNING *",
    )
    .bind(to)
    .bind(actor_id)
    .bind(notes)
    .bind(id)
    .bind(from)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub user_id: Option<Uuid>,
    pub kind: Option<OrderKind>,
    pub status: Option<OrderStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams) {
    if let Some(user_id) = params.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(kind) = params.kind {
        qb.push(" AND kind = ").push_bind(kind);
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = params.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(from) = params.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(search) = &params.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (order_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR employee_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR departure_city ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR arrival_city ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR city ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR flight_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<Order>, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM orders WHERE TRUE");
    push_filters(&mut qb, params);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset);
    qb.build_query_as::<Order>().fetch_all(pool).await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE TRUE");
    push_filters(&mut qb, params);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(OrderStatus, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
        .fetch_all(pool)
        .await
}

pub async fn count_by_kind(pool: &PgPool) -> Result<Vec<(OrderKind, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT kind, COUNT(*) FROM orders GROUP BY kind")
        .fetch_all(pool)
        .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

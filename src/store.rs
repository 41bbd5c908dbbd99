//! Persistence behind the worker handlers.
//!
//! Handlers only see the [`ReservationStore`] and [`LogStore`] traits. The
//! PostgreSQL implementations are used by the worker binaries; the in-memory
//! ones back tests and local runs. Every call a handler makes goes through
//! [`with_deadline`].

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::PersistenceError;

// ============================================================================
// Records
// ============================================================================

/// A reservation ready to be written. `user_id` is always a verified subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    /// Restaurant being booked
    pub restaurant_id: String,
    /// Verified subject the booking belongs to
    pub user_id: String,
    /// Party size
    pub count: u32,
    /// Requested time, as supplied by the caller
    pub reservation_time: String,
    /// Free-text remarks
    pub remarks: String,
}

/// A stored reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRecord {
    /// Server-assigned identifier
    pub id: String,
    /// Restaurant being booked
    pub restaurant_id: String,
    /// Subject the booking belongs to
    pub user_id: String,
    /// Party size
    pub count: u32,
    /// Requested time
    pub reservation_time: String,
    /// Free-text remarks
    pub remarks: String,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

/// An audit record ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    /// Event tag, e.g. `Auth_Login`
    pub name: String,
    /// Human-readable detail
    pub data: String,
}

/// A stored audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Server-assigned identifier
    pub id: String,
    /// Event tag
    pub name: String,
    /// Human-readable detail
    pub data: String,
    /// When the record was written
    pub created_at: DateTime<Utc>,
    /// Same as `created_at`; records are never updated here
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Traits
// ============================================================================

/// Writes reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync + 'static {
    /// Inserts one reservation and returns it with its assigned id.
    async fn insert(&self, reservation: NewReservation) -> Result<ReservationRecord, PersistenceError>;
}

/// Writes audit records.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// Inserts one audit record.
    async fn insert(&self, entry: NewLogEntry) -> Result<LogEntry, PersistenceError>;
}

/// Runs a store call under a bounded deadline.
///
/// The future is dropped when the deadline elapses, which releases whatever
/// connection it held.
///
/// # Errors
///
/// Returns [`PersistenceError::Timeout`] if `limit` elapses first, otherwise
/// whatever the store call returned.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, PersistenceError>
where
    F: Future<Output = Result<T, PersistenceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PersistenceError::Timeout(limit)),
    }
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// Opens a small pool against `dsn`.
///
/// # Errors
///
/// Returns [`PersistenceError::Database`] if no connection can be made
/// within `acquire_timeout`.
pub async fn connect(dsn: &str, acquire_timeout: Duration) -> Result<PgPool, PersistenceError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(acquire_timeout)
        .connect(dsn)
        .await?;
    Ok(pool)
}

/// Reservations in the `reservations` table.
#[derive(Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn insert(&self, r: NewReservation) -> Result<ReservationRecord, PersistenceError> {
        let row = sqlx::query(
            r#"
            INSERT INTO reservations (restaurant_id, user_id, count, reservation_time, remarks)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id::text AS id, created_at
            "#,
        )
        .bind(&r.restaurant_id)
        .bind(&r.user_id)
        .bind(i64::from(r.count))
        .bind(&r.reservation_time)
        .bind(&r.remarks)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReservationRecord {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            restaurant_id: r.restaurant_id,
            user_id: r.user_id,
            count: r.count,
            reservation_time: r.reservation_time,
            remarks: r.remarks,
        })
    }
}

/// Audit records in the `logs` table.
#[derive(Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn insert(&self, entry: NewLogEntry) -> Result<LogEntry, PersistenceError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO logs (id, name, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(id)
        .bind(&entry.name)
        .bind(&entry.data)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(LogEntry {
            id: id.to_string(),
            name: entry.name,
            data: entry.data,
            created_at: now,
            updated_at: now,
        })
    }
}

// ============================================================================
// In-memory
// ============================================================================

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reservations held in memory with sequential ids starting at 1.
#[derive(Clone, Default)]
pub struct MemoryReservationStore {
    rows: Arc<Mutex<Vec<ReservationRecord>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MemoryReservationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later insert fail with `reason`; `None` restores normal behaviour.
    pub fn fail_inserts(&self, reason: Option<&str>) {
        *lock(&self.fail_with) = reason.map(str::to_string);
    }

    /// Everything written so far, oldest first.
    pub fn records(&self) -> Vec<ReservationRecord> {
        lock(&self.rows).clone()
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn insert(&self, r: NewReservation) -> Result<ReservationRecord, PersistenceError> {
        if let Some(reason) = lock(&self.fail_with).clone() {
            return Err(PersistenceError::Rejected(reason));
        }

        let mut rows = lock(&self.rows);
        let record = ReservationRecord {
            id: (rows.len() + 1).to_string(),
            restaurant_id: r.restaurant_id,
            user_id: r.user_id,
            count: r.count,
            reservation_time: r.reservation_time,
            remarks: r.remarks,
            created_at: Utc::now(),
        };
        rows.push(record.clone());
        Ok(record)
    }
}

/// Audit records held in memory.
#[derive(Clone, Default)]
pub struct MemoryLogStore {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }

    /// Entries tagged `name`.
    pub fn named(&self, name: &str) -> Vec<LogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn insert(&self, entry: NewLogEntry) -> Result<LogEntry, PersistenceError> {
        let now = Utc::now();
        let stored = LogEntry {
            id: Uuid::new_v4().to_string(),
            name: entry.name,
            data: entry.data,
            created_at: now,
            updated_at: now,
        };
        lock(&self.entries).push(stored.clone());
        Ok(stored)
    }
}

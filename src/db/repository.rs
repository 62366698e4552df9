//! Database repository for the roster, attendance log and image blobs.
//!
//! Writes go through a single transaction per call so a save lands whole or not at all.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{AttendanceEvent, EmployeeRecord, Role, Shift};

/// An uploaded image waiting to be written with the record that references it.
#[derive(Debug, Clone)]
pub struct PendingBlob {
    pub key: String,
    pub data: Vec<u8>,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the schema version stamped at creation.
    pub async fn schema_version(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT schema_version FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("schema_version"))
    }

    /// Load every employee in creation order.
    pub async fn load_roster(&self) -> Result<Vec<EmployeeRecord>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, cnic, age, role, city, shift, photo_ref, logo_ref FROM employees ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(employee_from_row).collect()
    }

    /// Load every attendance event in creation order.
    pub async fn load_attendance(&self) -> Result<Vec<AttendanceEvent>, AppError> {
        let rows = sqlx::query(
            "SELECT employee_id, name, date, time, timestamp FROM attendance ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attendance_from_row).collect()
    }

    /// Append employees, attendance events and blobs in one transaction.
    pub async fn append(
        &self,
        employees: &[EmployeeRecord],
        events: &[AttendanceEvent],
        blobs: &[PendingBlob],
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for blob in blobs {
            sqlx::query("INSERT INTO blobs (key, data, created_at) VALUES (?, ?, ?)")
                .bind(&blob.key)
                .bind(&blob.data)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        for employee in employees {
            sqlx::query(
                "INSERT INTO employees (id, name, cnic, age, role, city, shift, photo_ref, logo_ref, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )
            .bind(&employee.id)
            .bind(&employee.name)
            .bind(&employee.national_id_number)
            .bind(employee.age as i64)
            .bind(employee.role.as_str())
            .bind(&employee.city)
            .bind(employee.shift.as_str())
            .bind(&employee.photo_ref)
            .bind(&employee.logo_ref)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        for event in events {
            sqlx::query(
                "INSERT INTO attendance (employee_id, name, date, time, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&event.employee_id)
            .bind(&event.name)
            .bind(event.date)
            .bind(event.time)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch an uploaded image by key.
    pub async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let row = sqlx::query("SELECT data FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("data")))
    }
}

fn employee_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EmployeeRecord, AppError> {
    let id: String = row.get("id");
    let age: i64 = row.get("age");
    let role: String = row.get("role");
    let shift: String = row.get("shift");

    let corrupt = |what: &str| AppError::Persistence(format!("Employee {} has invalid {}", id, what));

    Ok(EmployeeRecord {
        age: u8::try_from(age).map_err(|_| corrupt("age"))?,
        role: Role::parse(&role).ok_or_else(|| corrupt("role"))?,
        shift: Shift::parse(&shift).ok_or_else(|| corrupt("shift"))?,
        name: row.get("name"),
        national_id_number: row.get("cnic"),
        city: row.get("city"),
        photo_ref: row.get("photo_ref"),
        logo_ref: row.get("logo_ref"),
        id,
    })
}

fn attendance_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttendanceEvent, AppError> {
    Ok(AttendanceEvent {
        employee_id: row.try_get("employee_id")?,
        name: row.try_get("name")?,
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        timestamp: row.try_get("timestamp")?,
    })
}

//! Attendance recording and CSV export.

use chrono::{Local, NaiveDateTime, Timelike};

use super::{Committed, RosterStore};
use crate::errors::AppError;
use crate::models::AttendanceEvent;

/// CSV header, one column per `AttendanceEvent` field in declaration order.
pub const CSV_HEADER: [&str; 5] = ["employeeId", "name", "date", "time", "timestamp"];

impl RosterStore {
    /// Append an attendance event for `employee_id` stamped with the current local time.
    pub async fn record_attendance(
        &self,
        employee_id: &str,
    ) -> Result<Committed<AttendanceEvent>, AppError> {
        self.record_attendance_at(employee_id, Local::now().naive_local())
            .await
    }

    /// Append an attendance event stamped with `now`.
    ///
    /// Unknown identifiers are rejected and leave the log untouched. Repeated
    /// scans are all kept.
    pub async fn record_attendance_at(
        &self,
        employee_id: &str,
        now: NaiveDateTime,
    ) -> Result<Committed<AttendanceEvent>, AppError> {
        let mut session = self.session.lock().await;
        self.ensure_loaded(&mut session).await?;

        let name = session
            .find(employee_id)
            .map(|record| record.name.clone())
            .ok_or_else(|| AppError::EmployeeNotFound(employee_id.to_string()))?;

        let event = AttendanceEvent {
            employee_id: employee_id.to_string(),
            name,
            date: now.date(),
            time: now.time().with_nanosecond(0).unwrap_or(now.time()),
            timestamp: now,
        };
        session.attendance.push(event.clone());
        tracing::info!("Attendance marked for {} ({})", event.name, event.employee_id);

        let persistence_warning = self.save_or_warn(&mut session).await;
        Ok(Committed {
            value: event,
            persistence_warning,
        })
    }
}

/// Render the attendance log as CSV with a header row, even when empty.
pub fn export_csv(events: &[AttendanceEvent]) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for event in events {
        writer.serialize(event).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

fn csv_error(err: csv::Error) -> AppError {
    tracing::error!("CSV export error: {:?}", err);
    AppError::Internal(format!("CSV export failed: {}", err))
}

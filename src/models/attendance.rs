//! Attendance event model.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One attendance scan. Append-only.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub employee_id: String,
    /// Copy of the employee name at scan time
    pub name: String,
    pub date: NaiveDate,
    /// Wall-clock time, second resolution
    pub time: NaiveTime,
    /// Full-resolution instant
    pub timestamp: NaiveDateTime,
}

/// Request body for marking attendance by identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendanceRequest {
    pub employee_id: String,
}

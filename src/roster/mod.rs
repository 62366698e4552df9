//! Roster store.
//!
//! Holds the employee roster and attendance log in memory for the life of the
//! process, loaded once at startup and saved after every mutation. All mutations
//! run under one async mutex, so identifier allocation, append and save never
//! interleave between concurrent requests.

pub mod allocator;
pub mod attendance;

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::db::{PendingBlob, Repository};
use crate::errors::AppError;
use crate::models::{AttendanceEvent, EmployeeRecord, NewEmployee};

/// Uploaded images accompanying an enrollment.
#[derive(Debug, Clone, Default)]
pub struct Uploads {
    pub logo: Option<Vec<u8>>,
    pub photo: Option<Vec<u8>>,
}

/// Result of a mutation that was applied in memory.
///
/// `persistence_warning` is set when the follow-up save failed; the unsaved rows
/// stay queued and go out with the next successful save.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub persistence_warning: Option<String>,
}

#[derive(Default)]
struct Session {
    /// False until the stored roster has been read; mutations wait for it
    loaded: bool,
    roster: Vec<EmployeeRecord>,
    attendance: Vec<AttendanceEvent>,
    /// Rows already on disk
    saved_employees: usize,
    saved_events: usize,
    pending_blobs: Vec<PendingBlob>,
}

impl Session {
    fn from_storage(roster: Vec<EmployeeRecord>, attendance: Vec<AttendanceEvent>) -> Self {
        Self {
            loaded: true,
            saved_employees: roster.len(),
            saved_events: attendance.len(),
            roster,
            attendance,
            pending_blobs: Vec::new(),
        }
    }

    fn find(&self, id: &str) -> Option<&EmployeeRecord> {
        self.roster.iter().find(|record| record.id == id)
    }

    fn append(&mut self, record: EmployeeRecord) -> Result<(), AppError> {
        if self.find(&record.id).is_some() {
            return Err(AppError::Internal(format!(
                "Employee {} already exists",
                record.id
            )));
        }
        self.roster.push(record);
        Ok(())
    }
}

/// Process-wide owner of the roster and attendance log.
pub struct RosterStore {
    repo: Repository,
    id_prefix: String,
    session: Mutex<Session>,
}

impl RosterStore {
    /// Load both tables and start a session.
    ///
    /// A failed load starts empty and read-only; the load is retried before each mutation.
    pub async fn open(repo: Repository, id_prefix: impl Into<String>) -> Self {
        let session = match Self::load(&repo).await {
            Ok((roster, attendance)) => {
                tracing::info!(
                    "Loaded {} employees and {} attendance events",
                    roster.len(),
                    attendance.len()
                );
                Session::from_storage(roster, attendance)
            }
            Err(e) => {
                tracing::warn!("Error loading data, starting with an empty roster: {}", e);
                Session::default()
            }
        };

        Self {
            repo,
            id_prefix: id_prefix.into(),
            session: Mutex::new(session),
        }
    }

    /// Read the roster and attendance log from durable storage.
    pub async fn load(
        repo: &Repository,
    ) -> Result<(Vec<EmployeeRecord>, Vec<AttendanceEvent>), AppError> {
        let roster = repo.load_roster().await?;
        let attendance = repo.load_attendance().await?;
        Ok((roster, attendance))
    }

    /// Retry a failed startup load. Mutations are refused until it succeeds.
    async fn ensure_loaded(&self, session: &mut Session) -> Result<(), AppError> {
        if session.loaded {
            return Ok(());
        }

        match Self::load(&self.repo).await {
            Ok((roster, attendance)) => {
                tracing::info!("Recovered stored roster of {} employees", roster.len());
                *session = Session::from_storage(roster, attendance);
                Ok(())
            }
            Err(e) => Err(AppError::Persistence(format!(
                "Stored roster is unavailable: {}",
                e
            ))),
        }
    }

    /// Write every row not yet on disk.
    pub async fn flush(&self) -> Result<(), AppError> {
        let mut session = self.session.lock().await;
        self.save(&mut session).await
    }

    async fn save(&self, session: &mut Session) -> Result<(), AppError> {
        let employees = &session.roster[session.saved_employees..];
        let events = &session.attendance[session.saved_events..];

        if employees.is_empty() && events.is_empty() && session.pending_blobs.is_empty() {
            return Ok(());
        }

        self.repo
            .append(employees, events, &session.pending_blobs)
            .await?;

        session.saved_employees = session.roster.len();
        session.saved_events = session.attendance.len();
        session.pending_blobs.clear();
        Ok(())
    }

    /// Save after a mutation, downgrading a failure to a warning.
    async fn save_or_warn(&self, session: &mut Session) -> Option<String> {
        match self.save(session).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Error saving data, keeping changes in memory: {}", e);
                Some(format!("Changes not saved: {}", e))
            }
        }
    }

    /// Allocate an identifier, run `build` against the new record, then append and save.
    ///
    /// `build` runs under the store lock before the record is appended; if it fails
    /// nothing is stored. Keep it cheap: decode uploads before calling.
    pub async fn enroll<T, F>(
        &self,
        employee: NewEmployee,
        uploads: Uploads,
        build: F,
    ) -> Result<Committed<(EmployeeRecord, T)>, AppError>
    where
        F: FnOnce(&EmployeeRecord, &Uploads) -> Result<T, AppError>,
    {
        let mut session = self.session.lock().await;
        self.ensure_loaded(&mut session).await?;

        let id = {
            let existing: HashSet<&str> = session.roster.iter().map(|r| r.id.as_str()).collect();
            allocator::allocate(&self.id_prefix, &existing)?
        };

        let photo_ref = uploads
            .photo
            .as_ref()
            .map(|_| format!("photo-{}", uuid::Uuid::new_v4()));
        let logo_ref = uploads
            .logo
            .as_ref()
            .map(|_| format!("logo-{}", uuid::Uuid::new_v4()));
        let record = employee.into_record(id, photo_ref.clone(), logo_ref.clone());

        let output = build(&record, &uploads)?;

        session.append(record.clone())?;

        let Uploads { logo, photo } = uploads;
        for (key, data) in [(photo_ref, photo), (logo_ref, logo)] {
            if let (Some(key), Some(data)) = (key, data) {
                session.pending_blobs.push(PendingBlob { key, data });
            }
        }
        tracing::info!("Enrolled employee {}", record.id);

        let persistence_warning = self.save_or_warn(&mut session).await;
        Ok(Committed {
            value: (record, output),
            persistence_warning,
        })
    }

    /// Look up one employee.
    pub async fn find_by_id(&self, id: &str) -> Option<EmployeeRecord> {
        self.session.lock().await.find(id).cloned()
    }

    /// Snapshot of the roster in creation order.
    pub async fn roster(&self) -> Vec<EmployeeRecord> {
        self.session.lock().await.roster.clone()
    }

    /// Snapshot of the attendance log in creation order.
    pub async fn attendance(&self) -> Vec<AttendanceEvent> {
        self.session.lock().await.attendance.clone()
    }

    /// Fetch an uploaded image, including ones not yet saved.
    pub async fn blob(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        {
            let session = self.session.lock().await;
            if let Some(pending) = session.pending_blobs.iter().find(|b| b.key == key) {
                return Ok(Some(pending.data.clone()));
            }
        }
        self.repo.get_blob(key).await
    }
}

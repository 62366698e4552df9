//! Employee record model and the card request body.

use serde::{Deserialize, Serialize};

/// Lowest age accepted on the card form.
pub const MIN_AGE: u8 = 18;
/// Highest age accepted on the card form.
pub const MAX_AGE: u8 = 65;

/// Job roles offered on the card form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "Software Engineer")]
    SoftwareEngineer,
    #[serde(rename = "Data Analyst")]
    DataAnalyst,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "HR Specialist")]
    HrSpecialist,
    #[serde(rename = "Sales Executive")]
    SalesExecutive,
    #[serde(rename = "Marketing Coordinator")]
    MarketingCoordinator,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SoftwareEngineer,
        Role::DataAnalyst,
        Role::ProjectManager,
        Role::HrSpecialist,
        Role::SalesExecutive,
        Role::MarketingCoordinator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SoftwareEngineer => "Software Engineer",
            Role::DataAnalyst => "Data Analyst",
            Role::ProjectManager => "Project Manager",
            Role::HrSpecialist => "HR Specialist",
            Role::SalesExecutive => "Sales Executive",
            Role::MarketingCoordinator => "Marketing Coordinator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

/// Working shift printed on the card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "Morning",
            Shift::Afternoon => "Afternoon",
            Shift::Night => "Night",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Morning" => Some(Shift::Morning),
            "Afternoon" => Some(Shift::Afternoon),
            "Night" => Some(Shift::Night),
            _ => None,
        }
    }
}

/// An enrolled employee. Immutable once its identifier is assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: String,
    pub name: String,
    pub national_id_number: String,
    pub age: u8,
    pub role: Role,
    pub city: String,
    pub shift: Shift,
    /// Blob key of the uploaded photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    /// Blob key of the uploaded logo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_ref: Option<String>,
}

/// Request body for enrolling a new employee.
///
/// `role` and `shift` stay strings here so that unknown values surface as
/// validation errors instead of body-parse failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub national_id_number: String,
    pub age: i64,
    pub role: String,
    #[serde(default)]
    pub city: String,
    pub shift: String,
    /// Base64-encoded PNG/JPEG
    #[serde(default)]
    pub logo: Option<String>,
    /// Base64-encoded PNG/JPEG
    #[serde(default)]
    pub photo: Option<String>,
}

/// Validated employee fields, waiting for an identifier.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub national_id_number: String,
    pub age: u8,
    pub role: Role,
    pub city: String,
    pub shift: Shift,
}

impl NewEmployee {
    /// Apply the card form rules to a request.
    pub fn validate(request: &CreateEmployeeRequest) -> Result<Self, String> {
        let name = request.name.trim();
        let national_id_number = request.national_id_number.trim();

        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if national_id_number.is_empty() {
            return Err("CNIC is required".to_string());
        }

        let age = u8::try_from(request.age)
            .ok()
            .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
            .ok_or_else(|| format!("Age must be between {} and {}", MIN_AGE, MAX_AGE))?;

        let role =
            Role::parse(&request.role).ok_or_else(|| format!("Unknown role: {}", request.role))?;
        let shift = Shift::parse(&request.shift)
            .ok_or_else(|| format!("Unknown shift: {}", request.shift))?;

        Ok(Self {
            name: name.to_string(),
            national_id_number: national_id_number.to_string(),
            age,
            role,
            city: request.city.trim().to_string(),
            shift,
        })
    }

    /// Attach the allocated identifier and blob references.
    pub fn into_record(
        self,
        id: String,
        photo_ref: Option<String>,
        logo_ref: Option<String>,
    ) -> EmployeeRecord {
        EmployeeRecord {
            id,
            name: self.name,
            national_id_number: self.national_id_number,
            age: self.age,
            role: self.role,
            city: self.city,
            shift: self.shift,
            photo_ref,
            logo_ref,
        }
    }
}

//! Domain models and shared field validation
//!
//! Validation lives here so the direct-create form path and the CSV import
//! path apply identical constraints.

use serde::{Deserialize, Serialize};

/// Participant sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
        }
    }

    /// Human-readable label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Sex::M => "Male",
            Sex::F => "Female",
        }
    }

    pub fn parse(s: &str) -> Option<Sex> {
        match s {
            "M" => Some(Sex::M),
            "F" => Some(Sex::F),
            _ => None,
        }
    }
}

/// User role carried on the authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    NationalOffice,
    Superuser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::NationalOffice => "national_office",
            Role::Superuser => "superuser",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "staff" => Some(Role::Staff),
            "national_office" => Some(Role::NationalOffice),
            "superuser" => Some(Role::Superuser),
            _ => None,
        }
    }

    /// National pages are open to national officers and superusers
    pub fn has_national_access(&self) -> bool {
        matches!(self, Role::NationalOffice | Role::Superuser)
    }
}

/// Audit log action kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    CsvImport,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::CsvImport => "CSV_IMPORT",
        }
    }

    pub fn parse(s: &str) -> Option<AuditAction> {
        match s {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            "CSV_IMPORT" => Some(AuditAction::CsvImport),
            _ => None,
        }
    }
}

/// A project center (physical program site)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectCenter {
    pub guid: String,
    pub name: String,
    pub center_code: String,
    pub territory: String,
    pub cluster: String,
    pub latitude: f64,
    pub longitude: f64,
    pub beneficiaries: i64,
    pub address: String,
    pub created_at: String,
}

/// A participant (beneficiary) attached to exactly one center
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub guid: String,
    pub center_id: String,
    pub participant_name: String,
    pub participant_id: String,
    pub sex: String,
    pub caregiver_name: String,
    pub house_latitude: f64,
    pub house_longitude: f64,
    pub created_at: String,
}

/// An authenticated user row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub center_id: Option<String>,
}

/// One append-only audit trail entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub action: String,
    pub center_code: Option<String>,
    pub center_name: Option<String>,
    pub participant_id: Option<String>,
    pub details: String,
    pub timestamp: String,
}

/// A single field validation failure, surfaced inline per field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

pub fn valid_latitude(value: f64) -> bool {
    (-90.0..=90.0).contains(&value)
}

pub fn valid_longitude(value: f64) -> bool {
    (-180.0..=180.0).contains(&value)
}

/// Participant fields as submitted by a form or a CSV row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantFields {
    pub participant_name: String,
    pub participant_id: String,
    pub sex: String,
    pub caregiver_name: String,
    pub house_latitude: f64,
    pub house_longitude: f64,
}

impl ParticipantFields {
    /// Validate all fields, collecting every failure
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.participant_name.trim().is_empty() {
            errors.push(FieldError::new("participant_name", "must not be empty"));
        }
        if self.participant_id.trim().is_empty() {
            errors.push(FieldError::new("participant_id", "must not be empty"));
        }
        if Sex::parse(&self.sex).is_none() {
            errors.push(FieldError::new("sex", "must be 'M' or 'F'"));
        }
        if self.caregiver_name.trim().is_empty() {
            errors.push(FieldError::new("caregiver_name", "must not be empty"));
        }
        if !valid_latitude(self.house_latitude) {
            errors.push(FieldError::new(
                "house_latitude",
                "must be between -90 and 90",
            ));
        }
        if !valid_longitude(self.house_longitude) {
            errors.push(FieldError::new(
                "house_longitude",
                "must be between -180 and 180",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Center fields as submitted when creating a center
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterFields {
    pub name: String,
    pub center_code: String,
    pub territory: String,
    pub cluster: String,
    pub latitude: f64,
    pub longitude: f64,
    pub beneficiaries: i64,
    #[serde(default)]
    pub address: String,
}

impl CenterFields {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.center_code.trim().is_empty() {
            errors.push(FieldError::new("center_code", "must not be empty"));
        }
        if self.territory.trim().is_empty() {
            errors.push(FieldError::new("territory", "must not be empty"));
        }
        if self.cluster.trim().is_empty() {
            errors.push(FieldError::new("cluster", "must not be empty"));
        }
        if !valid_latitude(self.latitude) {
            errors.push(FieldError::new("latitude", "must be between -90 and 90"));
        }
        if !valid_longitude(self.longitude) {
            errors.push(FieldError::new("longitude", "must be between -180 and 180"));
        }
        if self.beneficiaries < 0 {
            errors.push(FieldError::new("beneficiaries", "must not be negative"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

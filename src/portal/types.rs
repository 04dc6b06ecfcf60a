//! Wire types of the university portal API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 200;
pub const PASSWORD_MIN_CHARS: usize = 8;
const CONTACT_MAX_CHARS: usize = 100;
const PHONE_MAX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub university_name: String,
    pub institutional_email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Same rules the portal enforces server side.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_len = self.university_name.trim().chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(invalid(
                "university_name",
                format!(
                    "must be between {} and {} characters",
                    NAME_MIN_CHARS, NAME_MAX_CHARS
                ),
            ));
        }
        validate_email(&self.institutional_email)?;
        validate_password(&self.password)?;
        if let Some(contact) = &self.contact_person {
            if contact.chars().count() > CONTACT_MAX_CHARS {
                return Err(invalid(
                    "contact_person",
                    format!("must be at most {} characters", CONTACT_MAX_CHARS),
                ));
            }
        }
        if let Some(phone) = &self.phone {
            if phone.chars().count() > PHONE_MAX_CHARS {
                return Err(invalid(
                    "phone",
                    format!("must be at most {} characters", PHONE_MAX_CHARS),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(invalid("institutional_email", "must be a valid email address")),
    }
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a
/// digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(invalid(
            "password",
            format!("must be at least {} characters", PASSWORD_MIN_CHARS),
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("password", "must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(invalid("password", "must contain a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("password", "must contain a digit"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub university_id: i64,
    pub university_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub institutional_email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub university_id: i64,
    pub university_name: String,
    pub email: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub university_name: String,
    pub institutional_email: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    pub id: i64,
    pub document_type: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub upload_date: String,
    #[serde(default)]
    pub academic_year: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentInfo>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub document_id: i64,
    pub message: String,
    pub filename: String,
    pub upload_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub document_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveCall {
    pub id: i64,
    pub university_name: String,
    pub original_filename: String,
    pub stored_filename: String,
    #[serde(default)]
    pub academic_year: Option<String>,
    pub upload_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveCallsResponse {
    pub calls: Vec<ActiveCall>,
    pub total: usize,
}

/// Document categories a university can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    ErasmusCall,
    Destinations,
    ErasmusCourses,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::ErasmusCall,
        DocumentKind::Destinations,
        DocumentKind::ErasmusCourses,
    ];

    /// Path segment under `/upload/`.
    pub fn upload_path(&self) -> &'static str {
        match self {
            Self::ErasmusCall => "erasmus-call",
            Self::Destinations => "destinazioni",
            Self::ErasmusCourses => "erasmus-courses",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ErasmusCall => "Erasmus call",
            Self::Destinations => "Destinations",
            Self::ErasmusCourses => "Erasmus courses",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.upload_path())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "erasmus-call" | "call" | "bando" => Ok(Self::ErasmusCall),
            "destinazioni" | "destinations" => Ok(Self::Destinations),
            "erasmus-courses" | "courses" => Ok(Self::ErasmusCourses),
            other => Err(format!(
                "Unknown document kind '{}': expected erasmus-call, destinazioni or erasmus-courses",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            university_name: "Università di Pisa".to_string(),
            institutional_email: "erasmus@unipi.it".to_string(),
            password: "SecurePassword123".to_string(),
            contact_person: None,
            phone: None,
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        let mut req = request();
        req.university_name = "AB".to_string();
        assert!(req.validate().is_err());
        req.university_name = "ABC".to_string();
        assert!(req.validate().is_ok());
        req.university_name = "x".repeat(201);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Short1A").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password("Abcdefg1").is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("erasmus@unipi.it").is_ok());
        assert!(validate_email("erasmus.unipi.it").is_err());
        assert!(validate_email("@unipi.it").is_err());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let body = serde_json::to_value(request()).unwrap();
        assert!(body.get("phone").is_none());
        assert_eq!(body["institutional_email"], "erasmus@unipi.it");
    }

    #[test]
    fn test_document_kind_paths() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.upload_path().parse::<DocumentKind>(), Ok(kind));
        }
        assert!("thesis".parse::<DocumentKind>().is_err());
    }
}

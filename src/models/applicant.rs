//! Applicant profile, qualifications and uploaded documents

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

text_enum! {
    pub enum Gender {
        Male => "male",
        Female => "female",
    }
}

text_enum! {
    pub enum QualificationLevel {
        HighSchool => "high_school",
        Diploma => "diploma",
        Bachelor => "bachelor",
        Master => "master",
        Doctorate => "doctorate",
    }
}

text_enum! {
    /// Scale a GPA value is expressed in
    pub enum GpaScale {
        FourPoint => "four_point",
        FivePoint => "five_point",
        Percentage => "percentage",
    }
}

impl GpaScale {
    pub fn max(&self) -> f64 {
        match self {
            GpaScale::FourPoint => 4.0,
            GpaScale::FivePoint => 5.0,
            GpaScale::Percentage => 100.0,
        }
    }
}

text_enum! {
    pub enum DocumentKind {
        Passport => "passport",
        NationalId => "national_id",
        Cv => "cv",
        Transcript => "transcript",
        RecommendationLetter => "recommendation_letter",
        PersonalStatement => "personal_statement",
        Photo => "photo",
        QualificationCertificate => "qualification_certificate",
    }
}

impl DocumentKind {
    /// Documents every applicant must upload before the profile is complete
    pub const REQUIRED: &'static [DocumentKind] = &[DocumentKind::Passport, DocumentKind::Transcript];

    /// Extensions accepted for this kind on top of the configured allow-list
    pub fn restricted_extensions(&self) -> Option<&'static [&'static str]> {
        match self {
            DocumentKind::Photo => Some(&["jpg", "jpeg", "png"]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Applicant {
    pub id: i64,
    pub user_id: i64,
    pub national_id: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub nationality_country_id: Option<i64>,
    pub address: Option<String>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicantProfileRequest {
    pub national_id: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub nationality_country_id: Option<i64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Qualification {
    pub id: i64,
    pub applicant_id: i64,
    pub level: QualificationLevel,
    pub institution: String,
    pub major: Option<String>,
    pub gpa: Option<f64>,
    pub gpa_scale: Option<GpaScale>,
    pub graduation_year: i32,
    pub certificate_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQualificationRequest {
    pub level: QualificationLevel,
    pub institution: String,
    pub major: Option<String>,
    pub gpa: Option<f64>,
    pub gpa_scale: Option<GpaScale>,
    pub graduation_year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQualificationRequest {
    pub level: Option<QualificationLevel>,
    pub institution: Option<String>,
    pub major: Option<String>,
    pub gpa: Option<f64>,
    pub gpa_scale: Option<GpaScale>,
    pub graduation_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicantDocument {
    pub id: i64,
    pub applicant_id: i64,
    pub kind: DocumentKind,
    pub storage_path: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// A file received from the outer layer, not yet stored
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

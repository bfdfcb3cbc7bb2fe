//! Builders for test users, profiles and enrolled students

use chrono::{Datelike, Duration, Utc};
use scholardesk::models::activity::{Activity, ActivityKind, CreateActivityRequest};
use scholardesk::models::applicant::{
    CreateQualificationRequest, DocumentKind, DocumentUpload, GpaScale, QualificationLevel,
    ApplicantProfileRequest,
};
use scholardesk::models::application::{
    ApplicantApplication, CreateApplicationRequest, ScheduleAppointmentRequest,
};
use scholardesk::models::scholarship::{CreateScholarshipRequest, Scholarship};
use scholardesk::models::student::Student;
use scholardesk::models::user::{CreateUserRequest, User, UserRole};
use scholardesk::services::ServiceFactory;

pub async fn create_user(services: &ServiceFactory, email: &str, role: UserRole) -> User {
    services
        .user_service
        .register(CreateUserRequest {
            email: email.to_string(),
            full_name: format!("Test {}", role),
            phone: None,
            role,
            language_code: Some("en".to_string()),
        })
        .await
        .expect("Failed to register user")
}

pub async fn create_admin(services: &ServiceFactory) -> User {
    create_user(services, "admin@scholardesk.test", UserRole::Admin).await
}

pub fn pdf(name: &str) -> DocumentUpload {
    DocumentUpload {
        original_name: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.4 test document".to_vec(),
    }
}

/// Applicant with a qualification, passport and transcript on file
pub async fn create_complete_applicant(services: &ServiceFactory, email: &str) -> User {
    let user = create_user(services, email, UserRole::Applicant).await;
    let applicants = &services.applicant_service;

    applicants
        .create_profile(&user, ApplicantProfileRequest::default())
        .await
        .expect("Failed to create profile");
    applicants
        .add_qualification(
            &user,
            CreateQualificationRequest {
                level: QualificationLevel::Bachelor,
                institution: "State University".to_string(),
                major: Some("Computer Science".to_string()),
                gpa: Some(3.6),
                gpa_scale: Some(GpaScale::FourPoint),
                graduation_year: Utc::now().year() - 1,
            },
        )
        .await
        .expect("Failed to add qualification");
    applicants
        .upload_document(&user, DocumentKind::Passport, pdf("passport.pdf"))
        .await
        .expect("Failed to upload passport");
    applicants
        .upload_document(&user, DocumentKind::Transcript, pdf("transcript.pdf"))
        .await
        .expect("Failed to upload transcript");

    user
}

pub async fn create_open_scholarship(services: &ServiceFactory, admin: &User, sponsor_id: Option<i64>) -> Scholarship {
    create_scholarship_with_seats(services, admin, sponsor_id, Some(10)).await
}

pub async fn create_scholarship_with_seats(
    services: &ServiceFactory,
    admin: &User,
    sponsor_id: Option<i64>,
    seats: Option<i32>,
) -> Scholarship {
    let now = Utc::now();
    services
        .scholarship_service
        .create(
            admin,
            CreateScholarshipRequest {
                title: "Engineering Excellence".to_string(),
                description: Some("Full tuition for engineering students".to_string()),
                sponsor_id,
                country_id: None,
                university_id: None,
                specialization_id: None,
                seats,
                opens_at: now - Duration::days(1),
                closes_at: now + Duration::days(30),
            },
        )
        .await
        .expect("Failed to create scholarship")
}

pub async fn apply(services: &ServiceFactory, applicant: &User, scholarship: &Scholarship) -> ApplicantApplication {
    services
        .application_service
        .apply(
            applicant,
            CreateApplicationRequest {
                scholarship_id: scholarship.id,
                motivation: Some("I want to build bridges".to_string()),
            },
        )
        .await
        .expect("Failed to apply")
}

/// Run an application through every stage and return the new student
pub async fn enroll_student(services: &ServiceFactory, admin: &User, email: &str) -> (User, Student) {
    let applicant = create_complete_applicant(services, email).await;
    let scholarship = create_open_scholarship(services, admin, None).await;
    let application = apply(services, &applicant, &scholarship).await;
    advance_to_second_approval(services, admin, application.id).await;

    let outcome = services
        .application_service
        .advance(admin, application.id, None)
        .await
        .expect("final approval");
    let student = outcome.student.expect("final approval creates a student");

    (applicant, student)
}

/// Walk an application from submitted to second approval, holding the meeting
pub async fn advance_to_second_approval(services: &ServiceFactory, admin: &User, application_id: i64) {
    let flow = &services.application_service;

    flow.advance(admin, application_id, None).await.expect("first approval");
    flow.advance(admin, application_id, None).await.expect("meeting");

    let appointment = flow
        .schedule_appointment(
            admin,
            ScheduleAppointmentRequest {
                application_id,
                scheduled_at: Utc::now() + Duration::days(2),
                location: Some("Room 101".to_string()),
                notes: None,
            },
        )
        .await
        .expect("schedule appointment");
    flow.complete_appointment(admin, appointment.id, None).await.expect("complete appointment");

    flow.advance(admin, application_id, None).await.expect("second approval");
}

pub async fn create_activity(services: &ServiceFactory, admin: &User, starts_in: Duration, capacity: Option<i32>) -> Activity {
    let starts_at = Utc::now() + starts_in;
    services
        .activity_service
        .create(
            admin,
            CreateActivityRequest {
                kind: ActivityKind::Program,
                title: "Research Methods Workshop".to_string(),
                description: None,
                location: Some("Hall B".to_string()),
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                capacity,
            },
        )
        .await
        .expect("Failed to create activity")
}

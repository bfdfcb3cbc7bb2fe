//! Tickets, student requests and announcements against a real database

mod helpers;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serial_test::serial;
use helpers::*;
use scholardesk::models::announcement::{Audience, CreateAnnouncementRequest};
use scholardesk::models::request::CreateStudentRequest;
use scholardesk::models::ticket::OpenTicketRequest;
use scholardesk::models::user::UserRole;
use scholardesk::workflow::{RequestKind, RequestStatus, TicketCategory, TicketStatus};
use scholardesk::ScholarDeskError;

fn ticket_request() -> OpenTicketRequest {
    OpenTicketRequest {
        subject: "Stipend not received".to_string(),
        category: TicketCategory::Stipend,
        body: "My March stipend has not arrived yet.".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn test_ticket_conversation() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let owner = create_user(&services, "owner@example.com", UserRole::Applicant).await;
    let stranger = create_user(&services, "stranger@example.com", UserRole::Applicant).await;
    let tickets = &services.ticket_service;

    let (ticket, first) = tickets.open(&owner, ticket_request()).await.unwrap();
    assert!(ticket.reference.starts_with("TK-"));
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(!first.from_staff);

    assert_matches!(
        tickets.reply(&stranger, ticket.id, "Me too".to_string()).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );

    let (answered, reply) = tickets.reply(&admin, ticket.id, "Payment was sent today.".to_string()).await.unwrap();
    assert_eq!(answered.status, TicketStatus::Answered);
    assert!(reply.from_staff);

    let (reopened, _) = tickets.reply(&owner, ticket.id, "Still nothing.".to_string()).await.unwrap();
    assert_eq!(reopened.status, TicketStatus::Open);

    let closed = tickets.close(&owner, ticket.id).await.unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
    assert!(closed.closed_at.is_some());

    assert_matches!(
        tickets.reply(&owner, ticket.id, "Hello?".to_string()).await,
        Err(ScholarDeskError::InvalidInput(_))
    );

    let again = tickets.reopen(&owner, ticket.id).await.unwrap();
    assert_eq!(again.status, TicketStatus::Open);
    assert!(again.closed_at.is_none());

    assert_eq!(tickets.messages(&owner, ticket.id).await.unwrap().len(), 3);

    let found = tickets.find_by_reference(&admin, &ticket.reference.to_lowercase()).await.unwrap();
    assert_eq!(found.id, ticket.id);
}

#[tokio::test]
#[serial]
async fn test_idle_answered_tickets_close() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let owner = create_user(&services, "quiet@example.com", UserRole::Applicant).await;

    let (ticket, _) = services.ticket_service.open(&owner, ticket_request()).await.unwrap();
    services.ticket_service.reply(&admin, ticket.id, "Resolved on our side.".to_string()).await.unwrap();

    let report = services.db.run_maintenance(Utc::now() + Duration::days(30), &TestDatabase::maintenance_policy()).await.unwrap();
    assert_eq!(report["tickets_closed"], 1);

    let closed = services.ticket_service.get(&owner, ticket.id).await.unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);
}

#[tokio::test]
#[serial]
async fn test_student_request_review() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, student) = enroll_student(&services, &admin, "letters@example.com").await;
    let requests = &services.request_service;

    let applicant = create_user(&services, "not-yet@example.com", UserRole::Applicant).await;
    assert_matches!(
        requests
            .create(&applicant, CreateStudentRequest { kind: RequestKind::EnrollmentLetter, details: "For visa".to_string() })
            .await,
        Err(ScholarDeskError::PermissionDenied(_))
    );

    let request = requests
        .create(&user, CreateStudentRequest { kind: RequestKind::EnrollmentLetter, details: "For visa".to_string() })
        .await
        .unwrap();
    assert_eq!(request.student_id, student.id);
    assert_eq!(request.status, RequestStatus::Pending);

    assert_matches!(
        requests.review(&user, request.id, RequestStatus::InReview, None).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );

    requests.review(&admin, request.id, RequestStatus::InReview, None).await.unwrap();
    assert_matches!(
        requests.cancel(&user, request.id).await,
        Err(ScholarDeskError::InvalidStateTransition { .. })
    );

    let approved = requests
        .review(&admin, request.id, RequestStatus::Approved, Some("Letter issued".to_string()))
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);

    let history = requests.history(&user, request.id).await.unwrap();
    let stages: Vec<_> = history.iter().map(|t| t.to_status).collect();
    assert_eq!(stages, vec![RequestStatus::Pending, RequestStatus::InReview, RequestStatus::Approved]);
}

#[tokio::test]
#[serial]
async fn test_announcement_visibility() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let applicant = create_user(&services, "reader@example.com", UserRole::Applicant).await;
    let (student_user, _) = enroll_student(&services, &admin, "student-reader@example.com").await;
    let announcements = &services.announcement_service;

    let publish = |title: &str, audience: Audience, expires_in: Option<Duration>| CreateAnnouncementRequest {
        title: title.to_string(),
        body: "Details inside".to_string(),
        audience,
        published_at: None,
        expires_at: expires_in.map(|d| Utc::now() + d),
    };

    announcements.publish(&admin, publish("Welcome", Audience::All, None)).await.unwrap();
    announcements.publish(&admin, publish("Deadline", Audience::Applicants, Some(Duration::days(7)))).await.unwrap();
    announcements.publish(&admin, publish("Orientation", Audience::Students, None)).await.unwrap();

    assert_matches!(
        announcements.publish(&admin, publish("Broken", Audience::All, Some(-Duration::days(1)))).await,
        Err(ScholarDeskError::InvalidInput(_))
    );
    assert_matches!(
        announcements.publish(&applicant, publish("Spam", Audience::All, None)).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );

    let now = Utc::now();
    let titles = |list: Vec<scholardesk::models::announcement::Announcement>| {
        let mut titles: Vec<String> = list.into_iter().map(|a| a.title).collect();
        titles.sort();
        titles
    };

    assert_eq!(
        titles(announcements.list_visible(&applicant, now).await.unwrap()),
        vec!["Deadline".to_string(), "Welcome".to_string()]
    );
    assert_eq!(
        titles(announcements.list_visible(&student_user, now).await.unwrap()),
        vec!["Orientation".to_string(), "Welcome".to_string()]
    );
    assert_eq!(
        titles(announcements.list_visible(&applicant, now + Duration::days(8)).await.unwrap()),
        vec!["Welcome".to_string()]
    );
}

#[tokio::test]
#[serial]
async fn test_dashboard_stats_for_admins_only() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let user = create_user(&services, "curious@example.com", UserRole::Applicant).await;

    services.ticket_service.open(&user, ticket_request()).await.unwrap();

    assert_matches!(
        services.system_stats(&user).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );

    let stats = services.system_stats(&admin).await.unwrap();
    assert_eq!(stats["users"]["applicant"], 1);
    assert_eq!(stats["users"]["admin"], 1);
    assert_eq!(stats["tickets"]["open"], 1);
    assert_eq!(stats["scholarships"]["total"], 0);
}

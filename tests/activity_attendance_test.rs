//! Programs, opportunities and QR attendance against a real database

mod helpers;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serial_test::serial;
use helpers::*;
use scholardesk::utils::errors::TokenError;
use scholardesk::workflow::{ActivityApplicationStatus, StudentStatus};
use scholardesk::ScholarDeskError;

#[tokio::test]
#[serial]
async fn test_capacity_and_decisions() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (first_user, _) = enroll_student(&services, &admin, "first@example.com").await;
    let (second_user, _) = enroll_student(&services, &admin, "second@example.com").await;

    let activity = create_activity(&services, &admin, Duration::days(3), Some(1)).await;
    let activities = &services.activity_service;

    let first = activities.apply(&first_user, activity.id).await.unwrap();
    let second = activities.apply(&second_user, activity.id).await.unwrap();
    assert_eq!(first.status, ActivityApplicationStatus::Pending);

    assert_matches!(
        activities.apply(&first_user, activity.id).await,
        Err(ScholarDeskError::Duplicate(_))
    );

    let accepted = activities.decide(&admin, first.id, true).await.unwrap();
    assert_eq!(accepted.status, ActivityApplicationStatus::Accepted);
    assert_eq!(accepted.decided_by, Some(admin.id));

    // The only seat is taken
    assert_matches!(
        activities.decide(&admin, second.id, true).await,
        Err(ScholarDeskError::InvalidInput(_))
    );
    let rejected = activities.decide(&admin, second.id, false).await.unwrap();
    assert_eq!(rejected.status, ActivityApplicationStatus::Rejected);

    assert_matches!(
        activities.decide(&first_user, first.id, false).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );
}

#[tokio::test]
#[serial]
async fn test_only_active_students_apply() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, student) = enroll_student(&services, &admin, "paused@example.com").await;
    let activity = create_activity(&services, &admin, Duration::days(1), None).await;

    services
        .student_service
        .change_status(&admin, student.id, StudentStatus::Suspended, None)
        .await
        .unwrap();

    assert_matches!(
        services.activity_service.apply(&user, activity.id).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );
}

#[tokio::test]
#[serial]
async fn test_cancel_and_excuse_flow() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "excuse@example.com").await;
    let activities = &services.activity_service;

    let first = create_activity(&services, &admin, Duration::days(1), None).await;
    let pending = activities.apply(&user, first.id).await.unwrap();
    let cancelled = activities.cancel(&user, pending.id).await.unwrap();
    assert_eq!(cancelled.status, ActivityApplicationStatus::Cancelled);

    let second = create_activity(&services, &admin, Duration::days(2), None).await;
    let participation = activities.apply(&user, second.id).await.unwrap();

    // Excuses only for accepted participation
    assert_matches!(
        activities.request_excuse(&user, participation.id, "Exam week".to_string()).await,
        Err(ScholarDeskError::InvalidStateTransition { .. })
    );

    activities.decide(&admin, participation.id, true).await.unwrap();
    assert_matches!(
        activities.request_excuse(&user, participation.id, "  ".to_string()).await,
        Err(ScholarDeskError::InvalidInput(_))
    );

    let requested = activities.request_excuse(&user, participation.id, "Exam week".to_string()).await.unwrap();
    assert_eq!(requested.status, ActivityApplicationStatus::ExcuseRequested);
    assert_eq!(requested.excuse_reason.as_deref(), Some("Exam week"));

    let excused = activities.decide_excuse(&admin, participation.id, true).await.unwrap();
    assert_eq!(excused.status, ActivityApplicationStatus::Excused);

    let mine = activities.list_mine(&user).await.unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
#[serial]
async fn test_qr_check_in() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "scanner@example.com").await;
    let (bystander, _) = enroll_student(&services, &admin, "bystander@example.com").await;

    let activity = create_activity(&services, &admin, -Duration::minutes(10), None).await;
    let participation = services.activity_service.apply(&user, activity.id).await.unwrap();
    services.activity_service.apply(&bystander, activity.id).await.unwrap();
    services.activity_service.decide(&admin, participation.id, true).await.unwrap();

    let attendance = &services.attendance_service;
    assert_matches!(
        attendance.issue_token(&user, activity.id).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );
    let issued = attendance.issue_token(&admin, activity.id).await.unwrap();
    assert_eq!(issued.activity_id, activity.id);

    let attended = attendance.check_in(&user, &issued.token).await.unwrap();
    assert_eq!(attended.status, ActivityApplicationStatus::Attended);
    assert!(attended.checked_in_at.is_some());

    assert_matches!(
        attendance.check_in(&user, &issued.token).await,
        Err(ScholarDeskError::Duplicate(_))
    );

    // Pending applications cannot check in
    assert_matches!(
        attendance.check_in(&bystander, &issued.token).await,
        Err(ScholarDeskError::InvalidStateTransition { .. })
    );

    assert_matches!(
        attendance.check_in(&user, "forged.token.value").await,
        Err(ScholarDeskError::Token(TokenError::Malformed(_)))
    );
}

#[tokio::test]
#[serial]
async fn test_check_in_outside_window() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "early-bird@example.com").await;

    let activity = create_activity(&services, &admin, Duration::hours(5), None).await;
    let participation = services.activity_service.apply(&user, activity.id).await.unwrap();
    services.activity_service.decide(&admin, participation.id, true).await.unwrap();

    let issued = services.attendance_service.issue_token(&admin, activity.id).await.unwrap();
    assert_matches!(
        services.attendance_service.check_in(&user, &issued.token).await,
        Err(ScholarDeskError::InvalidInput(_))
    );

    let later = activity.starts_at + Duration::minutes(5);
    let on_time = services.attendance_service.check_in_at(&user, &issued.token, later).await.unwrap();
    assert_eq!(on_time.status, ActivityApplicationStatus::Attended);
    assert_eq!(on_time.checked_in_at.map(|t| t.timestamp()), Some(later.timestamp()));
}

#[tokio::test]
#[serial]
async fn test_scan_rate_limit() {
    let db = require_db!();
    let mut settings = TestDatabase::settings();
    settings.attendance.scans_per_minute = 2;
    let services = db.services_with(settings);
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "spam@example.com").await;

    let attendance = &services.attendance_service;
    assert_matches!(attendance.check_in(&user, "junk").await, Err(ScholarDeskError::Token(_)));
    assert_matches!(attendance.check_in(&user, "junk").await, Err(ScholarDeskError::Token(_)));
    assert_matches!(attendance.check_in(&user, "junk").await, Err(ScholarDeskError::RateLimitExceeded));
}

#[tokio::test]
#[serial]
async fn test_absentees_after_activity_ends() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "no-show@example.com").await;

    let activity = create_activity(&services, &admin, Duration::hours(1), None).await;
    let participation = services.activity_service.apply(&user, activity.id).await.unwrap();
    services.activity_service.decide(&admin, participation.id, true).await.unwrap();

    assert_matches!(
        services.attendance_service.mark_absentees(&admin, activity.id).await,
        Err(ScholarDeskError::InvalidInput(_))
    );

    db.execute_sql(&format!(
        "UPDATE activities SET starts_at = NOW() - INTERVAL '3 hours', ends_at = NOW() - INTERVAL '1 hour' WHERE id = {}",
        activity.id
    ))
    .await
    .unwrap();

    let report = services.db.run_maintenance(Utc::now(), &TestDatabase::maintenance_policy()).await.unwrap();
    assert_eq!(report["absentees_marked"], 1);

    let after = services.activity_service.list_applications(&admin, activity.id).await.unwrap();
    assert_eq!(after[0].status, ActivityApplicationStatus::Absent);

    assert_eq!(services.attendance_service.mark_absentees(&admin, activity.id).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_maintenance_spares_grace_tail() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let (user, _) = enroll_student(&services, &admin, "latecomer@example.com").await;

    let activity = create_activity(&services, &admin, Duration::hours(1), None).await;
    let participation = services.activity_service.apply(&user, activity.id).await.unwrap();
    services.activity_service.decide(&admin, participation.id, true).await.unwrap();
    let issued = services.attendance_service.issue_token(&admin, activity.id).await.unwrap();

    // Ended five minutes ago, well inside the 30 minute grace
    db.execute_sql(&format!(
        "UPDATE activities SET starts_at = NOW() - INTERVAL '2 hours', ends_at = NOW() - INTERVAL '5 minutes' WHERE id = {}",
        activity.id
    ))
    .await
    .unwrap();

    let policy = TestDatabase::maintenance_policy();
    assert_eq!(policy.check_in_grace, Duration::minutes(30));
    let report = services.db.run_maintenance(Utc::now(), &policy).await.unwrap();
    assert_eq!(report["absentees_marked"], 0);
    assert_matches!(
        services.attendance_service.mark_absentees(&admin, activity.id).await,
        Err(ScholarDeskError::InvalidInput(_))
    );

    let attended = services.attendance_service.check_in(&user, &issued.token).await.unwrap();
    assert_eq!(attended.status, ActivityApplicationStatus::Attended);

    // Once the grace is over nobody is left to mark
    let report = services.db.run_maintenance(Utc::now() + Duration::hours(1), &policy).await.unwrap();
    assert_eq!(report["absentees_marked"], 0);
}

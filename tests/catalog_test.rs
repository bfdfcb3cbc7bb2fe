//! Catalog reference data against a real database

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;
use helpers::*;
use scholardesk::models::catalog::{
    CreateCountryRequest, CreateSpecializationRequest, CreateUniversityRequest,
    UpdateCountryRequest, UpdateSpecializationRequest, UpdateUniversityRequest,
};
use scholardesk::models::user::{User, UserRole};
use scholardesk::services::ServiceFactory;
use scholardesk::ScholarDeskError;

/// Country, university and specialization created by `admin`
async fn seed(services: &ServiceFactory, admin: &User) -> (i64, i64, i64) {
    let catalog = &services.catalog_service;
    let country = catalog
        .create_country(admin, CreateCountryRequest { name: "Kenya".to_string(), iso_code: "ke".to_string() })
        .await
        .unwrap();
    let university = catalog
        .create_university(
            admin,
            CreateUniversityRequest {
                country_id: country.id,
                name: "University of Nairobi".to_string(),
                website: Some("https://uonbi.ac.ke".to_string()),
            },
        )
        .await
        .unwrap();
    let specialization = catalog
        .create_specialization(
            admin,
            CreateSpecializationRequest { university_id: university.id, name: "Civil Engineering".to_string() },
        )
        .await
        .unwrap();
    (country.id, university.id, specialization.id)
}

#[tokio::test]
#[serial]
async fn test_catalog_crud() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let catalog = &services.catalog_service;
    assert!(!catalog.is_cached());

    let (country_id, university_id, specialization_id) = seed(&services, &admin).await;
    let countries = catalog.list_countries().await.unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].iso_code, "KE");

    let country = catalog
        .update_country(&admin, country_id, UpdateCountryRequest { name: Some("Republic of Kenya".to_string()), iso_code: None })
        .await
        .unwrap();
    assert_eq!(country.name, "Republic of Kenya");
    assert_eq!(country.iso_code, "KE");

    let university = catalog
        .update_university(&admin, university_id, UpdateUniversityRequest { name: None, website: Some("https://www.uonbi.ac.ke".to_string()) })
        .await
        .unwrap();
    assert_eq!(university.name, "University of Nairobi");
    assert_eq!(university.website.as_deref(), Some("https://www.uonbi.ac.ke"));

    let specialization = catalog
        .update_specialization(&admin, specialization_id, UpdateSpecializationRequest { name: Some("Structural Engineering".to_string()) })
        .await
        .unwrap();
    assert_eq!(specialization.name, "Structural Engineering");
    let listed = catalog.list_specializations(university_id).await.unwrap();
    assert_eq!(listed[0].name, "Structural Engineering");

    // Deleting a country takes its universities along
    catalog.delete_country(&admin, country_id).await.unwrap();
    assert!(catalog.list_universities(country_id).await.unwrap().is_empty());
    assert_matches!(
        catalog.delete_country(&admin, country_id).await,
        Err(ScholarDeskError::NotFound { entity: "Country", .. })
    );
}

#[tokio::test]
#[serial]
async fn test_catalog_updates_are_validated() {
    let db = require_db!();
    let services = db.services();
    let admin = create_admin(&services).await;
    let applicant = create_user(&services, "browser@example.com", UserRole::Applicant).await;
    let catalog = &services.catalog_service;
    let (country_id, university_id, _) = seed(&services, &admin).await;

    assert_matches!(
        catalog.update_country(&applicant, country_id, UpdateCountryRequest::default()).await,
        Err(ScholarDeskError::PermissionDenied(_))
    );
    assert_matches!(
        catalog
            .update_country(&admin, country_id, UpdateCountryRequest { name: None, iso_code: Some("KEN".to_string()) })
            .await,
        Err(ScholarDeskError::InvalidInput(_))
    );
    assert_matches!(
        catalog
            .update_university(&admin, university_id, UpdateUniversityRequest { name: Some("  ".to_string()), website: None })
            .await,
        Err(ScholarDeskError::InvalidInput(_))
    );
    assert_matches!(
        catalog.update_specialization(&admin, 999_999, UpdateSpecializationRequest::default()).await,
        Err(ScholarDeskError::NotFound { entity: "Specialization", .. })
    );

    catalog
        .create_country(&admin, CreateCountryRequest { name: "Ghana".to_string(), iso_code: "GH".to_string() })
        .await
        .unwrap();
    assert_matches!(
        catalog
            .update_country(&admin, country_id, UpdateCountryRequest { name: Some("Ghana".to_string()), iso_code: None })
            .await,
        Err(ScholarDeskError::Duplicate(_))
    );
}

#[tokio::test]
#[serial]
async fn test_catalog_falls_back_when_redis_is_down() {
    let db = require_db!();
    let mut settings = TestDatabase::settings();
    settings.features.catalog_cache = true;
    // Nothing listens on port 1
    settings.redis.url = "redis://127.0.0.1:1/".to_string();
    let services = db.services_with(settings);
    let admin = create_admin(&services).await;
    let catalog = &services.catalog_service;
    assert!(catalog.is_cached());

    let (country_id, _, _) = seed(&services, &admin).await;
    assert_eq!(catalog.list_countries().await.unwrap().len(), 1);

    catalog
        .update_country(&admin, country_id, UpdateCountryRequest { name: Some("Kenya (KE)".to_string()), iso_code: None })
        .await
        .unwrap();
    let countries = catalog.list_countries().await.unwrap();
    assert_eq!(countries[0].name, "Kenya (KE)");

    let health = services.health_check().await;
    assert_eq!(health.redis_healthy, Some(false));
    assert!(health.is_healthy());
}

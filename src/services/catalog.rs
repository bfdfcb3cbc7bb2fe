//! Catalog service: countries, universities and specializations
//!
//! Listings are read through a Redis cache when one is configured. Cache
//! errors fall back to the database; any write drops every `catalog:*` key.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{info, warn, debug};
use crate::database::repositories::CatalogRepository;
use crate::models::catalog::{
    Country, University, Specialization, CreateCountryRequest, CreateUniversityRequest,
    CreateSpecializationRequest, UpdateCountryRequest, UpdateUniversityRequest,
    UpdateSpecializationRequest,
};
use crate::models::user::User;
use crate::services::auth::{AuthService, Permission};
use crate::services::redis::RedisService;
use crate::utils::errors::{ScholarDeskError, Result};
use crate::utils::helpers::require_text;
use crate::utils::logging::log_admin_action;

/// Two ASCII letters, stored uppercase
fn normalize_iso_code(raw: &str) -> Result<String> {
    let iso_code = raw.trim().to_uppercase();
    if iso_code.len() != 2 || !iso_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ScholarDeskError::InvalidInput(format!("Invalid ISO country code: {}", raw)));
    }
    Ok(iso_code)
}

fn check_website(website: Option<&str>) -> Result<()> {
    if let Some(website) = website.filter(|w| !w.is_empty()) {
        url::Url::parse(website)?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct CatalogService {
    repository: CatalogRepository,
    cache: Option<RedisService>,
    auth: AuthService,
}

impl CatalogService {
    pub fn new(repository: CatalogRepository, cache: Option<RedisService>) -> Self {
        Self {
            repository,
            cache,
            auth: AuthService::new(),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    async fn cached<T, F, Fut>(&self, key: &str, load: F) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let Some(cache) = &self.cache else {
            return load().await;
        };

        match cache.get::<Vec<T>>(key).await {
            Ok(Some(items)) => {
                debug!(key = %key, "Catalog cache hit");
                return Ok(items);
            }
            Ok(None) => debug!(key = %key, "Catalog cache miss"),
            Err(e) => warn!(key = %key, error = %e, "Catalog cache read failed"),
        }

        let items = load().await?;
        if let Err(e) = cache.set(key, &items, None).await {
            warn!(key = %key, error = %e, "Catalog cache write failed");
        }
        Ok(items)
    }

    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete_pattern("catalog:*").await {
                warn!(error = %e, "Catalog cache invalidation failed");
            }
        }
    }

    pub async fn list_countries(&self) -> Result<Vec<Country>> {
        self.cached("catalog:countries", || self.repository.list_countries()).await
    }

    pub async fn list_universities(&self, country_id: i64) -> Result<Vec<University>> {
        let key = format!("catalog:universities:{}", country_id);
        self.cached(&key, || self.repository.list_universities(country_id)).await
    }

    pub async fn list_specializations(&self, university_id: i64) -> Result<Vec<Specialization>> {
        let key = format!("catalog:specializations:{}", university_id);
        self.cached(&key, || self.repository.list_specializations(university_id)).await
    }

    pub async fn create_country(&self, admin: &User, request: CreateCountryRequest) -> Result<Country> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        let name = require_text("Country name", &request.name)?;
        let iso_code = normalize_iso_code(&request.iso_code)?;

        let country = self.repository.create_country(CreateCountryRequest { name, iso_code }).await?;
        self.invalidate().await;
        info!(country_id = country.id, admin_id = admin.id, "Country created");
        Ok(country)
    }

    pub async fn create_university(&self, admin: &User, request: CreateUniversityRequest) -> Result<University> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        self.repository.find_country(request.country_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Country", id: request.country_id })?;
        check_website(request.website.as_deref())?;

        let request = CreateUniversityRequest {
            name: require_text("University name", &request.name)?,
            ..request
        };
        let university = self.repository.create_university(request).await?;
        self.invalidate().await;
        info!(university_id = university.id, admin_id = admin.id, "University created");
        Ok(university)
    }

    pub async fn create_specialization(&self, admin: &User, request: CreateSpecializationRequest) -> Result<Specialization> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        self.repository.find_university(request.university_id).await?
            .ok_or(ScholarDeskError::NotFound { entity: "University", id: request.university_id })?;

        let request = CreateSpecializationRequest {
            name: require_text("Specialization name", &request.name)?,
            ..request
        };
        let specialization = self.repository.create_specialization(request).await?;
        self.invalidate().await;
        info!(specialization_id = specialization.id, admin_id = admin.id, "Specialization created");
        Ok(specialization)
    }

    pub async fn update_country(&self, admin: &User, id: i64, request: UpdateCountryRequest) -> Result<Country> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        let request = UpdateCountryRequest {
            name: request.name.map(|n| require_text("Country name", &n)).transpose()?,
            iso_code: request.iso_code.map(|c| normalize_iso_code(&c)).transpose()?,
        };

        let country = self.repository.update_country(id, request).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Country", id })?;
        self.invalidate().await;
        log_admin_action(admin.id, "update_country", Some(&id.to_string()), None);
        Ok(country)
    }

    pub async fn update_university(&self, admin: &User, id: i64, request: UpdateUniversityRequest) -> Result<University> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        check_website(request.website.as_deref())?;
        let request = UpdateUniversityRequest {
            name: request.name.map(|n| require_text("University name", &n)).transpose()?,
            ..request
        };

        let university = self.repository.update_university(id, request).await?
            .ok_or(ScholarDeskError::NotFound { entity: "University", id })?;
        self.invalidate().await;
        log_admin_action(admin.id, "update_university", Some(&id.to_string()), None);
        Ok(university)
    }

    pub async fn update_specialization(&self, admin: &User, id: i64, request: UpdateSpecializationRequest) -> Result<Specialization> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        let request = UpdateSpecializationRequest {
            name: request.name.map(|n| require_text("Specialization name", &n)).transpose()?,
        };

        let specialization = self.repository.update_specialization(id, request).await?
            .ok_or(ScholarDeskError::NotFound { entity: "Specialization", id })?;
        self.invalidate().await;
        log_admin_action(admin.id, "update_specialization", Some(&id.to_string()), None);
        Ok(specialization)
    }

    pub async fn delete_country(&self, admin: &User, id: i64) -> Result<()> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        if !self.repository.delete_country(id).await? {
            return Err(ScholarDeskError::NotFound { entity: "Country", id });
        }
        self.invalidate().await;
        log_admin_action(admin.id, "delete_country", Some(&id.to_string()), None);
        Ok(())
    }

    pub async fn delete_university(&self, admin: &User, id: i64) -> Result<()> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        if !self.repository.delete_university(id).await? {
            return Err(ScholarDeskError::NotFound { entity: "University", id });
        }
        self.invalidate().await;
        log_admin_action(admin.id, "delete_university", Some(&id.to_string()), None);
        Ok(())
    }

    pub async fn delete_specialization(&self, admin: &User, id: i64) -> Result<()> {
        self.auth.require_permission(admin, Permission::ManageCatalog)?;
        if !self.repository.delete_specialization(id).await? {
            return Err(ScholarDeskError::NotFound { entity: "Specialization", id });
        }
        self.invalidate().await;
        log_admin_action(admin.id, "delete_specialization", Some(&id.to_string()), None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_codes_are_normalized() {
        assert_eq!(normalize_iso_code(" ke ").unwrap(), "KE");
        assert!(normalize_iso_code("KEN").is_err());
        assert!(normalize_iso_code("K1").is_err());
    }

    #[test]
    fn test_blank_website_is_allowed() {
        assert!(check_website(None).is_ok());
        assert!(check_website(Some("")).is_ok());
        assert!(check_website(Some("https://uni.example.edu")).is_ok());
        assert!(check_website(Some("not a url")).is_err());
    }
}

//! Catalog repository: countries, universities, specializations

use sqlx::PgPool;
use chrono::Utc;
use crate::database::connection::is_unique_violation;
use crate::models::catalog::{
    Country, University, Specialization, CreateCountryRequest, CreateUniversityRequest,
    CreateSpecializationRequest, UpdateCountryRequest, UpdateUniversityRequest,
    UpdateSpecializationRequest,
};
use crate::utils::errors::ScholarDeskError;

fn duplicate_or(err: sqlx::Error, what: String) -> ScholarDeskError {
    if is_unique_violation(&err) {
        ScholarDeskError::Duplicate(what)
    } else {
        err.into()
    }
}

#[derive(Clone, Debug)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_country(&self, request: CreateCountryRequest) -> Result<Country, ScholarDeskError> {
        let name = request.name.clone();
        sqlx::query_as::<_, Country>(
            r#"
            INSERT INTO countries (name, iso_code, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, name, iso_code, created_at
            "#
        )
        .bind(request.name)
        .bind(request.iso_code.to_uppercase())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("country {}", name)))
    }

    pub async fn find_country(&self, id: i64) -> Result<Option<Country>, ScholarDeskError> {
        let country = sqlx::query_as::<_, Country>(
            "SELECT id, name, iso_code, created_at FROM countries WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(country)
    }

    pub async fn list_countries(&self) -> Result<Vec<Country>, ScholarDeskError> {
        let countries = sqlx::query_as::<_, Country>(
            "SELECT id, name, iso_code, created_at FROM countries ORDER BY name ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(countries)
    }

    pub async fn update_country(&self, id: i64, request: UpdateCountryRequest) -> Result<Option<Country>, ScholarDeskError> {
        sqlx::query_as::<_, Country>(
            r#"
            UPDATE countries
            SET name = COALESCE($2, name),
                iso_code = COALESCE($3, iso_code)
            WHERE id = $1
            RETURNING id, name, iso_code, created_at
            "#
        )
        .bind(id)
        .bind(request.name)
        .bind(request.iso_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("country {}", id)))
    }

    pub async fn delete_country(&self, id: i64) -> Result<bool, ScholarDeskError> {
        let result = sqlx::query("DELETE FROM countries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_university(&self, request: CreateUniversityRequest) -> Result<University, ScholarDeskError> {
        let name = request.name.clone();
        sqlx::query_as::<_, University>(
            r#"
            INSERT INTO universities (country_id, name, website, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, country_id, name, website, created_at
            "#
        )
        .bind(request.country_id)
        .bind(request.name)
        .bind(request.website)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("university {}", name)))
    }

    pub async fn find_university(&self, id: i64) -> Result<Option<University>, ScholarDeskError> {
        let university = sqlx::query_as::<_, University>(
            "SELECT id, country_id, name, website, created_at FROM universities WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(university)
    }

    pub async fn list_universities(&self, country_id: i64) -> Result<Vec<University>, ScholarDeskError> {
        let universities = sqlx::query_as::<_, University>(
            "SELECT id, country_id, name, website, created_at FROM universities WHERE country_id = $1 ORDER BY name ASC"
        )
        .bind(country_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(universities)
    }

    pub async fn update_university(&self, id: i64, request: UpdateUniversityRequest) -> Result<Option<University>, ScholarDeskError> {
        sqlx::query_as::<_, University>(
            r#"
            UPDATE universities
            SET name = COALESCE($2, name),
                website = COALESCE($3, website)
            WHERE id = $1
            RETURNING id, country_id, name, website, created_at
            "#
        )
        .bind(id)
        .bind(request.name)
        .bind(request.website)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("university {}", id)))
    }

    pub async fn delete_university(&self, id: i64) -> Result<bool, ScholarDeskError> {
        let result = sqlx::query("DELETE FROM universities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_specialization(&self, request: CreateSpecializationRequest) -> Result<Specialization, ScholarDeskError> {
        let name = request.name.clone();
        sqlx::query_as::<_, Specialization>(
            r#"
            INSERT INTO specializations (university_id, name, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, university_id, name, created_at
            "#
        )
        .bind(request.university_id)
        .bind(request.name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("specialization {}", name)))
    }

    pub async fn list_specializations(&self, university_id: i64) -> Result<Vec<Specialization>, ScholarDeskError> {
        let specializations = sqlx::query_as::<_, Specialization>(
            "SELECT id, university_id, name, created_at FROM specializations WHERE university_id = $1 ORDER BY name ASC"
        )
        .bind(university_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(specializations)
    }

    pub async fn update_specialization(&self, id: i64, request: UpdateSpecializationRequest) -> Result<Option<Specialization>, ScholarDeskError> {
        sqlx::query_as::<_, Specialization>(
            r#"
            UPDATE specializations
            SET name = COALESCE($2, name)
            WHERE id = $1
            RETURNING id, university_id, name, created_at
            "#
        )
        .bind(id)
        .bind(request.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| duplicate_or(e, format!("specialization {}", id)))
    }

    pub async fn delete_specialization(&self, id: i64) -> Result<bool, ScholarDeskError> {
        let result = sqlx::query("DELETE FROM specializations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::admin_key::AdminKey,
    models::registration::{BulkActionRequest, ExportRequest, Registration, RegistrationListQuery},
    services::{activity, export::ExportService},
    AppState,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const LIST_FILTER: &str = "WHERE ($1::text = '' OR event = $1)
       AND ($2::text = '' OR age_group = $2)
       AND ($3::text = '' OR gender = $3)
       AND ($4::text = '' OR city = $4)
       AND ($5::boolean IS NULL OR is_active = $5)
       AND ($6::text = ''
            OR full_name ILIKE '%' || $6 || '%'
            OR whatsapp_number ILIKE '%' || $6 || '%'
            OR city ILIKE '%' || $6 || '%'
            OR serial_number::TEXT = $6
            OR id::TEXT = $6)";

/// Browse registrations in serial order, with the admin filters and search.
pub async fn list_registrations(
    State(state): State<AppState>,
    _auth: AdminKey,
    Query(query): Query<RegistrationListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let event = query.event.unwrap_or_default();
    let age_group = query.age_group.unwrap_or_default();
    let gender = query.gender.unwrap_or_default();
    let city = query.city.unwrap_or_default();
    let search = query.search.unwrap_or_default();

    let rows: Vec<Registration> = sqlx::query_as(&format!(
        "SELECT * FROM registrations
         {LIST_FILTER}
         ORDER BY serial_number
         LIMIT $7 OFFSET $8"
    ))
    .bind(&event)
    .bind(&age_group)
    .bind(&gender)
    .bind(&city)
    .bind(query.is_active)
    .bind(&search)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM registrations {LIST_FILTER}"))
        .bind(&event)
        .bind(&age_group)
        .bind(&gender)
        .bind(&city)
        .bind(query.is_active)
        .bind(&search)
        .fetch_one(&state.db)
        .await
        .unwrap_or(0);

    let results: Vec<Value> = rows.iter().map(Registration::to_admin_json).collect();

    Ok(Json(json!({
        "results": results,
        "total": total,
        "page": page,
        "per_page": per_page,
    })))
}

/// Newest-first audit trail for one registration.
pub async fn registration_activities(
    State(state): State<AppState>,
    _auth: AdminKey,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let entries = activity::list_for_registration(&state.db, id)
        .await
        .map_err(db_error)?;
    Ok(Json(json!({ "activities": entries })))
}

/// Soft activation toggling over a selection. Statistics are never rolled
/// back by a deactivation.
pub async fn bulk_action(
    State(state): State<AppState>,
    _auth: AdminKey,
    Json(req): Json<BulkActionRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let is_active = match req.action.as_str() {
        "activate" => true,
        "deactivate" => false,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Unknown bulk action: {other}") })),
            ))
        }
    };

    let result = sqlx::query(
        "UPDATE registrations SET is_active = $1, updated_at = NOW() WHERE id = ANY($2)",
    )
    .bind(is_active)
    .bind(&req.ids)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(json!({
        "affected": result.rows_affected(),
        "action": req.action,
    })))
}

pub async fn export_csv(
    State(state): State<AppState>,
    _auth: AdminKey,
    Json(req): Json<ExportRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let registrations = fetch_selection(&state.db, &req.ids).await.map_err(db_error)?;
    let bytes = ExportService::to_csv(registrations).map_err(export_error)?;
    Ok(attachment(bytes, "text/csv", "talent_registrations.csv"))
}

pub async fn export_xlsx(
    State(state): State<AppState>,
    _auth: AdminKey,
    Json(req): Json<ExportRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let registrations = fetch_selection(&state.db, &req.ids).await.map_err(db_error)?;
    let bytes = ExportService::to_xlsx(registrations).map_err(export_error)?;
    Ok(attachment(bytes, XLSX_CONTENT_TYPE, "talent_registrations.xlsx"))
}

/// 204 when no selected registration has a photo on disk.
pub async fn export_photos(
    State(state): State<AppState>,
    _auth: AdminKey,
    Json(req): Json<ExportRequest>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let registrations = fetch_selection(&state.db, &req.ids).await.map_err(db_error)?;

    match ExportService::photos_archive(registrations, &state.config.media_dir, "admin")
        .map_err(export_error)?
    {
        Some(bytes) => {
            let filename = format!(
                "talent_event_photos_{}.zip",
                Utc::now().format("%Y%m%d_%H%M%S")
            );
            Ok(attachment(bytes, "application/zip", &filename))
        }
        None => Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty())
            .unwrap()),
    }
}

/// Serve a stored participant photo (admin preview).
pub async fn serve_photo(
    State(state): State<AppState>,
    _auth: AdminKey,
    Path(path): Path<String>,
) -> Result<Response, StatusCode> {
    let file_path = std::path::PathBuf::from(&state.config.media_dir).join(&path);

    // The resolved path must stay inside the media directory
    let canonical_media = std::fs::canonicalize(&state.config.media_dir)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let canonical_file =
        std::fs::canonicalize(&file_path).map_err(|_| StatusCode::NOT_FOUND)?;
    if !canonical_file.starts_with(&canonical_media) {
        return Err(StatusCode::FORBIDDEN);
    }

    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let content_type = mime_guess::from_path(&file_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len().to_string())
        .body(Body::from(bytes))
        .unwrap())
}

/// Declarative admin-site configuration consumed by the admin frontend.
#[derive(Serialize)]
pub struct AdminSiteConfig {
    pub site_header: &'static str,
    pub site_title: &'static str,
    pub index_title: &'static str,
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub ordering: &'static [&'static str],
    pub actions: &'static [&'static str],
}

pub fn admin_site_config() -> AdminSiteConfig {
    AdminSiteConfig {
        site_header: "Bhudev Kalakaar 2025 Admin",
        site_title: "Talent Event Admin",
        index_title: "Talent Event Management",
        list_display: &[
            "serial_number",
            "full_name",
            "gender",
            "date_of_birth",
            "event",
            "age_group",
            "city",
            "whatsapp_number",
            "photo",
            "created_at",
            "is_active",
        ],
        list_filter: &["event", "age_group", "gender", "city", "terms", "is_active", "created_at"],
        search_fields: &["serial_number", "full_name", "whatsapp_number", "city", "id"],
        ordering: &["serial_number"],
        actions: &["activate", "deactivate", "export_csv", "export_xlsx", "export_photos"],
    }
}

pub async fn site_config(_auth: AdminKey) -> Json<AdminSiteConfig> {
    Json(admin_site_config())
}

/// The export selection: explicit ids, or every registration when empty.
async fn fetch_selection(
    pool: &sqlx::PgPool,
    ids: &[Uuid],
) -> Result<Vec<Registration>, sqlx::Error> {
    if ids.is_empty() {
        sqlx::query_as("SELECT * FROM registrations ORDER BY serial_number")
            .fetch_all(pool)
            .await
    } else {
        sqlx::query_as("SELECT * FROM registrations WHERE id = ANY($1) ORDER BY serial_number")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}

fn db_error(e: sqlx::Error) -> (StatusCode, Json<Value>) {
    ApiError::Database(e).into()
}

fn export_error(e: ApiError) -> (StatusCode, Json<Value>) {
    e.into()
}

fn attachment(bytes: Vec<u8>, content_type: &str, filename: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len().to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_site_config_mirrors_the_admin_surface() {
        let config = admin_site_config();
        assert_eq!(config.site_header, "Bhudev Kalakaar 2025 Admin");
        assert_eq!(config.ordering, ["serial_number"]);
        assert!(config.search_fields.contains(&"whatsapp_number"));
        assert!(config.actions.contains(&"export_photos"));
    }

    #[test]
    fn test_attachment_sets_disposition_header() {
        let response = attachment(b"a,b\n".to_vec(), "text/csv", "talent_registrations.csv");
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            disposition,
            "attachment; filename=\"talent_registrations.csv\""
        );
    }
}

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::AppState;

/// Extractor that validates the `X-Admin-Key` header against `config.admin_key`.
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("X-Admin-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing X-Admin-Key header"))?;

        if key != state.config.admin_key {
            return Err((StatusCode::UNAUTHORIZED, "Invalid admin key"));
        }

        Ok(AdminKey)
    }
}

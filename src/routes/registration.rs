use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::Redirect,
};

use crate::{
    services::registration::{RegistrationForm, RegistrationService, RequestMeta},
    services::stats::StatisticsService,
    AppState,
};

/// Handle a registration form submission.
///
/// Success redirects to the confirmation page; any failure redirects back to
/// the form with a flash message in the query string.
pub async fn submit_registration(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Redirect {
    let meta = request_meta(&headers);

    let form = match RegistrationForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => {
            tracing::error!("Registration submission error: {e}");
            return failure_redirect(&e.to_string());
        }
    };

    let registration =
        match RegistrationService::submit(&state.db, &state.config.media_dir, form, meta).await {
            Ok(registration) => registration,
            Err(e) => {
                tracing::error!("Registration submission error: {e}");
                return failure_redirect(&e.to_string());
            }
        };

    // Same request as the insert, but not transactionally coupled: a failure
    // here leaves the day's counters under-counted.
    if let Err(e) = StatisticsService::record_registration(
        &state.db,
        registration.created_at.date_naive(),
        &registration.event,
        &registration.age_group,
        &registration.city,
    )
    .await
    {
        tracing::error!("Statistics update error: {e}");
        return failure_redirect(&e.to_string());
    }

    Redirect::to(&format!(
        "/confirmation?registration_id={}",
        registration.registration_code()
    ))
}

fn failure_redirect(message: &str) -> Redirect {
    Redirect::to(&format!(
        "/?error={}",
        percent_encode(&format!("Registration failed: {message}"))
    ))
}

/// Client IP from the X-Forwarded-For first value (else X-Real-IP), plus the
/// User-Agent string.
fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let ip_address = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("X-Real-IP")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        });

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    RequestMeta { ip_address, user_agent }
}

/// Minimal query-string escaping for the flash message.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

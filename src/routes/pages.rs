use axum::response::Html;

/// The registration form. Rendering is intentionally static — all dynamic
/// behavior lives behind /submit and the admin API.
pub async fn registration_form() -> Html<&'static str> {
    Html(include_str!("../../templates/form.html"))
}

pub async fn confirmation() -> Html<&'static str> {
    Html(include_str!("../../templates/confirmation.html"))
}

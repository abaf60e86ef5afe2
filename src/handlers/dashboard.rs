// src/handlers/dashboard.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    dashboard::{Dashboard, load_dashboard},
    store::Store,
    utils::jwt::Claims,
};

/// Authored quizzes, own results and the public catalogue in one call.
///
/// Always 200: a listing that fails is empty and named in `warnings`.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = OK, body = Dashboard)),
    tag = "dashboard",
    security(("token" = []))
)]
pub async fn get_dashboard(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    Json(load_dashboard(store.as_ref(), &claims).await)
}

// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::{MAX_DOCUMENT_BYTES, RateLimit},
    docs,
    handlers::{ai, attempt, auth, dashboard, profile, quiz, submission},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

fn rate_limited(routes: Router<AppState>, limit: Option<RateLimit>) -> Router<AppState> {
    let Some(limit) = limit else {
        return routes;
    };

    match GovernorConfigBuilder::default()
        .per_second(limit.per_second)
        .burst_size(limit.burst_size)
        .finish()
    {
        Some(config) => routes.layer(GovernorLayer::new(Arc::new(config))),
        None => {
            tracing::warn!("AI rate limit {:?} is invalid; the AI routes are not limited", limit);
            routes
        }
    }
}

/// Assembles the main application router.
///
/// * Public: sign-up, sign-in and the public quiz catalogue.
/// * Authenticated: profile, taking quizzes, attempts, submissions, dashboard.
/// * Teacher only: authoring and the AI helpers.
/// * Ownership of a quiz, attempt or submission is checked per request.
pub fn create_router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(auth.clone()),
        );

    let profile_routes = Router::new()
        .route("/", get(profile::get_profile).patch(profile::update_profile))
        .layer(auth.clone());

    let quiz_routes = Router::new()
        .route("/public", get(quiz::list_public_quizzes))
        // Authoring
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/mine", get(quiz::list_my_quizzes))
                .layer(middleware::from_fn(teacher_middleware))
                .layer(auth.clone()),
        )
        // Owner and taker routes
        .merge(
            Router::new()
                .route(
                    "/{id}",
                    get(quiz::get_quiz)
                        .put(quiz::update_quiz)
                        .delete(quiz::delete_quiz),
                )
                .route("/{id}/sharing", put(quiz::update_sharing))
                .route("/{id}/take", get(quiz::take_quiz))
                .route("/{id}/submissions", post(quiz::submit_quiz))
                .route("/{id}/results", get(quiz::quiz_results))
                .route("/{id}/answer-key", get(quiz::answer_key))
                .route("/{id}/attempts", post(attempt::start_attempt))
                .layer(auth.clone()),
        );

    let attempt_routes = Router::new()
        .route(
            "/{id}",
            get(attempt::attempt_status).delete(attempt::abandon_attempt),
        )
        .route("/{id}/answers", put(attempt::save_answers))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .layer(auth.clone());

    let submission_routes = Router::new()
        .route("/mine", get(submission::list_my_submissions))
        .route("/{id}", get(submission::get_submission))
        .layer(auth.clone());

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::get_dashboard))
        .layer(auth.clone());

    let ai_routes = Router::new()
        .route("/generate", post(ai::generate_questions))
        .route("/enhance", post(ai::enhance_question))
        .route(
            "/document",
            post(ai::quiz_from_document).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES)),
        )
        // Double middleware protection: Auth first, then Teacher check
        .layer(middleware::from_fn(teacher_middleware))
        .layer(auth);
    let ai_routes = rate_limited(ai_routes, state.config.ai_rate_limit);

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/submissions", submission_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/ai", ai_routes)
        .merge(docs::create_router())
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        ai::ModelHandle, attempts::AttemptRegistry, config::Config, store::MemoryDocumentStore,
    };

    fn app() -> Router {
        create_router(AppState {
            store: Arc::new(MemoryDocumentStore::new()),
            config: Config {
                database_url: None,
                jwt_secret: "secret".to_string(),
                jwt_expiration: 60,
                rust_log: "error".to_string(),
                port: 0,
                cors_origins: vec!["http://localhost:3000".to_string(), "not a url\n".to_string()],
                gemini_api_key: None,
                gemini_model: "gemini-test".to_string(),
                gemini_base_url: "http://127.0.0.1:9".to_string(),
                ai_rate_limit: Some(RateLimit {
                    per_second: 2,
                    burst_size: 5,
                }),
            },
            ai: ModelHandle::disabled(),
            attempts: AttemptRegistry::new(),
        })
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/quizzes/public")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
    }
}

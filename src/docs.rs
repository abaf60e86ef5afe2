// src/docs.rs

use axum::Router;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{ai, attempt, auth, dashboard, profile, quiz, submission};

struct SecurityAddon;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        profile::get_profile,
        profile::update_profile,
        quiz::create_quiz,
        quiz::list_my_quizzes,
        quiz::list_public_quizzes,
        quiz::get_quiz,
        quiz::update_quiz,
        quiz::delete_quiz,
        quiz::update_sharing,
        quiz::take_quiz,
        quiz::submit_quiz,
        quiz::quiz_results,
        quiz::answer_key,
        attempt::start_attempt,
        attempt::attempt_status,
        attempt::save_answers,
        attempt::submit_attempt,
        attempt::abandon_attempt,
        submission::list_my_submissions,
        submission::get_submission,
        dashboard::get_dashboard,
        ai::generate_questions,
        ai::enhance_question,
        ai::quiz_from_document,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Sign-up and sign-in"),
        (name = "quizzes", description = "Authoring, sharing and taking quizzes"),
        (name = "attempts", description = "Server-timed quiz attempts"),
        (name = "submissions", description = "Scored submissions"),
        (name = "profile"),
        (name = "dashboard"),
        (name = "ai", description = "AI-assisted question authoring"),
    )
)]
pub struct ApiDoc;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use tower_governor::GovernorLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use schoolhub_config::CorsConfig;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::{require_admin, require_parent, require_student, require_teacher};
use crate::modules::announcements::router::{
    init_admin_announcements_router, init_announcements_router,
};
use crate::modules::approvals::router::init_approvals_router;
use crate::modules::assessments::router::init_admin_results_router;
use crate::modules::attendance::router::init_attendance_admin_router;
use crate::modules::auth::router::init_auth_router;
use crate::modules::classes::router::{init_admin_classes_router, init_classes_router};
use crate::modules::moderation::router::init_review_router;
use crate::modules::notes::router::init_notes_router;
use crate::modules::parents::router::init_parent_router;
use crate::modules::scheduled_subjects::router::init_admin_scheduled_subjects_router;
use crate::modules::students::router::init_student_router;
use crate::modules::teachers::router::init_teacher_router;
use crate::modules::users::router::init_users_router;
use crate::state::AppState;

fn init_admin_router() -> Router<AppState> {
    Router::new()
        .merge(init_approvals_router())
        .merge(init_admin_classes_router())
        .merge(init_admin_scheduled_subjects_router())
        .nest("/users", init_users_router())
        .nest("/review", init_review_router())
        .nest("/attendance", init_attendance_admin_router())
        .nest("/results", init_admin_results_router())
        .nest("/announcements", init_admin_announcements_router())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    // Credentials cannot be combined with a wildcard origin.
    if config.allows_any() {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer
        .allow_origin(allowed_origins)
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    let mut auth_router = init_auth_router();
    if let Some(config) = state.rate_limit_config.auth_governor_config() {
        auth_router = auth_router.layer(GovernorLayer::new(config));
    }

    let mut api = Router::new()
        .nest("/auth", auth_router)
        .nest("/classes", init_classes_router())
        .nest("/notes", init_notes_router())
        .nest("/announcements", init_announcements_router())
        .nest(
            "/admin",
            init_admin_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .nest(
            "/teacher",
            init_teacher_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_teacher)),
        )
        .nest(
            "/student",
            init_student_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_student)),
        )
        .nest(
            "/parent",
            init_parent_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_parent)),
        );
    if let Some(config) = state.rate_limit_config.general_governor_config() {
        api = api.layer(GovernorLayer::new(config));
    }

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.upload_config.body_limit()))
        .with_state(state.clone())
        .layer(cors_layer(&state.cors_config))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_wildcard() {
        let config = CorsConfig {
            allowed_origins: vec!["*".to_string()],
        };
        let _ = cors_layer(&config);
    }
}

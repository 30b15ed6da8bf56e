// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{ab_test, admin, auth, catalog, group, practice, profile, ranking, simulation},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, catalog, practice, simulations, groups,
///   ranking, profile, abtests, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, A/B test cache).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Keyed by peer IP; the server must be started with
    // into_make_service_with_connect_info for the extractor to resolve.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let catalog_routes = Router::new()
        .route("/disciplines", get(catalog::list_disciplines))
        .route("/disciplines/{id}/exams", get(catalog::list_exams))
        .route("/exams/{id}/questions", get(catalog::list_exam_questions));

    let practice_routes = Router::new()
        .route("/disciplines/{id}/sections", get(practice::list_sections))
        .route("/sections/{id}/sessions", get(practice::list_sessions))
        .route("/sessions/{id}/questions", get(practice::list_questions))
        // Progress routes need a user
        .merge(
            Router::new()
                .route("/disciplines/{id}/progress", get(practice::my_progress))
                .route("/progress", post(practice::save_progress))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let simulation_routes = Router::new()
        .route("/generate", post(simulation::generate))
        .route("/submit", post(simulation::submit))
        .route("/mine", get(simulation::list_mine))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let group_routes = Router::new()
        // The group directory is browsable without an account
        .route("/", get(group::list_groups))
        .merge(
            Router::new()
                .route("/", post(group::create_group))
                .route("/mine", get(group::list_my_groups))
                .route("/{id}", delete(group::delete_group))
                .route("/{id}/members", get(group::list_members))
                .route("/{id}/join", post(group::join_group))
                .route("/{id}/leave", post(group::leave_group))
                .route(
                    "/{id}/messages",
                    get(group::list_messages).post(group::send_message),
                )
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let ab_test_routes = Router::new()
        .route("/active/{location}", get(ab_test::get_active))
        .route("/{id}/track", post(ab_test::track_event))
        // Variant assignment needs a user identity
        .merge(
            Router::new()
                .route("/{id}/variant", get(ab_test::get_variant))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/disciplines", post(admin::create_discipline))
        .route(
            "/disciplines/{id}",
            put(admin::update_discipline).delete(admin::delete_discipline),
        )
        .route("/exams", post(admin::create_exam))
        .route("/exams/{id}", delete(admin::delete_exam))
        .route("/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/sections", post(admin::create_section))
        .route(
            "/sections/{id}",
            put(admin::update_section).delete(admin::delete_section),
        )
        .route("/sessions", post(admin::create_session))
        .route(
            "/sessions/{id}",
            put(admin::update_session).delete(admin::delete_session),
        )
        .route(
            "/sessions/{id}/questions",
            post(admin::create_practice_question),
        )
        .route(
            "/practice-questions/{id}",
            delete(admin::delete_practice_question),
        )
        .route(
            "/abtests",
            get(admin::list_ab_tests).post(admin::create_ab_test),
        )
        .route(
            "/abtests/{id}",
            put(admin::update_ab_test_status).delete(admin::delete_ab_test),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api/practice", practice_routes)
        .nest("/api/simulations", simulation_routes)
        .nest("/api/groups", group_routes)
        .route("/api/ranking", get(ranking::get_ranking))
        .nest("/api/profile", profile_routes)
        .nest("/api/abtests", ab_test_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

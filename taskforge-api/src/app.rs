/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskforge_api::{app::{build_router, AppState}, config::ApiConfig};
/// use taskforge_shared::config::EngineConfig;
/// use taskforge_shared::engine::Engine;
/// use taskforge_shared::notify::MemoryNotificationQueue;
/// use taskforge_shared::session::MemorySessionCache;
/// use taskforge_shared::store::MemoryStore;
///
/// let engine = Engine::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemorySessionCache::new()),
///     Arc::new(MemoryNotificationQueue::new()),
///     EngineConfig::default(),
/// );
/// let app = build_router(AppState::new(engine, ApiConfig::default()));
/// ```

use crate::{config::ApiConfig, middleware::session::require_session};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskforge_shared::engine::Engine;
use taskforge_shared::redis::RedisClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Authorization engine
    pub engine: Engine,

    /// HTTP configuration
    pub config: Arc<ApiConfig>,

    /// Database pool, reported by the health check when present
    pub db: Option<PgPool>,

    /// Redis handle, reported by the health check when present
    pub redis: Option<RedisClient>,
}

impl AppState {
    pub fn new(engine: Engine, config: ApiConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            db: None,
            redis: None,
        }
    }

    pub fn with_backends(mut self, db: PgPool, redis: RedisClient) -> Self {
        self.db = Some(db);
        self.redis = Some(redis);
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # liveness (public)
/// └── /v1/
///     ├── /auth/                           # public
///     │   ├── POST /register
///     │   ├── GET  /verify?code=
///     │   ├── POST /verify/resend
///     │   ├── POST /login
///     │   └── POST /logout
///     ├── GET /invitations/accept?code=    # public
///     ├── /users/                          # session
///     │   ├── GET /me, PUT /me/photo
///     │   ├── GET /
///     │   └── GET|DELETE /:id
///     ├── /projects/                       # session
///     │   ├── POST|GET|DELETE /
///     │   ├── GET|PUT|DELETE /:id
///     │   ├── POST /:id/invitations
///     │   └── DELETE /:id/members/:identity_id
///     └── /tasks/                          # session
///         ├── POST|GET /
///         └── GET|PUT|DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/verify", get(routes::auth::verify))
        .route("/verify/resend", post(routes::auth::resend_verification))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout));

    let invitation_routes =
        Router::new().route("/accept", get(routes::projects::accept_invitation));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/me", get(routes::users::me))
        .route("/me/photo", put(routes::users::update_photo))
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        );

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project)
                .get(routes::projects::list_projects)
                .delete(routes::projects::purge_projects),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/invitations", post(routes::projects::invite))
        .route(
            "/:id/members/:identity_id",
            delete(routes::projects::remove_member),
        );

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/invitations", invitation_routes)
        .merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// CORS policy
///
/// Session cookies are sent cross-site, so explicit origins get
/// credentials. `*` falls back to a permissive policy for development.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

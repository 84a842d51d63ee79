use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod admin;
pub mod auth;
mod cursor;
mod device;
mod error;
mod observability;
mod system;
mod types;
mod user;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn tokens(&self) -> &crate::services::TokenService {
        &self.shared.tokens
    }

    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn crate::services::Mailer> {
        &self.shared.mailer
    }

    #[must_use]
    pub fn devices(&self) -> &Arc<dyn crate::services::DeviceService> {
        &self.shared.devices
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/user/check", post(user::check_user))
        .route("/user/send_code", post(user::send_code))
        .route("/user/login", post(user::login))
        .route("/user/reset_password", post(user::reset_password))
        .route("/system/version", get(system::get_version))
        .route("/system/public_info", get(system::get_public_info));

    let authed_routes = Router::new()
        .route("/user/info", get(user::user_info))
        .route("/user/account", get(user::account))
        .route("/user/change_password", post(user::change_password))
        .route("/device/register", post(device::register))
        .route("/device/info", get(device::info))
        .route("/device/list", get(device::list))
        .route("/device/deactivate", put(device::deactivate))
        .route("/device/reset_machine_id", post(device::reset_machine_id))
        .route("/cursor/user_info", get(cursor::user_info))
        .route("/cursor/usage", get(cursor::usage))
        .route("/cursor/update_usage", post(cursor::update_usage))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Layer order matters: require_auth is added last so it runs first and
    // populates the identity require_admin checks.
    let admin_routes = Router::new()
        .route("/system/version", put(system::put_version))
        .route("/system/public_info", put(system::put_public_info))
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route(
            "/admin/users/{id}/reset-password",
            post(admin::reset_user_password),
        )
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let cors_origins = &state.config().server.cors_allowed_origins;
    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .merge(admin_routes)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
        .with_state(state)
}

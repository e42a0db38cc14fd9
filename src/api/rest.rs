use crate::config::Config;
use crate::counting::audit::PayloadAudit;
use crate::counting::registry::Registries;
use crate::counting::reconciler::Reconciler;
use crate::counting::signage::SignagePublisher;
use crate::db::catalog::CatalogStore;
use crate::db::models::audit_models::NewUserAudit;
use crate::db::store::CountingStore;
use crate::error::Error;
use crate::messaging::SignBus;
use crate::security::auth::AuthService;
use crate::security::{Claims, SecurityService};
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use log::{info, warn};
use serde::Serialize;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod audit_controller;
pub mod auth_controller;
pub mod cameras_controller;
pub mod car_details_controller;
pub mod clients_controller;
pub mod error_messages_controller;
pub mod guard;
pub mod health_controller;
pub mod history_controller;
pub mod pka_controller;
pub mod present_cars_controller;
pub mod settings_controller;
pub mod signs_controller;
pub mod third_party_controller;
pub mod users_controller;
pub mod webhook_controller;
pub mod zone_images_controller;
pub mod zones_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<PgPool>,
    pub store: Arc<dyn CountingStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub registries: Arc<Registries>,
    pub reconciler: Arc<Reconciler>,
    pub signage: Arc<SignagePublisher>,
    pub audit: Arc<PayloadAudit>,
    pub security: Arc<SecurityService>,
    pub auth_service: Arc<AuthService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services together. Registries start empty; call
    /// `registries.reload_all` before serving.
    pub fn new(
        config: Config,
        db_pool: Arc<PgPool>,
        store: Arc<dyn CountingStore>,
        catalog: Arc<dyn CatalogStore>,
        bus: Arc<dyn SignBus>,
    ) -> Self {
        let registries = Arc::new(Registries::new());
        let signage = Arc::new(SignagePublisher::new(store.clone(), bus, &config.pubsub));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            registries.clone(),
            signage.clone(),
        ));
        let security = Arc::new(SecurityService::new(config.security.clone()));
        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            security.clone(),
            &config.security,
        ));

        Self {
            audit: Arc::new(PayloadAudit::new(&config.capture)),
            db_pool,
            store,
            catalog,
            registries,
            reconciler,
            signage,
            security,
            auth_service,
            config: Arc::new(config),
        }
    }

    /// Rebuild the zone and camera snapshots after an admin change
    pub async fn reload_registries(&self) -> Result<()> {
        self.registries.reload_all(self.store.as_ref()).await
    }

    /// Append a user audit row. A failed write is logged, the change itself stands.
    pub async fn record_change(
        &self,
        claims: &Claims,
        module: &str,
        action: &str,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) {
        let entry = NewUserAudit {
            username: claims.sub.clone(),
            module: module.to_string(),
            action: action.to_string(),
            old_value,
            new_value,
        };

        if let Err(e) = self.catalog.record_audit(&entry).await {
            warn!(
                "Audit of {} {} by {} not written: {}",
                module, action, claims.sub, e
            );
        }
    }
}

/// JSON copy of a row for the audit trail
pub fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl ApiError {
    fn with_status(err: &Error, status: StatusCode) -> Self {
        ApiError {
            message: err.to_string(),
            status: status.as_u16(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::Parse(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::with_status(&err, status)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        ApiError {
            message: err.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

/// Build the full router. Split from `RestApi::run` so tests can drive it directly.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    let backoffice = Router::new()
        .route(
            "/zones",
            get(zones_controller::list_zones).post(zones_controller::create_zone),
        )
        .route(
            "/zones/:id",
            get(zones_controller::get_zone)
                .put(zones_controller::update_zone)
                .delete(zones_controller::delete_zone),
        )
        .route("/zones/:id/status", put(zones_controller::set_zone_status))
        .route("/zones/:id/images", get(zone_images_controller::list_zone_images))
        .route(
            "/zones/:id/images/:lang",
            get(zone_images_controller::get_zone_image)
                .put(zone_images_controller::save_zone_image)
                .delete(zone_images_controller::delete_zone_image),
        )
        .route(
            "/cameras",
            get(cameras_controller::list_cameras).post(cameras_controller::create_camera),
        )
        .route(
            "/cameras/:id",
            get(cameras_controller::get_camera)
                .put(cameras_controller::update_camera)
                .delete(cameras_controller::delete_camera),
        )
        .route(
            "/cameras/:id/status",
            put(cameras_controller::set_camera_status),
        )
        .route(
            "/signs",
            get(signs_controller::list_signs).post(signs_controller::create_sign),
        )
        .route(
            "/signs/:id",
            get(signs_controller::get_sign)
                .put(signs_controller::update_sign)
                .delete(signs_controller::delete_sign),
        )
        .route("/signs/:id/status", put(signs_controller::set_sign_status))
        .route("/signs/:id/push", post(signs_controller::push_sign))
        .route("/presentcars", get(present_cars_controller::list_present_cars))
        .route(
            "/presentcars/:lpn",
            get(present_cars_controller::get_present_car)
                .delete(present_cars_controller::delete_present_car),
        )
        .route("/history", get(history_controller::search_history))
        .route("/cardetails", get(car_details_controller::list_car_details))
        .route(
            "/cardetails/:id",
            get(car_details_controller::get_car_detail)
                .delete(car_details_controller::delete_car_detail),
        )
        .route(
            "/cardetails/:id/:picture",
            get(car_details_controller::get_car_picture),
        )
        .route(
            "/errors",
            get(error_messages_controller::list_error_messages),
        )
        .route(
            "/errors/:code",
            get(error_messages_controller::get_error_message)
                .put(error_messages_controller::save_error_message),
        )
        .route(
            "/errors/:code/:lang",
            delete(error_messages_controller::delete_error_language),
        )
        .route("/audit", get(audit_controller::list_audit))
        .route(
            "/settings",
            get(settings_controller::get_settings).put(settings_controller::update_settings),
        )
        .route(
            "/users",
            get(users_controller::list_users).post(users_controller::create_user),
        )
        .route(
            "/users/:username",
            get(users_controller::get_user)
                .put(users_controller::update_user)
                .delete(users_controller::delete_user),
        )
        .route(
            "/users/:username/status",
            put(users_controller::set_user_status),
        )
        .route(
            "/users/:username/reset-password",
            post(users_controller::reset_password),
        )
        .route(
            "/clients",
            get(clients_controller::list_clients).post(clients_controller::create_client),
        )
        .route("/clients/:id", delete(clients_controller::delete_client))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_backoffice,
        ))
        // added after the guard so it stays public
        .route("/login", post(auth_controller::login));

    let third_party = Router::new()
        .route("/zones", get(third_party_controller::list_zones))
        .route("/findcar", get(third_party_controller::find_car))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_third_party,
        ))
        .route("/token", post(third_party_controller::issue_token));

    let body_limit = state.config.capture.max_payload_bytes;

    Router::new()
        .route("/health", get(health_controller::health))
        .route("/cam", post(webhook_controller::receive_capture))
        .route("/v2/bays.json", get(pka_controller::search_bay))
        .route("/v2/maps/:imagename", get(pka_controller::zone_map))
        .nest("/backoffice", backoffice)
        .nest("/thirdparty", third_party)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub struct RestApi {
    state: AppState,
}

impl RestApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(&self) -> Result<()> {
        let api = &self.state.config.api;
        let app = build_router(self.state.clone());

        let addr = api.address.clone() + ":" + &api.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        Ok(())
    }
}

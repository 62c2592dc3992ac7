use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use tracing::{debug, error, info_span, Instrument};
use utoipa::ToSchema;

use super::auth::SessionCache;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    name: String,
    version: String,
    database: String,
    cache: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Database and session cache are healthy", body = [Health]),
        (status = 503, description = "Database or session cache is unhealthy", body = [Health])
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(
    method: Method,
    pool: Extension<PgPool>,
    cache: Extension<SessionCache>,
) -> impl IntoResponse {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let database = match pool.0.acquire().instrument(acquire_span).await {
        Ok(mut conn) => {
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            match conn.ping().instrument(ping_span).await {
                Ok(()) => Ok(()),
                Err(error) => {
                    error!("Failed to ping database: {}", error);

                    Err(StatusCode::SERVICE_UNAVAILABLE)
                }
            }
        }

        Err(error) => {
            error!("Failed to acquire database connection: {}", error);

            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let cache_status = match cache.0.ping().await {
        Ok(()) => Ok(()),
        Err(error) => {
            error!("Failed to ping session cache: {}", error);

            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let is_healthy = database.is_ok() && cache_status.is_ok();

    let health = Health {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
        cache: if cache_status.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = format!("{}:{}", health.name, health.version)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if is_healthy {
        debug!("Service dependencies are healthy");
        (StatusCode::OK, headers, body).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::Health;

    #[test]
    fn health_serializes_dependency_fields() {
        let health = Health {
            name: "gardi".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
            cache: "error".to_string(),
        };
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["database"], "ok");
        assert_eq!(value["cache"], "error");
    }
}

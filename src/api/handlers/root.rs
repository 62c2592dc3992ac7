use axum::response::IntoResponse;

/// Undocumented index route, mainly useful as a liveness probe target.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

//! Prometheus text exposition on `/metrics`, per the `metrics` +
//! `metrics-exporter-prometheus` stack named in §1's ambient-stack note.

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Installs the global recorder once at startup and hands back the handle
/// the `/metrics` route renders on every scrape.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("install the global metrics recorder exactly once at startup")
}

pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

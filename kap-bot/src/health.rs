use axum::extract::State;
use axum::routing::get;
use axum::Router;
use kap_core::PollStatus;

pub fn router(status: PollStatus) -> Router {
    Router::new().route("/", get(index)).with_state(status)
}

async fn index(State(status): State<PollStatus>) -> String {
    let last = status
        .last_checked()
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_owned());
    format!("KAP bot is running\nlast check: {last}\n")
}

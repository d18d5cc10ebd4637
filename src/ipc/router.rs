use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type TryHandle = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const FAMILIES: &[TryHandle] = &[
    handlers::core::try_handle,
    handlers::classes::try_handle,
    handlers::sections::try_handle,
    handlers::subjects::try_handle,
    handlers::teachers::try_handle,
    handlers::students::try_handle,
    handlers::exams::try_handle,
    handlers::attendance::try_handle,
    handlers::results::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(method = %req.method, id = %req.id, "request");
    for try_handle in FAMILIES.iter().copied() {
        if let Some(resp) = try_handle(state, &req) {
            return resp;
        }
    }

    tracing::warn!(method = %req.method, "unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

//! Key/value relay shared between the agent loop and other front-ends
//!
//! The trajectory lives under the `traj` key. Writes are last-writer-wins and readers always see a
//! whole value. With the `relay` feature the store is also served over HTTP:
//!
//! - `GET /api-sls`: every key and value
//! - `POST /api-sls` with `{"key": ..., "value": ...}`: set a key
//! - `PUT /api-sls/traj` with `{"item_type": "click" | "send_keys", "id": ..., "text": ...}`: append an
//!   action a human took in the browser

use crate::{error::AgentResult,
            trajectory::{SharedTrajectory, Trajectory}};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Arc, RwLock};

pub const TRAJECTORY_KEY: &str = "traj";
pub const DEFAULT_PORT: u16 = 2334;

#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    values: Arc<RwLock<IndexMap<String, Value>>>,
    trajectory: SharedTrajectory,
}

impl SharedStore {
    /// Store whose `traj` key is backed by `trajectory`
    pub fn new(trajectory: SharedTrajectory) -> Self {
        Self { values: Arc::default(), trajectory }
    }

    pub fn trajectory(&self) -> SharedTrajectory {
        self.trajectory.clone()
    }

    pub fn get(&self, key: &str) -> AgentResult<Option<Value>> {
        if key == TRAJECTORY_KEY {
            return Ok(Some(serde_json::to_value(&*self.trajectory.snapshot())?));
        }
        let values = self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    /// Set a key; a value for `traj` must be a serialized trajectory and replaces it whole
    pub fn set(&self, key: impl Into<String>, value: Value) -> AgentResult<()> {
        let key = key.into();
        if key == TRAJECTORY_KEY {
            let trajectory: Trajectory = serde_json::from_value(value)?;
            self.trajectory.replace(trajectory);
            return Ok(());
        }
        let mut values = self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key, value);
        Ok(())
    }

    /// Remove every key, emptying the trajectory
    pub fn clear(&self) {
        self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
        self.trajectory.replace(Trajectory::new());
    }

    /// Every key and value, `traj` included
    pub fn all(&self) -> AgentResult<IndexMap<String, Value>> {
        let mut all = self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone();
        all.insert(TRAJECTORY_KEY.to_string(), serde_json::to_value(&*self.trajectory.snapshot())?);
        Ok(all)
    }
}

#[cfg(feature = "relay")]
pub use server::{router, serve};

#[cfg(feature = "relay")]
mod server {
    use super::SharedStore;
    use crate::{error::AgentResult,
                trajectory::{BrowserAction, TrajectoryItem}};
    use axum::{Json, Router,
               extract::State,
               http::StatusCode,
               response::{IntoResponse, Response},
               routing::{get, put}};
    use serde::Deserialize;
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Deserialize)]
    pub(super) struct SetRequest {
        pub key: String,
        pub value: Value,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct TrajectoryPut {
        pub item_type: String,
        #[serde(default)]
        pub id: String,
        #[serde(default)]
        pub text: String,
    }

    pub fn router(store: SharedStore) -> Router {
        Router::new()
            .route("/api-sls", get(get_all).post(set_value))
            .route("/api-sls/traj", put(append_item))
            .with_state(store)
    }

    /// Serve the relay on `port` until `cancel` fires
    pub async fn serve(store: SharedStore, port: u16, cancel: CancellationToken) -> AgentResult<()> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        log::debug!("Relay listening on {}", listener.local_addr()?);
        axum::serve(listener, router(store))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        Ok(())
    }

    pub(super) async fn get_all(State(store): State<SharedStore>) -> Response {
        match store.all() {
            Ok(values) => Json(values).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }

    pub(super) async fn set_value(State(store): State<SharedStore>, Json(request): Json<SetRequest>) -> Response {
        match store.set(request.key, request.value) {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }

    pub(super) async fn append_item(State(store): State<SharedStore>, Json(put): Json<TrajectoryPut>) -> Response {
        log::debug!("Relay received {} on {}", put.item_type, put.id);
        let action = match put.item_type.as_str() {
            "click" if put.id.is_empty() => return bad_request("id is required for the click action"),
            "click" => BrowserAction::Click { id: put.id },
            "send_keys" if put.id.is_empty() => return bad_request("id is required for the send_keys action"),
            "send_keys" if put.text.is_empty() => return bad_request("text is required for the send_keys action"),
            "send_keys" => BrowserAction::SendKeys { id: put.id, text: put.text },
            other => return bad_request(&format!("unknown item type {}", other)),
        };
        store.trajectory().push(TrajectoryItem::from(action));
        StatusCode::OK.into_response()
    }

    fn bad_request(message: &str) -> Response {
        (StatusCode::BAD_REQUEST, message.to_string()).into_response()
    }
}

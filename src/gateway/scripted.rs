//! Scripted gateway double for component tests.
//!
//! Routes are keyed by method and path. Replies are served in order and the
//! last one repeats until the route is scripted again, which replaces it.
//! Unscripted routes fail as if the remote were unreachable. A route can be
//! gated so its requests stay in flight until the test releases them.

use super::{GatewayError, GatewayRequest, GatewayResponse, Method, RemoteGateway};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

type Reply = Result<GatewayResponse, GatewayError>;

#[derive(Default)]
struct Route {
    replies: VecDeque<Reply>,
    /// The only queued reply has been served at least once
    last_served: bool,
    gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.entry((method, path.to_string())).or_default();
        if route.last_served {
            route.replies.pop_front();
            route.last_served = false;
        }
        route.replies.push_back(reply);
    }

    pub(crate) fn ok(&self, method: Method, path: &str, payload: Value) {
        self.reply(method, path, Ok(GatewayResponse::ok(payload)));
    }

    pub(crate) fn status(&self, method: Method, path: &str, status: u16, payload: Value) {
        self.reply(method, path, Ok(GatewayResponse::new(status, payload)));
    }

    pub(crate) fn unreachable(&self, method: Method, path: &str) {
        self.reply(method, path, Err(GatewayError::Unavailable));
    }

    /// Hold requests to this route until permits are added to the returned gate
    pub(crate) fn gate(&self, method: Method, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        let mut routes = self.routes.lock().unwrap();
        routes.entry((method, path.to_string())).or_default().gate = Some(gate.clone());
        gate
    }

    pub(crate) fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, method: Method, path: &str) -> Vec<GatewayRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn request(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let key = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);

        let gate = self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .and_then(|route| route.gate.clone());
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front().unwrap(),
            Some(route) => match route.replies.front() {
                Some(reply) => {
                    route.last_served = true;
                    reply.clone()
                }
                None => Err(GatewayError::Unavailable),
            },
            None => Err(GatewayError::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn status_of(gateway: &ScriptedGateway) -> u16 {
        gateway
            .request(GatewayRequest::get("/r"))
            .await
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_replies_in_order_then_last_repeats() {
        let gateway = ScriptedGateway::new();
        gateway.ok(Method::Get, "/r", json!({}));
        gateway.status(Method::Get, "/r", 500, json!({}));

        assert_eq!(status_of(&gateway).await, 200);
        assert_eq!(status_of(&gateway).await, 500);
        assert_eq!(status_of(&gateway).await, 500);
    }

    #[tokio::test]
    async fn test_rescripting_replaces_served_reply() {
        let gateway = ScriptedGateway::new();
        gateway.ok(Method::Get, "/r", json!({}));
        assert_eq!(status_of(&gateway).await, 200);

        gateway.status(Method::Get, "/r", 503, json!({}));
        assert_eq!(status_of(&gateway).await, 503);

        let err = gateway
            .request(GatewayRequest::get("/unscripted"))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Unavailable);
    }
}

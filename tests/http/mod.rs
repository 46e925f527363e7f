use std::net::SocketAddr;
use std::pin::Pin;

use catalogd::config::context::build_context;
use catalogd::config::schema::load_config_from_string;
use catalogd::frontend::http::filters;
use futures::{Future, FutureExt};
use serde_json::{json, Value};
use tokio::sync::oneshot::{self, Sender};
use warp::hyper::body::to_bytes;
use warp::hyper::client::HttpConnector;
use warp::hyper::{Body, Client, Method, Request, Response};

use crate::sqlite_config;

mod collections;

/// Make an HTTP server that listens on a random free port, uses an in-memory
/// SQLite and requires a password ("write_password") for writes.
/// Returns the server's address, the actual server Future and a channel to stop the server
async fn make_http_server() -> (
    SocketAddr,
    Pin<Box<dyn Future<Output = ()> + Send>>,
    Sender<()>,
) {
    let config = load_config_from_string(&sqlite_config("sqlite::memory:"), false).unwrap();
    let http = config.frontend.http.clone().unwrap();
    let context = build_context(config).await.unwrap();

    let filters = filters(context.store, http);
    let (tx, rx) = oneshot::channel();
    let (addr, server) = warp::serve(filters).bind_with_graceful_shutdown(
        // Pass port :0 to pick a random free port
        "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
        async {
            rx.await.ok();
        },
    );

    (addr, server.boxed(), tx)
}

async fn response_json(response: Response<Body>) -> Value {
    let body_bytes = to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

async fn send(
    client: &Client<HttpConnector>,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "catalogd-tests");

    if let Some(t) = token {
        builder = builder.header("Authorization", format!("Bearer {t}"));
    }

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    client.request(builder.body(body).unwrap()).await.unwrap()
}

fn articles() -> Value {
    json!({
        "collection": "articles",
        "fields": [
            {"field": "id", "datatype": "integer", "note": "pk", "primary_key": true}
        ],
        "note": "Blog posts"
    })
}

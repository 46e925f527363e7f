use std::{net::SocketAddr, sync::Arc};

use percent_encoding::percent_decode_str;
use serde_json::json;
use tracing::{debug, info};
use warp::http::header::{AUTHORIZATION, USER_AGENT};
use warp::hyper::{body::Bytes, Body, Response, StatusCode};
use warp::{Filter, Rejection, Reply};

use crate::auth::{token_to_principal, AccessPolicy, Action, AuthError, UserContext};
use crate::catalog::{CatalogError, CollectionStore};
use crate::config::schema::HttpFrontend;
use crate::data_types::{ActorContext, CollectionInput};
use crate::query::{normalize, RawQuery};

use super::http_utils::{into_response, ApiError};

const BEARER_PREFIX: &str = "Bearer ";

// Resolve the `Authorization` header against the policy. Failures are handed to
// the handler rather than rejected so that they render as our own errors.
fn with_user(
    policy: AccessPolicy,
) -> impl Filter<Extract = (Result<UserContext, AuthError>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(AUTHORIZATION.as_str()).map(
        move |header: Option<String>| {
            let token = match header {
                None => None,
                Some(header) => match header.strip_prefix(BEARER_PREFIX) {
                    Some(token) => Some(token.trim().to_string()),
                    None => return Err(AuthError::Unauthorized),
                },
            };

            Ok(UserContext {
                principal: token_to_principal(token, &policy)?,
                policy: policy.clone(),
            })
        },
    )
}

// Where the request came from; the user is filled in once authenticated
fn with_actor() -> impl Filter<Extract = (ActorContext,), Error = Rejection> + Clone {
    warp::addr::remote()
        .and(warp::header::optional::<String>(USER_AGENT.as_str()))
        .map(|addr: Option<SocketAddr>, user_agent: Option<String>| ActorContext {
            ip: addr.map(|a| a.ip()),
            user_agent,
            user: None,
        })
}

fn authorize(user: Result<UserContext, AuthError>, action: Action) -> Result<UserContext, ApiError> {
    let user = user?;
    if !user.can_perform_action(action) {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

fn decode_name(name: &str) -> Result<String, ApiError> {
    percent_decode_str(name)
        .decode_utf8()
        .map(|n| n.into_owned())
        .map_err(|_| {
            CatalogError::CollectionNotFound {
                name: name.to_string(),
            }
            .into()
        })
}

// Reads and deletes are only dispatched for collections that exist right now
async fn ensure_exists(store: &Arc<dyn CollectionStore>, name: &str) -> Result<(), ApiError> {
    if !store.exists(name).await? {
        return Err(CatalogError::CollectionNotFound {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

fn data(value: impl serde::Serialize) -> Response<Body> {
    warp::reply::json(&json!({ "data": value })).into_response()
}

async fn create_collection(
    store: Arc<dyn CollectionStore>,
    user: Result<UserContext, AuthError>,
    mut actor: ActorContext,
    body: Bytes,
) -> Result<Response<Body>, ApiError> {
    let user = authorize(user, Action::Write)?;
    actor.user = user.principal.user_name();

    let input: CollectionInput =
        serde_json::from_slice(&body).map_err(|e| CatalogError::InvalidDefinition {
            reason: format!("malformed request body: {e}"),
        })?;

    let summary = store.create(&input, &actor).await?;
    info!("Created collection {:?}", summary.collection);

    Ok(data(summary))
}

async fn list_collections(
    store: Arc<dyn CollectionStore>,
    user: Result<UserContext, AuthError>,
    raw: RawQuery,
) -> Result<Response<Body>, ApiError> {
    authorize(user, Action::Read)?;

    let query = normalize(&raw)?;
    debug!("Listing collections with {query:?}");

    Ok(data(store.read_all(&query).await?))
}

async fn read_collection(
    store: Arc<dyn CollectionStore>,
    name: String,
    user: Result<UserContext, AuthError>,
    raw: RawQuery,
) -> Result<Response<Body>, ApiError> {
    authorize(user, Action::Read)?;

    let query = normalize(&raw)?;
    let name = decode_name(&name)?;
    ensure_exists(&store, &name).await?;

    Ok(data(store.read_one(&name, &query).await?))
}

async fn delete_collection(
    store: Arc<dyn CollectionStore>,
    name: String,
    user: Result<UserContext, AuthError>,
    mut actor: ActorContext,
) -> Result<Response<Body>, ApiError> {
    let user = authorize(user, Action::Write)?;
    actor.user = user.principal.user_name();

    let name = decode_name(&name)?;
    ensure_exists(&store, &name).await?;
    store.delete(&name, &actor).await?;
    info!("Deleted collection {name:?}");

    Ok(warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response())
}

pub fn filters(
    store: Arc<dyn CollectionStore>,
    config: HttpFrontend,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let policy = AccessPolicy::from_config(&config);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["Authorization", "Content-Type"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    let log = warp::log(module_path!());

    // POST /collections
    let store_ = store.clone();
    let create_route = warp::path!("collections")
        .and(warp::post())
        .and(with_user(policy.clone()))
        .and(with_actor())
        .and(warp::body::content_length_limit(config.body_max_length))
        .and(warp::body::bytes())
        .then(move |user, actor, body| create_collection(store_.clone(), user, actor, body))
        .map(into_response);

    // GET /collections
    let store_ = store.clone();
    let list_route = warp::path!("collections")
        .and(warp::get())
        .and(with_user(policy.clone()))
        .and(warp::query::<RawQuery>())
        .then(move |user, raw| list_collections(store_.clone(), user, raw))
        .map(into_response);

    // GET /collections/{name}
    let store_ = store.clone();
    let read_route = warp::path!("collections" / String)
        .and(warp::get())
        .and(with_user(policy.clone()))
        .and(warp::query::<RawQuery>())
        .then(move |name, user, raw| read_collection(store_.clone(), name, user, raw))
        .map(into_response);

    // DELETE /collections/{name}
    let delete_route = warp::path!("collections" / String)
        .and(warp::delete())
        .and(with_user(policy))
        .and(with_actor())
        .then(move |name, user, actor| delete_collection(store.clone(), name, user, actor))
        .map(into_response);

    create_route
        .or(list_route)
        .or(read_route)
        .or(delete_route)
        .with(cors)
        .with(log)
}

pub async fn run_server(store: Arc<dyn CollectionStore>, config: HttpFrontend) {
    let socket_addr: SocketAddr = format!("{}:{}", config.bind_host, config.bind_port)
        .parse()
        .expect("Error parsing the listen address");
    let filters = filters(store, config);

    info!("Starting the HTTP frontend on {socket_addr}");
    warp::serve(filters).run(socket_addr).await;
}

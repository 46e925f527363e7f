// Warp error handling and propagation
// Courtesy of https://github.com/seanmonstar/warp/pull/909#issuecomment-1184854848
//
// Usage:
//
//   1) A handler function, instead of returning a Warp reply/rejection, returns a
//   `Result<Reply, ApiError>.`
//
//   Rejections are meant to say "this filter can't handle this request, but maybe some
//   other can". Our errors are final and we want to bail out of handlers with `?`.
//
//   2) ApiError knows how to convert itself to an HTTP response + status code (error-specific),
//   allowing us to implement Reply for ApiError.
//
//   3) We can't implement Reply for Result<Reply, Reply> (we don't control Result), so we have to
//   add a final function `into_response` that converts our Result into a Response:
//
//   ```
//   .then(my_handler_func)
//   .map(into_response)
//   ```
//

use serde_json::json;
use tracing::error;
use warp::hyper::{Body, Response, StatusCode};
use warp::Reply;

use crate::auth::AuthError;
use crate::catalog::CatalogError;

#[derive(Debug)]
pub enum ApiError {
    Forbidden,
    Unauthorized(AuthError),
    Catalog(CatalogError),
}

// Wrap catalog errors so that we can automagically return an
// `ApiError(CatalogError)` by using the `?` operator
impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err)
    }
}

impl ApiError {
    fn status_code_body(self: ApiError) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not allowed to perform this action".to_string(),
            ),
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.code(), e.to_string()),
            ApiError::Catalog(e) => match e {
                CatalogError::InvalidDefinition { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_DEFINITION", e.to_string())
                }
                CatalogError::InvalidQuery { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_QUERY", e.to_string())
                }
                CatalogError::CollectionAlreadyExists { .. } => {
                    (StatusCode::CONFLICT, "COLLECTION_ALREADY_EXISTS", e.to_string())
                }
                CatalogError::CollectionNotFound { .. } => {
                    (StatusCode::NOT_FOUND, "COLLECTION_NOT_FOUND", e.to_string())
                }
                CatalogError::CatalogInconsistent { ref name, .. } => {
                    error!("{e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CATALOG_INCONSISTENT",
                        format!(
                            "Collection {name:?} was created but its field notes couldn't be recorded"
                        ),
                    )
                }
                // Store details stay in the log
                CatalogError::SchemaMutationFailed(_) | CatalogError::SqlxError(_) => {
                    error!("{e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "SCHEMA_MUTATION_FAILED",
                        "Internal error while accessing the schema".to_string(),
                    )
                }
            },
        }
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response<Body> {
        let (status, code, message) = self.status_code_body();
        let body = json!({"error": {"code": code, "message": message}});
        warp::reply::with_status(warp::reply::json(&body), status).into_response()
    }
}

pub fn into_response<S: Reply, E: Reply>(reply_res: Result<S, E>) -> Response<Body> {
    match reply_res {
        Ok(resp) => resp.into_response(),
        Err(err) => err.into_response(),
    }
}

use super::types::*;
use crate::auth::{hash_password, verify_password, AuthContext};
use crate::config::OperationTimes;
use crate::parser;
use crate::scheduler::scheduler::Scheduler;
use crate::store::{Store, StoreError};

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn unauthorized() -> ApiError {
    error(StatusCode::UNAUTHORIZED, "unauthorized")
}

/// `POST /expressions`: parses the submitted text and registers it with the
/// scheduler. Syntactic faults never enter the graph.
pub async fn handle_submit_expression(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    Extension(auth): Extension<Arc<AuthContext>>,
    Extension(times): Extension<OperationTimes>,
    headers: HeaderMap,
    Json(req): Json<SubmitExpressionRequest>,
) -> Result<(StatusCode, Json<SubmitExpressionResponse>), ApiError> {
    let claims = auth.authorize(&headers).map_err(|_| unauthorized())?;

    let specs = parser::parse(&req.expression, &times)
        .map_err(|e| error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    let id = scheduler.submit(claims.sub, specs);
    tracing::info!("User {} submitted expression {}", claims.sub, id);

    Ok((StatusCode::CREATED, Json(SubmitExpressionResponse { id })))
}

/// `GET /expressions`: all expressions of the calling user, newest first.
pub async fn handle_list_expressions(
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthContext>>,
    headers: HeaderMap,
) -> Result<Json<ExpressionListResponse>, ApiError> {
    let claims = auth.authorize(&headers).map_err(|_| unauthorized())?;

    let expressions = store
        .list_expressions(claims.sub)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .into_iter()
        .map(ExpressionView::from)
        .collect();

    Ok(Json(ExpressionListResponse { expressions }))
}

/// `GET /expressions/{id}`: a single expression, owner-scoped.
pub async fn handle_get_expression(
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let claims = auth.authorize(&headers).map_err(|_| unauthorized())?;

    match store.get_expression(&id, claims.sub) {
        Ok(expression) => Ok(Json(ExpressionResponse {
            expression: expression.into(),
        })),
        Err(StoreError::NotFound) => Err(error(StatusCode::NOT_FOUND, "expression not found")),
        Err(e) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

/// `POST /register`: creates an account. The password is digested before it
/// touches the store.
pub async fn handle_register(
    Extension(store): Extension<Arc<dyn Store>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.login.trim().is_empty() || req.password.is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "login and password are required",
        ));
    }

    match store.create_user(&req.login, &hash_password(&req.password)) {
        Ok(id) => Ok(Json(RegisterResponse { id })),
        Err(StoreError::Conflict(_)) => {
            Err(error(StatusCode::CONFLICT, "login already taken"))
        }
        Err(e) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

/// `POST /login`: verifies credentials and issues a session token. A wrong
/// login and a wrong password are indistinguishable to the caller.
pub async fn handle_login(
    Extension(store): Extension<Arc<dyn Store>>,
    Extension(auth): Extension<Arc<AuthContext>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid = || error(StatusCode::UNAUTHORIZED, "invalid login or password");

    let user = match store.get_user_by_login(&req.login) {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(invalid()),
        Err(e) => return Err(error(StatusCode::INTERNAL_SERVER_ERROR, e)),
    };

    if !verify_password(&req.password, &user.password_digest) {
        return Err(invalid());
    }

    let token = auth
        .issue_token(user.id, &user.login)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    tracing::info!("User {} logged in", user.login);
    Ok(Json(TokenResponse { token }))
}

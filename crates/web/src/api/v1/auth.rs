//! Account registration and token lifecycle. Tokens are opaque, handed
//! out exactly once; every other route consumes them through the
//! [`Actor`] extractor.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    routing::{get, on, post},
    Extension, Json, Router,
};
use model::user::{Role, User};
use refill::client::NewUser;
use serde::Deserialize;
use serde_json::json;
use utility::id::Id;

use crate::{
    common::{
        route_not_found, RouteErrorResponse, RouteResult, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{
        auth::Actor,
        base_url::{base_url_middleware, BaseUrl},
    },
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/auth{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/refresh", post(refresh))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterBody {
    name: String,
    email: String,
    password: String,
    role: Role,
    station_id: Option<String>,
}

async fn register(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<RegisterBody>,
) -> RouteResult<Json<serde_json::Value>> {
    let session = station_client
        .register(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
            station_id: body.station_id.map(Id::new),
            is_active: true,
        })
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })?;

    Ok(Json(json!({
        "message": "Registration successful",
        "user": me_hateoas(session.user.content, base_url),
        "token": session.token,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<LoginBody>,
) -> RouteResult<Json<serde_json::Value>> {
    let session = station_client
        .login(&body.email, &body.password)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })?;

    Ok(Json(json!({
        "message": "Login successful",
        "user": me_hateoas(session.user.content, base_url),
        "token": session.token,
    })))
}

async fn logout(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    actor: Actor,
) -> RouteResult<Json<serde_json::Value>> {
    station_client.logout(&actor.token).await.map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    })?;

    Ok(Json(json!({
        "message": "Logged out"
    })))
}

async fn me(
    actor: Actor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<hateoas::Response<User>>> {
    Ok(me_hateoas(actor.user.content, base_url).json())
}

async fn refresh(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    actor: Actor,
) -> RouteResult<Json<serde_json::Value>> {
    let token = station_client
        .refresh(&actor.user.id)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })?;

    Ok(Json(json!({
        "message": "Token refreshed",
        "token": token,
    })))
}

fn me_hateoas(user: User, base_url: Arc<BaseUrl>) -> hateoas::Response<User> {
    let station_id = user.station_id.clone();
    hateoas::Response::builder(user, base_url)
        .link("self", resource!("/me"))
        .link_option(
            "station",
            station_id
                .map(|station| super::stations::resource!("/{}", station.raw())),
        )
        .build()
}

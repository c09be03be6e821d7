//! Admin directory of station-manager accounts.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Json, Router,
};
use model::{
    user::{ManagerSummary, User},
    WithId,
};
use refill::database::{ManagerFilter, PageRequest};
use serde::Deserialize;
use serde_json::json;
use utility::id::Id;

use crate::{
    common::{
        route_not_found, schema_no_example, HateoasResult, RouteErrorResponse,
        RouteResult, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{
        auth::AdminActor,
        base_url::{base_url_middleware, BaseUrl},
    },
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/managers{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema_no_example::<ManagerSummary>))
        .route("/", get(get_managers).post(create_manager))
        .route("/active", get(get_active_managers))
        .route(
            "/:id",
            get(get_manager).put(update_manager).delete(delete_manager),
        )
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManagersQuery {
    is_active: Option<bool>,
    search: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

impl ManagersQuery {
    fn to_filter(&self, active_only: bool) -> ManagerFilter {
        ManagerFilter {
            active_only: active_only || self.is_active.unwrap_or(false),
            search: self.search.clone(),
            page: PageRequest::new(
                self.page.unwrap_or(1).max(1),
                self.per_page.unwrap_or(15).clamp(1, 100),
            ),
        }
    }
}

async fn get_managers(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Query(params): Query<ManagersQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<ManagerSummary>>>> {
    station_client
        .list_managers(&params.to_filter(false))
        .await
        .map(|page| {
            VecResponse::from_page(page, |summary| {
                manager_hateoas(summary, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_active_managers(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Query(params): Query<ManagersQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<ManagerSummary>>>> {
    station_client
        .list_managers(&params.to_filter(true))
        .await
        .map(|page| {
            VecResponse::from_page(page, |summary| {
                manager_hateoas(summary, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateManagerBody {
    name: String,
    email: String,
    password: String,
    is_active: Option<bool>,
}

async fn create_manager(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<CreateManagerBody>,
) -> HateoasResult<User> {
    station_client
        .create_manager(
            body.name,
            body.email,
            body.password,
            body.is_active.unwrap_or(true),
        )
        .await
        .map(|manager| user_hateoas(manager, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn get_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<ManagerSummary> {
    station_client
        .get_manager(&Id::new(id))
        .await
        .map(|summary| manager_hateoas(summary, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateManagerBody {
    name: Option<String>,
    email: Option<String>,
    is_active: Option<bool>,
}

async fn update_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<UpdateManagerBody>,
) -> HateoasResult<ManagerSummary> {
    let id: Id<User> = Id::new(id);
    let error_response = |why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::PUT)
            .with_uri(original_uri.path())
    };

    let summary = station_client
        .get_manager(&id)
        .await
        .map_err(error_response)?;

    let mut manager = summary.manager;
    if let Some(name) = body.name {
        manager.content.name = name;
    }
    if let Some(email) = body.email {
        manager.content.email = email;
    }
    if let Some(is_active) = body.is_active {
        manager.content.is_active = is_active;
    }

    let updated = station_client
        .update_manager(manager)
        .await
        .map_err(error_response)?;

    // Re-read through the summary path to include the assignment state.
    station_client
        .get_manager(&updated.id)
        .await
        .map(|summary| manager_hateoas(summary, base_url.clone()).json())
        .map_err(error_response)
}

async fn delete_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
) -> RouteResult<Json<serde_json::Value>> {
    station_client
        .delete_manager(&Id::new(id))
        .await
        .map(|_| {
            Json(json!({
                "message": "Station manager deleted successfully"
            }))
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

// - Presenters -

fn manager_hateoas(
    summary: ManagerSummary,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<ManagerSummary> {
    let id = summary.manager.id.clone();
    let station_id = summary
        .active_assignment
        .as_ref()
        .map(|assignment| assignment.content.station_id.clone());
    hateoas::Response::builder(summary, base_url)
        .link("self", resource!("/{}", id.raw()))
        .link_option(
            "station",
            station_id
                .map(|station| super::stations::resource!("/{}", station.raw())),
        )
        .build()
}

fn user_hateoas(
    user: WithId<User>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<User> {
    let id = user.id.clone();
    hateoas::Response::builder(user.content, base_url)
        .link("self", resource!("/{}", id.raw()))
        .build()
}

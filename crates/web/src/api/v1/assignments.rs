//! Manager assignment endpoints, nested under the station resource.
//! Assigning and removing are admin-only; both route through the
//! transactional ledger operations of the client.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, put},
    Extension, Json, Router,
};
use model::{assignment::ManagerAssignment, station::Station, user::User, WithId};
use serde::Deserialize;
use utility::id::Id;

use crate::{
    common::{
        schema_no_example, HateoasResult, PageParams, RouteErrorResponse,
        RouteResult, VecResponse,
    },
    hateoas,
    middleware::{
        auth::AdminActor,
        base_url::{base_url_middleware, BaseUrl},
    },
    WebState,
};

use super::stations::resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route(
            "/:id/manager",
            put(assign_manager)
                .delete(remove_manager)
                .get(current_manager),
        )
        .route("/:id/manager/history", get(manager_history))
        .route(
            "/:id/manager/schema",
            get(schema_no_example::<ManagerAssignment>),
        )
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignBody {
    manager_id: String,
}

async fn assign_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<AssignBody>,
) -> HateoasResult<ManagerAssignment> {
    let station_id: Id<Station> = Id::new(id);
    let manager_id: Id<User> = Id::new(body.manager_id);

    station_client
        .assign_manager(&station_id, &manager_id, &actor.user.id)
        .await
        .map(|assignment| assignment_hateoas(assignment, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::PUT)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct RemoveBody {
    removal_reason: Option<String>,
}

async fn remove_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    body: Option<Json<RemoveBody>>,
) -> HateoasResult<ManagerAssignment> {
    let station_id: Id<Station> = Id::new(id);
    let reason = body.and_then(|Json(body)| body.removal_reason);

    station_client
        .remove_manager(&station_id, reason)
        .await
        .map(|assignment| assignment_hateoas(assignment, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

async fn current_manager(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<serde_json::Value>> {
    let station_id: Id<Station> = Id::new(id);

    let assignment = station_client
        .current_manager(&station_id)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })?;

    // "No manager" is a regular answer here, not an error.
    let response = match assignment {
        Some(assignment) => serde_json::json!({
            "message": "Current manager retrieved successfully",
            "assignment": assignment_hateoas(assignment, base_url.clone()),
        }),
        None => serde_json::json!({
            "message": "No active manager assigned to this station",
            "assignment": null,
        }),
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    manager_id: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn manager_history(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    AdminActor(_actor): AdminActor,
    Query(params): Query<HistoryQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<ManagerAssignment>>>> {
    let station_id: Id<Station> = Id::new(id);
    let manager_id: Option<Id<User>> = params.manager_id.map(Id::new);
    let page = PageParams {
        page: params.page,
        per_page: params.per_page,
    }
    .to_request();

    station_client
        .manager_history(&station_id, manager_id.as_ref(), &page)
        .await
        .map(|page| {
            VecResponse::from_page(page, |assignment| {
                assignment_hateoas(assignment, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

fn assignment_hateoas(
    assignment: WithId<ManagerAssignment>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<ManagerAssignment> {
    let station_id = assignment.content.station_id.clone();
    let manager_id = assignment.content.manager_id.clone();
    hateoas::Response::builder(assignment.content, base_url)
        .link("station", resource!("/{}", station_id.raw()))
        .link(
            "history",
            resource!("/{}/manager/history", station_id.raw()),
        )
        .link(
            "manager",
            super::managers::resource!("/{}", manager_id.raw()),
        )
        .build()
}

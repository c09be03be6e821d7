use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on, patch},
    Extension, Json, Router,
};
use model::{
    history::{AvailabilityLogEntry, PriceHistoryEntry},
    station::Station,
    WithDistance, WithId,
};
use refill::{
    database::{PageRequest, StationFilter, StationSort},
    ranking::NearbyOutcome,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utility::id::Id;

use crate::{
    common::{
        route_not_found, schema, schema_no_example, HateoasResult, PageParams,
        RouteErrorResponse, RouteResult, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{
        auth::{Actor, AdminActor},
        base_url::{base_url_middleware, BaseUrl},
    },
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/stations{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Station>))
        .route("/", get(get_stations).post(create_station))
        .route("/nearby", get(nearby))
        .route("/nearby/schema", get(schema_no_example::<NearbyDto>))
        .route(
            "/:id",
            get(get_station).put(update_station).delete(delete_station),
        )
        .route("/:id/availability", patch(update_availability))
        .route("/:id/status", patch(toggle_status))
        .route("/:id/price-history", get(price_history))
        .route("/:id/availability-log", get(availability_log))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

// - Listing and lookup -

#[derive(Debug, Deserialize)]
pub(crate) struct StationsQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    assigned: Option<bool>,
    available: Option<bool>,
    sort_by: Option<String>,
}

impl StationsQuery {
    fn to_filter(&self) -> StationFilter {
        StationFilter {
            available: self.available.unwrap_or(false),
            assigned: self.assigned,
            sort: match self.sort_by.as_deref() {
                Some("name") => StationSort::Name,
                Some("price_per_kg") => StationSort::PricePerKg,
                _ => StationSort::RecentlyUpdated,
            },
            page: PageRequest::new(
                self.page.unwrap_or(1).max(1),
                self.per_page.unwrap_or(15).clamp(1, 100),
            ),
        }
    }
}

async fn get_stations(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    Query(params): Query<StationsQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<Station>>>> {
    station_client
        .list_stations(&params.to_filter())
        .await
        .map(|page| {
            VecResponse::from_page(page, |station| {
                station_hateoas(station, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_station(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Station> {
    station_client
        .get_station(&Id::new(id))
        .await
        .map(|station| station_hateoas(station, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

// - Administration -

#[derive(Debug, Deserialize)]
pub(crate) struct CreateStationBody {
    name: String,
    address: String,
    phone: String,
    email: String,
    latitude: f64,
    longitude: f64,
    operating_hours: String,
    price_per_kg: Option<f64>,
    image: Option<String>,
    is_available: Option<bool>,
}

async fn create_station(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    _admin: AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<CreateStationBody>,
) -> HateoasResult<Station> {
    let station = Station {
        name: body.name,
        address: body.address,
        phone: body.phone,
        email: body.email,
        is_available: body.is_available.unwrap_or(true),
        is_active: true,
        price_per_kg: body.price_per_kg,
        operating_hours: body.operating_hours,
        image: body.image,
        latitude: body.latitude,
        longitude: body.longitude,
    };

    station_client
        .create_station(station)
        .await
        .map(|station| station_hateoas(station, base_url.clone()).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStationBody {
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    operating_hours: Option<String>,
    price_per_kg: Option<f64>,
    image: Option<String>,
    is_available: Option<bool>,
}

async fn update_station(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    _admin: AdminActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<UpdateStationBody>,
) -> HateoasResult<Station> {
    let id: Id<Station> = Id::new(id);
    let error_response = |why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::PUT)
            .with_uri(original_uri.path())
    };

    let mut station = station_client
        .get_station(&id)
        .await
        .map_err(error_response)?;

    let current = &mut station.content;
    if let Some(name) = body.name {
        current.name = name;
    }
    if let Some(address) = body.address {
        current.address = address;
    }
    if let Some(phone) = body.phone {
        current.phone = phone;
    }
    if let Some(email) = body.email {
        current.email = email;
    }
    if let Some(latitude) = body.latitude {
        current.latitude = latitude;
    }
    if let Some(longitude) = body.longitude {
        current.longitude = longitude;
    }
    if let Some(operating_hours) = body.operating_hours {
        current.operating_hours = operating_hours;
    }
    if let Some(price_per_kg) = body.price_per_kg {
        current.price_per_kg = Some(price_per_kg);
    }
    if let Some(image) = body.image {
        current.image = Some(image);
    }
    if let Some(is_available) = body.is_available {
        current.is_available = is_available;
    }

    station_client
        .update_station(station)
        .await
        .map(|station| station_hateoas(station, base_url.clone()).json())
        .map_err(error_response)
}

async fn delete_station(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    _admin: AdminActor,
) -> RouteResult<Json<serde_json::Value>> {
    station_client
        .delete_station(&Id::new(id))
        .await
        .map(|_| {
            Json(json!({
                "message": "Station deleted successfully"
            }))
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

// - Nearby search -

#[derive(Debug, Deserialize)]
pub(crate) struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    radius: Option<u32>,
    available_only: Option<bool>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NearbyDto {
    message: String,
    radius_km: f64,
    available_count: usize,
    unavailable_count: usize,
    data: Vec<hateoas::Response<WithDistance<Station>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyBenchmark {
    search_secs: f64,
    candidates: usize,
}

async fn nearby(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { station_client, .. }): State<WebState>,
    Query(params): Query<NearbyQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<NearbyDto> {
    // Radius is a bounded integer, 1 to 100 km, defaulting to 5.
    let radius_km = f64::from(params.radius.unwrap_or(5).clamp(1, 100));
    let available_only = params.available_only.unwrap_or(false);

    let now = Instant::now();
    let ranked = station_client
        .find_nearby(
            params.latitude,
            params.longitude,
            radius_km,
            available_only,
        )
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })?;
    let search_elapsed = now.elapsed();

    let message = match ranked.outcome() {
        NearbyOutcome::NoneInRadius => {
            "No LPG stations found in the specified radius"
        }
        NearbyOutcome::NoneAvailable => "No available LPG station near you",
        NearbyOutcome::Available => "Nearby stations retrieved successfully",
    };

    let benchmark = NearbyBenchmark {
        search_secs: search_elapsed.as_secs_f64(),
        candidates: ranked.available_count + ranked.unavailable_count,
    };

    let dto = NearbyDto {
        message: message.to_owned(),
        radius_km,
        available_count: ranked.available_count,
        unavailable_count: ranked.unavailable_count,
        data: ranked
            .ordered
            .into_iter()
            .map(|station| {
                station_with_distance_hateoas(station, base_url.clone())
            })
            .collect(),
    };

    Ok(hateoas::Response::builder(dto, base_url)
        .link(
            "self",
            resource!(
                "/nearby?latitude={}&longitude={}&radius={}",
                params.latitude,
                params.longitude,
                radius_km
            ),
        )
        .debug_info("benchmark", benchmark)
        .build()
        .json())
}

// - Availability, status, price -

#[derive(Debug, Deserialize)]
pub(crate) struct AvailabilityBody {
    is_available: bool,
}

async fn update_availability(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    actor: Actor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<AvailabilityBody>,
) -> HateoasResult<Station> {
    let id: Id<Station> = Id::new(id);
    let error_response = |why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::PATCH)
            .with_uri(original_uri.path())
    };

    let allowed = station_client
        .can_manage(&actor.user, &id)
        .await
        .map_err(error_response)?;
    if !allowed {
        return Err(RouteErrorResponse::forbidden(
            "Unauthorized - You can only manage your assigned station",
        ));
    }

    station_client
        .set_availability(&id, body.is_available, &actor.user.id)
        .await
        .map(|station| station_hateoas(station, base_url.clone()).json())
        .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusBody {
    is_active: bool,
}

async fn toggle_status(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    actor: Actor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<StatusBody>,
) -> HateoasResult<Station> {
    let id: Id<Station> = Id::new(id);
    let error_response = |why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::PATCH)
            .with_uri(original_uri.path())
    };

    let allowed = station_client
        .can_manage(&actor.user, &id)
        .await
        .map_err(error_response)?;
    if !allowed {
        return Err(RouteErrorResponse::forbidden(
            "Unauthorized - You can only manage your assigned station",
        ));
    }

    station_client
        .set_active(&id, body.is_active)
        .await
        .map(|station| station_hateoas(station, base_url.clone()).json())
        .map_err(error_response)
}

// - History -

async fn price_history(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    Query(params): Query<PageParams>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<PriceHistoryEntry>>>> {
    let id: Id<Station> = Id::new(id);
    station_client
        .price_history(&id, &params.to_request())
        .await
        .map(|page| {
            VecResponse::from_page(page, |entry| {
                price_entry_hateoas(entry, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn availability_log(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { station_client, .. }): State<WebState>,
    Query(params): Query<PageParams>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Json<VecResponse<hateoas::Response<AvailabilityLogEntry>>>> {
    let id: Id<Station> = Id::new(id);
    station_client
        .availability_log(&id, &params.to_request())
        .await
        .map(|page| {
            VecResponse::from_page(page, |entry| {
                availability_entry_hateoas(entry, base_url.clone())
            })
            .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

// - Presenters -

pub(crate) fn station_hateoas(
    station: WithId<Station>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<Station> {
    let id = station.id.clone();
    let latitude = station.content.latitude;
    let longitude = station.content.longitude;
    hateoas::Response::builder(station.content, base_url)
        .link("self", resource!("/{}", id.raw()))
        .link("price-history", resource!("/{}/price-history", id.raw()))
        .link(
            "availability-log",
            resource!("/{}/availability-log", id.raw()),
        )
        .link("manager", resource!("/{}/manager", id.raw()))
        .link(
            "nearby",
            resource!(
                "/nearby?latitude={}&longitude={}&radius=5",
                latitude,
                longitude
            ),
        )
        .build()
}

pub(crate) fn station_with_distance_hateoas(
    station: WithDistance<WithId<Station>>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithDistance<Station>> {
    let id = station.content.id.clone();
    hateoas::Response::builder(
        WithDistance::new(station.distance_km, station.content.content),
        base_url,
    )
    .link("self", resource!("/{}", id.raw()))
    .link("price-history", resource!("/{}/price-history", id.raw()))
    .build()
}

fn price_entry_hateoas(
    entry: WithId<PriceHistoryEntry>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<PriceHistoryEntry> {
    let station_id = entry.content.station_id.clone();
    hateoas::Response::builder(entry.content, base_url)
        .link("station", resource!("/{}", station_id.raw()))
        .build()
}

fn availability_entry_hateoas(
    entry: WithId<AvailabilityLogEntry>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<AvailabilityLogEntry> {
    let station_id = entry.content.station_id.clone();
    hateoas::Response::builder(entry.content, base_url)
        .link("station", resource!("/{}", station_id.raw()))
        .build()
}

pub use crate::common::RouteResult;

use axum::{extract::FromRef, Router};
use database::PgDatabase;
use refill::client::Client;
use tokio::net::TcpListener;

pub mod api;
pub mod common;
pub mod hateoas;
pub mod middleware;
pub mod user_agent;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub station_client: Client<PgDatabase>,
}

pub async fn start_web_server(state: WebState) -> std::io::Result<()> {
    let routes = Router::new()
        .nest_service("/api", api::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::track_visitor::track_visitor_middleware,
        ));

    let listener = TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

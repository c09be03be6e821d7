//! Bearer token authentication as axum extractors.
//!
//! The core never authenticates; these extractors resolve the token to
//! the actor record the domain operations consume.

use axum::{
    async_trait, extract::FromRequestParts, http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use model::{user::User, WithId};

use crate::{common::RouteErrorResponse, WebState};

/// An authenticated account, plus the plain token it presented (needed
/// by logout to revoke exactly that token).
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: WithId<User>,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<WebState> for Actor {
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| RouteErrorResponse::unauthorized())?;

        let user = state
            .station_client
            .user_by_token(bearer.token())
            .await
            .map_err(|_| RouteErrorResponse::unauthorized())?;

        if !user.content.is_active {
            return Err(RouteErrorResponse::unauthorized());
        }

        Ok(Actor {
            user,
            token: bearer.token().to_owned(),
        })
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct AdminActor(pub Actor);

#[async_trait]
impl FromRequestParts<WebState> for AdminActor {
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState,
    ) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        if !actor.user.content.is_admin() {
            return Err(RouteErrorResponse::forbidden(
                "Unauthorized - Admin access required",
            ));
        }
        Ok(AdminActor(actor))
    }
}

//! GraphQL schema: every query and mutation of the portal API.

mod ai;
mod help_requests;
pub mod objects;
mod posts;
mod users;


use async_graphql::{Context, EmptySubscription, ID, MergedObject, Schema, http::GraphiQLSource};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Extension,
    extract::State,
    response::{Html, IntoResponse},
};
use uuid::Uuid;

use neighborly_types::models::User;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::state::{AppState, AppStateInner};

#[derive(MergedObject, Default)]
pub struct QueryRoot(users::UserQuery, posts::PostQuery, help_requests::HelpRequestQuery, ai::AiQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(users::AuthMutation, posts::PostMutation, help_requests::HelpRequestMutation);

pub type PortalSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> PortalSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(state)
        .finish()
}

/// POST /graphql: executes one request as the caller resolved by `attach_user`.
pub async fn graphql_handler(
    State(schema): State<PortalSchema>,
    Extension(user): Extension<CurrentUser>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(user)).await.into()
}

/// GET /graphql: interactive explorer.
pub async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

// -- Resolver helpers --

fn app<'a>(ctx: &Context<'a>) -> &'a AppStateInner {
    ctx.data_unchecked::<AppState>()
}

fn caller<'a>(ctx: &Context<'a>) -> Option<&'a User> {
    ctx.data_opt::<CurrentUser>().and_then(|u| u.0.as_ref())
}

fn require_user<'a>(ctx: &Context<'a>) -> Result<&'a User, ApiError> {
    match ctx.data_opt::<CurrentUser>() {
        Some(user) => user.require(),
        None => Err(ApiError::NotAuthenticated),
    }
}

fn parse_id(id: &ID) -> Result<Uuid, ApiError> {
    id.parse::<Uuid>().map_err(|_| ApiError::bad_request("Invalid id"))
}

fn parse_opt_id(id: Option<&ID>) -> Result<Option<Uuid>, ApiError> {
    id.map(parse_id).transpose()
}

//! GraphQL endpoint over the post store.

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{Context, EmptySubscription, Object, Schema, SimpleObject};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use posts_core::{Post, PostStore};
use tracing::info;

use crate::config::AppState;
use crate::error::Result;

pub type PostSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(SimpleObject)]
#[graphql(name = "Post")]
pub struct PostObject {
    pub id: u64,
    pub title: String,
    pub content: String,
}

impl From<Post> for PostObject {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn posts(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<PostObject>> {
        let store = ctx.data::<Arc<PostStore>>()?;
        Ok(store.list().into_iter().map(PostObject::from).collect())
    }

    /// Null when no post has this id.
    async fn post(&self, ctx: &Context<'_>, id: u64) -> async_graphql::Result<Option<PostObject>> {
        let store = ctx.data::<Arc<PostStore>>()?;
        Ok(store.get(id).ok().map(PostObject::from))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
    ) -> async_graphql::Result<PostObject> {
        let store = ctx.data::<Arc<PostStore>>()?;
        Ok(store.create(title, content).into())
    }

    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: u64,
        title: String,
        content: String,
    ) -> async_graphql::Result<Option<PostObject>> {
        let store = ctx.data::<Arc<PostStore>>()?;
        Ok(store.update(id, title, content).ok().map(PostObject::from))
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: u64) -> async_graphql::Result<bool> {
        let store = ctx.data::<Arc<PostStore>>()?;
        Ok(store.delete(id))
    }
}

pub fn build_schema(store: Arc<PostStore>) -> PostSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .finish()
}

/// POST /graphql
pub async fn graphql_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<async_graphql::Request>, JsonRejection>,
) -> Result<Json<async_graphql::Response>> {
    let Json(request) = payload?;
    info!("POST /graphql");
    Ok(Json(state.schema.execute(request).await))
}

/// GET /graphql
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};

use warehouse_auth::Action;
use warehouse_core::RequestScope;
use warehouse_inventory::{Item, ItemDraft};

use crate::app::dto::parse_item_id;
use crate::app::errors::ApiError;
use crate::app::routes::guarded;
use crate::app::services::AppServices;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/items",
            guarded(Action::View, get(list_items)).merge(guarded(Action::Create, post(create_item))),
        )
        .route(
            "/api/items/:id",
            guarded(Action::View, get(get_item))
                .merge(guarded(Action::Update, put(update_item)))
                .merge(guarded(Action::Delete, delete(delete_item))),
        )
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(services.inventory.list(&scope, caller.identity()).await?))
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id = parse_item_id(&id)?;
    Ok(Json(services.inventory.get(&scope, caller.identity(), id).await?))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    payload: Result<Json<ItemDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = payload?;
    let item = services.inventory.create(&scope, caller.identity(), draft).await?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    Path(id): Path<String>,
    payload: Result<Json<ItemDraft>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let id = parse_item_id(&id)?;
    let Json(draft) = payload?;
    Ok(Json(services.inventory.update(&scope, caller.identity(), id, draft).await?))
}

/// Responds with the item as it was just before deletion.
pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id = parse_item_id(&id)?;
    Ok(Json(services.inventory.delete(&scope, caller.identity(), id).await?))
}

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    routing::get,
    Json, Router,
};

use warehouse_auth::Action;
use warehouse_core::RequestScope;
use warehouse_inventory::HistoryRecord;

use crate::app::dto::{parse_item_id, HistoryQuery};
use crate::app::errors::ApiError;
use crate::app::routes::guarded;
use crate::app::services::AppServices;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/api/history", guarded(Action::ViewHistory, get(list_history)))
        .route("/api/history/items/:id", guarded(Action::ViewHistory, get(item_history)))
}

/// Filtered history, newest first. See [`HistoryQuery`] for parameters.
pub async fn list_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(Json(services.inventory.history(&scope, caller.identity(), &filter).await?))
}

/// Every record for one item (deleted items included), newest first.
pub async fn item_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(scope): Extension<RequestScope>,
    Extension(caller): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let id = parse_item_id(&id)?;
    Ok(Json(services.inventory.history_for_item(&scope, caller.identity(), id).await?))
}

//! Order history, for buyers and for admins.

use axum::extract::{Path, Query, State};
use axum::Json;
use beatstore_core::error::CoreError;
use beatstore_core::types::DbId;
use beatstore_db::models::order::{Order, OrderFilter};
use beatstore_db::models::status::OrderStatus;
use beatstore_db::repositories::OrderRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/orders
///
/// The caller's own orders, newest first.
pub async fn list_my_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Order>>>> {
    let (limit, offset) = params.clamped();
    let orders = OrderRepo::list_for_user(&state.pool, auth_user.user_id, limit, offset).await?;
    Ok(Json(DataResponse { data: orders }))
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    pub user_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/admin/orders
pub async fn admin_list_orders(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<AdminOrderQuery>,
) -> AppResult<Json<DataResponse<Vec<Order>>>> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .clamped();

    let orders = OrderRepo::list(
        &state.pool,
        &OrderFilter {
            status,
            user_id: params.user_id,
            limit,
            offset,
        },
    )
    .await?;
    Ok(Json(DataResponse { data: orders }))
}

/// GET /api/v1/admin/orders/{id}
pub async fn admin_get_order(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let order = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "order", id }))?;
    Ok(Json(DataResponse { data: order }))
}

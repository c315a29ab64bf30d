//! `/orders` handlers: create, fetch, list.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::order::{CreateOrderRequest, OrderListResponse, OrderResponse};
use crate::AppState;

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let order = state.order_allocator.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let order = state.order_allocator.get_order(id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<impl IntoResponse> {
    let (orders, limit, offset) = state.order_allocator.list_orders(query.limit, query.offset).await?;
    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(OrderResponse::from).collect(),
        limit,
        offset,
    }))
}

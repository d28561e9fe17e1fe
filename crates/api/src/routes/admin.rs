//! Admin dashboard data.

use axum::{Json, extract::State};

use crate::db::StatsRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::DashboardStats;
use crate::state::AppState;

/// `GET /admin/stats` - order, revenue and stock figures for this year.
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    Ok(Json(StatsRepository::new(state.pool()).dashboard().await?))
}

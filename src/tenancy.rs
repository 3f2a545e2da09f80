use serde_json::Value;
use sqlx::Row;

use crate::error::{AppError, AppResult};
use crate::state::{db_pool, AppState};

/// Roles allowed to create or change bookings.
pub const BOOKING_WRITE_ROLES: &[&str] = &["owner_admin", "operator"];

pub async fn get_tenant_membership(
    state: &AppState,
    user_id: &str,
    tenant_id: &str,
) -> AppResult<Option<Value>> {
    let cache_key = format!("{tenant_id}:{user_id}");
    if let Some(cached) = state.tenant_membership_cache.get(&cache_key).await {
        return Ok(cached);
    }

    let pool = db_pool(state)?;
    let row = sqlx::query(
        "SELECT row_to_json(t) AS row
         FROM tenant_members t
         WHERE tenant_id::text = $1 AND user_id::text = $2
         LIMIT 1",
    )
    .bind(tenant_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|error| {
        tracing::error!(error = %error, tenant_id, "Membership lookup failed");
        AppError::Dependency("Database operation failed.".to_string())
    })?;

    let membership = row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten());
    state
        .tenant_membership_cache
        .insert(cache_key, membership.clone())
        .await;
    Ok(membership)
}

pub async fn assert_tenant_member(
    state: &AppState,
    user_id: &str,
    tenant_id: &str,
) -> AppResult<Value> {
    get_tenant_membership(state, user_id, tenant_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Forbidden: not a member of this tenant.".to_string()))
}

pub async fn assert_tenant_role(
    state: &AppState,
    user_id: &str,
    tenant_id: &str,
    allowed_roles: &[&str],
) -> AppResult<Value> {
    let membership = assert_tenant_member(state, user_id, tenant_id).await?;
    let role = membership_role(&membership);
    if allowed_roles.contains(&role) {
        return Ok(membership);
    }

    Err(AppError::Forbidden(format!(
        "Forbidden: role '{role}' is not allowed for this action."
    )))
}

/// Public pages address a tenant by slug; only active tenants resolve.
pub async fn find_tenant_by_slug(state: &AppState, slug: &str) -> AppResult<Value> {
    let normalized = slug.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(AppError::NotFound("Tenant not found.".to_string()));
    }

    let pool = db_pool(state)?;
    let row = sqlx::query(
        "SELECT row_to_json(t) AS row
         FROM tenants t
         WHERE lower(t.slug) = $1
         LIMIT 1",
    )
    .bind(&normalized)
    .fetch_optional(pool)
    .await
    .map_err(|error| {
        tracing::error!(error = %error, slug = %normalized, "Tenant lookup failed");
        AppError::Dependency("Database operation failed.".to_string())
    })?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .filter(|tenant| tenant.get("is_active").and_then(Value::as_bool) != Some(false))
        .ok_or_else(|| AppError::NotFound("Tenant not found.".to_string()))
}

fn membership_role(membership: &Value) -> &str {
    membership
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

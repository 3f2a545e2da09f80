use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    auth::require_user_id,
    config::AppConfig,
    error::{AppError, AppResult},
    repository::bookings::PgBookingRepository,
    repository::table_service::get_row_opt,
    schemas::{
        validate_input, AvailabilityQuery, CalendarQuery, NextAvailableQuery, PropertyPath,
        ValidateAvailabilityInput,
    },
    services::calendar::{
        check_availability, get_calendar_availability, get_next_available_periods,
        nights_between, parse_local_date, today_in, validate_booking_availability,
        AvailabilityResult, BookingType, BookingValidation,
    },
    state::{db_pool, AppState},
    tenancy::assert_tenant_member,
};

const MAX_SEARCH_DAYS: i64 = 1095;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties/{property_id}/availability",
            axum::routing::get(get_availability),
        )
        .route(
            "/properties/{property_id}/availability/validate",
            axum::routing::post(validate_availability),
        )
        .route(
            "/properties/{property_id}/calendar",
            axum::routing::get(get_calendar),
        )
        .route(
            "/properties/{property_id}/next-available",
            axum::routing::get(get_next_available),
        )
}

async fn get_availability(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Query(query): Query<AvailabilityQuery>,
    headers: HeaderMap,
) -> AppResult<Json<AvailabilityResult>> {
    let user_id = require_user_id(&state, &headers).await?;
    let check_in = parse_date_param(&query.check_in, "check_in")?;
    let check_out = parse_date_param(&query.check_out, "check_out")?;
    let booking_type = parse_booking_type(query.booking_type.as_deref())?;

    assert_tenant_member(&state, &user_id, &query.tenant_id).await?;
    let repo = property_repository(&state, &path.property_id, &query.tenant_id).await?;

    let result = check_availability(
        &repo,
        &path.property_id,
        &query.tenant_id,
        check_in,
        check_out,
        non_empty(query.exclude_booking_id.as_deref()),
        booking_type,
    )
    .await?;
    Ok(Json(result))
}

async fn validate_availability(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    headers: HeaderMap,
    Json(payload): Json<ValidateAvailabilityInput>,
) -> AppResult<Json<BookingValidation>> {
    validate_input(&payload)?;
    let user_id = require_user_id(&state, &headers).await?;
    let booking_type = parse_booking_type(payload.booking_type.as_deref())?;

    assert_tenant_member(&state, &user_id, &payload.tenant_id).await?;
    let repo = property_repository(&state, &path.property_id, &payload.tenant_id).await?;

    let validation = validate_booking_availability(
        &repo,
        &path.property_id,
        &payload.tenant_id,
        payload.check_in.as_str(),
        payload.check_out.as_str(),
        non_empty(payload.exclude_booking_id.as_deref()),
        booking_type,
    )
    .await?;
    Ok(Json(validation))
}

async fn get_calendar(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Query(query): Query<CalendarQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers).await?;
    let (start, end) = parse_calendar_range(&state.config, &query.start, &query.end)?;

    assert_tenant_member(&state, &user_id, &query.tenant_id).await?;
    let repo = property_repository(&state, &path.property_id, &query.tenant_id).await?;

    let days =
        get_calendar_availability(&repo, &path.property_id, &query.tenant_id, start, end).await?;
    Ok(Json(json!({ "data": days })))
}

async fn get_next_available(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Query(query): Query<NextAvailableQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers).await?;
    assert_tenant_member(&state, &user_id, &query.tenant_id).await?;
    let repo = property_repository(&state, &path.property_id, &query.tenant_id).await?;

    let periods = get_next_available_periods(
        &repo,
        &path.property_id,
        &query.tenant_id,
        today_in(state.config.calendar_tz()),
        search_days(&state.config, query.max_days),
    )
    .await?;
    Ok(Json(json!({ "data": periods })))
}

/// Repository for a property, after checking the property belongs to the
/// tenant. Cross-tenant lookups read as missing.
pub(crate) async fn property_repository(
    state: &AppState,
    property_id: &str,
    tenant_id: &str,
) -> AppResult<PgBookingRepository> {
    let pool = db_pool(state)?;
    let property = get_row_opt(pool, "properties", property_id, "id").await?;
    let owned = property
        .as_ref()
        .and_then(|row| row.get("tenant_id"))
        .and_then(Value::as_str)
        .is_some_and(|owner| owner == tenant_id);
    if !owned {
        return Err(AppError::NotFound("Property not found.".to_string()));
    }
    Ok(PgBookingRepository::new(pool.clone()))
}

pub(crate) fn parse_date_param(raw: &str, field: &str) -> AppResult<NaiveDate> {
    parse_local_date(raw)
        .map_err(|error| AppError::BadRequest(format!("Invalid {field}: {error}")))
}

pub(crate) fn parse_booking_type(raw: Option<&str>) -> AppResult<Option<BookingType>> {
    match non_empty(raw) {
        Some(value) => value
            .parse::<BookingType>()
            .map(Some)
            .map_err(|error| AppError::BadRequest(error.to_string())),
        None => Ok(None),
    }
}

/// Inclusive display range, capped by `calendar_max_range_days`.
pub(crate) fn parse_calendar_range(
    config: &AppConfig,
    raw_start: &str,
    raw_end: &str,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = parse_date_param(raw_start, "start")?;
    let end = parse_date_param(raw_end, "end")?;
    let days = nights_between(start, end) + 1;
    if days > config.calendar_max_range_days {
        tracing::warn!(
            %start,
            %end,
            days,
            limit = config.calendar_max_range_days,
            "Calendar range rejected"
        );
        return Err(AppError::BadRequest(format!(
            "Calendar range is limited to {} days.",
            config.calendar_max_range_days
        )));
    }
    Ok((start, end))
}

pub(crate) fn search_days(config: &AppConfig, requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(config.availability_search_days)
        .clamp(1, MAX_SEARCH_DAYS)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{parse_booking_type, parse_calendar_range, search_days};
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::services::calendar::BookingType;

    #[test]
    fn booking_type_parses_strictly() {
        assert_eq!(
            parse_booking_type(Some("closed_period")).ok(),
            Some(Some(BookingType::ClosedPeriod))
        );
        assert_eq!(parse_booking_type(Some("  ")).ok(), Some(None));
        assert!(matches!(
            parse_booking_type(Some("owner_stay")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn calendar_range_is_capped() {
        let mut config = AppConfig::for_tests();
        config.calendar_max_range_days = 31;

        assert!(parse_calendar_range(&config, "2025-07-01", "2025-07-31").is_ok());
        assert!(matches!(
            parse_calendar_range(&config, "2025-07-01", "2025-08-01"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_calendar_range(&config, "01/07/2025", "2025-07-31"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn search_days_defaults_and_clamps() {
        let config = AppConfig::for_tests();
        assert_eq!(search_days(&config, None), 365);
        assert_eq!(search_days(&config, Some(0)), 1);
        assert_eq!(search_days(&config, Some(90)), 90);
        assert_eq!(search_days(&config, Some(100_000)), 1095);
    }
}

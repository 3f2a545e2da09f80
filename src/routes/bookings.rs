use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::{
    auth::require_user_id,
    error::{AppError, AppResult},
    repository::bookings::{find_lookup_id, require_lookup_id, PgBookingRepository},
    repository::table_service::{count_rows, create_row, get_row, list_rows, update_row},
    routes::calendar::{parse_booking_type, parse_date_param, property_repository},
    schemas::{
        clamp_limit_in_range, remove_nulls, serialize_to_map, validate_input, BookingPath,
        BookingsQuery, CreateBookingInput, UpdateBookingInput,
    },
    services::calendar::{
        check_availability, format_date_for_api, AvailabilityResult, BookingRepository,
        BookingType,
    },
    state::{db_pool, AppState},
    tenancy::{assert_tenant_member, assert_tenant_role, BOOKING_WRITE_ROLES},
};

const DEFAULT_BOOKING_STATUS: &str = "confirmed";
const CANCELLED_STATUS: &str = "cancelled";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/bookings",
            axum::routing::get(list_bookings).post(create_booking),
        )
        .route(
            "/bookings/{booking_id}",
            axum::routing::get(get_booking).patch(update_booking),
        )
        .route(
            "/bookings/{booking_id}/cancel",
            axum::routing::post(cancel_booking),
        )
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingsQuery>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers).await?;
    let from = query
        .from
        .as_deref()
        .map(|raw| parse_date_param(raw, "from"))
        .transpose()?;
    let to = query
        .to
        .as_deref()
        .map(|raw| parse_date_param(raw, "to"))
        .transpose()?;

    assert_tenant_member(&state, &user_id, &query.tenant_id).await?;
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    filters.insert(
        "tenant_id".to_string(),
        Value::String(query.tenant_id.clone()),
    );
    if let Some(property_id) = non_empty_opt(query.property_id.as_deref()) {
        filters.insert("property_id".to_string(), Value::String(property_id));
    }
    if let Some(status_id) = non_empty_opt(query.booking_status_id.as_deref()) {
        filters.insert("booking_status_id".to_string(), Value::String(status_id));
    }
    if let Some(from) = from {
        filters.insert(
            "check_out_date__gt".to_string(),
            Value::String(format_date_for_api(from)),
        );
    }
    if let Some(to) = to {
        filters.insert(
            "check_in_date__lt".to_string(),
            Value::String(format_date_for_api(to)),
        );
    }

    let limit = clamp_limit_in_range(query.limit, 1, 500);
    let offset = query.offset.max(0);
    let rows = list_rows(
        pool,
        "bookings",
        Some(&filters),
        limit,
        offset,
        "check_in_date",
        true,
    )
    .await?;
    let total = count_rows(pool, "bookings", Some(&filters)).await?;

    Ok(Json(json!({
        "data": rows,
        "count": total,
        "limit": limit,
        "offset": offset,
    })))
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookingInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let user_id = require_user_id(&state, &headers).await?;
    let check_in = parse_date_param(&payload.check_in_date, "check_in_date")?;
    let check_out = parse_date_param(&payload.check_out_date, "check_out_date")?;
    let booking_type =
        parse_booking_type(Some(payload.booking_type.as_str()))?.unwrap_or(BookingType::Commercial);

    assert_tenant_role(&state, &user_id, &payload.tenant_id, BOOKING_WRITE_ROLES).await?;
    let repo = property_repository(&state, &payload.property_id, &payload.tenant_id).await?;
    let pool = db_pool(&state)?;

    let result = check_availability(
        &repo,
        &payload.property_id,
        &payload.tenant_id,
        check_in,
        check_out,
        None,
        Some(booking_type),
    )
    .await?;
    reject_unavailable(&result)?;

    let booking_type_id = require_lookup_id(pool, "booking_types", booking_type.as_str()).await?;
    let booking_status_id = find_lookup_id(pool, "booking_statuses", DEFAULT_BOOKING_STATUS).await?;

    let mut record = Map::new();
    record.insert("tenant_id".to_string(), Value::String(payload.tenant_id.clone()));
    record.insert(
        "property_id".to_string(),
        Value::String(payload.property_id.clone()),
    );
    record.insert(
        "check_in_date".to_string(),
        Value::String(format_date_for_api(check_in)),
    );
    record.insert(
        "check_out_date".to_string(),
        Value::String(format_date_for_api(check_out)),
    );
    record.insert("booking_type_id".to_string(), Value::String(booking_type_id));
    record.insert(
        "booking_status_id".to_string(),
        booking_status_id.map(Value::String).unwrap_or(Value::Null),
    );
    record.insert(
        "guest_person_id".to_string(),
        non_empty_opt(payload.guest_person_id.as_deref())
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    record.insert(
        "notes".to_string(),
        payload.notes.clone().map(Value::String).unwrap_or(Value::Null),
    );

    let created = create_row(pool, "bookings", &remove_nulls(record)).await?;
    tracing::info!(
        booking_id = %value_str(&created, "id"),
        property_id = %payload.property_id,
        tenant_id = %payload.tenant_id,
        booking_type = %booking_type,
        "Booking created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers).await?;
    let pool = db_pool(&state)?;
    let record = get_row(pool, "bookings", &path.booking_id, "id").await?;
    let tenant_id = value_str(&record, "tenant_id");
    assert_tenant_member(&state, &user_id, &tenant_id).await?;
    Ok(Json(record))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
    Json(payload): Json<UpdateBookingInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let user_id = require_user_id(&state, &headers).await?;
    let pool = db_pool(&state)?;

    let record = get_row(pool, "bookings", &path.booking_id, "id").await?;
    let tenant_id = value_str(&record, "tenant_id");
    let property_id = value_str(&record, "property_id");
    assert_tenant_role(&state, &user_id, &tenant_id, BOOKING_WRITE_ROLES).await?;

    let mut patch = remove_nulls(serialize_to_map(&payload));
    if payload.touches_dates() {
        let check_in = resolve_patch_date(
            payload.check_in_date.as_deref(),
            &record,
            "check_in_date",
        )?;
        let check_out = resolve_patch_date(
            payload.check_out_date.as_deref(),
            &record,
            "check_out_date",
        )?;

        let repo = PgBookingRepository::new(pool.clone());
        let booking_type = stored_booking_type(&repo, &record).await?;
        let result = check_availability(
            &repo,
            &property_id,
            &tenant_id,
            check_in,
            check_out,
            Some(path.booking_id.as_str()),
            Some(booking_type),
        )
        .await?;
        reject_unavailable(&result)?;

        patch.insert(
            "check_in_date".to_string(),
            Value::String(format_date_for_api(check_in)),
        );
        patch.insert(
            "check_out_date".to_string(),
            Value::String(format_date_for_api(check_out)),
        );
    }

    let updated = update_row(pool, "bookings", &path.booking_id, &patch, "id").await?;
    Ok(Json(updated))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(path): Path<BookingPath>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let user_id = require_user_id(&state, &headers).await?;
    let pool = db_pool(&state)?;

    let record = get_row(pool, "bookings", &path.booking_id, "id").await?;
    let tenant_id = value_str(&record, "tenant_id");
    assert_tenant_role(&state, &user_id, &tenant_id, BOOKING_WRITE_ROLES).await?;

    let cancelled_id = require_lookup_id(pool, "booking_statuses", CANCELLED_STATUS).await?;
    if value_str(&record, "booking_status_id") == cancelled_id {
        return Ok(Json(record));
    }

    let mut patch = Map::new();
    patch.insert("booking_status_id".to_string(), Value::String(cancelled_id));
    let updated = update_row(pool, "bookings", &path.booking_id, &patch, "id").await?;
    tracing::info!(booking_id = %path.booking_id, tenant_id = %tenant_id, "Booking cancelled");
    Ok(Json(updated))
}

/// Range problems are unprocessable; overlaps with stored bookings conflict.
fn reject_unavailable(result: &AvailabilityResult) -> AppResult<()> {
    if result.available {
        return Ok(());
    }
    let message = result.summary().unwrap_or_default();
    if result.conflicts.iter().all(|conflict| conflict.booking.is_none()) {
        return Err(AppError::UnprocessableEntity(message));
    }
    Err(AppError::Conflict(message))
}

fn resolve_patch_date(raw: Option<&str>, record: &Value, field: &str) -> AppResult<NaiveDate> {
    match raw {
        Some(value) => parse_date_param(value, field),
        None => parse_date_param(&value_str(record, field), field).map_err(|_| {
            AppError::Internal(format!("Stored booking has an unreadable {field}."))
        }),
    }
}

async fn stored_booking_type(repo: &PgBookingRepository, record: &Value) -> AppResult<BookingType> {
    let type_id = value_str(record, "booking_type_id");
    if type_id.is_empty() {
        return Ok(BookingType::Commercial);
    }
    let lookup = repo.fetch_booking_type(&type_id).await?;
    Ok(BookingType::from_lookup(
        lookup.as_ref().map(|row| row.value.as_str()),
    ))
}

fn value_str(row: &Value, key: &str) -> String {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}

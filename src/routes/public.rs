use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    routes::calendar::{parse_calendar_range, property_repository, search_days},
    schemas::{PublicCalendarQuery, PublicNextAvailableQuery, PublicPropertyPath},
    services::calendar::{
        get_calendar_availability, get_next_available_periods, today_in, CalendarDay,
    },
    state::AppState,
    tenancy::find_tenant_by_slug,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/public/{tenant_slug}/properties/{property_id}/next-available",
            axum::routing::get(get_next_available),
        )
        .route(
            "/public/{tenant_slug}/properties/{property_id}/calendar",
            axum::routing::get(get_calendar),
        )
}

/// Calendar entry shown to anonymous guests: occupancy only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PublicCalendarDay {
    date: NaiveDate,
    is_available: bool,
    is_check_in: bool,
}

impl From<CalendarDay> for PublicCalendarDay {
    fn from(day: CalendarDay) -> Self {
        Self {
            date: day.date,
            is_available: day.is_available,
            is_check_in: day.is_check_in,
        }
    }
}

/// Suggested stays for the guest landing page.
async fn get_next_available(
    State(state): State<AppState>,
    Path(path): Path<PublicPropertyPath>,
    Query(query): Query<PublicNextAvailableQuery>,
) -> AppResult<Json<Value>> {
    let tenant = find_tenant_by_slug(&state, &path.tenant_slug).await?;
    let tenant_id = tenant_id_of(&tenant);
    let repo = property_repository(&state, &path.property_id, &tenant_id).await?;

    let periods = get_next_available_periods(
        &repo,
        &path.property_id,
        &tenant_id,
        today_in(state.config.calendar_tz()),
        search_days(&state.config, query.max_days),
    )
    .await?;
    Ok(Json(json!({ "data": periods })))
}

async fn get_calendar(
    State(state): State<AppState>,
    Path(path): Path<PublicPropertyPath>,
    Query(query): Query<PublicCalendarQuery>,
) -> AppResult<Json<Value>> {
    let (start, end) = parse_calendar_range(&state.config, &query.start, &query.end)?;
    let tenant = find_tenant_by_slug(&state, &path.tenant_slug).await?;
    let tenant_id = tenant_id_of(&tenant);
    let repo = property_repository(&state, &path.property_id, &tenant_id).await?;

    let days = get_calendar_availability(&repo, &path.property_id, &tenant_id, start, end)
        .await?
        .into_iter()
        .map(PublicCalendarDay::from)
        .collect::<Vec<_>>();
    Ok(Json(json!({ "data": days })))
}

fn tenant_id_of(tenant: &Value) -> String {
    tenant
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::PublicCalendarDay;
    use crate::services::calendar::{Booking, BookingStatus, BookingType, CalendarDay};

    #[test]
    fn public_day_hides_booking_details() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");
        let day = CalendarDay {
            date,
            is_available: false,
            booking: Some(Booking {
                id: "b1".to_string(),
                property_id: "p1".to_string(),
                tenant_id: "t1".to_string(),
                check_in_date: date,
                check_out_date: NaiveDate::from_ymd_opt(2025, 7, 3).expect("valid date"),
                status: BookingStatus::Active,
                status_value: None,
                booking_type: BookingType::Commercial,
                booking_type_value: None,
                guest_person_id: Some("g1".to_string()),
                notes: Some("VIP".to_string()),
            }),
            booking_type: Some(BookingType::Commercial),
            is_check_in: true,
            is_check_out: false,
            guest_name: Some("Ana Gómez".to_string()),
        };

        let public = serde_json::to_value(PublicCalendarDay::from(day)).expect("serializes");
        assert_eq!(
            public,
            json!({"date": "2025-07-01", "is_available": false, "is_check_in": true})
        );
    }
}

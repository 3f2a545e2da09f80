use chrono::NaiveDate;

use super::dates::{format_date_for_api, nights_between, IntoLocalDate};
use super::interval::ranges_overlap;
use super::model::{
    AvailabilityConflict, AvailabilityResult, Booking, BookingType, BookingValidation,
    UNKNOWN_GUEST_NAME,
};
use super::repository::{
    guest_display_name, property_min_nights, resolve_bookings, BookingRepository,
};
use crate::error::AppResult;

/// Decide whether `[check_in, check_out)` is free for a property.
///
/// Invalid ranges and stays shorter than the property's minimum are reported
/// in the result, not as errors. Repository failures are returned as-is.
pub async fn check_availability(
    repo: &dyn BookingRepository,
    property_id: &str,
    tenant_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_booking_id: Option<&str>,
    booking_type: Option<BookingType>,
) -> AppResult<AvailabilityResult> {
    let requested_type = booking_type.unwrap_or(BookingType::Commercial);

    if check_out <= check_in {
        return Ok(AvailabilityResult::rejected(
            requested_type,
            "La fecha de salida debe ser posterior a la fecha de entrada.".to_string(),
        ));
    }

    if booking_type == Some(BookingType::Commercial) {
        let min_nights = property_min_nights(repo, property_id).await?;
        let nights = nights_between(check_in, check_out);
        if nights < min_nights {
            return Ok(AvailabilityResult::rejected(
                BookingType::Commercial,
                format!(
                    "La estancia mínima es de {min_nights} noches; se solicitaron {nights}."
                ),
            ));
        }
    }

    let records = repo
        .fetch_bookings_overlapping(property_id, tenant_id, check_in, check_out)
        .await?;
    let bookings = resolve_bookings(repo, records).await?;

    let mut conflicts = Vec::new();
    for booking in bookings {
        if booking.status.is_cancelled() {
            continue;
        }
        if exclude_booking_id.is_some_and(|excluded| excluded == booking.id) {
            continue;
        }
        if !ranges_overlap(booking.check_in_date, booking.check_out_date, check_in, check_out) {
            continue;
        }
        conflicts.push(build_conflict(repo, booking).await?);
    }

    tracing::debug!(
        property_id,
        tenant_id,
        check_in = %check_in,
        check_out = %check_out,
        conflicts = conflicts.len(),
        "Availability checked"
    );

    Ok(AvailabilityResult::from_conflicts(conflicts))
}

/// Wrapper for form submissions: accepts wire strings or dates and collapses
/// the conflicts into a single message.
pub async fn validate_booking_availability(
    repo: &dyn BookingRepository,
    property_id: &str,
    tenant_id: &str,
    check_in: impl IntoLocalDate,
    check_out: impl IntoLocalDate,
    exclude_booking_id: Option<&str>,
    booking_type: Option<BookingType>,
) -> AppResult<BookingValidation> {
    let dates = check_in
        .into_local_date()
        .and_then(|start| check_out.into_local_date().map(|end| (start, end)));
    let (check_in, check_out) = match dates {
        Ok(pair) => pair,
        Err(error) => {
            return Ok(BookingValidation {
                valid: false,
                message: Some(error.to_string()),
                conflicts: Vec::new(),
            })
        }
    };

    let result = check_availability(
        repo,
        property_id,
        tenant_id,
        check_in,
        check_out,
        exclude_booking_id,
        booking_type,
    )
    .await?;

    Ok(BookingValidation {
        valid: result.available,
        message: result.summary(),
        conflicts: result.conflicts,
    })
}

async fn build_conflict(
    repo: &dyn BookingRepository,
    booking: Booking,
) -> AppResult<AvailabilityConflict> {
    let from = format_date_for_api(booking.check_in_date);
    let to = format_date_for_api(booking.check_out_date);

    let message = match booking.booking_type {
        BookingType::ClosedPeriod => format!("Periodo cerrado del {from} al {to}"),
        BookingType::Commercial => {
            let guest = guest_display_name(repo, &booking)
                .await?
                .unwrap_or_else(|| UNKNOWN_GUEST_NAME.to_string());
            format!("Reserva de {guest} del {from} al {to}")
        }
    };

    Ok(AvailabilityConflict {
        conflict_type: booking.booking_type,
        booking: Some(booking),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::{check_availability, validate_booking_availability};
    use crate::services::calendar::memory::{
        booking, date, MemoryRepository, PROPERTY, STATUS_CANCELLED, TENANT, TYPE_CLOSED,
    };
    use crate::services::calendar::model::BookingType;

    #[tokio::test]
    async fn checkout_day_is_free_for_next_arrival() {
        let repo = MemoryRepository::new().with_booking(booking("b1", "2025-07-01", "2025-07-05"));

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-05"),
            date("2025-07-06"),
            None,
            Some(BookingType::Commercial),
        )
        .await
        .expect("check succeeds");
        assert!(result.available);
        assert!(result.conflicts.is_empty());
    }

    #[tokio::test]
    async fn overlapping_booking_is_reported_with_guest_name() {
        let mut record = booking("b1", "2025-07-01", "2025-07-05");
        record.guest_person_id = Some("guest-1".to_string());
        let repo = MemoryRepository::new()
            .with_guest("guest-1", "Lucía", "Pérez")
            .with_booking(record);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-04"),
            date("2025-07-08"),
            None,
            None,
        )
        .await
        .expect("check succeeds");

        assert!(!result.available);
        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.conflict_type, BookingType::Commercial);
        assert_eq!(
            conflict.message,
            "Reserva de Lucía Pérez del 2025-07-01 al 2025-07-05"
        );
        assert_eq!(
            conflict.booking.as_ref().map(|b| b.id.as_str()),
            Some("b1")
        );
    }

    #[tokio::test]
    async fn unknown_guest_falls_back_to_placeholder() {
        let mut record = booking("b1", "2025-07-01", "2025-07-05");
        record.guest_person_id = Some("missing-person".to_string());
        let repo = MemoryRepository::new().with_booking(record);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-02"),
            date("2025-07-03"),
            None,
            None,
        )
        .await
        .expect("check succeeds");
        assert!(result.conflicts[0].message.contains("Huésped desconocido"));
    }

    #[tokio::test]
    async fn closed_period_conflicts_are_typed() {
        let mut record = booking("block", "2025-08-01", "2025-08-15");
        record.booking_type_id = Some(TYPE_CLOSED.to_string());
        let repo = MemoryRepository::new().with_booking(record);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-08-10"),
            date("2025-08-20"),
            None,
            Some(BookingType::Commercial),
        )
        .await
        .expect("check succeeds");
        assert_eq!(result.conflicts[0].conflict_type, BookingType::ClosedPeriod);
        assert_eq!(
            result.conflicts[0].message,
            "Periodo cerrado del 2025-08-01 al 2025-08-15"
        );
    }

    #[tokio::test]
    async fn cancelled_bookings_never_conflict() {
        let mut record = booking("b1", "2025-07-01", "2025-07-05");
        record.booking_status_id = Some(STATUS_CANCELLED.to_string());
        let repo = MemoryRepository::new().with_booking(record);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            date("2025-07-05"),
            None,
            None,
        )
        .await
        .expect("check succeeds");
        assert!(result.available);
    }

    #[tokio::test]
    async fn missing_status_counts_as_active() {
        let mut no_status = booking("b1", "2025-07-01", "2025-07-05");
        no_status.booking_status_id = None;
        let mut dangling_status = booking("b2", "2025-07-06", "2025-07-08");
        dangling_status.booking_status_id = Some("status-gone".to_string());
        let repo = MemoryRepository::new()
            .with_booking(no_status)
            .with_booking(dangling_status);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-03"),
            date("2025-07-07"),
            None,
            None,
        )
        .await
        .expect("check succeeds");
        assert_eq!(result.conflicts.len(), 2);
    }

    #[tokio::test]
    async fn minimum_nights_apply_only_to_commercial_requests() {
        let repo = MemoryRepository::new().with_min_nights(3);

        let commercial = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-09-01"),
            date("2025-09-03"),
            None,
            Some(BookingType::Commercial),
        )
        .await
        .expect("check succeeds");
        assert!(!commercial.available);
        assert!(commercial.conflicts[0].message.contains("3 noches"));
        assert!(commercial.conflicts[0].booking.is_none());

        let closed = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-09-01"),
            date("2025-09-03"),
            None,
            Some(BookingType::ClosedPeriod),
        )
        .await
        .expect("check succeeds");
        assert!(closed.available);
    }

    #[tokio::test]
    async fn excluded_booking_does_not_conflict_with_itself() {
        let repo = MemoryRepository::new().with_booking(booking("b1", "2025-07-01", "2025-07-05"));

        let editing = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-02"),
            date("2025-07-06"),
            Some("b1"),
            Some(BookingType::Commercial),
        )
        .await
        .expect("check succeeds");
        assert!(editing.available);

        let other = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-02"),
            date("2025-07-06"),
            Some("b9"),
            Some(BookingType::Commercial),
        )
        .await
        .expect("check succeeds");
        assert!(!other.available);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_without_touching_storage() {
        let repo = MemoryRepository::new();

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-06-10"),
            date("2025-06-10"),
            None,
            None,
        )
        .await
        .expect("check succeeds");
        assert!(!result.available);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(
            repo.booking_queries
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn other_tenants_bookings_are_invisible() {
        let mut foreign = booking("b1", "2025-07-01", "2025-07-05");
        foreign.tenant_id = "tenant-2".to_string();
        let repo = MemoryRepository::new().with_booking(foreign);

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            date("2025-07-05"),
            None,
            None,
        )
        .await
        .expect("check succeeds");
        assert!(result.available);
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let mut repo = MemoryRepository::new();
        repo.fail_bookings = true;

        let result = check_availability(
            &repo,
            PROPERTY,
            TENANT,
            date("2025-07-01"),
            date("2025-07-05"),
            None,
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn validation_reports_inverted_dates_without_error() {
        let repo = MemoryRepository::new();

        let validation = validate_booking_availability(
            &repo,
            PROPERTY,
            TENANT,
            "2025-06-10",
            "2025-06-08",
            None,
            Some(BookingType::Commercial),
        )
        .await
        .expect("validation never errors on bad input");
        assert!(!validation.valid);
        assert!(validation.message.is_some());
    }

    #[tokio::test]
    async fn validation_reports_unparseable_dates() {
        let repo = MemoryRepository::new();

        let validation = validate_booking_availability(
            &repo,
            PROPERTY,
            TENANT,
            "2025-13-01",
            date("2025-06-08"),
            None,
            None,
        )
        .await
        .expect("validation never errors on bad input");
        assert!(!validation.valid);
        assert!(validation
            .message
            .as_deref()
            .is_some_and(|message| message.contains("2025-13-01")));
    }

    #[tokio::test]
    async fn validation_flattens_conflict_messages() {
        let repo = MemoryRepository::new()
            .with_booking(booking("b1", "2025-07-01", "2025-07-03"))
            .with_booking(booking("b2", "2025-07-04", "2025-07-06"));

        let validation = validate_booking_availability(
            &repo,
            PROPERTY,
            TENANT,
            "2025-07-02",
            "2025-07-05",
            None,
            None,
        )
        .await
        .expect("validation succeeds");
        assert!(!validation.valid);
        assert_eq!(
            validation.message.as_deref(),
            Some(
                "Reserva de Huésped desconocido del 2025-07-01 al 2025-07-03; \
                 Reserva de Huésped desconocido del 2025-07-04 al 2025-07-06"
            )
        );
    }
}

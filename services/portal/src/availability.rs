//! Weekly reservation calendar
//!
//! Day blocking and hourly slot generation are pure functions of the clock.
//! They are a display filter only: real occupancy is decided by the backend
//! when a reservation is created.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use common::{ClientError, ClientResult};
use tracing::{debug, info, warn};

use crate::backend::ReservationBackend;
use crate::models::{Id, NewReservation, Reservation};

/// First bookable hour
pub const OPENING_HOUR: u32 = 8;
/// Last bookable hour (slot start)
pub const LAST_SLOT_HOUR: u32 = 22;
/// Length of one slot
pub const SLOT_HOURS: i64 = 1;

/// One-hour reservable window on a given day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSlot {
    pub date: NaiveDate,
    pub hour: u32,
    pub is_available: bool,
}

impl ReservationSlot {
    /// Label shown to the user, e.g. "08:00"
    pub fn label(&self) -> String {
        format!("{:02}:00", self.hour)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(hour_time(self.hour))
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start() + Duration::hours(SLOT_HOURS)
    }
}

/// One day of the displayed week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub blocked: bool,
    pub selected: bool,
}

fn hour_time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Monday of the week containing `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Monday to Sunday of the week containing `today`
pub fn week_days(today: NaiveDate) -> Vec<NaiveDate> {
    let monday = week_start(today);
    (0..7).map(|offset| monday + Duration::days(offset)).collect()
}

/// Whether `day` can be picked when the current date is `today`
pub fn is_day_blocked(day: NaiveDate, today: NaiveDate) -> bool {
    let weekday = day.weekday();
    if matches!(weekday, Weekday::Sat | Weekday::Sun) {
        return true;
    }

    match today.weekday() {
        Weekday::Tue if weekday == Weekday::Mon => return true,
        Weekday::Fri if weekday != Weekday::Fri => return true,
        _ => {}
    }

    day < today
}

/// Blocked dates of the Monday-start week containing `today`
pub fn compute_blocked_days(today: NaiveDate) -> BTreeSet<NaiveDate> {
    week_days(today)
        .into_iter()
        .filter(|day| is_day_blocked(*day, today))
        .collect()
}

/// Hourly slots from 08:00 to 22:00 for `selected`
///
/// On `now`'s own day, slots whose start is already behind `now` are
/// unavailable.
pub fn compute_slots(selected: NaiveDate, now: NaiveDateTime) -> Vec<ReservationSlot> {
    let same_day = selected == now.date();
    (OPENING_HOUR..=LAST_SLOT_HOUR)
        .map(|hour| {
            let start = selected.and_time(hour_time(hour));
            ReservationSlot {
                date: selected,
                hour,
                is_available: !(same_day && start < now),
            }
        })
        .collect()
}

/// Parse "08:00", "8:00" or "8" into an hour
pub fn parse_slot_label(label: &str) -> Option<u32> {
    let label = label.trim();
    let hour = match label.split_once(':') {
        Some((hour, "00")) => hour,
        Some(_) => return None,
        None => label,
    };
    hour.parse().ok()
}

/// Who reserves which room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationTarget {
    pub band: Id,
    pub room: Id,
}

/// Calendar and slot picker for the current week
pub struct AvailabilityView<B> {
    backend: B,
    target: ReservationTarget,
    today: NaiveDate,
    blocked: BTreeSet<NaiveDate>,
    selected: Option<NaiveDate>,
    slots: Vec<ReservationSlot>,
}

impl<B: ReservationBackend> AvailabilityView<B> {
    pub fn new(backend: B, target: ReservationTarget, today: NaiveDate) -> Self {
        Self {
            backend,
            target,
            today,
            blocked: compute_blocked_days(today),
            selected: None,
            slots: Vec::new(),
        }
    }

    pub fn target(&self) -> &ReservationTarget {
        &self.target
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn slots(&self) -> &[ReservationSlot] {
        &self.slots
    }

    /// The seven days of the displayed week
    pub fn days(&self) -> Vec<CalendarDay> {
        week_days(self.today)
            .into_iter()
            .map(|date| CalendarDay {
                date,
                blocked: self.blocked.contains(&date),
                selected: self.selected == Some(date),
            })
            .collect()
    }

    /// Pick a day and regenerate its slots
    pub fn select_date(&mut self, date: NaiveDate, now: NaiveDateTime) -> ClientResult<&[ReservationSlot]> {
        if week_start(date) != week_start(self.today) {
            return Err(ClientError::Validation(format!(
                "{} is outside the current week",
                date
            )));
        }
        if self.blocked.contains(&date) {
            return Err(ClientError::Validation(format!(
                "{} is not available for reservations",
                date
            )));
        }

        self.selected = Some(date);
        self.slots = compute_slots(date, now);
        Ok(&self.slots)
    }

    /// Select a day carried over from an earlier view, dropping it when it
    /// is no longer selectable
    pub fn keep_selection(&mut self, date: NaiveDate, now: NaiveDateTime) -> bool {
        match self.select_date(date, now) {
            Ok(_) => true,
            Err(e) => {
                debug!("Dropped selection of {}: {}", date, e);
                false
            }
        }
    }

    /// Reserve the slot with the given label on the selected day
    ///
    /// On success the slots are reconciled from the reservation the backend
    /// returned; on failure they are left as they were.
    pub async fn reserve(&mut self, label: &str) -> ClientResult<Reservation> {
        let date = self
            .selected
            .ok_or_else(|| ClientError::Validation("Select a day first".to_string()))?;
        let hour = parse_slot_label(label)
            .ok_or_else(|| ClientError::Validation(format!("Unknown slot '{}'", label)))?;
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.hour == hour)
            .ok_or_else(|| ClientError::Validation(format!("Unknown slot '{}'", label)))?;
        if !slot.is_available {
            return Err(ClientError::Validation(format!(
                "Slot {} is not available",
                slot.label()
            )));
        }

        let request = NewReservation {
            band: self.target.band.clone(),
            room: self.target.room.clone(),
            start_time: slot.start(),
            end_time: slot.end(),
            guests: Vec::new(),
        };

        match self.backend.create_reservation(&request).await {
            Ok(reservation) => {
                info!("Reservation {} created for {} {}", reservation.id, date, label);
                self.reconcile(&reservation, hour);
                Ok(reservation)
            }
            Err(e) => {
                warn!("Reservation for {} {} failed: {}", date, label, e);
                Err(e)
            }
        }
    }

    /// Close the requested slot and every slot the returned window covers
    fn reconcile(&mut self, reservation: &Reservation, requested_hour: u32) {
        for slot in &mut self.slots {
            if slot.hour == requested_hour || reservation.overlaps(slot.start(), slot.end()) {
                slot.is_available = false;
            }
        }
    }
}

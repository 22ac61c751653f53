//! Free-form reservation drafts with guests

use chrono::NaiveDateTime;
use common::{ClientError, ClientResult};

use crate::backend::ReservationBackend;
use crate::models::{Id, NewReservation, Reservation, User};

/// Reservation being filled in
#[derive(Debug, Clone, Default)]
pub struct ReservationDraft {
    pub room: Option<Id>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    guests: Vec<User>,
}

impl ReservationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guests(&self) -> &[User] {
        &self.guests
    }

    /// Add a guest; adding someone already invited changes nothing
    pub fn add_guest(&mut self, user: User) -> bool {
        if self.guests.iter().any(|g| g.id == user.id) {
            return false;
        }
        self.guests.push(user);
        true
    }

    pub fn remove_guest(&mut self, id: &Id) {
        self.guests.retain(|g| &g.id != id);
    }

    /// Start and end, both present and in order
    pub fn window(&self) -> ClientResult<(NaiveDateTime, NaiveDateTime)> {
        let (Some(start_time), Some(end_time)) = (self.start_time, self.end_time) else {
            return Err(missing_fields());
        };

        if start_time >= end_time {
            return Err(ClientError::Validation(
                "The start time must be before the end time.".to_string(),
            ));
        }

        Ok((start_time, end_time))
    }

    /// Build the request for `band`, checking the draft is complete
    pub fn to_request(&self, band: &Id) -> ClientResult<NewReservation> {
        let (start_time, end_time) = self.window()?;
        let room = self.room.as_ref().ok_or_else(missing_fields)?;

        Ok(NewReservation {
            band: band.clone(),
            room: room.clone(),
            start_time,
            end_time,
            guests: self.guests.iter().map(|g| g.id.clone()).collect(),
        })
    }

    /// Validate and submit the draft
    pub async fn submit<B: ReservationBackend>(
        &self,
        backend: &B,
        band: &Id,
    ) -> ClientResult<Reservation> {
        let request = self.to_request(band)?;
        backend.create_reservation(&request).await
    }
}

fn missing_fields() -> ClientError {
    ClientError::Validation("All fields are required.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::user;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_guests_are_deduplicated() {
        let mut draft = ReservationDraft::new();
        assert!(draft.add_guest(user(3, "violeta", false)));
        assert!(!draft.add_guest(user(3, "violeta", false)));
        assert!(draft.add_guest(user(4, "victor", true)));
        assert_eq!(draft.guests().len(), 2);

        draft.remove_guest(&Id::from(3u64));
        assert_eq!(draft.guests().len(), 1);
        assert_eq!(draft.guests()[0].username, "victor");
    }

    #[test]
    fn test_incomplete_draft_is_rejected() {
        let mut draft = ReservationDraft::new();
        draft.room = Some(Id::from(2u64));
        draft.start_time = Some(at(10));

        let err = draft.to_request(&Id::from(4u64)).unwrap_err();
        assert_eq!(err.to_string(), "All fields are required.");
    }

    #[test]
    fn test_start_must_precede_end() {
        let draft = ReservationDraft {
            room: Some(Id::from(2u64)),
            start_time: Some(at(12)),
            end_time: Some(at(12)),
            ..ReservationDraft::default()
        };
        assert!(matches!(
            draft.to_request(&Id::from(4u64)),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_window_needs_no_room() {
        let mut draft = ReservationDraft::new();
        draft.start_time = Some(at(10));
        assert!(draft.window().is_err());

        draft.end_time = Some(at(12));
        assert_eq!(draft.window().unwrap(), (at(10), at(12)));
        assert!(draft.to_request(&Id::from(4u64)).is_err());
    }

    #[test]
    fn test_request_carries_guest_ids() {
        let mut draft = ReservationDraft {
            room: Some(Id::from(2u64)),
            start_time: Some(at(12)),
            end_time: Some(at(14)),
            ..ReservationDraft::default()
        };
        draft.add_guest(user(3, "violeta", false));

        let request = draft.to_request(&Id::from(4u64)).unwrap();
        assert_eq!(request.guests, vec![Id::from(3u64)]);
        assert_eq!(request.end_time, at(14));
    }
}

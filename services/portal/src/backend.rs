//! Seams between the client components and the REST backend
//!
//! [`crate::api::ApiClient`] implements all three traits; tests substitute
//! in-memory fakes.

use std::future::Future;

use common::ClientResult;

use crate::models::{
    Band, BandMembership, BandUpdate, DashboardStats, Id, LoginRequest, NewBand, NewMembership,
    NewReservation, Registration, Reservation, Room, User,
};

/// Identity and session endpoints
pub trait SessionBackend {
    /// Identity behind the current session cookie
    fn current_user(&self) -> impl Future<Output = ClientResult<User>> + Send;

    fn login(&self, credentials: &LoginRequest) -> impl Future<Output = ClientResult<()>> + Send;

    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    /// Ask the backend to end the session
    fn logout(&self) -> impl Future<Output = ClientResult<()>> + Send;

    /// Forget every credential held locally
    fn clear_credentials(&self);
}

/// Band, membership and user directory endpoints
pub trait BandBackend {
    fn bands(&self, search: Option<&str>) -> impl Future<Output = ClientResult<Vec<Band>>> + Send;

    fn band(&self, id: &Id) -> impl Future<Output = ClientResult<Band>> + Send;

    fn create_band(&self, band: &NewBand) -> impl Future<Output = ClientResult<Band>> + Send;

    fn update_band(
        &self,
        id: &Id,
        update: &BandUpdate,
    ) -> impl Future<Output = ClientResult<Band>> + Send;

    fn delete_band(&self, id: &Id) -> impl Future<Output = ClientResult<()>> + Send;

    fn join_band(&self, id: &Id) -> impl Future<Output = ClientResult<()>> + Send;

    fn memberships(
        &self,
        band: &Id,
    ) -> impl Future<Output = ClientResult<Vec<BandMembership>>> + Send;

    fn add_membership(
        &self,
        membership: &NewMembership,
    ) -> impl Future<Output = ClientResult<BandMembership>> + Send;

    fn remove_membership(&self, id: &Id) -> impl Future<Output = ClientResult<()>> + Send;

    fn users_by_national_id(
        &self,
        national_id: &str,
    ) -> impl Future<Output = ClientResult<Vec<User>>> + Send;

    fn search_users(&self, term: &str) -> impl Future<Output = ClientResult<Vec<User>>> + Send;

    fn dashboard_stats(&self) -> impl Future<Output = ClientResult<DashboardStats>> + Send;
}

/// Room and reservation endpoints
pub trait ReservationBackend {
    fn rooms(&self) -> impl Future<Output = ClientResult<Vec<Room>>> + Send;

    fn reservations(&self) -> impl Future<Output = ClientResult<Vec<Reservation>>> + Send;

    fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> impl Future<Output = ClientResult<Reservation>> + Send;
}

//! HTTP client for the band and reservation REST backend
//!
//! Requests are authenticated by the session cookie kept in an in-memory
//! jar. Every non-GET request echoes the anti-forgery token from its cookie
//! in a header, read fresh for each request.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use common::{ClientConfig, ClientError, ClientResult};
use reqwest::{
    Client, Method, Url,
    cookie::{CookieStore, Jar},
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{BandBackend, ReservationBackend, SessionBackend};
use crate::models::{
    Band, BandMembership, BandUpdate, DashboardStats, Id, LoginRequest, NewBand, NewMembership,
    NewReservation, Registration, Reservation, Room, User,
};

/// Message shown when the backend rejects the credentials
pub const INVALID_CREDENTIALS: &str = "Incorrect username or password.";

/// Backend paths
pub mod endpoints {
    pub const CURRENT_USER: &str = "/api/application/current-user/";
    pub const LOGIN: &str = "/api/application/login/";
    pub const LOGOUT: &str = "/api/application/logout/";
    pub const REGISTER: &str = "/api/application/register/";
    pub const DASHBOARD_STATS: &str = "/api/application/dashboard/stats/";
    pub const BANDS: &str = "/api/application/bands/";
    pub const BAND_MEMBERS: &str = "/api/application/band-members/";
    pub const USERS: &str = "/api/application/users/";
    pub const USER_SEARCH: &str = "/api/application/users/search";
    pub const RESERVATIONS: &str = "/api/application/reservations/";
    pub const ROOMS: &str = "/api/collection/rooms/";
}

/// Cookie jar that can be emptied on sign-out
#[derive(Default)]
pub struct SessionCookies {
    jar: RwLock<Jar>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    fn jar(&self) -> RwLockReadGuard<'_, Jar> {
        self.jar.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value of the named cookie sent to `url`
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.jar().cookies(url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Drop every cookie
    pub fn clear(&self) {
        let mut jar = self.jar.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *jar = Jar::default();
    }
}

impl CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar().cookies(url)
    }
}

/// REST client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    cookies: Arc<SessionCookies>,
    csrf_cookie: String,
    csrf_header: HeaderName,
}

impl ApiClient {
    /// Create a new client from the configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config.base_url()?;
        let csrf_header = config.csrf_header_name()?;
        let cookies = Arc::new(SessionCookies::new());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .default_headers(headers)
            .user_agent(concat!("bandroom/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("API client initialized with URL: {}", base_url);

        Ok(Self {
            http,
            base_url,
            cookies,
            csrf_cookie: config.csrf_cookie.clone(),
            csrf_header,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Anti-forgery token currently held in the cookie jar
    pub fn csrf_token(&self) -> Option<String> {
        self.cookies.get(&self.base_url, &self.csrf_cookie)
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Configuration(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> ClientResult<T> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);

        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if method != Method::GET {
            let token = self.csrf_token().unwrap_or_default();
            request = request.header(self.csrf_header.clone(), token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.inspect_err(|e| {
            warn!("{} {} did not complete: {}", method, path, e);
        })?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("{} {} failed with status {}", method, path, status);
            return Err(ClientError::from_response(status.as_u16(), &text));
        }

        decode(&text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        self.request(Method::GET, path, query, None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: &(impl Serialize + Sync),
    ) -> ClientResult<T> {
        let body = serde_json::to_value(payload)?;
        self.request(method, path, &[], Some(body)).await
    }

    /// Request whose answer body is irrelevant
    async fn command(&self, method: Method, path: &str) -> ClientResult<()> {
        self.request::<IgnoredAny>(method, path, &[], None).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    Ok(serde_json::from_str(body)?)
}

fn band_path(id: &Id) -> String {
    format!("{}{}/", endpoints::BANDS, id)
}

impl SessionBackend for ApiClient {
    async fn current_user(&self) -> ClientResult<User> {
        self.get(endpoints::CURRENT_USER, &[]).await
    }

    async fn login(&self, credentials: &LoginRequest) -> ClientResult<()> {
        info!("Login attempt for user: {}", credentials.username);
        let result: ClientResult<IgnoredAny> =
            self.send(Method::POST, endpoints::LOGIN, credentials).await;

        match result {
            Ok(_) => Ok(()),
            Err(ClientError::Http { status: 400, .. }) => {
                Err(ClientError::Authentication(INVALID_CREDENTIALS.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn register(&self, registration: &Registration) -> ClientResult<()> {
        info!("Registering user: {}", registration.username);
        self.send::<IgnoredAny>(Method::POST, endpoints::REGISTER, registration)
            .await?;
        Ok(())
    }

    async fn logout(&self) -> ClientResult<()> {
        self.command(Method::POST, endpoints::LOGOUT).await
    }

    fn clear_credentials(&self) {
        debug!("Clearing session cookies");
        self.cookies.clear();
    }
}

impl BandBackend for ApiClient {
    async fn bands(&self, search: Option<&str>) -> ClientResult<Vec<Band>> {
        match search {
            Some(term) => self.get(endpoints::BANDS, &[("search", term)]).await,
            None => self.get(endpoints::BANDS, &[]).await,
        }
    }

    async fn band(&self, id: &Id) -> ClientResult<Band> {
        self.get(&band_path(id), &[]).await
    }

    async fn create_band(&self, band: &NewBand) -> ClientResult<Band> {
        self.send(Method::POST, endpoints::BANDS, band).await
    }

    async fn update_band(&self, id: &Id, update: &BandUpdate) -> ClientResult<Band> {
        self.send(Method::PUT, &band_path(id), update).await
    }

    async fn delete_band(&self, id: &Id) -> ClientResult<()> {
        self.command(Method::DELETE, &band_path(id)).await
    }

    async fn join_band(&self, id: &Id) -> ClientResult<()> {
        self.command(Method::POST, &format!("{}join/", band_path(id)))
            .await
    }

    async fn memberships(&self, band: &Id) -> ClientResult<Vec<BandMembership>> {
        self.get(endpoints::BAND_MEMBERS, &[("band", band.as_str())])
            .await
    }

    async fn add_membership(&self, membership: &NewMembership) -> ClientResult<BandMembership> {
        self.send(Method::POST, endpoints::BAND_MEMBERS, membership)
            .await
    }

    async fn remove_membership(&self, id: &Id) -> ClientResult<()> {
        self.command(Method::DELETE, &format!("{}{}/", endpoints::BAND_MEMBERS, id))
            .await
    }

    async fn users_by_national_id(&self, national_id: &str) -> ClientResult<Vec<User>> {
        self.get(endpoints::USERS, &[("ruf", national_id)]).await
    }

    async fn search_users(&self, term: &str) -> ClientResult<Vec<User>> {
        self.get(endpoints::USER_SEARCH, &[("term", term)]).await
    }

    async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get(endpoints::DASHBOARD_STATS, &[]).await
    }
}

impl ReservationBackend for ApiClient {
    async fn rooms(&self) -> ClientResult<Vec<Room>> {
        self.get(endpoints::ROOMS, &[]).await
    }

    async fn reservations(&self) -> ClientResult<Vec<Reservation>> {
        self.get(endpoints::RESERVATIONS, &[]).await
    }

    async fn create_reservation(&self, reservation: &NewReservation) -> ClientResult<Reservation> {
        info!(
            "Reserving room {} from {} to {}",
            reservation.room, reservation.start_time, reservation.end_time
        );
        self.send(Method::POST, endpoints::RESERVATIONS, reservation)
            .await
    }
}

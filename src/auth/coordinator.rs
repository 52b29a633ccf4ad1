//! Session validation with single-flight coalescing.
//!
//! The coordinator decides, on each request, whether the access token is
//! fresh, needs a proactive refresh, or needs a server-side validation, and
//! guarantees that at most one such round trip is outstanding at any
//! instant. Callers that arrive while a round trip is in flight await the
//! same outcome instead of issuing a second network call.
//!
//! Every failure path is fail-closed: a rejected or unreachable endpoint
//! ends the session.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::watch;

use crate::auth::jwt;
use crate::auth::session::SessionManager;
use crate::auth::types::{TokenResponse, ValidationResponse};
use crate::error::Error;

/// Transport used for refresh/validate round trips
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a refresh token for a new token pair
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error>;

    /// Ask the server whether the access token is still valid
    async fn validate(&self, access_token: &str) -> Result<ValidationResponse, Error>;
}

/// Coordinator state. `Validating` holds the receiver late arrivals clone
/// to await the shared outcome.
enum FlightState {
    Idle,
    Validating(watch::Receiver<Option<bool>>),
}

enum Role {
    Leader(watch::Sender<Option<bool>>),
    Follower(watch::Receiver<Option<bool>>),
}

/// Coordinates token refresh and server-side validation for a session
pub struct RefreshCoordinator {
    session: Arc<SessionManager>,
    api: Arc<dyn AuthApi>,
    refresh_buffer_minutes: i64,
    validate_interval: Duration,
    flight: Mutex<FlightState>,
    last_validated: Mutex<Option<Instant>>,
}

impl RefreshCoordinator {
    pub fn new(
        session: Arc<SessionManager>,
        api: Arc<dyn AuthApi>,
        refresh_buffer_minutes: i64,
        validate_interval: Duration,
    ) -> Self {
        Self {
            session,
            api,
            refresh_buffer_minutes,
            validate_interval,
            flight: Mutex::new(FlightState::Idle),
            last_validated: Mutex::new(None),
        }
    }

    /// The session this coordinator drives
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Validate the current session, refreshing the token pair when it is
    /// close to expiry.
    ///
    /// Returns `true` when the session is (still) valid. Any failure,
    /// whether a refresh rejection, a server rejection or a network error,
    /// logs the session out and returns `false`; this method never errors
    /// and never issues more than one concurrent round trip.
    pub async fn validate_once(&self) -> bool {
        loop {
            if !self.session.is_authenticated() {
                return false;
            }

            let role = {
                let mut flight = self.flight.lock().unwrap();
                match &*flight {
                    FlightState::Validating(rx) => Role::Follower(rx.clone()),
                    FlightState::Idle => {
                        let (tx, rx) = watch::channel(None);
                        *flight = FlightState::Validating(rx);
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Follower(rx) => {
                    if let Some(outcome) = await_outcome(rx).await {
                        return outcome;
                    }
                    // The leading call was cancelled before publishing an
                    // outcome; re-arbitrate and drive a fresh round trip.
                }
                Role::Leader(tx) => {
                    let ticket = FlightTicket::new(&self.flight, tx);
                    let outcome = self.round_trip().await;
                    return ticket.complete(outcome);
                }
            }
        }
    }

    /// The single round trip behind a held ticket
    async fn round_trip(&self) -> bool {
        let snapshot = self.session.snapshot();
        let tokens = match snapshot.tokens {
            Some(tokens) => tokens,
            None => {
                warn!("authenticated session without tokens, logging out");
                self.session.logout();
                return false;
            }
        };

        if jwt::needs_refresh(&tokens.access_token, self.refresh_buffer_minutes) {
            debug!("access token close to expiry, refreshing");
            return match self.api.refresh(&tokens.refresh_token).await {
                Ok(response) => {
                    let user = response.user.or(snapshot.user);
                    self.session.set_auth(
                        &response.access_token,
                        &response.refresh_token,
                        response.expires_in,
                        user,
                    );
                    debug!("token pair refreshed");
                    true
                }
                Err(err) => {
                    warn!("token refresh failed, logging out: {}", err);
                    self.session.logout();
                    false
                }
            };
        }

        // The token is locally fresh; only re-validate against the server
        // if the last full validation is older than the interval.
        let now = Instant::now();
        {
            let mut last = self.last_validated.lock().unwrap();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.validate_interval {
                    return true;
                }
            }
            *last = Some(now);
        }

        match self.api.validate(&tokens.access_token).await {
            Ok(response) if response.valid => true,
            Ok(_) => {
                warn!("server rejected access token, logging out");
                self.session.logout();
                false
            }
            Err(err) => {
                warn!("token validation failed, logging out: {}", err);
                self.session.logout();
                false
            }
        }
    }
}

/// Holds the validation ticket for the leading caller.
///
/// Dropping the ticket returns the coordinator to `Idle` on every exit
/// path. If the round trip unwound before publishing an outcome, the
/// channel closes with no value and followers arbitrate a new flight
/// rather than treating the cancellation as a verdict; a `false` outcome
/// always comes from a completed round trip with its logout applied.
struct FlightTicket<'a> {
    flight: &'a Mutex<FlightState>,
    tx: watch::Sender<Option<bool>>,
}

impl<'a> FlightTicket<'a> {
    fn new(flight: &'a Mutex<FlightState>, tx: watch::Sender<Option<bool>>) -> Self {
        Self { flight, tx }
    }

    fn complete(self, outcome: bool) -> bool {
        let _ = self.tx.send(Some(outcome));
        outcome
    }
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        // Runs before the sender drops, so followers woken by the closed
        // channel always find the flight released.
        *self.flight.lock().unwrap() = FlightState::Idle;
    }
}

/// `Some` once the leader publishes; `None` when the leader's sender
/// dropped without a value.
async fn await_outcome(mut rx: watch::Receiver<Option<bool>>) -> Option<bool> {
    loop {
        if let Some(outcome) = *rx.borrow() {
            return Some(outcome);
        }
        if rx.changed().await.is_err() {
            return *rx.borrow();
        }
    }
}

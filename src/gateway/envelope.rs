//! Action envelope parsing and reservation payload binding.

use serde::Deserialize;

use crate::context::Ctx;
use crate::credential::AuthRequest;
use crate::error::Error;
use crate::state::Authed;
use crate::workers::CreateReservation;
use crate::Tainted;

/// Longest accepted `remarks`, in characters.
pub const MAX_REMARKS_CHARS: usize = 512;

/// A parsed `POST /handle` body.
#[derive(Debug)]
pub enum Action {
    /// Forward to the credential service
    Auth(AuthRequest),
    /// Create a reservation for the verified caller
    Reserve(ReservationRequest),
}

impl Action {
    /// Envelope tag, for logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Auth(_) => "auth",
            Action::Reserve(_) => "reserve",
        }
    }
}

/// Sub-action of a `reserve` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationAction {
    /// Create a booking
    Add,
}

/// The `reservation` half of a `reserve` envelope.
#[derive(Debug)]
pub struct ReservationRequest {
    /// What to do
    pub action: ReservationAction,
    /// Client-supplied booking; bound with [`ReservationData::bind`]
    pub data: Tainted<ReservationData>,
}

/// Party size as sent by clients: `2` or `"2"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    /// JSON number
    Number(i64),
    /// JSON string
    Text(String),
}

/// Booking fields exactly as the client sent them.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationData {
    #[serde(rename = "restaurantID", default)]
    restaurant_id: String,
    /// Ignored; the verified subject replaces it.
    #[serde(rename = "userID", default)]
    _user_id: Option<serde_json::Value>,
    count: RawCount,
    #[serde(rename = "reservationTime", default)]
    reservation_time: String,
    #[serde(default)]
    remarks: String,
}

impl ReservationData {
    /// Validates a client booking and binds it to the verified caller.
    ///
    /// Whatever `userID` the client sent is discarded; the record belongs to
    /// `ctx`'s principal.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `restaurantID` is empty, `count` is not a
    /// positive integer, or `remarks` exceeds [`MAX_REMARKS_CHARS`].
    pub fn bind(data: Tainted<Self>, ctx: &Ctx<Authed>) -> Result<CreateReservation, Error> {
        let data = data.into_inner();

        let restaurant_id = data.restaurant_id.trim();
        if restaurant_id.is_empty() {
            return Err(Error::validation("restaurantID is required"));
        }

        let count = match data.count {
            RawCount::Number(n) => u32::try_from(n).ok(),
            RawCount::Text(ref s) => s.trim().parse::<u32>().ok(),
        }
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::validation("count must be a positive integer"))?;

        if data.remarks.chars().count() > MAX_REMARKS_CHARS {
            return Err(Error::validation(format!(
                "remarks exceed {MAX_REMARKS_CHARS} characters"
            )));
        }

        Ok(CreateReservation {
            restaurant_id: restaurant_id.to_string(),
            user_id: ctx.principal().subject().to_string(),
            count,
            reservation_time: data.reservation_time,
            remarks: data.remarks,
        })
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    action: String,
    #[serde(default)]
    auth: Option<serde_json::Value>,
    #[serde(default)]
    reservation: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawReservation {
    action: ReservationAction,
    #[serde(rename = "reservationData")]
    reservation_data: ReservationData,
}

/// Parses a request body into an [`Action`].
///
/// # Errors
///
/// [`Error::Validation`] if the body is not JSON, the tag is unknown, the
/// payload for the tag is missing, the other tag's payload is present, or
/// the payload itself does not parse (including unknown sub-actions).
pub fn parse_envelope(body: &[u8]) -> Result<Action, Error> {
    let raw: RawEnvelope = serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("body is not an envelope: {e}")))?;

    match (raw.action.as_str(), raw.auth, raw.reservation) {
        ("auth", Some(auth), None) => serde_json::from_value(auth)
            .map(Action::Auth)
            .map_err(|e| Error::validation(format!("invalid auth payload: {e}"))),
        ("reserve", None, Some(reservation)) => {
            let r: RawReservation = serde_json::from_value(reservation)
                .map_err(|e| Error::validation(format!("invalid reservation payload: {e}")))?;
            Ok(Action::Reserve(ReservationRequest {
                action: r.action,
                data: Tainted::new(r.reservation_data),
            }))
        }
        ("auth", None, _) | ("reserve", _, None) => {
            Err(Error::validation(format!("missing payload for '{}'", raw.action)))
        }
        ("auth", Some(_), Some(_)) | ("reserve", Some(_), Some(_)) => Err(Error::validation(
            "envelope carries payloads for more than one action",
        )),
        (other, _, _) => Err(Error::validation(format!("unknown action '{other}'"))),
    }
}

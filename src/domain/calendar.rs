use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::booking::{Booking, BookingId};
use super::property::{Property, RoomKind};
use crate::error::{BookingError, Result};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Outcome of an availability check for one room type and stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    /// The owner blocked a day inside the stay.
    Blocked { date: NaiveDate },
    /// A pending or confirmed booking already holds the room type.
    Booked {
        booking_id: BookingId,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Available => Ok(()),
            Self::Blocked { date } => Err(BookingError::conflict(format!(
                "Selected dates include blocked date: {date}. Please choose different dates."
            ))),
            Self::Booked { .. } => Err(BookingError::conflict(
                "Selected room type not available for the chosen dates",
            )),
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Blocked { date } => write!(f, "Unavailable: {date} is blocked by the owner"),
            Self::Booked {
                check_in,
                check_out,
                ..
            } => write!(
                f,
                "Unavailable: already booked {} to {}",
                check_in.date_naive(),
                check_out.date_naive()
            ),
        }
    }
}

/// Whole days between two instants, rounding any partial day up.
pub fn ceil_days(delta: TimeDelta) -> i64 {
    let millis = delta.num_milliseconds();
    let whole = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        whole
    } else {
        whole + 1
    }
}

/// Calendar days touched by `[check_in, check_out)`, stepping one day at a
/// time from the check-in instant.
pub fn stay_days(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut cursor = check_in;
    while cursor < check_out {
        days.push(cursor.date_naive());
        cursor += TimeDelta::days(1);
    }
    days
}

pub fn first_blocked_date(
    property: &Property,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> Option<NaiveDate> {
    stay_days(check_in, check_out)
        .into_iter()
        .find(|day| property.is_blocked(*day))
}

/// Half-open interval intersection. Back-to-back stays do not overlap.
pub fn ranges_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn find_conflict<'a>(
    existing: &'a [Booking],
    property: &Property,
    kind: RoomKind,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> Option<&'a Booking> {
    existing.iter().find(|b| {
        b.property_id == property.id
            && b.room.kind == kind
            && b.status.holds_calendar()
            && ranges_overlap(b.check_in, b.check_out, check_in, check_out)
    })
}

/// Decide whether `room_type` can be booked for the stay.
///
/// Blocked days are checked before existing bookings, so a stay that hits
/// both reports the blocked day.
pub fn check_availability(
    property: &Property,
    room_type: &str,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    existing: &[Booking],
) -> Result<Availability> {
    if check_in >= check_out {
        return Err(BookingError::validation(
            "check-in must be before check-out",
        ));
    }
    let room = property.resolve_room(room_type)?;

    if let Some(date) = first_blocked_date(property, check_in, check_out) {
        return Ok(Availability::Blocked { date });
    }
    if let Some(conflict) = find_conflict(existing, property, room.kind, check_in, check_out) {
        return Ok(Availability::Booked {
            booking_id: conflict.id,
            check_in: conflict.check_in,
            check_out: conflict.check_out,
        });
    }
    Ok(Availability::Available)
}

/// Parse a stay boundary: RFC 3339 instant or a plain `YYYY-MM-DD` date
/// (midnight UTC).
pub fn parse_stay_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| {
            BookingError::validation(format!(
                "invalid date '{raw}', expected YYYY-MM-DD or RFC 3339"
            ))
        })
}

#![allow(clippy::cast_precision_loss)] // Night counts are small enough for f64

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::ceil_days;
use super::property::{Property, Room};

/// Flat GST applied to the base price plus cleaning fee.
pub const TAX_RATE: f64 = 0.18;

/// Cost breakdown captured on the booking at creation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub total_nights: i64,
    pub room_price: f64,
    /// Farmhouse base price per night.
    pub farmhouse_base_price: f64,
    pub base_price: f64,
    pub cleaning_fee: f64,
    pub security_deposit: f64,
    pub taxes: f64,
    pub total_amount: f64,
}

pub fn total_nights(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    ceil_days(check_out - check_in)
}

pub fn compute_pricing(
    room: &Room,
    property: &Property,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> Pricing {
    let nights = total_nights(check_in, check_out);
    let room_price = room.price_per_night * nights as f64;
    let farmhouse_base_price = property.pricing.base_price;
    let base_price = room_price + farmhouse_base_price * nights as f64;
    let cleaning_fee = property.pricing.cleaning_fee;
    let security_deposit = property.pricing.security_deposit;
    let taxes = (base_price + cleaning_fee) * TAX_RATE;

    Pricing {
        total_nights: nights,
        room_price,
        farmhouse_base_price,
        base_price,
        cleaning_fee,
        security_deposit,
        taxes,
        total_amount: base_price + cleaning_fee + security_deposit + taxes,
    }
}

impl std::fmt::Display for Pricing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Nights: {}", self.total_nights)?;
        writeln!(f, "Room: {:.2}", self.room_price)?;
        writeln!(
            f,
            "Farmhouse base: {:.2} ({:.2}/night)",
            self.base_price - self.room_price,
            self.farmhouse_base_price
        )?;
        writeln!(f, "Cleaning fee: {:.2}", self.cleaning_fee)?;
        writeln!(f, "Security deposit: {:.2}", self.security_deposit)?;
        writeln!(f, "Taxes (18% GST): {:.2}", self.taxes)?;
        write!(f, "Total: {:.2}", self.total_amount)
    }
}

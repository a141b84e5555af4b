use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::Booking;
use super::calendar::ceil_days;
use super::property::CancellationPolicy;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundTier {
    Full,
    Half,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefundQuote {
    pub tier: RefundTier,
    pub amount: f64,
    /// Only set for guest cancellations, which depend on timing.
    #[serde(default)]
    pub days_until_check_in: Option<i64>,
}

impl RefundQuote {
    pub fn full(total_amount: f64) -> Self {
        Self {
            tier: RefundTier::Full,
            amount: total_amount,
            days_until_check_in: None,
        }
    }

    pub fn nothing() -> Self {
        Self {
            tier: RefundTier::None,
            amount: 0.0,
            days_until_check_in: None,
        }
    }
}

impl std::fmt::Display for RefundQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tier = match self.tier {
            RefundTier::Full => "full refund",
            RefundTier::Half => "50% refund",
            RefundTier::None => "no refund",
        };
        write!(f, "{tier}: {:.2}", self.amount)?;
        if let Some(days) = self.days_until_check_in {
            write!(f, " ({days} days before check-in)")?;
        }
        Ok(())
    }
}

pub fn days_until_check_in(check_in: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ceil_days(check_in - now)
}

/// Tiered refund for a guest cancelling their own booking.
pub fn compute_refund(
    booking: &Booking,
    policy: &CancellationPolicy,
    now: DateTime<Utc>,
) -> Result<RefundQuote> {
    booking.ensure_cancellable()?;

    let days = days_until_check_in(booking.check_in, now);
    let total = booking.pricing.total_amount;
    let (tier, amount) = if days >= policy.free_cancellation_days {
        (RefundTier::Full, total)
    } else if days >= policy.partial_refund_days {
        (RefundTier::Half, total * 0.5)
    } else {
        (RefundTier::None, 0.0)
    };

    Ok(RefundQuote {
        tier,
        amount,
        days_until_check_in: Some(days),
    })
}

/// Owner-side refunds ignore timing: rejecting refunds everything, while an
/// owner cancellation refunds nothing.
pub fn owner_refund(booking: &Booking, rejecting: bool) -> RefundQuote {
    if rejecting {
        RefundQuote::full(booking.pricing.total_amount)
    } else {
        RefundQuote::nothing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::BookingStatus;
    use crate::domain::property::RoomKind;
    use crate::error::BookingError;
    use crate::test_helpers::*;
    use chrono::TimeDelta;
    use uuid::Uuid;

    fn confirmed_booking() -> Booking {
        let property = make_property(Uuid::new_v4());
        make_booking(
            &property,
            Uuid::new_v4(),
            RoomKind::Single,
            at(2024, 1, 20),
            at(2024, 1, 23),
            BookingStatus::Confirmed,
        )
    }

    fn policy() -> CancellationPolicy {
        CancellationPolicy {
            free_cancellation: true,
            free_cancellation_days: 7,
            partial_refund_days: 3,
        }
    }

    #[test]
    fn ten_days_out_is_full_refund() {
        let booking = confirmed_booking();
        let quote = compute_refund(&booking, &policy(), at(2024, 1, 10)).unwrap();
        assert_eq!(quote.tier, RefundTier::Full);
        assert_eq!(quote.days_until_check_in, Some(10));
        assert!((quote.amount - booking.pricing.total_amount).abs() < 1e-9);
    }

    #[test]
    fn five_days_out_is_half_refund() {
        let booking = confirmed_booking();
        let quote = compute_refund(&booking, &policy(), at(2024, 1, 15)).unwrap();
        assert_eq!(quote.tier, RefundTier::Half);
        assert!((quote.amount - booking.pricing.total_amount * 0.5).abs() < 1e-9);
    }

    #[test]
    fn one_day_out_is_no_refund() {
        let booking = confirmed_booking();
        let quote = compute_refund(&booking, &policy(), at(2024, 1, 19)).unwrap();
        assert_eq!(quote.tier, RefundTier::None);
        assert!(quote.amount.abs() < f64::EPSILON);
    }

    #[test]
    fn partial_day_counts_as_a_whole_day() {
        let booking = confirmed_booking();
        // 6 days and 1 hour before check-in rounds up to 7
        let now = at(2024, 1, 14) - TimeDelta::hours(1);
        let quote = compute_refund(&booking, &policy(), now).unwrap();
        assert_eq!(quote.days_until_check_in, Some(7));
        assert_eq!(quote.tier, RefundTier::Full);
    }

    #[test]
    fn already_cancelled_booking_is_invalid_state() {
        let mut booking = confirmed_booking();
        booking.status = BookingStatus::Cancelled;
        let err = compute_refund(&booking, &policy(), at(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, BookingError::InvalidState { .. }));
    }

    #[test]
    fn owner_refunds_ignore_timing() {
        let booking = confirmed_booking();
        let rejected = owner_refund(&booking, true);
        assert_eq!(rejected.tier, RefundTier::Full);
        assert!((rejected.amount - booking.pricing.total_amount).abs() < 1e-9);
        let cancelled = owner_refund(&booking, false);
        assert_eq!(cancelled.tier, RefundTier::None);
        assert!(cancelled.amount.abs() < f64::EPSILON);
    }

    #[test]
    fn quote_display() {
        let booking = confirmed_booking();
        let quote = compute_refund(&booking, &policy(), at(2024, 1, 15)).unwrap();
        let text = quote.to_string();
        assert!(text.starts_with("50% refund"));
        assert!(text.contains("5 days before check-in"));
    }
}

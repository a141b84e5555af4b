use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calendar::ranges_overlap;
use super::pricing::Pricing;
use super::property::{PropertyId, Room, RoomKind};
use super::refund::{RefundQuote, owner_refund};
use super::user::UserId;
use crate::error::{BookingError, Result};

pub type BookingId = Uuid;

pub const MAX_TEXT_LEN: usize = 500;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Rejected,
}

impl BookingStatus {
    /// `pending → confirmed | rejected | cancelled`, `confirmed → cancelled | completed`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Confirmed | Self::Rejected | Self::Cancelled
            ) | (Self::Confirmed, Self::Cancelled | Self::Completed)
        )
    }

    /// Pending and confirmed stays hold their room type on the calendar.
    pub fn holds_calendar(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(BookingError::validation(format!(
                "Invalid status '{other}'"
            ))),
        }
    }
}

/// Room details frozen at booking time; later listing edits do not touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub name: String,
    pub capacity: u32,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            kind: room.kind,
            name: room.name.clone(),
            capacity: room.capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Eq)]
pub struct Guests {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub alternate_phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Payment {
    pub status: PaymentStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refund_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy {
    User,
    Owner,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cancellation {
    pub requested_at: DateTime<Utc>,
    pub reason: String,
    pub refund_amount: f64,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub property_id: PropertyId,
    pub room: RoomSnapshot,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: Guests,
    pub pricing: Pricing,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment: Payment,
    #[serde(default)]
    pub special_requests: Option<String>,
    pub contact: ContactInfo,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub review: Option<Review>,
    #[serde(default)]
    pub hidden_from_user: bool,
    #[serde(default)]
    pub hidden_from_user_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hidden_from_owner: bool,
    #[serde(default)]
    pub hidden_from_owner_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn overlaps(&self, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> bool {
        ranges_overlap(self.check_in, self.check_out, check_in, check_out)
    }

    /// The review counted toward the farmhouse rating, if any.
    pub fn rated_review(&self) -> Option<&Review> {
        if self.status != BookingStatus::Completed {
            return None;
        }
        self.review.as_ref().filter(|r| r.is_visible)
    }

    fn ensure_transition(&self, next: BookingStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(BookingError::invalid_state(format!(
                "Booking cannot move from {} to {next}",
                self.status
            )))
        }
    }

    pub fn ensure_cancellable(&self) -> Result<()> {
        self.ensure_transition(BookingStatus::Cancelled)
            .map_err(|_| {
                BookingError::invalid_state(format!(
                    "Booking cannot be cancelled (status: {})",
                    self.status
                ))
            })
    }

    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(BookingStatus::Confirmed)?;
        self.status = BookingStatus::Confirmed;
        self.payment.status = PaymentStatus::Completed;
        self.payment.paid_at = Some(now);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.ensure_transition(BookingStatus::Completed)?;
        self.status = BookingStatus::Completed;
        Ok(())
    }

    /// Owner rejection refunds the whole amount.
    pub fn reject(&mut self, by: CancelledBy, reason: String, now: DateTime<Utc>) -> Result<()> {
        self.ensure_transition(BookingStatus::Rejected)?;
        let refund = owner_refund(self, true).amount;
        self.status = BookingStatus::Rejected;
        self.cancellation = Some(Cancellation {
            requested_at: now,
            reason,
            refund_amount: refund,
            cancelled_by: by,
        });
        self.payment.status = PaymentStatus::Refunded;
        self.payment.refunded_at = Some(now);
        self.payment.refund_amount = Some(refund);
        Ok(())
    }

    pub fn cancel(
        &mut self,
        by: CancelledBy,
        refund: &RefundQuote,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_cancellable()?;
        self.status = BookingStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            requested_at: now,
            reason,
            refund_amount: refund.amount,
            cancelled_by: by,
        });
        if refund.amount > 0.0 && self.payment.status == PaymentStatus::Completed {
            self.payment.status = PaymentStatus::Refunded;
            self.payment.refunded_at = Some(now);
            self.payment.refund_amount = Some(refund.amount);
        }
        Ok(())
    }

    /// Returns `false` when the booking was already hidden.
    pub fn hide_from_user(&mut self, now: DateTime<Utc>) -> Result<bool> {
        self.ensure_hideable("list")?;
        if self.hidden_from_user {
            return Ok(false);
        }
        self.hidden_from_user = true;
        self.hidden_from_user_at = Some(now);
        Ok(true)
    }

    /// Returns `false` when the booking was already hidden.
    pub fn hide_from_owner(&mut self, now: DateTime<Utc>) -> Result<bool> {
        self.ensure_hideable("owner list")?;
        if self.hidden_from_owner {
            return Ok(false);
        }
        self.hidden_from_owner = true;
        self.hidden_from_owner_at = Some(now);
        Ok(true)
    }

    fn ensure_hideable(&self, list: &str) -> Result<()> {
        if self.status.is_terminal() {
            Ok(())
        } else {
            Err(BookingError::invalid_state(format!(
                "Can only remove completed, rejected, or cancelled bookings from {list} (status: {})",
                self.status
            )))
        }
    }

    /// Write the one-and-only review of a completed stay.
    pub fn attach_review(
        &mut self,
        rating: i64,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Review> {
        if self.status != BookingStatus::Completed {
            return Err(BookingError::invalid_state(
                "You can only review completed bookings",
            ));
        }
        if self.review.is_some() {
            return Err(BookingError::conflict(
                "You have already reviewed this booking",
            ));
        }
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| BookingError::validation("Rating must be between 1 and 5"))?;
        let comment = comment.unwrap_or_default();
        if comment.chars().count() > MAX_TEXT_LEN {
            return Err(BookingError::validation(format!(
                "Review comment cannot exceed {MAX_TEXT_LEN} characters"
            )));
        }
        Ok(&*self.review.insert(Review {
            rating,
            comment,
            created_at: now,
            is_visible: true,
        }))
    }
}

impl std::fmt::Display for Booking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Booking {} [{}]", self.id, self.status)?;
        writeln!(f, "Farmhouse: {}", self.property_id)?;
        writeln!(
            f,
            "Room: {} ({}, sleeps {})",
            self.room.name, self.room.kind, self.room.capacity
        )?;
        writeln!(
            f,
            "Stay: {} to {} ({} nights)",
            self.check_in.date_naive(),
            self.check_out.date_naive(),
            self.pricing.total_nights
        )?;
        writeln!(
            f,
            "Guests: {} adults, {} children, {} infants",
            self.guests.adults, self.guests.children, self.guests.infants
        )?;
        writeln!(f, "Total: {:.2}", self.pricing.total_amount)?;
        if let Some(c) = &self.cancellation {
            writeln!(
                f,
                "Cancellation: {} (refund {:.2}, by {:?})",
                c.reason, c.refund_amount, c.cancelled_by
            )?;
        }
        if let Some(r) = &self.review {
            writeln!(f, "Review: {}/5 {}", r.rating, r.comment)?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

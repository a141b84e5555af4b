use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;
use crate::error::{BookingError, Result};

pub type PropertyId = Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Single,
    Double,
    Family,
    Suite,
    Villa,
}

impl RoomKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Family => "family",
            Self::Suite => "suite",
            Self::Villa => "villa",
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq)]
pub struct Room {
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub name: String,
    pub capacity: u32,
    pub price_per_night: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// Farmhouse-level pricing. The multipliers are stored for listing display
/// only; the booking price does not apply them.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq)]
pub struct PropertyPricing {
    pub base_price: f64,
    #[serde(default = "default_weekend_multiplier")]
    pub weekend_multiplier: f64,
    #[serde(default = "default_holiday_multiplier")]
    pub holiday_multiplier: f64,
    #[serde(default)]
    pub cleaning_fee: f64,
    #[serde(default)]
    pub security_deposit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq)]
pub struct CancellationPolicy {
    #[serde(default = "default_true")]
    pub free_cancellation: bool,
    #[serde(default = "default_free_cancellation_days")]
    pub free_cancellation_days: i64,
    #[serde(default = "default_partial_refund_days")]
    pub partial_refund_days: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            free_cancellation: true,
            free_cancellation_days: default_free_cancellation_days(),
            partial_refund_days: default_partial_refund_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema, PartialEq, Default)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedDate {
    pub date: NaiveDate,
    pub reason: String,
    pub blocked_by: Option<UserId>,
    pub blocked_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalDetails {
    pub reviewed_by: UserId,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Ratings {
    pub average: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Block,
    Unblock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: Address,
    #[serde(default)]
    pub rooms: Vec<Room>,
    pub pricing: PropertyPricing,
    #[serde(default)]
    pub cancellation_policy: CancellationPolicy,
    #[serde(default)]
    pub blocked_dates: Vec<BlockedDate>,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub approval_details: Option<ApprovalDetails>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub ratings: Ratings,
    pub created_at: DateTime<Utc>,
}

impl Property {
    /// Visible in public search and open for bookings.
    pub fn is_listed(&self) -> bool {
        self.is_active && self.approval_status == ApprovalStatus::Approved
    }

    /// Find the room a guest asked for.
    ///
    /// The token matches a room type case-insensitively; failing that, any
    /// room whose display name contains the token.
    pub fn resolve_room(&self, token: &str) -> Result<&Room> {
        let wanted = token.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(BookingError::validation("room type is required"));
        }
        self.rooms
            .iter()
            .find(|r| r.kind.as_str() == wanted)
            .or_else(|| {
                self.rooms
                    .iter()
                    .find(|r| r.name.to_lowercase().contains(&wanted))
            })
            .ok_or_else(|| {
                BookingError::validation(format!(
                    "Room type '{token}' not available. Available rooms: {}",
                    self.room_types()
                ))
            })
    }

    pub fn room_types(&self) -> String {
        self.rooms
            .iter()
            .map(|r| r.kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_blocked(&self, day: NaiveDate) -> bool {
        self.blocked_dates.iter().any(|b| b.date == day)
    }

    /// Block each day not already blocked. Returns how many were added.
    pub fn block_dates(&mut self, days: &[NaiveDate], by: UserId, now: DateTime<Utc>) -> usize {
        let mut added = 0;
        for &day in days {
            if self.is_blocked(day) {
                continue;
            }
            self.blocked_dates.push(BlockedDate {
                date: day,
                reason: default_block_reason(),
                blocked_by: Some(by),
                blocked_at: now,
            });
            added += 1;
        }
        self.blocked_dates.sort_by_key(|b| b.date);
        added
    }

    /// Returns how many entries were removed.
    pub fn unblock_dates(&mut self, days: &[NaiveDate]) -> usize {
        let before = self.blocked_dates.len();
        self.blocked_dates.retain(|b| !days.contains(&b.date));
        before - self.blocked_dates.len()
    }

    pub fn approve(&mut self, admin: UserId, notes: String, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending_review()?;
        self.approval_status = ApprovalStatus::Approved;
        self.is_active = true;
        self.approval_details = Some(ApprovalDetails {
            reviewed_by: admin,
            reviewed_at: now,
            rejection_reason: None,
            notes,
        });
        Ok(())
    }

    pub fn reject(
        &mut self,
        admin: UserId,
        reason: String,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(BookingError::validation("Rejection reason is required"));
        }
        self.ensure_pending_review()?;
        self.approval_status = ApprovalStatus::Rejected;
        self.is_active = false;
        self.approval_details = Some(ApprovalDetails {
            reviewed_by: admin,
            reviewed_at: now,
            rejection_reason: Some(reason),
            notes,
        });
        Ok(())
    }

    fn ensure_pending_review(&self) -> Result<()> {
        if self.approval_status == ApprovalStatus::Pending {
            Ok(())
        } else {
            Err(BookingError::invalid_state(format!(
                "Farmhouse is not in pending status. Current status: {}",
                self.approval_status
            )))
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.name)?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(
            f,
            "Location: {}, {}, {}",
            self.address.city, self.address.state, self.address.country
        )?;
        writeln!(f, "Status: {}", self.approval_status)?;
        if self.ratings.count > 0 {
            writeln!(
                f,
                "Rating: {:.1} ({} reviews)",
                self.ratings.average, self.ratings.count
            )?;
        }
        writeln!(
            f,
            "Base price: {:.0}/night | Cleaning fee: {:.0} | Security deposit: {:.0}",
            self.pricing.base_price, self.pricing.cleaning_fee, self.pricing.security_deposit
        )?;
        writeln!(
            f,
            "Cancellation: full refund {}+ days before check-in, half refund {}+ days",
            self.cancellation_policy.free_cancellation_days,
            self.cancellation_policy.partial_refund_days
        )?;
        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }
        if !self.rooms.is_empty() {
            writeln!(f, "\n## Rooms")?;
            for room in &self.rooms {
                writeln!(
                    f,
                    "- {} ({}): sleeps {}, {:.0}/night{}",
                    room.name,
                    room.kind,
                    room.capacity,
                    room.price_per_night,
                    if room.is_available { "" } else { " [unavailable]" }
                )?;
            }
        }
        if !self.blocked_dates.is_empty() {
            let days: Vec<String> = self
                .blocked_dates
                .iter()
                .map(|b| b.date.to_string())
                .collect();
            writeln!(f, "\nBlocked dates: {}", days.join(", "))?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_weekend_multiplier() -> f64 {
    1.2
}

fn default_holiday_multiplier() -> f64 {
    1.5
}

fn default_free_cancellation_days() -> i64 {
    7
}

fn default_partial_refund_days() -> i64 {
    3
}

fn default_country() -> String {
    "India".into()
}

fn default_block_reason() -> String {
    "Blocked by owner".into()
}

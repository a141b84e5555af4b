#![allow(clippy::cast_precision_loss)] // Review counts are small enough for f64

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::{Booking, BookingId, Review};
use super::property::{Property, PropertyId, Ratings};
use super::user::UserId;

/// Round to one decimal place, halves away from zero.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Recompute a farmhouse's rating from scratch.
///
/// Only completed bookings of `property_id` with a visible review count, so
/// the result is the same no matter how often or in which order it runs.
pub fn aggregate(property_id: PropertyId, bookings: &[Booking]) -> Ratings {
    let ratings: Vec<u8> = bookings
        .iter()
        .filter(|b| b.property_id == property_id)
        .filter_map(|b| b.rated_review().map(|r| r.rating))
        .collect();

    if ratings.is_empty() {
        return Ratings::default();
    }
    let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
    let count = u32::try_from(ratings.len()).unwrap_or(u32::MAX);
    Ratings {
        average: round_one_decimal(f64::from(sum) / ratings.len() as f64),
        count,
    }
}

/// A review as shown on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewEntry {
    pub booking_id: BookingId,
    pub property_id: PropertyId,
    pub user_id: UserId,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub review: Review,
}

impl ReviewEntry {
    pub fn from_booking(booking: &Booking) -> Option<Self> {
        booking.rated_review().map(|review| Self {
            booking_id: booking.id,
            property_id: booking.property_id,
            user_id: booking.user_id,
            check_in: booking.check_in,
            check_out: booking.check_out,
            review: review.clone(),
        })
    }
}

/// Visible reviews, newest first.
pub fn visible_reviews<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Vec<ReviewEntry> {
    let mut entries: Vec<ReviewEntry> = bookings
        .into_iter()
        .filter_map(ReviewEntry::from_booking)
        .collect();
    entries.sort_by(|a, b| b.review.created_at.cmp(&a.review.created_at));
    entries
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyRating {
    pub property_id: PropertyId,
    pub name: String,
    pub ratings: Ratings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerRatingSummary {
    pub properties: Vec<PropertyRating>,
    pub total_reviews: usize,
    /// Mean of the farmhouses' own averages, unrated ones included as 0.
    pub overall_rating: f64,
    pub recent_reviews: Vec<ReviewEntry>,
}

pub const RECENT_REVIEW_LIMIT: usize = 10;

pub fn owner_summary(properties: &[Property], bookings: &[Booking]) -> OwnerRatingSummary {
    if properties.is_empty() {
        return OwnerRatingSummary {
            properties: Vec::new(),
            total_reviews: 0,
            overall_rating: 0.0,
            recent_reviews: Vec::new(),
        };
    }

    let reviews = visible_reviews(
        bookings
            .iter()
            .filter(|b| properties.iter().any(|p| p.id == b.property_id)),
    );
    let overall = properties.iter().map(|p| p.ratings.average).sum::<f64>()
        / properties.len() as f64;

    OwnerRatingSummary {
        properties: properties
            .iter()
            .map(|p| PropertyRating {
                property_id: p.id,
                name: p.name.clone(),
                ratings: p.ratings,
            })
            .collect(),
        total_reviews: reviews.len(),
        overall_rating: round_one_decimal(overall),
        recent_reviews: reviews.into_iter().take(RECENT_REVIEW_LIMIT).collect(),
    }
}

impl std::fmt::Display for OwnerRatingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Overall rating: {:.1} across {} farmhouses ({} reviews)",
            self.overall_rating,
            self.properties.len(),
            self.total_reviews
        )?;
        for p in &self.properties {
            writeln!(
                f,
                "- {}: {:.1} ({} reviews)",
                p.name, p.ratings.average, p.ratings.count
            )?;
        }
        if !self.recent_reviews.is_empty() {
            writeln!(f, "\nRecent reviews:")?;
            for entry in &self.recent_reviews {
                writeln!(
                    f,
                    "- {}/5 on {}: {}",
                    entry.review.rating,
                    entry.review.created_at.date_naive(),
                    entry.review.comment
                )?;
            }
        }
        Ok(())
    }
}

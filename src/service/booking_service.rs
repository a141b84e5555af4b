use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::page_limit;
use super::property_service::PropertyService;
use crate::config::types::{Config, ListingConfig, PolicyConfig};
use crate::domain::booking::{
    Booking, BookingId, BookingStatus, CancelledBy, ContactInfo, Guests, MAX_TEXT_LEN, Payment,
    RoomSnapshot,
};
use crate::domain::calendar::{Availability, check_availability};
use crate::domain::page::Page;
use crate::domain::pricing::{Pricing, compute_pricing, total_nights};
use crate::domain::property::{Property, PropertyId, RoomKind};
use crate::domain::rating::{ReviewEntry, visible_reviews};
use crate::domain::refund::{RefundQuote, compute_refund, owner_refund};
use crate::domain::user::{Access, User};
use crate::error::{BookingError, Result};
use crate::ports::clock::Clock;
use crate::ports::repository::Repositories;

/// Contact fields a guest may override; blanks fall back to the profile.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct ContactOverrides {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub property_id: PropertyId,
    pub room_type: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: Guests,
    pub special_requests: Option<String>,
    pub contact: ContactOverrides,
}

type RoomKey = (PropertyId, RoomKind);

/// One async mutex per (farmhouse, room type).
#[derive(Default)]
struct RoomLocks {
    locks: std::sync::Mutex<HashMap<RoomKey, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    async fn acquire(&self, key: RoomKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

/// Creation, status changes, visibility and reviews of bookings.
pub struct BookingService {
    repos: Repositories,
    properties: Arc<PropertyService>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    listing: ListingConfig,
    room_locks: RoomLocks,
}

impl BookingService {
    pub fn new(
        repos: Repositories,
        properties: Arc<PropertyService>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            repos,
            properties,
            clock,
            policy: config.policy.clone(),
            listing: config.listing.clone(),
            room_locks: RoomLocks::default(),
        }
    }

    /// Reserve a room type for a stay.
    ///
    /// The availability check and the insert run under the room-type lock, so
    /// of two overlapping requests only the first one lands.
    pub async fn create(&self, user: &User, request: BookingRequest) -> Result<Booking> {
        self.validate_request(&request)?;

        let property = self.properties.load(request.property_id).await?;
        if !property.is_listed() {
            return Err(BookingError::validation(
                "Farmhouse is not available for booking",
            ));
        }
        let kind = property.resolve_room(&request.room_type)?.kind;

        let _guard = self.room_locks.acquire((property.id, kind)).await;
        // re-read under the lock to see the latest blocked dates
        let property = self.properties.load(request.property_id).await?;
        let existing = self
            .repos
            .bookings
            .bookings_for_room(property.id, kind)
            .await?;
        check_availability(
            &property,
            &request.room_type,
            request.check_in,
            request.check_out,
            &existing,
        )?
        .into_result()?;

        let room = property.resolve_room(&request.room_type)?;
        if !room.is_available {
            return Err(BookingError::validation(format!(
                "Room '{}' is currently unavailable",
                room.name
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: user.id,
            property_id: property.id,
            room: RoomSnapshot::from(room),
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            pricing: compute_pricing(room, &property, request.check_in, request.check_out),
            status: BookingStatus::Pending,
            payment: Payment::default(),
            special_requests: request.special_requests.filter(|s| !s.trim().is_empty()),
            contact: contact_for(user, request.contact),
            cancellation: None,
            review: None,
            hidden_from_user: false,
            hidden_from_user_at: None,
            hidden_from_owner: false,
            hidden_from_owner_at: None,
            created_at: self.clock.now(),
        };
        self.repos.bookings.insert_booking(booking.clone()).await?;

        tracing::info!(
            booking_id = %booking.id,
            property_id = %property.id,
            room = %kind,
            nights = booking.pricing.total_nights,
            "Booking created"
        );
        Ok(booking)
    }

    fn validate_request(&self, request: &BookingRequest) -> Result<()> {
        if request.guests.adults < 1 {
            return Err(BookingError::validation("At least one adult is required"));
        }
        if let Some(text) = &request.special_requests
            && text.chars().count() > MAX_TEXT_LEN
        {
            return Err(BookingError::validation(format!(
                "Special requests cannot exceed {MAX_TEXT_LEN} characters"
            )));
        }
        if request.check_in >= request.check_out {
            return Err(BookingError::validation(
                "Check-out date must be after check-in date",
            ));
        }
        let nights = total_nights(request.check_in, request.check_out);
        if nights > i64::from(self.policy.max_stay_nights) {
            return Err(BookingError::validation(format!(
                "Stays are limited to {} nights",
                self.policy.max_stay_nights
            )));
        }
        Ok(())
    }

    /// Public availability check; nothing is reserved.
    pub async fn availability(
        &self,
        property_id: PropertyId,
        room_type: &str,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<Availability> {
        let property = self.properties.get_property(None, property_id).await?;
        let kind = property.resolve_room(room_type)?.kind;
        let existing = self
            .repos
            .bookings
            .bookings_for_room(property_id, kind)
            .await?;
        check_availability(&property, room_type, check_in, check_out, &existing)
    }

    pub async fn quote(
        &self,
        property_id: PropertyId,
        room_type: &str,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    ) -> Result<Pricing> {
        if check_in >= check_out {
            return Err(BookingError::validation(
                "Check-out date must be after check-in date",
            ));
        }
        let property = self.properties.get_property(None, property_id).await?;
        let room = property.resolve_room(room_type)?;
        Ok(compute_pricing(room, &property, check_in, check_out))
    }

    /// Owner/admin status changes, plus a guest cancelling their own stay.
    pub async fn update_status(
        &self,
        actor: &User,
        id: BookingId,
        status: &str,
        reason: Option<String>,
    ) -> Result<Booking> {
        let target: BookingStatus = status.parse()?;
        if target == BookingStatus::Pending {
            return Err(BookingError::validation("Invalid status 'pending'"));
        }
        let now = self.clock.now();

        let (booking, ()) = self
            .mutate(id, |booking, property| {
                let access = Access::resolve(actor, property.owner_id, booking.user_id);
                if access.manages_property() {
                    let by = if access == Access::Admin {
                        CancelledBy::Admin
                    } else {
                        CancelledBy::Owner
                    };
                    match target {
                        BookingStatus::Confirmed => booking.confirm(now),
                        BookingStatus::Completed => booking.complete(),
                        BookingStatus::Rejected => booking.reject(
                            by,
                            reason.unwrap_or_else(|| "Rejected by owner".into()),
                            now,
                        ),
                        BookingStatus::Cancelled => {
                            let refund = owner_refund(booking, false);
                            booking.cancel(
                                by,
                                &refund,
                                reason.unwrap_or_else(|| "Cancelled by owner".into()),
                                now,
                            )
                        }
                        BookingStatus::Pending => {
                            Err(BookingError::validation("Invalid status 'pending'"))
                        }
                    }
                } else if access == Access::Guest {
                    if target != BookingStatus::Cancelled {
                        return Err(BookingError::unauthorized(
                            "You can only cancel your own booking",
                        ));
                    }
                    let refund = RefundQuote::full(booking.pricing.total_amount);
                    booking.cancel(
                        CancelledBy::User,
                        &refund,
                        reason.unwrap_or_else(|| "Cancelled by user".into()),
                        now,
                    )
                } else {
                    Err(BookingError::unauthorized(
                        "Not authorized to update this booking",
                    ))
                }
            })
            .await?;

        tracing::info!(booking_id = %id, status = %booking.status, actor_id = %actor.id, "Booking status updated");
        Ok(booking)
    }

    /// Guest cancellation with the farmhouse's tiered refund.
    pub async fn cancel(
        &self,
        user: &User,
        id: BookingId,
        reason: Option<String>,
    ) -> Result<(Booking, RefundQuote)> {
        let now = self.clock.now();
        let property_id = self.load(id).await?.property_id;
        let policy = self.properties.policy_for(property_id).await?;

        let (booking, quote) = self
            .mutate(id, |booking, _| {
                if booking.user_id != user.id {
                    return Err(BookingError::unauthorized(
                        "Not authorized to cancel this booking",
                    ));
                }
                let quote = compute_refund(booking, &policy, now)?;
                booking.cancel(
                    CancelledBy::User,
                    &quote,
                    reason.unwrap_or_else(|| "Cancelled by user".into()),
                    now,
                )?;
                Ok(quote)
            })
            .await?;

        tracing::info!(booking_id = %id, refund = quote.amount, tier = ?quote.tier, "Booking cancelled by guest");
        Ok((booking, quote))
    }

    /// Remove a finished booking from the guest's list. Returns whether
    /// anything changed.
    pub async fn hide_from_user(&self, actor: &User, id: BookingId) -> Result<bool> {
        let now = self.clock.now();
        let (_, changed) = self
            .mutate(id, |booking, _| {
                if booking.user_id != actor.id && !actor.is_admin() {
                    return Err(BookingError::unauthorized(
                        "Not authorized to remove this booking",
                    ));
                }
                booking.hide_from_user(now)
            })
            .await?;
        tracing::debug!(booking_id = %id, changed, "Booking hidden from guest");
        Ok(changed)
    }

    /// Remove a finished booking from the owner's list.
    pub async fn hide_from_owner(&self, actor: &User, id: BookingId) -> Result<bool> {
        let now = self.clock.now();
        let (_, changed) = self
            .mutate(id, |booking, property| {
                if property.owner_id != actor.id && !actor.is_admin() {
                    return Err(BookingError::unauthorized(
                        "Not authorized to remove this booking",
                    ));
                }
                booking.hide_from_owner(now)
            })
            .await?;
        tracing::debug!(booking_id = %id, changed, "Booking hidden from owner");
        Ok(changed)
    }

    /// Review a completed stay, then refresh the farmhouse rating.
    pub async fn submit_review(
        &self,
        user: &User,
        id: BookingId,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Booking> {
        let now = self.clock.now();
        let (booking, ()) = self
            .mutate(id, |booking, _| {
                if booking.user_id != user.id {
                    return Err(BookingError::unauthorized(
                        "You can only review your own bookings",
                    ));
                }
                booking.attach_review(rating, comment, now).map(|_| ())
            })
            .await?;

        if let Err(e) = self.properties.recompute_rating(booking.property_id).await {
            tracing::error!(
                booking_id = %id,
                property_id = %booking.property_id,
                error = %e,
                "Review saved but rating recompute failed"
            );
        }
        Ok(booking)
    }

    pub async fn get_booking(&self, actor: &User, id: BookingId) -> Result<Booking> {
        let booking = self.load(id).await?;
        let owner = self
            .repos
            .properties
            .get_property(booking.property_id)
            .await?
            .map(|p| p.owner_id);
        let visible = actor.is_admin()
            || actor.id == booking.user_id
            || owner.is_some_and(|o| o == actor.id);
        if visible {
            Ok(booking)
        } else {
            Err(BookingError::unauthorized(
                "Not authorized to view this booking",
            ))
        }
    }

    /// The guest's own bookings, newest first.
    pub async fn user_bookings(
        &self,
        user: &User,
        status: Option<BookingStatus>,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Booking>> {
        let bookings = self
            .repos
            .bookings
            .bookings_for_user(user.id)
            .await?
            .into_iter()
            .filter(|b| !b.hidden_from_user && status.is_none_or(|s| b.status == s))
            .collect();
        Ok(Page::paginate(
            newest_first(bookings),
            page,
            page_limit(&self.listing, limit),
        ))
    }

    /// Bookings across every farmhouse the owner lists, newest first.
    pub async fn owner_bookings(
        &self,
        owner: &User,
        status: Option<BookingStatus>,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Booking>> {
        let bookings = self
            .owner_visible_bookings(owner)
            .await?
            .into_iter()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .collect();
        Ok(Page::paginate(
            newest_first(bookings),
            page,
            page_limit(&self.listing, limit),
        ))
    }

    pub async fn active_bookings_count(&self, owner: &User) -> Result<usize> {
        Ok(self
            .owner_visible_bookings(owner)
            .await?
            .iter()
            .filter(|b| b.status.holds_calendar())
            .count())
    }

    pub async fn all_bookings(
        &self,
        admin: &User,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Booking>> {
        if !admin.is_admin() {
            return Err(BookingError::unauthorized("Admin access required"));
        }
        let bookings = self.repos.bookings.all_bookings().await?;
        Ok(Page::paginate(
            newest_first(bookings),
            page,
            page_limit(&self.listing, limit),
        ))
    }

    /// Visible reviews of a farmhouse, newest first.
    pub async fn property_reviews(
        &self,
        property_id: PropertyId,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<ReviewEntry>> {
        self.properties.load(property_id).await?;
        let bookings = self
            .repos
            .bookings
            .bookings_for_property(property_id)
            .await?;
        Ok(Page::paginate(
            visible_reviews(&bookings),
            page,
            page_limit(&self.listing, limit),
        ))
    }

    async fn owner_visible_bookings(&self, owner: &User) -> Result<Vec<Booking>> {
        let properties = self.repos.properties.properties_by_owner(owner.id).await?;
        let mut bookings = Vec::new();
        for property in &properties {
            bookings.extend(
                self.repos
                    .bookings
                    .bookings_for_property(property.id)
                    .await?
                    .into_iter()
                    .filter(|b| !b.hidden_from_owner),
            );
        }
        Ok(bookings)
    }

    async fn load(&self, id: BookingId) -> Result<Booking> {
        self.repos
            .bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))
    }

    /// Read-modify-write of one booking under its room-type lock.
    ///
    /// `apply` works on a copy; nothing is written unless it succeeds.
    async fn mutate<T>(
        &self,
        id: BookingId,
        apply: impl FnOnce(&mut Booking, &Property) -> Result<T>,
    ) -> Result<(Booking, T)> {
        let snapshot = self.load(id).await?;
        let _guard = self
            .room_locks
            .acquire((snapshot.property_id, snapshot.room.kind))
            .await;

        let mut booking = self.load(id).await?;
        let property = self.properties.load(booking.property_id).await?;
        let out = apply(&mut booking, &property)?;
        self.repos.bookings.save_booking(booking.clone()).await?;
        Ok((booking, out))
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").finish()
    }
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

fn contact_for(user: &User, overrides: ContactOverrides) -> ContactInfo {
    fn pick(value: Option<String>, fallback: &str) -> String {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
    ContactInfo {
        name: pick(overrides.name, &user.name),
        email: pick(overrides.email, &user.email),
        phone: pick(overrides.phone, &user.phone),
        alternate_phone: overrides.alternate_phone.filter(|p| !p.trim().is_empty()),
    }
}

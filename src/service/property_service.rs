use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::page_limit;
use crate::config::types::{Config, ListingConfig, PolicyConfig};
use crate::domain::page::Page;
use crate::domain::property::{
    Address, ApprovalStatus, BlockAction, BlockedDate, CancellationPolicy, Property, PropertyId,
    PropertyPricing, Ratings, Room,
};
use crate::domain::rating::{self, OwnerRatingSummary};
use crate::domain::search_params::PropertyFilter;
use crate::domain::user::User;
use crate::error::{BookingError, Result};
use crate::ports::cache::PropertyCache;
use crate::ports::clock::Clock;
use crate::ports::repository::Repositories;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// A new listing as submitted by an owner.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PropertyDraft {
    pub name: String,
    pub description: String,
    pub address: Address,
    pub rooms: Vec<Room>,
    pub pricing: PropertyPricing,
    /// Defaults to the configured policy.
    #[serde(default)]
    pub cancellation_policy: Option<CancellationPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<Address>,
    pub rooms: Option<Vec<Room>>,
    pub pricing: Option<PropertyPricing>,
    pub cancellation_policy: Option<CancellationPolicy>,
}

/// Listings, moderation, blocked dates and rating aggregates.
pub struct PropertyService {
    repos: Repositories,
    cache: Arc<dyn PropertyCache>,
    clock: Arc<dyn Clock>,
    policy: PolicyConfig,
    listing: ListingConfig,
    cache_ttl: Duration,
    // Serializes read-modify-write cycles on property documents.
    write_lock: Mutex<()>,
}

impl PropertyService {
    pub fn new(
        repos: Repositories,
        cache: Arc<dyn PropertyCache>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            repos,
            cache,
            clock,
            policy: config.policy.clone(),
            listing: config.listing.clone(),
            cache_ttl: Duration::from_secs(config.cache.property_ttl_secs),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn create_property(&self, actor: &User, draft: PropertyDraft) -> Result<Property> {
        if !actor.can_list_properties() {
            return Err(BookingError::unauthorized(
                "Only owners and admins can list farmhouses",
            ));
        }
        let property = Property {
            id: Uuid::new_v4(),
            owner_id: actor.id,
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            address: draft.address,
            rooms: draft.rooms,
            pricing: draft.pricing,
            cancellation_policy: draft
                .cancellation_policy
                .unwrap_or_else(|| self.default_policy()),
            blocked_dates: Vec::new(),
            approval_status: ApprovalStatus::Pending,
            approval_details: None,
            is_active: true,
            ratings: Ratings::default(),
            created_at: self.clock.now(),
        };
        validate_listing(&property)?;

        self.repos.properties.save_property(property.clone()).await?;
        tracing::info!(property_id = %property.id, owner_id = %actor.id, "Farmhouse submitted for approval");
        Ok(property)
    }

    pub async fn update_property(
        &self,
        actor: &User,
        id: PropertyId,
        patch: PropertyPatch,
    ) -> Result<Property> {
        let _guard = self.write_lock.lock().await;
        let mut property = self.load(id).await?;
        ensure_manages(actor, &property)?;

        if let Some(name) = patch.name {
            property.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            property.description = description.trim().to_string();
        }
        if let Some(address) = patch.address {
            property.address = address;
        }
        if let Some(rooms) = patch.rooms {
            property.rooms = rooms;
        }
        if let Some(pricing) = patch.pricing {
            property.pricing = pricing;
        }
        if let Some(policy) = patch.cancellation_policy {
            property.cancellation_policy = policy;
        }
        validate_listing(&property)?;

        self.store(property.clone()).await?;
        tracing::info!(property_id = %id, "Farmhouse updated");
        Ok(property)
    }

    pub async fn delete_property(&self, actor: &User, id: PropertyId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let property = self.load(id).await?;
        ensure_manages(actor, &property)?;
        self.repos.properties.delete_property(id).await?;
        self.cache.invalidate(&cache_key(id));
        tracing::info!(property_id = %id, "Farmhouse deleted");
        Ok(())
    }

    pub async fn approve(&self, admin: &User, id: PropertyId, notes: String) -> Result<Property> {
        ensure_admin(admin)?;
        let _guard = self.write_lock.lock().await;
        let mut property = self.load(id).await?;
        property.approve(admin.id, notes, self.clock.now())?;
        self.store(property.clone()).await?;
        tracing::info!(property_id = %id, admin_id = %admin.id, "Farmhouse approved");
        Ok(property)
    }

    pub async fn reject(
        &self,
        admin: &User,
        id: PropertyId,
        reason: String,
        notes: String,
    ) -> Result<Property> {
        ensure_admin(admin)?;
        let _guard = self.write_lock.lock().await;
        let mut property = self.load(id).await?;
        property.reject(admin.id, reason, notes, self.clock.now())?;
        self.store(property.clone()).await?;
        tracing::info!(property_id = %id, admin_id = %admin.id, "Farmhouse rejected");
        Ok(property)
    }

    /// Admin moderation queue, oldest submission first.
    pub async fn pending_properties(
        &self,
        admin: &User,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Property>> {
        ensure_admin(admin)?;
        let mut pending: Vec<Property> = self
            .repos
            .properties
            .list_properties()
            .await?
            .into_iter()
            .filter(|p| p.approval_status == ApprovalStatus::Pending)
            .collect();
        pending.sort_by_key(|p| p.created_at);
        Ok(Page::paginate(
            pending,
            page,
            page_limit(&self.listing, limit),
        ))
    }

    /// Public search over listed farmhouses, newest first.
    pub async fn search(
        &self,
        filter: &PropertyFilter,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<Property>> {
        filter.validate()?;
        let mut found: Vec<Property> = self
            .repos
            .properties
            .list_properties()
            .await?
            .into_iter()
            .filter(|p| p.is_listed() && filter.matches(p))
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::paginate(found, page, page_limit(&self.listing, limit)))
    }

    /// Look up one farmhouse.
    ///
    /// Anonymous callers and guests only see listed farmhouses; the owner and
    /// admins see every state. Listed farmhouses are served from the cache.
    pub async fn get_property(&self, actor: Option<&User>, id: PropertyId) -> Result<Property> {
        let key = cache_key(id);
        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_str::<Property>(&cached) {
                Ok(property) => return Ok(property),
                Err(e) => {
                    tracing::warn!(property_id = %id, error = %e, "Dropping unreadable cache entry");
                    self.cache.invalidate(&key);
                }
            }
        }

        // a writer must not slip between this read and the cache fill
        let property = {
            let _guard = self.write_lock.lock().await;
            let property = self.load(id).await?;
            if property.is_listed() {
                match serde_json::to_string(&property) {
                    Ok(json) => self.cache.set(&key, &json, self.cache_ttl),
                    Err(e) => {
                        tracing::warn!(property_id = %id, error = %e, "Failed to cache farmhouse");
                    }
                }
            }
            property
        };
        if property.is_listed() {
            return Ok(property);
        }

        let privileged = actor.is_some_and(|a| a.is_admin() || a.id == property.owner_id);
        if privileged {
            Ok(property)
        } else {
            Err(BookingError::not_found("Farmhouse", id))
        }
    }

    pub async fn owner_properties(&self, owner: &User) -> Result<Vec<Property>> {
        let mut properties = self.repos.properties.properties_by_owner(owner.id).await?;
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    pub async fn blocked_dates(&self, id: PropertyId) -> Result<Vec<BlockedDate>> {
        Ok(self.load(id).await?.blocked_dates)
    }

    /// Block or unblock calendar days. Returns how many days changed along
    /// with the resulting blocked set.
    pub async fn update_blocked_dates(
        &self,
        actor: &User,
        id: PropertyId,
        dates: &[NaiveDate],
        action: BlockAction,
    ) -> Result<(usize, Vec<BlockedDate>)> {
        if dates.is_empty() {
            return Err(BookingError::validation("At least one date is required"));
        }
        let _guard = self.write_lock.lock().await;
        let mut property = self.load(id).await?;
        ensure_manages(actor, &property)?;

        let changed = match action {
            BlockAction::Block => property.block_dates(dates, actor.id, self.clock.now()),
            BlockAction::Unblock => property.unblock_dates(dates),
        };
        let blocked = property.blocked_dates.clone();
        if changed > 0 {
            self.store(property).await?;
        }
        tracing::info!(property_id = %id, ?action, changed, "Blocked dates updated");
        Ok((changed, blocked))
    }

    /// Rebuild a farmhouse's rating from its reviewed bookings.
    pub async fn recompute_rating(&self, id: PropertyId) -> Result<Ratings> {
        let _guard = self.write_lock.lock().await;
        let bookings = self.repos.bookings.bookings_for_property(id).await?;
        let mut property = self.load(id).await?;
        property.ratings = rating::aggregate(id, &bookings);
        let ratings = property.ratings;
        self.store(property).await?;
        tracing::debug!(property_id = %id, average = ratings.average, count = ratings.count, "Rating recomputed");
        Ok(ratings)
    }

    pub async fn owner_rating_summary(&self, owner: &User) -> Result<OwnerRatingSummary> {
        let properties = self.repos.properties.properties_by_owner(owner.id).await?;
        let mut bookings = Vec::new();
        for property in &properties {
            bookings.extend(self.repos.bookings.bookings_for_property(property.id).await?);
        }
        Ok(rating::owner_summary(&properties, &bookings))
    }

    /// Fetch a farmhouse regardless of its approval state.
    pub async fn load(&self, id: PropertyId) -> Result<Property> {
        self.repos
            .properties
            .get_property(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Farmhouse", id))
    }

    /// Cancellation policy of a farmhouse, or the configured default when the
    /// listing is gone.
    pub async fn policy_for(&self, id: PropertyId) -> Result<CancellationPolicy> {
        Ok(self
            .repos
            .properties
            .get_property(id)
            .await?
            .map_or_else(|| self.default_policy(), |p| p.cancellation_policy))
    }

    fn default_policy(&self) -> CancellationPolicy {
        CancellationPolicy {
            free_cancellation: true,
            free_cancellation_days: self.policy.free_cancellation_days,
            partial_refund_days: self.policy.partial_refund_days,
        }
    }

    async fn store(&self, property: Property) -> Result<()> {
        let id = property.id;
        self.repos.properties.save_property(property).await?;
        self.cache.invalidate(&cache_key(id));
        Ok(())
    }
}

impl std::fmt::Debug for PropertyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyService").finish()
    }
}

fn cache_key(id: PropertyId) -> String {
    format!("property:{id}")
}

fn ensure_admin(actor: &User) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(BookingError::unauthorized("Admin access required"))
    }
}

fn ensure_manages(actor: &User, property: &Property) -> Result<()> {
    if actor.is_admin() || actor.id == property.owner_id {
        Ok(())
    } else {
        Err(BookingError::unauthorized(
            "Not authorized to manage this farmhouse",
        ))
    }
}

fn validate_listing(property: &Property) -> Result<()> {
    let name_len = property.name.chars().count();
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(BookingError::validation(format!(
            "Name is required and cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    let description_len = property.description.chars().count();
    if description_len == 0 || description_len > MAX_DESCRIPTION_LEN {
        return Err(BookingError::validation(format!(
            "Description is required and cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    if property.address.city.trim().is_empty() || property.address.state.trim().is_empty() {
        return Err(BookingError::validation("City and state are required"));
    }
    if !(property.pricing.base_price.is_finite() && property.pricing.base_price > 0.0) {
        return Err(BookingError::validation("Base price must be greater than 0"));
    }
    for fee in [property.pricing.cleaning_fee, property.pricing.security_deposit] {
        if !(fee.is_finite() && fee >= 0.0) {
            return Err(BookingError::validation("Fees cannot be negative"));
        }
    }
    if property.rooms.is_empty() {
        return Err(BookingError::validation("At least one room is required"));
    }
    for room in &property.rooms {
        if room.name.trim().is_empty() {
            return Err(BookingError::validation("Room name is required"));
        }
        if room.capacity < 1 {
            return Err(BookingError::validation(format!(
                "Room '{}' must sleep at least one guest",
                room.name
            )));
        }
        if !(room.price_per_night.is_finite() && room.price_per_night >= 0.0) {
            return Err(BookingError::validation(format!(
                "Room '{}' price cannot be negative",
                room.name
            )));
        }
    }
    let policy = &property.cancellation_policy;
    if policy.partial_refund_days < 0 || policy.partial_refund_days > policy.free_cancellation_days
    {
        return Err(BookingError::validation(
            "Partial refund days must be between 0 and the free cancellation days",
        ));
    }
    Ok(())
}

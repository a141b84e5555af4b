use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::booking::{Booking, BookingId};
use crate::domain::property::{Property, PropertyId, RoomKind};
use crate::domain::user::{User, UserId};
use crate::error::{BookingError, Result};
use crate::ports::repository::{BookingRepository, PropertyRepository, UserRepository};

/// Startup data for the in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

impl SeedData {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// All three collections behind async read/write locks.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    properties: RwLock<HashMap<PropertyId, Property>>,
    bookings: RwLock<HashMap<BookingId, Booking>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: SeedData) -> Self {
        Self {
            users: RwLock::new(seed.users.into_iter().map(|u| (u.id, u)).collect()),
            properties: RwLock::new(seed.properties.into_iter().map(|p| (p.id, p)).collect()),
            bookings: RwLock::new(seed.bookings.into_iter().map(|b| (b.id, b)).collect()),
        }
    }

    pub async fn put_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn put_property(&self, property: Property) {
        self.properties.write().await.insert(property.id, property);
    }

    pub async fn put_booking(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id, booking);
    }

    /// Counts of users, properties and bookings.
    pub async fn counts(&self) -> (usize, usize, usize) {
        (
            self.users.read().await.len(),
            self.properties.read().await.len(),
            self.bookings.read().await.len(),
        )
    }

    async fn collect_bookings(&self, keep: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        self.bookings
            .read()
            .await
            .values()
            .filter(|b| keep(b))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn save_user(&self, user: User) -> Result<()> {
        self.put_user(user).await;
        Ok(())
    }
}

#[async_trait]
impl PropertyRepository for InMemoryStore {
    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>> {
        Ok(self.properties.read().await.get(&id).cloned())
    }

    async fn save_property(&self, property: Property) -> Result<()> {
        self.put_property(property).await;
        Ok(())
    }

    async fn delete_property(&self, id: PropertyId) -> Result<bool> {
        Ok(self.properties.write().await.remove(&id).is_some())
    }

    async fn list_properties(&self) -> Result<Vec<Property>> {
        Ok(self.properties.read().await.values().cloned().collect())
    }

    async fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>> {
        Ok(self
            .properties
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn insert_booking(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(BookingError::Storage(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn save_booking(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking;
                Ok(())
            }
            None => Err(BookingError::not_found("Booking", booking.id)),
        }
    }

    async fn bookings_for_room(
        &self,
        property: PropertyId,
        kind: RoomKind,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .collect_bookings(|b| b.property_id == property && b.room.kind == kind)
            .await)
    }

    async fn bookings_for_property(&self, property: PropertyId) -> Result<Vec<Booking>> {
        Ok(self.collect_bookings(|b| b.property_id == property).await)
    }

    async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>> {
        Ok(self.collect_bookings(|b| b.user_id == user).await)
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        Ok(self.collect_bookings(|_| true).await)
    }
}

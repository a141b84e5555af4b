use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::booking::{Booking, BookingId};
use crate::domain::property::{Property, PropertyId, RoomKind};
use crate::domain::user::{User, UserId};
use crate::error::Result;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    async fn save_user(&self, user: User) -> Result<()>;
}

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>>;
    /// Insert or replace.
    async fn save_property(&self, property: Property) -> Result<()>;
    async fn delete_property(&self, id: PropertyId) -> Result<bool>;
    async fn list_properties(&self) -> Result<Vec<Property>>;
    async fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn insert_booking(&self, booking: Booking) -> Result<()>;
    /// Replace an existing booking; errors if it does not exist.
    async fn save_booking(&self, booking: Booking) -> Result<()>;
    async fn bookings_for_room(&self, property: PropertyId, kind: RoomKind)
    -> Result<Vec<Booking>>;
    async fn bookings_for_property(&self, property: PropertyId) -> Result<Vec<Booking>>;
    async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>>;
    async fn all_bookings(&self) -> Result<Vec<Booking>>;
}

/// The three document collections, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + PropertyRepository + BookingRepository + 'static,
    {
        Self {
            users: store.clone(),
            properties: store.clone(),
            bookings: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish()
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::adapters::cache::memory_cache::MemoryCache;
use crate::adapters::memory::store::InMemoryStore;
use crate::config::types::Config;
use crate::domain::booking::{
    Booking, BookingId, BookingStatus, ContactInfo, Guests, Payment, RoomSnapshot,
};
use crate::domain::pricing::compute_pricing;
use crate::domain::property::{
    Address, ApprovalStatus, CancellationPolicy, Property, PropertyId, PropertyPricing, Ratings,
    Room, RoomKind,
};
use crate::domain::user::{Role, User, UserId};
use crate::ports::clock::ManualClock;
use crate::error::Result;
use crate::ports::repository::{BookingRepository, PropertyRepository, Repositories};
use crate::service::Services;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Midnight UTC.
pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    day(y, m, d).and_time(NaiveTime::MIN).and_utc()
}

pub fn make_user(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("{role} {}", &id.simple().to_string()[..6]),
        email: format!("{}@example.com", id.simple()),
        phone: "+91 98200 00000".into(),
        role,
    }
}

/// An approved, active farmhouse with a single and a double room.
pub fn make_property(owner_id: UserId) -> Property {
    Property {
        id: Uuid::new_v4(),
        owner_id,
        name: "Green Acres Farmhouse".into(),
        description: "Quiet farm stay with a mango orchard and a pool".into(),
        address: Address {
            street: "Old Mumbai-Pune Highway".into(),
            city: "Lonavala".into(),
            state: "Maharashtra".into(),
            zip_code: "410401".into(),
            country: "India".into(),
        },
        rooms: vec![
            Room {
                kind: RoomKind::Single,
                name: "Cozy Single".into(),
                capacity: 1,
                price_per_night: 1000.0,
                description: None,
                is_available: true,
            },
            Room {
                kind: RoomKind::Double,
                name: "Garden Double".into(),
                capacity: 2,
                price_per_night: 1500.0,
                description: Some("Opens onto the lawn".into()),
                is_available: true,
            },
        ],
        pricing: PropertyPricing {
            base_price: 200.0,
            weekend_multiplier: 1.2,
            holiday_multiplier: 1.5,
            cleaning_fee: 300.0,
            security_deposit: 500.0,
        },
        cancellation_policy: CancellationPolicy::default(),
        blocked_dates: Vec::new(),
        approval_status: ApprovalStatus::Approved,
        approval_details: None,
        is_active: true,
        ratings: Ratings::default(),
        created_at: at(2023, 12, 1),
    }
}

pub fn make_booking(
    property: &Property,
    user_id: UserId,
    kind: RoomKind,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    status: BookingStatus,
) -> Booking {
    let room = property
        .rooms
        .iter()
        .find(|r| r.kind == kind)
        .expect("fixture property has this room kind");
    Booking {
        id: Uuid::new_v4(),
        user_id,
        property_id: property.id,
        room: RoomSnapshot::from(room),
        check_in,
        check_out,
        guests: Guests {
            adults: 1,
            children: 0,
            infants: 0,
        },
        pricing: compute_pricing(room, property, check_in, check_out),
        status,
        payment: Payment::default(),
        special_requests: None,
        contact: ContactInfo {
            name: "Guest".into(),
            email: "guest@example.com".into(),
            phone: "+91 90000 00000".into(),
            alternate_phone: None,
        },
        cancellation: None,
        review: None,
        hidden_from_user: false,
        hidden_from_user_at: None,
        hidden_from_owner: false,
        hidden_from_owner_at: None,
        created_at: check_in - chrono::TimeDelta::days(30),
    }
}

/// Services over an empty in-memory store with a manual clock.
pub struct TestEnv {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl TestEnv {
    pub fn new(now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::over(Repositories::from_store(store.clone()), store, now)
    }

    /// Like `new`, but property and booking reads go through a
    /// [`HeldReads`] wrapper the test can stall.
    pub fn with_held_reads(now: DateTime<Utc>) -> (Self, Arc<HeldReads>) {
        let store = Arc::new(InMemoryStore::new());
        let held = Arc::new(HeldReads::new(store.clone(), Duration::from_millis(200)));
        let repos = Repositories {
            users: store.clone(),
            properties: held.clone(),
            bookings: held.clone(),
        };
        (Self::over(repos, store, now), held)
    }

    fn over(repos: Repositories, store: Arc<InMemoryStore>, now: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let services = Services::new(
            repos,
            Arc::new(MemoryCache::new(16)),
            clock.clone(),
            &Config::default(),
        );
        Self {
            store,
            clock,
            services,
        }
    }

    pub async fn add_user(&self, role: Role) -> User {
        let user = make_user(role);
        self.store.put_user(user.clone()).await;
        user
    }

    pub async fn add_property(&self, owner: &User) -> Property {
        let property = make_property(owner.id);
        self.store.put_property(property.clone()).await;
        property
    }

    pub async fn add_booking(&self, booking: Booking) -> Booking {
        self.store.put_booking(booking.clone()).await;
        booking
    }
}

/// Store wrapper whose next armed read takes its snapshot, then waits
/// `pause` before handing it back. Lets a test land a write in between.
pub struct HeldReads {
    inner: Arc<InMemoryStore>,
    pause: Duration,
    hold_property: AtomicBool,
    hold_property_bookings: AtomicBool,
}

impl HeldReads {
    pub fn new(inner: Arc<InMemoryStore>, pause: Duration) -> Self {
        Self {
            inner,
            pause,
            hold_property: AtomicBool::new(false),
            hold_property_bookings: AtomicBool::new(false),
        }
    }

    /// Stall the next `get_property`.
    pub fn hold_next_property_read(&self) {
        self.hold_property.store(true, Ordering::SeqCst);
    }

    /// Stall the next `bookings_for_property`.
    pub fn hold_next_property_bookings_read(&self) {
        self.hold_property_bookings.store(true, Ordering::SeqCst);
    }

    async fn maybe_pause(&self, flag: &AtomicBool) {
        if flag.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.pause).await;
        }
    }
}

#[async_trait]
impl PropertyRepository for HeldReads {
    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>> {
        let snapshot = self.inner.get_property(id).await?;
        self.maybe_pause(&self.hold_property).await;
        Ok(snapshot)
    }

    async fn save_property(&self, property: Property) -> Result<()> {
        self.inner.save_property(property).await
    }

    async fn delete_property(&self, id: PropertyId) -> Result<bool> {
        self.inner.delete_property(id).await
    }

    async fn list_properties(&self) -> Result<Vec<Property>> {
        self.inner.list_properties().await
    }

    async fn properties_by_owner(&self, owner: UserId) -> Result<Vec<Property>> {
        self.inner.properties_by_owner(owner).await
    }
}

#[async_trait]
impl BookingRepository for HeldReads {
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn insert_booking(&self, booking: Booking) -> Result<()> {
        self.inner.insert_booking(booking).await
    }

    async fn save_booking(&self, booking: Booking) -> Result<()> {
        self.inner.save_booking(booking).await
    }

    async fn bookings_for_room(
        &self,
        property: PropertyId,
        kind: RoomKind,
    ) -> Result<Vec<Booking>> {
        self.inner.bookings_for_room(property, kind).await
    }

    async fn bookings_for_property(&self, property: PropertyId) -> Result<Vec<Booking>> {
        let snapshot = self.inner.bookings_for_property(property).await?;
        self.maybe_pause(&self.hold_property_bookings).await;
        Ok(snapshot)
    }

    async fn bookings_for_user(&self, user: UserId) -> Result<Vec<Booking>> {
        self.inner.bookings_for_user(user).await
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        self.inner.all_bookings().await
    }
}

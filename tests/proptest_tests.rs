#![allow(clippy::cast_possible_truncation, clippy::float_cmp)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use farmstay_booking::adapters::cache::memory_cache::MemoryCache;
use farmstay_booking::adapters::memory::store::InMemoryStore;
use farmstay_booking::config::types::Config;
use farmstay_booking::domain::booking::{
    Booking, BookingStatus, ContactInfo, Guests, Payment, Review, RoomSnapshot,
};
use farmstay_booking::domain::calendar::ranges_overlap;
use farmstay_booking::domain::page::Page;
use farmstay_booking::domain::pricing::{TAX_RATE, compute_pricing};
use farmstay_booking::domain::property::{
    Address, ApprovalStatus, CancellationPolicy, Property, PropertyPricing, Ratings, Room,
    RoomKind,
};
use farmstay_booking::domain::rating::aggregate;
use farmstay_booking::domain::refund::{RefundTier, compute_refund};
use farmstay_booking::domain::user::{Role, User};
use farmstay_booking::error::BookingError;
use farmstay_booking::ports::cache::PropertyCache;
use farmstay_booking::ports::clock::ManualClock;
use farmstay_booking::ports::repository::Repositories;
use farmstay_booking::service::Services;
use farmstay_booking::service::booking_service::{BookingRequest, ContactOverrides};

// ---------------------------------------------------------------------------
// Fixtures and strategies
// ---------------------------------------------------------------------------

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn property(room: Room, pricing: PropertyPricing) -> Property {
    Property {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        name: "Prop Farm".into(),
        description: String::new(),
        address: Address {
            city: "Karjat".into(),
            state: "Maharashtra".into(),
            ..Address::default()
        },
        rooms: vec![room],
        pricing,
        cancellation_policy: CancellationPolicy::default(),
        blocked_dates: Vec::new(),
        approval_status: ApprovalStatus::Approved,
        approval_details: None,
        is_active: true,
        ratings: Ratings::default(),
        created_at: epoch(),
    }
}

fn booking(
    property_id: Uuid,
    check_in: DateTime<Utc>,
    status: BookingStatus,
    rating: Option<u8>,
) -> Booking {
    let room = Room {
        kind: RoomKind::Suite,
        name: "Hill Suite".into(),
        capacity: 3,
        price_per_night: 2500.0,
        description: None,
        is_available: true,
    };
    let stay = property(room.clone(), pricing(800.0, 250.0, 1000.0));
    let check_out = check_in + TimeDelta::days(2);
    Booking {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        property_id,
        room: RoomSnapshot::from(&room),
        check_in,
        check_out,
        guests: Guests {
            adults: 2,
            children: 0,
            infants: 0,
        },
        pricing: compute_pricing(&room, &stay, check_in, check_out),
        status,
        payment: Payment::default(),
        special_requests: None,
        contact: ContactInfo {
            name: "Guest".into(),
            email: "guest@example.com".into(),
            phone: String::new(),
            alternate_phone: None,
        },
        cancellation: None,
        review: rating.map(|rating| Review {
            rating,
            comment: String::new(),
            created_at: check_out,
            is_visible: true,
        }),
        hidden_from_user: false,
        hidden_from_user_at: None,
        hidden_from_owner: false,
        hidden_from_owner_at: None,
        created_at: check_in - TimeDelta::days(30),
    }
}

fn pricing(base_price: f64, cleaning_fee: f64, security_deposit: f64) -> PropertyPricing {
    PropertyPricing {
        base_price,
        weekend_multiplier: 1.2,
        holiday_multiplier: 1.5,
        cleaning_fee,
        security_deposit,
    }
}

fn arb_room() -> impl Strategy<Value = Room> {
    (1..10_u32, 0.0..20_000.0_f64).prop_map(|(capacity, price)| Room {
        kind: RoomKind::Family,
        name: "Family Room".into(),
        capacity,
        price_per_night: price,
        description: None,
        is_available: true,
    })
}

fn arb_pricing() -> impl Strategy<Value = PropertyPricing> {
    (1.0..5000.0_f64, 0.0..2000.0_f64, 0.0..10_000.0_f64)
        .prop_map(|(base, cleaning, deposit)| pricing(base, cleaning, deposit))
}

/// Instant within a year of the epoch, at minute resolution.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0..525_600_i64).prop_map(|minutes| epoch() + TimeDelta::minutes(minutes))
}

fn arb_status() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Confirmed),
        Just(BookingStatus::Cancelled),
        Just(BookingStatus::Completed),
        Just(BookingStatus::Rejected),
    ]
}

fn arb_policy() -> impl Strategy<Value = CancellationPolicy> {
    (0..10_i64, 0..20_i64).prop_map(|(partial, extra)| CancellationPolicy {
        free_cancellation: true,
        free_cancellation_days: partial + extra,
        partial_refund_days: partial,
    })
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn total_is_sum_of_parts(
        room in arb_room(),
        pricing in arb_pricing(),
        check_in in arb_instant(),
        stay_minutes in 1..(30 * 24 * 60_i64),
    ) {
        let stay = property(room.clone(), pricing);
        let check_out = check_in + TimeDelta::minutes(stay_minutes);
        let p = compute_pricing(&room, &stay, check_in, check_out);

        prop_assert!(p.total_nights >= 1);
        prop_assert!(p.total_nights * 24 * 60 >= stay_minutes);
        prop_assert!((p.taxes - (p.base_price + p.cleaning_fee) * TAX_RATE).abs() < 1e-6);
        let sum = p.base_price + p.cleaning_fee + p.security_deposit + p.taxes;
        prop_assert!((p.total_amount - sum).abs() < 1e-6);
        prop_assert!(p.total_amount >= p.security_deposit);
    }
}

// ---------------------------------------------------------------------------
// Refund tiers
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn refund_never_grows_as_check_in_nears(
        policy in arb_policy(),
        check_in in arb_instant(),
        earlier in 0..(60 * 24 * 60_i64),
        later in 0..(60 * 24 * 60_i64),
    ) {
        let (far, near) = (earlier.max(later), earlier.min(later));
        let b = booking(Uuid::new_v4(), check_in, BookingStatus::Confirmed, None);

        let early = compute_refund(&b, &policy, check_in - TimeDelta::minutes(far)).unwrap();
        let late = compute_refund(&b, &policy, check_in - TimeDelta::minutes(near)).unwrap();
        prop_assert!(early.amount >= late.amount);

        let total = b.pricing.total_amount;
        for quote in [early, late] {
            let expected = match quote.tier {
                RefundTier::Full => total,
                RefundTier::Half => total * 0.5,
                RefundTier::None => 0.0,
            };
            prop_assert_eq!(quote.amount, expected);
        }
    }

    #[test]
    fn terminal_bookings_have_no_refund_quote(
        status in arb_status(),
        check_in in arb_instant(),
    ) {
        let b = booking(Uuid::new_v4(), check_in, status, None);
        let quote = compute_refund(&b, &CancellationPolicy::default(), epoch());
        prop_assert_eq!(quote.is_ok(), status.holds_calendar());
    }
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlap_is_symmetric(
        a in arb_instant(),
        a_len in 1..10_000_i64,
        b in arb_instant(),
        b_len in 1..10_000_i64,
    ) {
        let (a_end, b_end) = (a + TimeDelta::minutes(a_len), b + TimeDelta::minutes(b_len));
        prop_assert_eq!(ranges_overlap(a, a_end, b, b_end), ranges_overlap(b, b_end, a, a_end));
    }

    #[test]
    fn back_to_back_stays_do_not_overlap(
        start in arb_instant(),
        first in 1..10_000_i64,
        second in 1..10_000_i64,
    ) {
        let turnover = start + TimeDelta::minutes(first);
        let end = turnover + TimeDelta::minutes(second);
        prop_assert!(!ranges_overlap(start, turnover, turnover, end));
        prop_assert!(ranges_overlap(start, turnover, turnover - TimeDelta::minutes(1), end));
    }
}

// ---------------------------------------------------------------------------
// Booking service
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn accepted_stays_never_share_a_night(
        stays in prop::collection::vec((0..60_i64, 1..8_i64), 1..25),
    ) {
        let outcome: Vec<(DateTime<Utc>, DateTime<Utc>)> = tokio_test::block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let guest = User {
                id: Uuid::new_v4(),
                name: "Guest".into(),
                email: "guest@example.com".into(),
                phone: String::new(),
                role: Role::User,
            };
            store.put_user(guest.clone()).await;
            let room = Room {
                kind: RoomKind::Double,
                name: "Loft Double".into(),
                capacity: 2,
                price_per_night: 1500.0,
                description: None,
                is_available: true,
            };
            let farm = property(room, pricing(500.0, 200.0, 0.0));
            let property_id = farm.id;
            store.put_property(farm).await;

            let services = Services::new(
                Repositories::from_store(Arc::clone(&store)),
                Arc::new(MemoryCache::new(8)),
                Arc::new(ManualClock::new(epoch())),
                &Config::default(),
            );

            let mut accepted = Vec::new();
            for &(offset, nights) in &stays {
                let check_in = epoch() + TimeDelta::days(30 + offset);
                let request = BookingRequest {
                    property_id,
                    room_type: "double".into(),
                    check_in,
                    check_out: check_in + TimeDelta::days(nights),
                    guests: Guests { adults: 1, children: 0, infants: 0 },
                    special_requests: None,
                    contact: ContactOverrides::default(),
                };
                match services.bookings.create(&guest, request).await {
                    Ok(b) => accepted.push((b.check_in, b.check_out)),
                    Err(BookingError::Conflict { .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            accepted
        });

        prop_assert!(!outcome.is_empty());
        for (i, a) in outcome.iter().enumerate() {
            for b in &outcome[i + 1..] {
                prop_assert!(!ranges_overlap(a.0, a.1, b.0, b.1));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn rating_is_bounded_and_order_independent(
        entries in prop::collection::vec((arb_status(), prop::option::of(1..=5_u8)), 0..30),
    ) {
        let property_id = Uuid::new_v4();
        let mut bookings: Vec<Booking> = entries
            .iter()
            .map(|&(status, rating)| booking(property_id, epoch(), status, rating))
            .collect();
        // a review on another farmhouse never counts
        bookings.push(booking(Uuid::new_v4(), epoch(), BookingStatus::Completed, Some(1)));

        let ratings = aggregate(property_id, &bookings);
        let counted = entries
            .iter()
            .filter(|(status, rating)| *status == BookingStatus::Completed && rating.is_some())
            .count();
        prop_assert_eq!(ratings.count as usize, counted);
        if counted == 0 {
            prop_assert_eq!(ratings.average, 0.0);
        } else {
            prop_assert!((1.0..=5.0).contains(&ratings.average));
        }

        bookings.reverse();
        prop_assert_eq!(aggregate(property_id, &bookings), ratings);
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn pages_partition_the_listing(len in 0..200_usize, limit in 1..50_usize) {
        let items: Vec<usize> = (0..len).collect();
        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let p = Page::paginate(items.clone(), page, limit);
            prop_assert_eq!(p.total, len);
            prop_assert!(p.items.len() <= limit);
            seen.extend(p.items.iter().copied());
            if !p.has_next() {
                break;
            }
            page += 1;
        }
        prop_assert_eq!(seen, items);
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cache_returns_what_was_stored(
        entries in prop::collection::hash_map("[a-z0-9-]{1,36}", ".{0,64}", 1..20),
    ) {
        let cache = MemoryCache::new(entries.len());
        for (key, value) in &entries {
            cache.set(key, value, Duration::from_secs(60));
        }
        for (key, value) in &entries {
            prop_assert_eq!(cache.get(key), Some(value.clone()));
        }
        if let Some(key) = entries.keys().next() {
            cache.invalidate(key);
            prop_assert_eq!(cache.get(key), None);
        }
    }
}

pub mod booking_service;
pub mod property_service;

use std::sync::Arc;

use crate::config::types::{Config, ListingConfig};
use crate::ports::cache::PropertyCache;
use crate::ports::clock::Clock;
use crate::ports::repository::Repositories;

use booking_service::BookingService;
use property_service::PropertyService;

/// Both services wired over the same repositories, cache and clock.
#[derive(Clone)]
pub struct Services {
    pub properties: Arc<PropertyService>,
    pub bookings: Arc<BookingService>,
}

impl Services {
    pub fn new(
        repos: Repositories,
        cache: Arc<dyn PropertyCache>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let properties = Arc::new(PropertyService::new(
            repos.clone(),
            cache,
            Arc::clone(&clock),
            config,
        ));
        let bookings = Arc::new(BookingService::new(
            repos,
            Arc::clone(&properties),
            clock,
            config,
        ));
        Self {
            properties,
            bookings,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish()
    }
}

/// Requested page size, defaulted and capped by the listing config.
pub(crate) fn page_limit(listing: &ListingConfig, requested: Option<usize>) -> usize {
    requested
        .unwrap_or(listing.page_size)
        .clamp(1, listing.max_page_size.max(1))
}

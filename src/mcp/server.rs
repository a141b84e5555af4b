use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use lru::LruCache;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus, Guests};
use crate::domain::calendar::parse_stay_date;
use crate::domain::page::Page;
use crate::domain::property::{BlockAction, Property};
use crate::domain::search_params::PropertyFilter;
use crate::domain::user::User;
use crate::error::{self, BookingError};
use crate::ports::identity::IdentityProvider;
use crate::service::Services;
use crate::service::booking_service::{BookingRequest, ContactOverrides};
use crate::service::property_service::PropertyDraft;

// ---------- Resource Store ----------

/// Most resources kept before the least recently touched is dropped.
const MAX_RESOURCES: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Farmhouses and bookings touched by tools, exposed as MCP resources.
/// Keys are URIs like `farmstay://farmhouse/{id}`.
#[derive(Clone)]
pub struct ResourceStore {
    entries: Arc<Mutex<LruCache<String, ResourceEntry>>>,
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::with_capacity(MAX_RESOURCES)
    }
}

impl ResourceStore {
    fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.lock().await.put(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.lock().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect()
    }

    async fn remember_property(&self, property: &Property) {
        self.insert(
            format!("farmstay://farmhouse/{}", property.id),
            format!("Farmhouse: {}", property.name),
            property.to_string(),
        )
        .await;
    }

    async fn remember_booking(&self, booking: &Booking) {
        self.insert(
            format!("farmstay://booking/{}", booking.id),
            format!("Booking: {}", booking.id),
            booking.to_string(),
        )
        .await;
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchToolParams {
    /// Free text matched against name, description, city and state
    pub search: Option<String>,
    /// City filter (case-insensitive substring, e.g. "Lonavala")
    pub city: Option<String>,
    /// State filter (case-insensitive substring, e.g. "Maharashtra")
    pub state: Option<String>,
    /// Minimum farmhouse base price per night
    pub min_price: Option<f64>,
    /// Maximum farmhouse base price per night
    pub max_price: Option<f64>,
    /// Page number, starting at 1
    pub page: Option<usize>,
    /// Results per page
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DetailToolParams {
    /// Farmhouse ID from farmhouse_search
    pub property_id: String,
    /// Caller user ID. Owners and admins can see unapproved farmhouses.
    pub actor_id: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreatePropertyToolParams {
    /// Owner or admin user ID
    pub actor_id: String,
    /// The listing to submit for approval
    pub listing: PropertyDraft,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ApproveToolParams {
    /// Admin user ID
    pub actor_id: String,
    pub property_id: String,
    /// Optional moderation notes
    pub notes: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RejectToolParams {
    /// Admin user ID
    pub actor_id: String,
    pub property_id: String,
    /// Why the listing was rejected (required)
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct BlockedDatesToolParams {
    pub property_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ManageBlockedDatesToolParams {
    /// Farmhouse owner or admin user ID
    pub actor_id: String,
    pub property_id: String,
    /// Days in YYYY-MM-DD format
    pub dates: Vec<String>,
    /// "block" or "unblock"
    pub action: BlockAction,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ReviewsToolParams {
    pub property_id: String,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct StayToolParams {
    pub property_id: String,
    /// Room type (single, double, family, suite, villa) or part of a room name
    pub room_type: String,
    /// Check-in date (YYYY-MM-DD or RFC 3339)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD or RFC 3339), after check-in
    pub check_out: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateBookingToolParams {
    /// Guest user ID
    pub actor_id: String,
    pub property_id: String,
    /// Room type (single, double, family, suite, villa) or part of a room name
    pub room_type: String,
    /// Check-in date (YYYY-MM-DD or RFC 3339)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD or RFC 3339)
    pub check_out: String,
    /// Number of adults (at least 1)
    pub adults: u32,
    pub children: Option<u32>,
    pub infants: Option<u32>,
    /// Up to 500 characters
    pub special_requests: Option<String>,
    /// Contact details; missing fields fall back to the guest's profile
    pub contact: Option<ContactOverrides>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdateStatusToolParams {
    /// Farmhouse owner, admin, or the booking's guest (cancel only)
    pub actor_id: String,
    pub booking_id: String,
    /// confirmed, cancelled, completed or rejected
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CancelBookingToolParams {
    /// The booking's guest
    pub actor_id: String,
    pub booking_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HideFrom {
    /// The guest's booking list
    User,
    /// The owner's booking list
    Owner,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct HideBookingToolParams {
    pub actor_id: String,
    pub booking_id: String,
    /// Which list to remove the booking from
    pub from: HideFrom,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ReviewBookingToolParams {
    /// The booking's guest
    pub actor_id: String,
    pub booking_id: String,
    /// Rating from 1 to 5
    pub rating: i64,
    /// Up to 500 characters
    pub comment: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListBookingsToolParams {
    pub actor_id: String,
    /// Only bookings in this status
    pub status: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct OwnerRatingToolParams {
    /// Owner user ID
    pub actor_id: String,
}

// ---------- MCP Server ----------

#[derive(Clone)]
pub struct FarmstayMcpServer {
    services: Services,
    identity: Arc<dyn IdentityProvider>,
    tool_router: ToolRouter<Self>,
    resources: ResourceStore,
}

#[tool_router]
impl FarmstayMcpServer {
    pub fn new(services: Services, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            services,
            identity,
            tool_router: Self::tool_router(),
            resources: ResourceStore::default(),
        }
    }

    async fn actor(&self, actor_id: &str) -> error::Result<User> {
        self.identity.current_user(actor_id).await
    }

    #[tool(
        name = "farmhouse_search",
        description = "Search approved farmhouses by free text, city, state and base price range. Returns farmhouse IDs for the other tools, newest listings first.",
        annotations(read_only_hint = true)
    )]
    async fn farmhouse_search(
        &self,
        Parameters(params): Parameters<SearchToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let filter = PropertyFilter {
            search: params.search,
            city: params.city,
            state: params.state,
            min_price: params.min_price,
            max_price: params.max_price,
        };
        match self
            .services
            .properties
            .search(&filter, params.page.unwrap_or(1), params.limit)
            .await
        {
            Ok(page) => {
                let mut text = String::new();
                if page.items.is_empty() {
                    text.push_str("No farmhouses found for this search.\n");
                } else {
                    let _ = writeln!(text, "Found {} farmhouses:\n", page.total);
                    for (i, p) in page.items.iter().enumerate() {
                        let _ = write!(
                            text,
                            "{}. **{}** (ID: {})\n   {}, {}\n   {:.0}/night base",
                            i + 1,
                            p.name,
                            p.id,
                            p.address.city,
                            p.address.state,
                            p.pricing.base_price,
                        );
                        if p.ratings.count > 0 {
                            let _ = write!(
                                text,
                                " | Rating: {:.1} ({} reviews)",
                                p.ratings.average, p.ratings.count
                            );
                        }
                        let _ = writeln!(text, " | Rooms: {}\n", p.room_types());
                    }
                    write_page_footer(&mut text, &page);
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(tool_error(
                "Search failed",
                &e,
                "Try removing the price filters or check the city spelling.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_details",
        description = "Get a farmhouse's full details: address, rooms with capacity and nightly price, fees, cancellation policy, rating and blocked dates.",
        annotations(read_only_hint = true)
    )]
    async fn farmhouse_details(
        &self,
        Parameters(params): Parameters<DetailToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let id = parse_id(&params.property_id, "farmhouse")?;
            let actor = match params.actor_id.as_deref() {
                Some(raw) => Some(self.actor(raw).await?),
                None => None,
            };
            self.services
                .properties
                .get_property(actor.as_ref(), id)
                .await
        }
        .await;
        match result {
            Ok(property) => {
                self.resources.remember_property(&property).await;
                Ok(CallToolResult::success(vec![Content::text(
                    property.to_string(),
                )]))
            }
            Err(e) => Ok(tool_error(
                &format!("Failed to get farmhouse '{}'", params.property_id),
                &e,
                "Use farmhouse_search to find valid IDs.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_create",
        description = "Submit a new farmhouse listing as an owner. The listing starts pending until an admin approves it.",
        annotations(read_only_hint = false, destructive_hint = false)
    )]
    async fn farmhouse_create(
        &self,
        Parameters(params): Parameters<CreatePropertyToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            self.services
                .properties
                .create_property(&actor, params.listing)
                .await
        }
        .await;
        match result {
            Ok(property) => {
                self.resources.remember_property(&property).await;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Farmhouse submitted for approval.\n\n{property}"
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to create farmhouse",
                &e,
                "A listing needs a name, description, city, state, a positive base price and at least one room.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_approve",
        description = "Admin only: approve a pending farmhouse so it appears in search and accepts bookings.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false)
    )]
    async fn farmhouse_approve(
        &self,
        Parameters(params): Parameters<ApproveToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.property_id, "farmhouse")?;
            self.services
                .properties
                .approve(&actor, id, params.notes.unwrap_or_default())
                .await
        }
        .await;
        match result {
            Ok(property) => {
                self.resources.remember_property(&property).await;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Farmhouse '{}' approved.",
                    property.name
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to approve farmhouse",
                &e,
                "Only pending farmhouses can be approved, and only by an admin.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_reject",
        description = "Admin only: reject a pending farmhouse with a reason. The listing is deactivated.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn farmhouse_reject(
        &self,
        Parameters(params): Parameters<RejectToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.property_id, "farmhouse")?;
            self.services
                .properties
                .reject(&actor, id, params.reason, params.notes.unwrap_or_default())
                .await
        }
        .await;
        match result {
            Ok(property) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Farmhouse '{}' rejected.",
                property.name
            ))])),
            Err(e) => Ok(tool_error(
                "Failed to reject farmhouse",
                &e,
                "Only pending farmhouses can be rejected, and a reason is required.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_blocked_dates",
        description = "List the days an owner has blocked on a farmhouse calendar.",
        annotations(read_only_hint = true)
    )]
    async fn farmhouse_blocked_dates(
        &self,
        Parameters(params): Parameters<BlockedDatesToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let id = parse_id(&params.property_id, "farmhouse")?;
            self.services.properties.blocked_dates(id).await
        }
        .await;
        match result {
            Ok(blocked) if blocked.is_empty() => Ok(CallToolResult::success(vec![
                Content::text("No blocked dates."),
            ])),
            Ok(blocked) => {
                let mut text = format!("{} blocked dates:\n", blocked.len());
                for b in &blocked {
                    let _ = writeln!(text, "- {} ({})", b.date, b.reason);
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(tool_error(
                "Failed to get blocked dates",
                &e,
                "Use farmhouse_search to find valid IDs.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_manage_blocked_dates",
        description = "Owner or admin: block or unblock calendar days on a farmhouse. Blocked days cannot be booked.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = true)
    )]
    async fn farmhouse_manage_blocked_dates(
        &self,
        Parameters(params): Parameters<ManageBlockedDatesToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.property_id, "farmhouse")?;
            let days = params
                .dates
                .iter()
                .map(|raw| parse_stay_date(raw).map(|d| d.date_naive()))
                .collect::<error::Result<Vec<_>>>()?;
            self.services
                .properties
                .update_blocked_dates(&actor, id, &days, params.action)
                .await
        }
        .await;
        match result {
            Ok((changed, blocked)) => {
                let verb = match params.action {
                    BlockAction::Block => "Blocked",
                    BlockAction::Unblock => "Unblocked",
                };
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "{verb} {changed} dates. {} dates are now blocked.",
                    blocked.len()
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to update blocked dates",
                &e,
                "Dates use YYYY-MM-DD and only the farmhouse owner or an admin may change them.",
            )),
        }
    }

    #[tool(
        name = "farmhouse_reviews",
        description = "Get guest reviews of a farmhouse, newest first, with pagination.",
        annotations(read_only_hint = true)
    )]
    async fn farmhouse_reviews(
        &self,
        Parameters(params): Parameters<ReviewsToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let id = parse_id(&params.property_id, "farmhouse")?;
            self.services
                .bookings
                .property_reviews(id, params.page.unwrap_or(1), params.limit)
                .await
        }
        .await;
        match result {
            Ok(page) if page.items.is_empty() => Ok(CallToolResult::success(vec![
                Content::text("This farmhouse has no reviews yet."),
            ])),
            Ok(page) => {
                let mut text = format!("{} reviews:\n\n", page.total);
                for entry in &page.items {
                    let _ = writeln!(
                        text,
                        "- {}/5 ({} to {}): {}",
                        entry.review.rating,
                        entry.check_in.date_naive(),
                        entry.check_out.date_naive(),
                        entry.review.comment
                    );
                }
                write_page_footer(&mut text, &page);
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(tool_error(
                "Failed to get reviews",
                &e,
                "Use farmhouse_search to find valid IDs.",
            )),
        }
    }

    #[tool(
        name = "booking_check_availability",
        description = "Check whether a room type is free for a stay. Reports the first blocked day or the overlapping booking when it is not.",
        annotations(read_only_hint = true)
    )]
    async fn booking_check_availability(
        &self,
        Parameters(params): Parameters<StayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let (id, check_in, check_out) = parse_stay(&params)?;
            self.services
                .bookings
                .availability(id, &params.room_type, check_in, check_out)
                .await
        }
        .await;
        match result {
            Ok(availability) => Ok(CallToolResult::success(vec![Content::text(
                availability.to_string(),
            )])),
            Err(e) => Ok(tool_error(
                "Failed to check availability",
                &e,
                "Check-out must be after check-in, and the room type must exist on the farmhouse.",
            )),
        }
    }

    #[tool(
        name = "booking_quote",
        description = "Price a stay without booking it: room and farmhouse nightly prices, cleaning fee, security deposit, 18% tax and total.",
        annotations(read_only_hint = true)
    )]
    async fn booking_quote(
        &self,
        Parameters(params): Parameters<StayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let (id, check_in, check_out) = parse_stay(&params)?;
            self.services
                .bookings
                .quote(id, &params.room_type, check_in, check_out)
                .await
        }
        .await;
        match result {
            Ok(pricing) => Ok(CallToolResult::success(vec![Content::text(
                pricing.to_string(),
            )])),
            Err(e) => Ok(tool_error(
                "Failed to price stay",
                &e,
                "Check-out must be after check-in, and the room type must exist on the farmhouse.",
            )),
        }
    }

    #[tool(
        name = "booking_create",
        description = "Book a room type at a farmhouse for a stay. The booking starts pending until the owner confirms it. Fails if the dates are blocked or already booked.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false)
    )]
    async fn booking_create(
        &self,
        Parameters(params): Parameters<CreateBookingToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let request = BookingRequest {
                property_id: parse_id(&params.property_id, "farmhouse")?,
                room_type: params.room_type,
                check_in: parse_stay_date(&params.check_in)?,
                check_out: parse_stay_date(&params.check_out)?,
                guests: Guests {
                    adults: params.adults,
                    children: params.children.unwrap_or(0),
                    infants: params.infants.unwrap_or(0),
                },
                special_requests: params.special_requests,
                contact: params.contact.unwrap_or_default(),
            };
            self.services.bookings.create(&actor, request).await
        }
        .await;
        match result {
            Ok(booking) => {
                self.resources.remember_booking(&booking).await;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Booking created successfully.\n\n{booking}"
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to create booking",
                &e,
                "Use booking_check_availability to find free dates first.",
            )),
        }
    }

    #[tool(
        name = "booking_update_status",
        description = "Change a booking's status. Owners and admins confirm, reject, complete or cancel; a guest may only cancel their own booking.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn booking_update_status(
        &self,
        Parameters(params): Parameters<UpdateStatusToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.booking_id, "booking")?;
            self.services
                .bookings
                .update_status(&actor, id, &params.status, params.reason)
                .await
        }
        .await;
        match result {
            Ok(booking) => {
                self.resources.remember_booking(&booking).await;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Booking {} is now {}.",
                    booking.id, booking.status
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to update booking",
                &e,
                "Pending bookings can be confirmed, rejected or cancelled; confirmed ones cancelled or completed.",
            )),
        }
    }

    #[tool(
        name = "booking_cancel",
        description = "Cancel your own booking. The refund depends on how many days remain before check-in and the farmhouse's cancellation policy.",
        annotations(read_only_hint = false, destructive_hint = true)
    )]
    async fn booking_cancel(
        &self,
        Parameters(params): Parameters<CancelBookingToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.booking_id, "booking")?;
            self.services.bookings.cancel(&actor, id, params.reason).await
        }
        .await;
        match result {
            Ok((booking, quote)) => {
                self.resources.remember_booking(&booking).await;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Booking cancelled successfully. Refund: {quote}"
                ))]))
            }
            Err(e) => Ok(tool_error(
                "Failed to cancel booking",
                &e,
                "Only the guest can cancel, and completed or cancelled bookings cannot be cancelled.",
            )),
        }
    }

    #[tool(
        name = "booking_hide",
        description = "Remove a completed, rejected or cancelled booking from the guest's or the owner's list. The booking itself is kept.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = true)
    )]
    async fn booking_hide(
        &self,
        Parameters(params): Parameters<HideBookingToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.booking_id, "booking")?;
            match params.from {
                HideFrom::User => self.services.bookings.hide_from_user(&actor, id).await,
                HideFrom::Owner => self.services.bookings.hide_from_owner(&actor, id).await,
            }
        }
        .await;
        match result {
            Ok(true) => Ok(CallToolResult::success(vec![Content::text(
                "Booking removed from list.",
            )])),
            Ok(false) => Ok(CallToolResult::success(vec![Content::text(
                "Booking was already removed from list.",
            )])),
            Err(e) => Ok(tool_error(
                "Failed to remove booking",
                &e,
                "Only finished bookings can be removed, by their guest, the farmhouse owner or an admin.",
            )),
        }
    }

    #[tool(
        name = "booking_review",
        description = "Rate a completed stay from 1 to 5 with an optional comment. Each booking can be reviewed once; the farmhouse rating updates immediately.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false)
    )]
    async fn booking_review(
        &self,
        Parameters(params): Parameters<ReviewBookingToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let id = parse_id(&params.booking_id, "booking")?;
            self.services
                .bookings
                .submit_review(&actor, id, params.rating, params.comment)
                .await
        }
        .await;
        match result {
            Ok(booking) => {
                self.resources.remember_booking(&booking).await;
                Ok(CallToolResult::success(vec![Content::text(
                    "Review submitted successfully.",
                )]))
            }
            Err(e) => Ok(tool_error(
                "Failed to submit review",
                &e,
                "Only the guest of a completed booking can review it, once.",
            )),
        }
    }

    #[tool(
        name = "booking_list_mine",
        description = "List the caller's bookings, newest first, optionally filtered by status.",
        annotations(read_only_hint = true)
    )]
    async fn booking_list_mine(
        &self,
        Parameters(params): Parameters<ListBookingsToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let status = parse_status_filter(params.status.as_deref())?;
            self.services
                .bookings
                .user_bookings(&actor, status, params.page.unwrap_or(1), params.limit)
                .await
        }
        .await;
        match result {
            Ok(page) => Ok(CallToolResult::success(vec![Content::text(
                format_bookings(&page, "You have no bookings."),
            )])),
            Err(e) => Ok(tool_error(
                "Failed to list bookings",
                &e,
                "Pass a registered actor_id.",
            )),
        }
    }

    #[tool(
        name = "booking_list_owner",
        description = "List bookings across every farmhouse the caller owns, newest first, with the count of active bookings.",
        annotations(read_only_hint = true)
    )]
    async fn booking_list_owner(
        &self,
        Parameters(params): Parameters<ListBookingsToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            let status = parse_status_filter(params.status.as_deref())?;
            let page = self
                .services
                .bookings
                .owner_bookings(&actor, status, params.page.unwrap_or(1), params.limit)
                .await?;
            let active = self.services.bookings.active_bookings_count(&actor).await?;
            Ok::<_, BookingError>((page, active))
        }
        .await;
        match result {
            Ok((page, active)) => {
                let mut text = format!("Active bookings: {active}\n\n");
                text.push_str(&format_bookings(&page, "No bookings for your farmhouses."));
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(tool_error(
                "Failed to list owner bookings",
                &e,
                "Pass a registered actor_id.",
            )),
        }
    }

    #[tool(
        name = "owner_rating_summary",
        description = "Summarize ratings across the caller's farmhouses: per-farmhouse averages, overall rating and the ten most recent reviews.",
        annotations(read_only_hint = true)
    )]
    async fn owner_rating_summary(
        &self,
        Parameters(params): Parameters<OwnerRatingToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = async {
            let actor = self.actor(&params.actor_id).await?;
            self.services.properties.owner_rating_summary(&actor).await
        }
        .await;
        match result {
            Ok(summary) => Ok(CallToolResult::success(vec![Content::text(
                summary.to_string(),
            )])),
            Err(e) => Ok(tool_error(
                "Failed to summarize ratings",
                &e,
                "Pass a registered actor_id.",
            )),
        }
    }
}

fn parse_id(raw: &str, entity: &str) -> error::Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| BookingError::validation(format!("Invalid {entity} ID '{raw}'")))
}

fn parse_stay(
    params: &StayToolParams,
) -> error::Result<(Uuid, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> {
    Ok((
        parse_id(&params.property_id, "farmhouse")?,
        parse_stay_date(&params.check_in)?,
        parse_stay_date(&params.check_out)?,
    ))
}

fn parse_status_filter(raw: Option<&str>) -> error::Result<Option<BookingStatus>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .transpose()
}

fn tool_error(context: &str, error: &BookingError, hint: &str) -> CallToolResult {
    tracing::debug!(status = error.status_code(), error = %error, "{context}");
    CallToolResult::error(vec![Content::text(format!(
        "{context}: {error} (status {}). {hint}",
        error.status_code()
    ))])
}

fn write_page_footer<T>(text: &mut String, page: &Page<T>) {
    let _ = write!(
        text,
        "Page {} of {} ({} total).",
        page.current_page,
        page.total_pages.max(1),
        page.total
    );
    if page.has_next() {
        let _ = write!(text, " Use page {} for more.", page.current_page + 1);
    }
    text.push('\n');
}

fn format_bookings(page: &Page<Booking>, empty: &str) -> String {
    if page.items.is_empty() {
        return format!("{empty}\n");
    }
    let mut text = String::new();
    for b in &page.items {
        let _ = writeln!(
            text,
            "- {} [{}] {} ({}) {} to {}, total {:.2}",
            b.id,
            b.status,
            b.room.name,
            b.room.kind,
            b.check_in.date_naive(),
            b.check_out.date_naive(),
            b.pricing.total_amount
        );
    }
    write_page_footer(&mut text, page);
    text
}

#[tool_handler]
impl ServerHandler for FarmstayMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Farmhouse rental booking server.\n\
                 \n\
                 Callers identify themselves with actor_id, a registered user ID.\n\
                 \n\
                 ## Farmhouses\n\
                 - farmhouse_search: find approved farmhouses by text, city, state and price\n\
                 - farmhouse_details: rooms, fees, cancellation policy, rating\n\
                 - farmhouse_reviews: guest reviews, newest first\n\
                 - farmhouse_blocked_dates: days the owner closed\n\
                 - farmhouse_create: owners submit a listing for approval\n\
                 - farmhouse_approve / farmhouse_reject: admin moderation\n\
                 - farmhouse_manage_blocked_dates: owners block or unblock days\n\
                 - owner_rating_summary: ratings across an owner's farmhouses\n\
                 \n\
                 ## Bookings\n\
                 - booking_check_availability and booking_quote before booking\n\
                 - booking_create: reserve a room type (starts pending)\n\
                 - booking_update_status: owners confirm, reject, complete or cancel\n\
                 - booking_cancel: guests cancel with a tiered refund\n\
                 - booking_review: rate a completed stay once\n\
                 - booking_hide: remove a finished booking from a list\n\
                 - booking_list_mine / booking_list_owner: paginated booking lists\n\
                 \n\
                 ## Resources\n\
                 Farmhouses and bookings returned by tools are kept as resources \
                 (farmstay://farmhouse/{id}, farmstay://booking/{id})."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "farmstay://farmhouse/{id}".into(),
                    name: "Farmhouse".into(),
                    title: Some("Farmhouse details".into()),
                    description: Some(
                        "Farmhouse details (fetched via farmhouse_details or farmhouse_create)"
                            .into(),
                    ),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "farmstay://booking/{id}".into(),
                    name: "Booking".into(),
                    title: Some("Booking summary".into()),
                    description: Some(
                        "Latest state of a booking touched by a booking_* tool".into(),
                    ),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
        ];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}

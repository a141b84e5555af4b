pub mod booking;
pub mod calendar;
pub mod page;
pub mod pricing;
pub mod property;
pub mod rating;
pub mod refund;
pub mod search_params;
pub mod user;

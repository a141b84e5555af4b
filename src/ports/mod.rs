pub mod cache;
pub mod clock;
pub mod identity;
pub mod repository;

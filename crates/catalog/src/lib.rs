//! Banner catalog: banners, slots, audience segments and the banner↔slot
//! links that define each slot's candidate set.
//!
//! Data is held in DashMap; the [`CatalogStore`] also serves as the
//! [`SlotIndex`](rotator_bandit::SlotIndex) for the selection engine.

#![warn(clippy::unwrap_used)]

pub mod models;
pub mod store;
mod table;

pub use store::CatalogStore;

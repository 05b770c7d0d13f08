//! Banner selection engine: epsilon-greedy over per-(slot, segment) click
//! statistics, with storage reached only through the [`SlotIndex`] and
//! [`StatsStore`] capabilities.

#![warn(clippy::unwrap_used)]

pub mod collaborators;
pub mod epsilon_greedy;
pub mod error;
pub mod selector;

pub use collaborators::{SlotIndex, StatsStore};
pub use epsilon_greedy::EpsilonGreedy;
pub use error::{SelectionError, SelectionResult};
pub use selector::{new_bandit, BannerSelector};

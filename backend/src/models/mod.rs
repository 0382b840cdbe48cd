pub mod audit;
pub mod stats;
pub mod tier;
pub mod usage;
pub mod user;

pub use audit::{AuditEntry, DownloadLog};
pub use stats::{ProfileStats, RecentSignup};
pub use tier::Tier;
pub use usage::UsageDecision;
pub use user::{Profile, ProfileUpdate};

//! Scheduled channel content.

mod poster;
mod schedule;

pub use poster::{ChannelPoster, ChannelStats, ChannelStatus, PostOutcome};
pub use schedule::{bucket_key, BucketPeriod, ChannelSchedule, ScheduleSlot, SlotDays, CATCH_UP_MINUTES};

//! Channel posting schedule and calendar buckets.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Timelike, Weekday};
use syncara_models::PostKind;

/// Minutes after the slot time during which a kind is still due.
pub const CATCH_UP_MINUTES: u32 = 5;

/// Calendar interval a kind may post in at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPeriod {
    Day,
    Week,
    Month,
}

/// Days a slot fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDays {
    Daily,
    /// Even day-of-month.
    EvenDays,
    /// Day-of-month divisible by three.
    EveryThirdDay,
    Weekly(Weekday),
    /// A fixed day-of-month.
    Monthly(u32),
}

impl SlotDays {
    fn matches<D: Datelike>(self, date: &D) -> bool {
        match self {
            Self::Daily => true,
            Self::EvenDays => date.day() % 2 == 0,
            Self::EveryThirdDay => date.day() % 3 == 0,
            Self::Weekly(day) => date.weekday() == day,
            Self::Monthly(day) => date.day() == day,
        }
    }

    pub fn period(self) -> BucketPeriod {
        match self {
            Self::Daily | Self::EvenDays | Self::EveryThirdDay => BucketPeriod::Day,
            Self::Weekly(_) => BucketPeriod::Week,
            Self::Monthly(_) => BucketPeriod::Month,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Daily => "every day".to_string(),
            Self::EvenDays => "even days".to_string(),
            Self::EveryThirdDay => "every 3rd day".to_string(),
            Self::Weekly(day) => format!("every {}", day),
            Self::Monthly(day) => format!("day {} of the month", day),
        }
    }
}

/// One kind's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub kind: PostKind,
    pub time: NaiveTime,
    pub days: SlotDays,
}

impl ScheduleSlot {
    fn new(kind: PostKind, hour: u32, minute: u32, days: SlotDays) -> Self {
        Self {
            kind,
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            days,
        }
    }

    /// Whether `local` falls on a slot day within the catch-up window.
    pub fn is_due(&self, local: &DateTime<FixedOffset>) -> bool {
        if !self.days.matches(local) {
            return false;
        }
        let now = local.hour() * 60 + local.minute();
        let start = self.time.hour() * 60 + self.time.minute();
        now >= start && now < start + CATCH_UP_MINUTES
    }

    pub fn describe(&self) -> String {
        format!(
            "{} - {} at {}",
            self.kind.label(),
            self.days.describe(),
            self.time.format("%H:%M")
        )
    }
}

/// The full posting schedule, in the configured zone.
#[derive(Debug, Clone)]
pub struct ChannelSchedule {
    slots: Vec<ScheduleSlot>,
}

impl Default for ChannelSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl ChannelSchedule {
    /// Tips 08:00, facts 14:00, Q&A 20:00, stories 10:30 on even days,
    /// polls 16:00 every third day, weekly update Monday 09:00 and the AI
    /// trend piece on the 1st at 11:00.
    pub fn standard() -> Self {
        Self {
            slots: vec![
                ScheduleSlot::new(PostKind::DailyTip, 8, 0, SlotDays::Daily),
                ScheduleSlot::new(PostKind::UserStory, 10, 30, SlotDays::EvenDays),
                ScheduleSlot::new(PostKind::FunFact, 14, 0, SlotDays::Daily),
                ScheduleSlot::new(PostKind::Poll, 16, 0, SlotDays::EveryThirdDay),
                ScheduleSlot::new(PostKind::QnA, 20, 0, SlotDays::Daily),
                ScheduleSlot::new(PostKind::WeeklyUpdate, 9, 0, SlotDays::Weekly(Weekday::Mon)),
                ScheduleSlot::new(PostKind::AiTrend, 11, 0, SlotDays::Monthly(1)),
            ],
        }
    }

    pub fn slots(&self) -> &[ScheduleSlot] {
        &self.slots
    }

    pub fn slot(&self, kind: PostKind) -> Option<&ScheduleSlot> {
        self.slots.iter().find(|s| s.kind == kind)
    }

    /// Kinds due at `local`; several may share a tick.
    pub fn due(&self, local: &DateTime<FixedOffset>) -> Vec<PostKind> {
        self.slots
            .iter()
            .filter(|s| s.is_due(local))
            .map(|s| s.kind)
            .collect()
    }

    /// Bucket period of `kind`; kinds without a slot use daily buckets.
    pub fn period(&self, kind: PostKind) -> BucketPeriod {
        self.slot(kind)
            .map(|s| s.days.period())
            .unwrap_or(BucketPeriod::Day)
    }
}

/// Bucket label: `2026-10-18`, `2026-W42` or `2026-10`.
pub fn bucket_key(period: BucketPeriod, local: &DateTime<FixedOffset>) -> String {
    match period {
        BucketPeriod::Day => local.format("%Y-%m-%d").to_string(),
        BucketPeriod::Week => {
            let week = local.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        BucketPeriod::Month => local.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_daily_tip_window() {
        let schedule = ChannelSchedule::standard();
        assert_eq!(schedule.due(&local(2026, 10, 17, 8, 0)), vec![PostKind::DailyTip]);
        assert_eq!(schedule.due(&local(2026, 10, 17, 8, 4)), vec![PostKind::DailyTip]);
        assert!(schedule.due(&local(2026, 10, 17, 8, 5)).is_empty());
        assert!(schedule.due(&local(2026, 10, 17, 7, 59)).is_empty());
    }

    #[test]
    fn test_even_day_stories() {
        let schedule = ChannelSchedule::standard();
        assert_eq!(schedule.due(&local(2026, 10, 18, 10, 30)), vec![PostKind::UserStory]);
        assert!(schedule.due(&local(2026, 10, 17, 10, 30)).is_empty());
    }

    #[test]
    fn test_polls_every_third_day() {
        let schedule = ChannelSchedule::standard();
        assert_eq!(schedule.due(&local(2026, 10, 21, 16, 0)), vec![PostKind::Poll]);
        assert!(schedule.due(&local(2026, 10, 20, 16, 0)).is_empty());
    }

    #[test]
    fn test_weekly_and_monthly() {
        let schedule = ChannelSchedule::standard();
        // 2026-10-19 is a Monday
        assert_eq!(schedule.due(&local(2026, 10, 19, 9, 1)), vec![PostKind::WeeklyUpdate]);
        assert!(schedule.due(&local(2026, 10, 20, 9, 1)).is_empty());
        assert_eq!(schedule.due(&local(2026, 11, 1, 11, 0)), vec![PostKind::AiTrend]);
    }

    #[test]
    fn test_bucket_keys() {
        let at = local(2026, 10, 18, 12, 0);
        assert_eq!(bucket_key(BucketPeriod::Day, &at), "2026-10-18");
        assert_eq!(bucket_key(BucketPeriod::Week, &at), "2026-W42");
        assert_eq!(bucket_key(BucketPeriod::Month, &at), "2026-10");
    }

    #[test]
    fn test_periods() {
        let schedule = ChannelSchedule::standard();
        assert_eq!(schedule.period(PostKind::DailyTip), BucketPeriod::Day);
        assert_eq!(schedule.period(PostKind::WeeklyUpdate), BucketPeriod::Week);
        assert_eq!(schedule.period(PostKind::AiTrend), BucketPeriod::Month);
    }
}

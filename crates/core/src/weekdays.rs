//! Seven-day repeat bitset for alarm records.
//!
//! Bit `n` is set when the weekday with `num_days_from_monday() == n` is
//! enabled. An empty set means the alarm does not repeat.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weekdays(u8);

const ALL_BITS: u8 = 0b0111_1111;

impl Weekdays {
    pub const NONE: Weekdays = Weekdays(0);
    pub const ALL: Weekdays = Weekdays(ALL_BITS);

    /// Build from a raw bitset. Bits above the seventh are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Weekdays(bits & ALL_BITS)
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        days.iter()
            .fold(Weekdays::NONE, |acc, day| acc.with(*day, true))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_on(self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn with(self, day: Weekday, on: bool) -> Self {
        if on {
            Weekdays(self.0 | bit(day))
        } else {
            Weekdays(self.0 & !bit(day))
        }
    }

    pub fn is_repeating(self) -> bool {
        self.0 != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Days to add to `date` to land on an enabled weekday (0 when `date`
    /// itself is enabled). `None` when no weekday is enabled.
    pub fn distance_to_next_day(self, date: NaiveDate) -> Option<i64> {
        if !self.is_repeating() {
            return None;
        }
        let mut day = date.weekday();
        for distance in 0..7 {
            if self.is_on(day) {
                return Some(distance);
            }
            day = day.succ();
        }
        None
    }

    /// Days to subtract from `date` to land on the closest enabled weekday
    /// strictly before it (1..=7). `None` when no weekday is enabled.
    pub fn distance_to_previous_day(self, date: NaiveDate) -> Option<i64> {
        if !self.is_repeating() {
            return None;
        }
        let mut day = date.weekday();
        for distance in 1..=7 {
            day = day.pred();
            if self.is_on(day) {
                return Some(distance);
            }
        }
        None
    }

    /// Enabled weekdays, Monday first.
    pub fn days(self) -> Vec<Weekday> {
        WEEK.iter().copied().filter(|d| self.is_on(*d)).collect()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

impl std::fmt::Display for Weekdays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_repeating() {
            return write!(f, "once");
        }
        if *self == Weekdays::ALL {
            return write!(f, "daily");
        }
        let names: Vec<String> = self.days().iter().map(|d| d.to_string()).collect();
        write!(f, "{}", names.join(","))
    }
}

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sunday-first order, matching the bit layout (bit 0 = Sunday).
const ORDERED_DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A 7-bit set of days used by contract schedules and availability windows.
///
/// Bit 0 is Sunday and bit 6 is Saturday. A value is always in `1..=127`,
/// so an empty set cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const ALL: WeekdaySet = WeekdaySet(127);
    pub const WEEKDAYS: WeekdaySet = WeekdaySet(62);

    pub fn new(bits: u8) -> Result<Self, AppError> {
        if bits == 0 || bits > 127 {
            return Err(AppError::InvalidArgument(format!(
                "Weekday mask must be between 1 and 127, got {}",
                bits
            )));
        }
        Ok(Self(bits))
    }

    pub fn encode<I>(days: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let bits = days.into_iter().fold(0u8, |acc, day| acc | day_bit(day));
        Self::new(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & day_bit(day) != 0
    }

    pub fn days(self) -> Vec<Weekday> {
        ORDERED_DAYS
            .iter()
            .copied()
            .filter(|day| self.contains(*day))
            .collect()
    }
}

fn day_bit(day: Weekday) -> u8 {
    1 << day.num_days_from_sunday()
}

fn abbreviation(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.days().into_iter().map(abbreviation).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl TryFrom<u8> for WeekdaySet {
    type Error = AppError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl TryFrom<i64> for WeekdaySet {
    type Error = AppError;

    fn try_from(bits: i64) -> Result<Self, Self::Error> {
        let bits = u8::try_from(bits)
            .map_err(|_| AppError::InvalidArgument(format!("Weekday mask out of range: {}", bits)))?;
        Self::new(bits)
    }
}

impl From<WeekdaySet> for u8 {
    fn from(set: WeekdaySet) -> Self {
        set.0
    }
}

impl From<WeekdaySet> for i64 {
    fn from(set: WeekdaySet) -> Self {
        set.0 as i64
    }
}

use chrono::NaiveTime;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::availabilities;

pub const DAYS_PER_WEEK: usize = 7;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, PartialEq, Eq)]
pub enum AvailabilityError {
    WrongDayCount,
    DayOutOfRange,
    DuplicateDay,
    InvalidTime,
    EndNotAfterStart,
}

impl std::error::Error for AvailabilityError {}

impl fmt::Display for AvailabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityError::WrongDayCount => {
                write!(f, "Must provide availability for all 7 days")
            }
            AvailabilityError::DayOutOfRange => write!(f, "Day must be between 0 and 6"),
            AvailabilityError::DuplicateDay => write!(f, "Each day must appear exactly once"),
            AvailabilityError::InvalidTime => write!(f, "Invalid time format"),
            AvailabilityError::EndNotAfterStart => {
                write!(f, "End time must be after start time when day is available")
            }
        }
    }
}

/// One weekday of a user's standing availability. `day` runs from 0 to 6.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Identifiable, Queryable, Selectable,
)]
#[diesel(table_name = availabilities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Availability {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub day: i16,
    pub is_available: bool,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Insertable)]
#[diesel(table_name = availabilities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAvailability {
    pub user_id: i32,
    pub day: i16,
    pub is_available: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl NewAvailability {
    /// Times are `HH:MM`. Start and end are only ordered-checked on available days.
    pub fn parse(
        user_id: i32,
        day: i16,
        is_available: bool,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self, AvailabilityError> {
        if !(0..DAYS_PER_WEEK as i16).contains(&day) {
            return Err(AvailabilityError::DayOutOfRange);
        }

        let start_time = hh_mm::parse(start_time)?;
        let end_time = hh_mm::parse(end_time)?;

        if is_available && end_time <= start_time {
            return Err(AvailabilityError::EndNotAfterStart);
        }

        Ok(Self {
            user_id,
            day,
            is_available,
            start_time,
            end_time,
        })
    }
}

/// A week is valid when it holds every weekday exactly once.
pub fn check_full_week(week: &[NewAvailability]) -> Result<(), AvailabilityError> {
    if week.len() != DAYS_PER_WEEK {
        return Err(AvailabilityError::WrongDayCount);
    }

    let mut seen = [false; DAYS_PER_WEEK];
    for entry in week {
        let slot = usize::try_from(entry.day)
            .ok()
            .and_then(|day| seen.get_mut(day))
            .ok_or(AvailabilityError::DayOutOfRange)?;
        if *slot {
            return Err(AvailabilityError::DuplicateDay);
        }
        *slot = true;
    }

    Ok(())
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{AvailabilityError, TIME_FORMAT};

    pub fn parse(raw: &str) -> Result<NaiveTime, AvailabilityError> {
        NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
            .map_err(|_| AvailabilityError::InvalidTime)
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

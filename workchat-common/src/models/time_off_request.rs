use chrono::{DateTime, NaiveDate, Utc};
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::schema::time_off_requests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffType {
    Vacation,
    SickLeave,
    Personal,
    Other,
}

impl TimeOffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOffType::Vacation => "vacation",
            TimeOffType::SickLeave => "sick_leave",
            TimeOffType::Personal => "personal",
            TimeOffType::Other => "other",
        }
    }
}

impl FromStr for TimeOffType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vacation" => Ok(TimeOffType::Vacation),
            "sick_leave" => Ok(TimeOffType::SickLeave),
            "personal" => Ok(TimeOffType::Personal),
            "other" => Ok(TimeOffType::Other),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Denied,
    Cancelled,
}

impl TimeOffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOffStatus::Pending => "pending",
            TimeOffStatus::Approved => "approved",
            TimeOffStatus::Denied => "denied",
            TimeOffStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TimeOffStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TimeOffStatus::Pending),
            "approved" => Ok(TimeOffStatus::Approved),
            "denied" => Ok(TimeOffStatus::Denied),
            "cancelled" => Ok(TimeOffStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = time_off_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TimeOffRequest {
    pub id: i32,
    pub user_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub request_type: String,
    pub reason: Option<String>,
    pub status: String,
    pub created_timestamp: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = time_off_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTimeOffRequest<'a> {
    pub user_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub request_type: &'a str,
    pub reason: Option<&'a str>,
    pub status: &'a str,
    pub created_timestamp: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::models::user::UserSummary;
use crate::schema::shifts;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Scheduled,
    AvailableForExchange,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Scheduled => "scheduled",
            ShiftStatus::AvailableForExchange => "available_for_exchange",
            ShiftStatus::Completed => "completed",
            ShiftStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses under which a shift still occupies its holder's time.
    pub fn holding() -> [ShiftStatus; 2] {
        [ShiftStatus::Scheduled, ShiftStatus::AvailableForExchange]
    }

    pub fn terminal() -> [ShiftStatus; 2] {
        [ShiftStatus::Completed, ShiftStatus::Cancelled]
    }

    pub fn is_terminal(&self) -> bool {
        ShiftStatus::terminal().contains(self)
    }
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct UnknownShiftStatus(pub String);

impl std::error::Error for UnknownShiftStatus {}

impl fmt::Display for UnknownShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown shift status '{}'", self.0)
    }
}

impl FromStr for ShiftStatus {
    type Err = UnknownShiftStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ShiftStatus::Scheduled),
            "available_for_exchange" => Ok(ShiftStatus::AvailableForExchange),
            "completed" => Ok(ShiftStatus::Completed),
            "cancelled" => Ok(ShiftStatus::Cancelled),
            _ => Err(UnknownShiftStatus(String::from(s))),
        }
    }
}

impl ToSql<Text, Pg> for ShiftStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ShiftStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Ok(raw.parse()?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, Selectable)]
#[diesel(table_name = shifts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Shift {
    pub id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub department_id: i32,
    pub scheduled_by_id: i32,
    pub user_id: Option<i32>,
    pub status: ShiftStatus,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shifts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewShift {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub department_id: i32,
    pub scheduled_by_id: i32,
    pub user_id: Option<i32>,
    pub status: ShiftStatus,
}

/// A shift row with its department's name, as listed to clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftWithDepartment {
    #[serde(flatten)]
    pub shift: Shift,
    pub department_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftDetails {
    #[serde(flatten)]
    pub shift: Shift,
    pub department_name: String,
    pub scheduled_by: Option<UserSummary>,
    pub assigned_user: Option<UserSummary>,
}

/// A shift open to the requesting user for pickup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AvailableShift {
    pub id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub department_id: i32,
    pub department_name: String,
    pub current_user: Option<UserSummary>,
}

impl AvailableShift {
    pub fn new(shift: Shift, department_name: String, current_user: Option<UserSummary>) -> Self {
        Self {
            id: shift.id,
            start_time: shift.start_time,
            end_time: shift.end_time,
            status: shift.status,
            department_id: shift.department_id,
            department_name,
            current_user,
        }
    }
}

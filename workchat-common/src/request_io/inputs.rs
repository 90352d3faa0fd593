use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, Debug, Deserialize, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct InputCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEmail {
    pub email: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct InputPasswordReset {
    pub token: String,
    pub new_password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct InputUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub password: String,
    #[serde(default)]
    pub is_manager: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputDepartment {
    pub name: String,
    pub description: Option<String>,
}

/// Absent fields stay `None`. A field that is present but `null` becomes `Some(None)`.
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputUserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub role_id: Option<Option<i32>>,
    pub is_manager: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputUserRole {
    pub role_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct InputPasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputDepartmentUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
}

/// Used both to create a role, where both fields are required, and to update one.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputRole {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputDayAvailability {
    pub day: i16,
    pub is_available: bool,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputAvailabilityWeek {
    pub availabilities: Option<Vec<InputDayAvailability>>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct InputDepartmentMember {
    pub user_id: i32,
    pub department_id: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputShift {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub department_id: i32,
    pub status: String,
    pub user_id: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ShiftQuery {
    pub department_id: Option<i32>,
    pub user_id: Option<i32>,
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// The ID is optional so a missing one can be reported by name rather than as a parse
/// failure.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct InputShiftId {
    pub shift_id: Option<i32>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct InputShiftAssignment {
    pub shift_id: Option<i32>,
    pub user_id: Option<i32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub unread_only: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputNotificationIds {
    pub notification_ids: Option<Vec<i32>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMessage {
    pub content: String,
    pub received_by_user_id: Option<i32>,
    pub department_id: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMessageEdit {
    pub content: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTimeOffRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub request_type: String,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTimeOffStatus {
    pub status: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTemplateEmail {
    pub template_type: String,
    pub recipient_id: i32,
    #[serde(default)]
    pub template_data: HashMap<String, String>,
}

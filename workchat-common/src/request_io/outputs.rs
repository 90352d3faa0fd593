use serde::Serialize;

use crate::models::availability::Availability;
use crate::models::department::{Department, DepartmentMember};
use crate::models::notification::Notification;
use crate::models::shift::{AvailableShift, ShiftWithDepartment};
use crate::models::user::User;

#[derive(Clone, Debug, Serialize)]
pub struct OutputLogin {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct OutputId {
    pub id: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputMessage<'a> {
    pub message: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputUserWithDepartments {
    #[serde(flatten)]
    pub user: User,
    pub departments: Vec<Department>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputDepartmentWithMembers {
    #[serde(flatten)]
    pub department: Department,
    pub members: Vec<DepartmentMember>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputShiftPage {
    pub shifts: Vec<ShiftWithDepartment>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputAvailableShifts {
    pub shifts: Vec<AvailableShift>,
    pub total: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputShiftAssignment<'a> {
    pub message: &'a str,
    pub shift_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputNotificationPage {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputNotificationsRead<'a> {
    pub message: &'a str,
    pub updated_ids: Vec<i32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputEmailSent<'a> {
    pub message: &'a str,
    pub template_type: &'a str,
    pub recipient_id: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputAvailabilities {
    pub availabilities: Vec<Availability>,
}

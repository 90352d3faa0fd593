use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%B %d, %Y";
const TIME_FORMAT: &str = "%I:%M %p";
const MESSAGE_PREVIEW_CHARS: usize = 50;

pub enum NotificationTemplate<'a> {
    ShiftCreatedForUser {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    ShiftAvailable {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    ShiftAssigned {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        department_name: Option<&'a str>,
    },
    ShiftReassigned {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        new_holder_name: &'a str,
    },
    CoworkerAssigned {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        holder_name: &'a str,
    },
    ShiftUnassigned {
        start: DateTime<Utc>,
    },
    ShiftCancelled {
        start: DateTime<Utc>,
    },
    AddedToDepartment {
        department_name: &'a str,
    },
    RemovedFromDepartment {
        department_name: &'a str,
    },
    RoleUpdated {
        role_name: &'a str,
    },
    TimeOffRequested {
        requester_name: &'a str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    TimeOffDecided {
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: &'a str,
    },
    NewMessage {
        sender_name: &'a str,
        content: &'a str,
    },
    EmailSent {
        subject: &'a str,
    },
}

impl NotificationTemplate<'_> {
    pub fn render(&self) -> String {
        match self {
            NotificationTemplate::ShiftCreatedForUser { start, end } => format!(
                "New shift assigned: {} from {} to {}",
                date(start),
                time(start),
                time(end),
            ),
            NotificationTemplate::ShiftAvailable { start, end } => format!(
                "A new shift is available: {} from {} to {}",
                date(start),
                time(start),
                time(end),
            ),
            NotificationTemplate::ShiftAssigned {
                start,
                end,
                department_name,
            } => {
                let mut content = format!(
                    "You have been assigned a shift on {} from {} to {}",
                    date(start),
                    time(start),
                    time(end),
                );

                if let Some(name) = department_name {
                    content.push_str(" in ");
                    content.push_str(name);
                }

                content
            }
            NotificationTemplate::ShiftReassigned {
                start,
                end,
                new_holder_name,
            } => format!(
                "Your shift on {} ({} to {}) has been reassigned to {}",
                date(start),
                time(start),
                time(end),
                new_holder_name,
            ),
            NotificationTemplate::CoworkerAssigned {
                start,
                end,
                holder_name,
            } => format!(
                "{} has been assigned to the shift on {} ({} to {})",
                holder_name,
                date(start),
                time(start),
                time(end),
            ),
            NotificationTemplate::ShiftUnassigned { start } => {
                format!("Your shift on {} has been unassigned", date(start))
            }
            NotificationTemplate::ShiftCancelled { start } => {
                format!("Your shift on {} has been cancelled", date(start))
            }
            NotificationTemplate::AddedToDepartment { department_name } => {
                format!("You have been added to the {department_name} department")
            }
            NotificationTemplate::RemovedFromDepartment { department_name } => {
                format!("You have been removed from the {department_name} department")
            }
            NotificationTemplate::RoleUpdated { role_name } => {
                format!("Your role has been updated to {role_name}")
            }
            NotificationTemplate::TimeOffRequested {
                requester_name,
                start_date,
                end_date,
            } => format!(
                "New time off request from {} ({} to {})",
                requester_name,
                start_date.format(DATE_FORMAT),
                end_date.format(DATE_FORMAT),
            ),
            NotificationTemplate::TimeOffDecided {
                start_date,
                end_date,
                status,
            } => format!(
                "Your time off request for {} to {} has been {}",
                start_date.format(DATE_FORMAT),
                end_date.format(DATE_FORMAT),
                status,
            ),
            NotificationTemplate::NewMessage {
                sender_name,
                content,
            } => format!("New message from {}: {}", sender_name, preview(content)),
            NotificationTemplate::EmailSent { subject } => format!("Email sent: {subject}"),
        }
    }
}

fn date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

fn time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

fn preview(content: &str) -> String {
    if content.chars().count() <= MESSAGE_PREVIEW_CHARS {
        return String::from(content);
    }

    let mut truncated: String = content.chars().take(MESSAGE_PREVIEW_CHARS).collect();
    truncated.push_str("...");
    truncated
}

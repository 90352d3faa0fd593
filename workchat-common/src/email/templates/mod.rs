use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, PartialEq, Eq)]
pub enum TemplateError {
    UnknownTemplate(String),
    MissingField(&'static str),
}

impl std::error::Error for TemplateError {}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UnknownTemplate(name) => write!(f, "Invalid template type: {name}"),
            TemplateError::MissingField(field) => {
                write!(f, "Missing required template field: {field}")
            }
        }
    }
}

/// Email templates that may be requested by key. Keys outside this set are rejected
/// before any rendering happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailTemplate {
    NewUser,
    ShiftAssignment,
    ShiftExchangeRequest,
}

impl FromStr for EmailTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_user" => Ok(EmailTemplate::NewUser),
            "shift_assignment" => Ok(EmailTemplate::ShiftAssignment),
            "shift_exchange_request" => Ok(EmailTemplate::ShiftExchangeRequest),
            _ => Err(TemplateError::UnknownTemplate(String::from(s))),
        }
    }
}

impl EmailTemplate {
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            EmailTemplate::NewUser => &["user_name", "temp_password"],
            EmailTemplate::ShiftAssignment => &[
                "user_name",
                "shift_date",
                "start_time",
                "end_time",
                "department",
            ],
            EmailTemplate::ShiftExchangeRequest => {
                &["requester_name", "shift_date", "start_time", "end_time"]
            }
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            EmailTemplate::NewUser => "Welcome to WorkChat - Your Account Details",
            EmailTemplate::ShiftAssignment => "WorkChat - New Shift Assignment",
            EmailTemplate::ShiftExchangeRequest => "WorkChat - Shift Exchange Request",
        }
    }

    /// Fails with the first required field that `data` lacks.
    pub fn render(
        &self,
        data: &HashMap<String, String>,
        app_url: &str,
    ) -> Result<String, TemplateError> {
        let field = |name: &'static str| -> Result<&str, TemplateError> {
            data.get(name)
                .map(String::as_str)
                .ok_or(TemplateError::MissingField(name))
        };

        for name in self.required_fields() {
            field(name)?;
        }

        let body = match self {
            EmailTemplate::NewUser => format!(
                "Hello {},\n\n\
                 Welcome to WorkChat! Your account has been created successfully.\n\n\
                 Please log into WorkChat using the following temporary password:\n\
                 {}\n\n\
                 You will be asked to change your password after you first log in.\n\n\
                 You can log in at: {}\n\n\
                 Best regards,\n\
                 WorkChat Team\n\n\
                 This is an automated message, please do not reply.",
                field("user_name")?,
                field("temp_password")?,
                app_url,
            ),
            EmailTemplate::ShiftAssignment => format!(
                "Hello {},\n\n\
                 You have been assigned a new shift in {}.\n\n\
                 Date: {}\n\
                 Time: {} to {}\n\n\
                 You can view your schedule at: {}\n\n\
                 Best regards,\n\
                 WorkChat Team",
                field("user_name")?,
                field("department")?,
                field("shift_date")?,
                field("start_time")?,
                field("end_time")?,
                app_url,
            ),
            EmailTemplate::ShiftExchangeRequest => format!(
                "Hello,\n\n\
                 {} would like to exchange a shift.\n\n\
                 Date: {}\n\
                 Time: {} to {}\n\n\
                 You can pick up the shift at: {}\n\n\
                 Best regards,\n\
                 WorkChat Team",
                field("requester_name")?,
                field("shift_date")?,
                field("start_time")?,
                field("end_time")?,
                app_url,
            ),
        };

        Ok(body)
    }
}

pub struct PasswordResetMessage {}

impl PasswordResetMessage {
    pub fn generate(url: &str, token: &str, token_lifetime: Duration) -> String {
        let link = format!("{}/reset-password?token={}", url, token);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>WorkChat Password Reset</h1>
               <p>Someone asked to reset the password for your WorkChat account.</p>
               <p><a href=\"{}\" rel=\"nofollow\">Click here to choose a new password</a></p>
               <p><b>This link will expire in {} minutes.</b></p>
               <br />
               <p><i>Didn't ask for this? Just ignore this email.</i></p>
             </body>
             </html>",
            link,
            token_lifetime.as_secs() / 60,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect()
    }

    #[test]
    fn test_unknown_template_is_rejected() {
        assert_eq!(
            "password_dump".parse::<EmailTemplate>().unwrap_err(),
            TemplateError::UnknownTemplate(String::from("password_dump"))
        );
        assert_eq!(
            "new_user".parse::<EmailTemplate>().unwrap(),
            EmailTemplate::NewUser
        );
    }

    #[test]
    fn test_missing_field_is_named() {
        let template = EmailTemplate::ShiftAssignment;
        let partial = data(&[
            ("user_name", "Jo"),
            ("shift_date", "2024-01-10"),
            ("start_time", "09:00"),
            ("end_time", "17:00"),
        ]);

        assert_eq!(
            template.render(&partial, "https://workchat.test").unwrap_err(),
            TemplateError::MissingField("department")
        );
    }

    #[test]
    fn test_render_new_user() {
        let body = EmailTemplate::NewUser
            .render(
                &data(&[("user_name", "Jo Park"), ("temp_password", "x7Yq!")]),
                "https://workchat.test",
            )
            .unwrap();

        assert!(body.starts_with("Hello Jo Park,"));
        assert!(body.contains("x7Yq!"));
        assert!(body.contains("https://workchat.test"));
    }
}

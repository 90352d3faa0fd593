pub mod availability;
pub mod department;
pub mod department_membership;
pub mod job_run;
pub mod message;
pub mod message_read;
pub mod notification;
pub mod password_reset_token;
pub mod role;
pub mod shift;
pub mod time_off_request;
pub mod user;

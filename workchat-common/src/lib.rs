#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod email;
pub mod models;
pub mod notifications;
pub mod request_io;
pub mod schema;
pub mod threadrand;
pub mod token;
pub mod workflow;

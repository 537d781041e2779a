pub mod activities;
pub mod admin;
pub mod auth;
pub mod coordinator;
pub mod files;
pub mod hod;
pub mod student;
pub mod transcript;

pub(crate) mod helper;

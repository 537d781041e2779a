pub mod dashboard;
pub mod principal;
pub mod reference;
pub mod submission;

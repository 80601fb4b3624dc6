pub mod auth;
pub mod chassis;
pub mod customers;
pub mod public_form;

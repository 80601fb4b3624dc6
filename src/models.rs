pub mod auth;
pub mod chassis;
pub mod customer;
pub mod document;
pub mod finance;
pub mod verification;

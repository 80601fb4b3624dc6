pub mod access_policy;
pub mod auth;
pub mod chassis_service;
pub mod customer_service;
pub mod document_storage;
pub mod pricing;
pub mod workflow;

#[cfg(test)]
mod customer_service_tests;
#[cfg(test)]
pub(crate) mod test_support;

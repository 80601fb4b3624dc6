pub mod user_repo;
pub use user_repo::UserRepository;
pub mod customer_repo;
pub use customer_repo::{CustomerKey, CustomerRepository, CustomerStore};
pub mod chassis_repo;
pub use chassis_repo::{ChassisRepository, ChassisStore};

//! Users module - accounts, roles and KYC/FICA verification.

mod users_model;
mod users_service;
mod users_traits;

pub use users_model::{
    validate_sa_id_number, KycStatus, KycSubmission, NewUser, User, UserCredentials, UserRole,
};
pub use users_service::UserService;
pub use users_traits::{UserRepositoryTrait, UserServiceTrait};

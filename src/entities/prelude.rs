pub use super::devices::Entity as Devices;
pub use super::system_config::Entity as SystemConfig;
pub use super::users::Entity as Users;
pub use super::verification_codes::Entity as VerificationCodes;

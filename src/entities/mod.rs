pub mod prelude;

pub mod devices;
pub mod system_config;
pub mod users;
pub mod verification_codes;

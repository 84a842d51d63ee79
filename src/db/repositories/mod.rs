pub mod device;
pub mod system_config;
pub mod user;
pub mod verification;

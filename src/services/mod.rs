pub mod token;
pub use token::{TokenError, TokenService};

pub mod mailer;
pub use mailer::{LogMailer, MailError, Mailer, SmtpMailer};

pub mod device_service;
pub mod device_service_impl;
pub use device_service::{
    DeviceCredentials, DeviceDetails, DeviceError, DeviceService, DeviceSummary,
};
pub use device_service_impl::SeaOrmDeviceService;

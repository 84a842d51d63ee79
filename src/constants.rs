/// Model tiers reported by the usage endpoint. Ceilings are static per tier,
/// independent of the account's own `total_count`.
pub const MODEL_TIERS: &[ModelTierLimits] = &[
    ModelTierLimits {
        name: "gpt-4",
        num_requests_total: 100,
        max_request_usage: 200,
        max_token_usage: 20_000,
    },
    ModelTierLimits {
        name: "gpt-3.5-turbo",
        num_requests_total: 200,
        max_request_usage: 500,
        max_token_usage: 50_000,
    },
    ModelTierLimits {
        name: "gpt-4-32k",
        num_requests_total: 50,
        max_request_usage: 100,
        max_token_usage: 100_000,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct ModelTierLimits {
    pub name: &'static str,
    pub num_requests_total: i64,
    pub max_request_usage: i64,
    pub max_token_usage: i64,
}

/// Flat token estimate per request used for the derived `numTokens` field.
pub const TOKENS_PER_REQUEST: i64 = 100;

pub mod codes {
    use std::time::Duration;

    /// Verification codes live for 10 minutes.
    pub const TTL: Duration = Duration::from_secs(10 * 60);

    /// How often the expiry sweep reclaims dead rows.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
}

pub mod defaults {
    /// Quota ceiling for admin-created accounts.
    pub const TOTAL_COUNT: i64 = 100;

    /// New accounts expire 30 days out.
    pub const ACCOUNT_LIFETIME_DAYS: i64 = 30;

    /// Bootstrap admin accounts expire a year out.
    pub const ADMIN_LIFETIME_DAYS: i64 = 365;
}

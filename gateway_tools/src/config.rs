use log::*;
use spg_common::Secret;

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| {
        warn!("{var} not set, using {default} as default");
        default.to_string()
    })
}

fn secret_or(var: &str, default: &str) -> Secret<String> {
    Secret::new(std::env::var(var).unwrap_or_else(|_| {
        warn!("{var} not set, using a (probably useless) default");
        default.to_string()
    }))
}

#[derive(Debug, Clone, Default)]
pub struct PhonePeConfig {
    pub merchant_id: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub salt_key: Secret<String>,
    pub salt_index: String,
    pub pay_base_url: String,
    pub oauth_base_url: String,
}

impl PhonePeConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            merchant_id: env_or("SPG_PHONEPE_MERCHANT_ID", "M000000000000"),
            client_id: env_or("SPG_PHONEPE_CLIENT_ID", "client-id"),
            client_secret: secret_or("SPG_PHONEPE_CLIENT_SECRET", "00000000"),
            salt_key: secret_or("SPG_PHONEPE_SALT_KEY", "00000000"),
            salt_index: env_or("SPG_PHONEPE_SALT_INDEX", "1"),
            pay_base_url: env_or("SPG_PHONEPE_PAY_BASE_URL", "https://api.phonepe.com/apis/pg"),
            oauth_base_url: env_or("SPG_PHONEPE_OAUTH_BASE_URL", "https://api.phonepe.com/apis/identity-manager"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EasebuzzConfig {
    pub merchant_key: String,
    pub salt: Secret<String>,
    pub base_url: String,
}

impl EasebuzzConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            merchant_key: env_or("SPG_EASEBUZZ_MERCHANT_KEY", "key"),
            salt: secret_or("SPG_EASEBUZZ_SALT", "00000000"),
            base_url: env_or("SPG_EASEBUZZ_BASE_URL", "https://pay.easebuzz.in"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZohoPayConfig {
    pub account_id: String,
    pub access_token: Secret<String>,
    pub api_base_url: String,
}

impl ZohoPayConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            account_id: env_or("SPG_ZOHOPAY_ACCOUNT_ID", "0000000000"),
            access_token: secret_or("SPG_ZOHOPAY_ACCESS_TOKEN", "zoho-token"),
            api_base_url: env_or("SPG_ZOHOPAY_API_BASE_URL", "https://payments.zoho.in/api/v1"),
        }
    }
}

/// All three gateway configurations, loaded together at startup.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub phonepe: PhonePeConfig,
    pub easebuzz: EasebuzzConfig,
    pub zohopay: ZohoPayConfig,
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        Self {
            phonepe: PhonePeConfig::new_from_env_or_default(),
            easebuzz: EasebuzzConfig::new_from_env_or_default(),
            zohopay: ZohoPayConfig::new_from_env_or_default(),
        }
    }
}

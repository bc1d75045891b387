use std::env;

use chrono::Duration;
use gateway_tools::GatewayConfig;
use log::*;
use spg_common::{parse_boolean_flag, Secret};

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8480;
const DEFAULT_SITE_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_POLL_INTERVAL: Duration = Duration::seconds(10);
const DEFAULT_POLL_BUDGET: Duration = Duration::seconds(120);
// the poll budget must fall between these bounds; out-of-range values are clamped
const MIN_POLL_BUDGET: Duration = Duration::seconds(60);
const MAX_POLL_BUDGET: Duration = Duration::seconds(300);
const DEFAULT_AUDIT_SWEEP_INTERVAL: Duration = Duration::hours(1);
const DEFAULT_AUDIT_SWEEP_LOOKBACK: Duration = Duration::hours(48);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The storefront origin that shoppers are redirected back to after a payment attempt.
    pub site_origin: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_forwarded: bool,
    /// How often the status poller asks the gateway about an in-flight order.
    pub poll_interval: Duration,
    /// How long the poller keeps trying before handing the order over to the audit sweep.
    pub poll_budget: Duration,
    /// The period of the audit sweep over still-pending orders.
    pub audit_sweep_interval: Duration,
    /// How far back the audit sweep looks for pending orders.
    pub audit_sweep_lookback: Duration,
    /// Webhook signature checking.
    pub webhook_auth: WebhookAuthConfig,
    /// Gateway API credentials.
    pub gateways: GatewayConfig,
}

#[derive(Clone, Debug, Default)]
pub struct WebhookAuthConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: String::default(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_budget: DEFAULT_POLL_BUDGET,
            audit_sweep_interval: DEFAULT_AUDIT_SWEEP_INTERVAL,
            audit_sweep_lookback: DEFAULT_AUDIT_SWEEP_LOOKBACK,
            webhook_auth: WebhookAuthConfig::default(),
            gateways: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SPG_DATABASE_URL is not set. Please set it to the URL for the orders database.");
            String::default()
        });
        let site_origin = env::var("SPG_SITE_ORIGIN").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_SITE_ORIGIN is not set. Redirects will bounce to {DEFAULT_SITE_ORIGIN}.");
            DEFAULT_SITE_ORIGIN.to_string()
        });
        let site_origin = site_origin.trim_end_matches('/').to_string();
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPG_USE_FORWARDED").ok(), false);
        let poll_interval = duration_from_env("SPG_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL);
        let poll_budget = clamp_poll_budget(duration_from_env("SPG_POLL_BUDGET_SECS", DEFAULT_POLL_BUDGET));
        let audit_sweep_interval =
            duration_from_env("SPG_AUDIT_SWEEP_INTERVAL_SECS", DEFAULT_AUDIT_SWEEP_INTERVAL);
        let audit_sweep_lookback = env::var("SPG_AUDIT_SWEEP_LOOKBACK_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or(DEFAULT_AUDIT_SWEEP_LOOKBACK);
        let webhook_auth = WebhookAuthConfig::from_env_or_default();
        let gateways = GatewayConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            site_origin,
            use_x_forwarded_for,
            use_forwarded,
            poll_interval,
            poll_budget,
            audit_sweep_interval,
            audit_sweep_lookback,
            webhook_auth,
            gateways,
        }
    }
}

impl WebhookAuthConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_checks = parse_boolean_flag(env::var("SPG_WEBHOOK_HMAC_CHECKS").ok(), true);
        let hmac_secret = env::var("SPG_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            if hmac_checks {
                error!(
                    "🪛️ SPG_WEBHOOK_HMAC_SECRET is not set but HMAC checks are enabled. Webhook signatures will \
                     not validate."
                );
            }
            String::default()
        });
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

fn duration_from_env(var: &str, default: Duration) -> Duration {
    env::var(var).ok().and_then(|s| s.parse::<i64>().ok()).map(Duration::seconds).unwrap_or(default)
}

fn clamp_poll_budget(budget: Duration) -> Duration {
    if budget < MIN_POLL_BUDGET {
        warn!("🪛️ Poll budget of {}s is too short. Clamping to {}s.", budget.num_seconds(), MIN_POLL_BUDGET.num_seconds());
        MIN_POLL_BUDGET
    } else if budget > MAX_POLL_BUDGET {
        warn!("🪛️ Poll budget of {}s is too long. Clamping to {}s.", budget.num_seconds(), MAX_POLL_BUDGET.num_seconds());
        MAX_POLL_BUDGET
    } else {
        budget
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn poll_budget_is_clamped_to_its_bounds() {
        assert_eq!(clamp_poll_budget(Duration::seconds(5)), MIN_POLL_BUDGET);
        assert_eq!(clamp_poll_budget(Duration::seconds(301)), MAX_POLL_BUDGET);
        assert_eq!(clamp_poll_budget(Duration::seconds(120)), Duration::seconds(120));
    }
}

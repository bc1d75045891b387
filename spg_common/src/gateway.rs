use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------      Gateway      -----------------------------------------------------------
/// The external payment providers the storefront can collect payments through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    PhonePe,
    Easebuzz,
    ZohoPay,
}

impl Gateway {
    pub const ALL: [Gateway; 3] = [Gateway::PhonePe, Gateway::Easebuzz, Gateway::ZohoPay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::PhonePe => "phonepe",
            Gateway::Easebuzz => "easebuzz",
            Gateway::ZohoPay => "zohopay",
        }
    }
}

impl Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown payment gateway: {0}")]
pub struct UnknownGateway(String);

impl FromStr for Gateway {
    type Err = UnknownGateway;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phonepe" => Ok(Gateway::PhonePe),
            "easebuzz" => Ok(Gateway::Easebuzz),
            "zohopay" | "zoho" => Ok(Gateway::ZohoPay),
            other => Err(UnknownGateway(other.to_string())),
        }
    }
}

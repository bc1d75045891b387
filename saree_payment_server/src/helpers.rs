use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use gateway_tools::helpers::hmac_sha256_hex;
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address,
/// in decreasing order of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result =
            req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        let re = Regex::new(r#"for=(?P<ip>[^;]+)"#).unwrap();
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.captures(v))
            .and_then(|caps| caps.name("ip"))
            .map(|m| m.as_str())
            .and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// The signature the webhook HMAC middleware compares against: hex-encoded HMAC-SHA256 over
/// the raw request body.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    hmac_sha256_hex(secret, data)
}

#[cfg(test)]
mod test {
    use super::calculate_hmac;

    #[test]
    fn hmac_signature_is_stable() {
        let sig = calculate_hmac("topsecret", br#"{"order_id":"SR-1"}"#);
        assert_eq!(sig, calculate_hmac("topsecret", br#"{"order_id":"SR-1"}"#));
        assert_eq!(sig.len(), 64);
    }
}

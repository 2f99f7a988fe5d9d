use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;

const SERVER_PORT: &str = "HOSTWATCH_PORT";

const DEFAULT_PORT: u16 = 3001;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(SERVER_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const SERVER_ADDR: &str = "HOSTWATCH_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(SERVER_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

/// Format an uptime in seconds as the dashboard expects it: "3d 4h 12m",
/// dropping the day (or day and hour) part when zero.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn uptime_days_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)d").expect("static regex"))
}

/// Extract the leading day count from a formatted uptime.
///
/// Uptimes without a day token ("4h 12m") parse as 0 days.
pub fn parse_uptime_days(uptime: &str) -> u64 {
    uptime_days_re()
        .captures(uptime)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

use std::env;
use std::time::Duration;

use crate::model::Position;
use crate::name_match::MatchPolicy;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub team_id: Option<u64>,
    pub use_web_data: bool,
    pub use_cache: bool,
    pub cache_ttl: Duration,
    pub scout_url: Option<String>,
    pub scrape_delay: Duration,
    pub fetch_parallelism: usize,
    pub transfer_count: usize,
    pub captain_top_n: usize,
    pub name_match: MatchPolicy,
    pub position_filter: Option<Position>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            team_id: None,
            use_web_data: false,
            use_cache: true,
            cache_ttl: Duration::from_secs(6 * 60 * 60),
            scout_url: None,
            scrape_delay: Duration::from_millis(2000),
            fetch_parallelism: 6,
            transfer_count: 2,
            captain_top_n: 5,
            name_match: MatchPolicy::Substring,
            position_filter: None,
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_hours = env::var("FPL_CACHE_HOURS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(6)
            .min(24 * 7);
        Self {
            team_id: opt_env("FPL_TEAM_ID").and_then(|val| val.trim().parse::<u64>().ok()),
            use_web_data: flag_env("FPL_USE_WEB_DATA").unwrap_or(defaults.use_web_data),
            use_cache: flag_env("FPL_USE_CACHE").unwrap_or(defaults.use_cache),
            cache_ttl: Duration::from_secs(cache_hours * 60 * 60),
            scout_url: opt_env("FPL_SCOUT_URL"),
            scrape_delay: Duration::from_millis(
                env::var("FPL_SCRAPE_DELAY_MS")
                    .ok()
                    .and_then(|val| val.trim().parse::<u64>().ok())
                    .unwrap_or(2000)
                    .min(30_000),
            ),
            fetch_parallelism: env::var("FPL_FETCH_PARALLELISM")
                .ok()
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(6)
                .clamp(1, 16),
            transfer_count: env::var("FPL_TRANSFER_COUNT")
                .ok()
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(2)
                .clamp(1, 15),
            captain_top_n: env::var("FPL_CAPTAIN_TOP_N")
                .ok()
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(5)
                .clamp(1, 15),
            name_match: opt_env("FPL_NAME_MATCH")
                .and_then(|val| val.parse::<MatchPolicy>().ok())
                .unwrap_or(defaults.name_match),
            position_filter: opt_env("FPL_POSITION").and_then(|val| val.parse::<Position>().ok()),
        }
    }

    pub fn effective_cache_ttl(&self) -> Duration {
        if self.use_cache {
            self.cache_ttl
        } else {
            Duration::ZERO
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn flag_env(key: &str) -> Option<bool> {
    opt_env(key).and_then(|val| parse_flag(&val))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn disabled_cache_has_zero_ttl() {
        let cfg = AdvisorConfig {
            use_cache: false,
            ..AdvisorConfig::default()
        };
        assert!(cfg.effective_cache_ttl().is_zero());
        assert_eq!(
            AdvisorConfig::default().effective_cache_ttl(),
            Duration::from_secs(21_600)
        );
    }
}

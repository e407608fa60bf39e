// ---------------------------------------------------------------------------
// DaemonConfig — file-based config loader (credpool.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Reference URL the liveness probe and the network-up check hit. Any stable
/// plain-HTTP endpoint that answers 200 works; this is the historical default.
pub const DEFAULT_PROBE_URL: &str = "http://www.baidu.com";

/// Raw contents of `credpool.json`. Every field is optional; the `resolve_*`
/// methods apply env-var fallback and defaults, so a missing file means
/// "all defaults".
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct DaemonConfig {
    /// Store address, e.g. `127.0.0.1:6379`.
    pub store_addr: Option<String>,
    /// Store password. Never logged. Empty for unauthenticated stores.
    pub store_password: Option<String>,
    /// Sorted-set key the proxy ranking lives under.
    pub key: Option<String>,
    /// Bind address for the selection API, e.g. `127.0.0.1:8090`.
    pub api_addr: Option<String>,
    /// Skip the crawl sweep while the index holds at least this many
    /// candidates. 0 disables the cap.
    pub threshold: Option<u64>,
    /// Seconds between probe sweeps.
    pub probe_cycle_secs: Option<u64>,
    /// Seconds between crawl sweeps.
    pub crawl_cycle_secs: Option<u64>,
    /// Reference URL for liveness probes.
    pub probe_url: Option<String>,
}

impl DaemonConfig {
    /// Store address: JSON field → `CREDPOOL_STORE_ADDR` env var → `127.0.0.1:6379`.
    pub fn resolve_store_addr(&self) -> String {
        resolve(&self.store_addr, "CREDPOOL_STORE_ADDR", "127.0.0.1:6379")
    }

    /// Store password: JSON field → `CREDPOOL_STORE_PASSWORD` env var → empty.
    pub fn resolve_store_password(&self) -> String {
        resolve(&self.store_password, "CREDPOOL_STORE_PASSWORD", "")
    }

    /// Index key: JSON field → `CREDPOOL_KEY` env var → `credpool:proxies`.
    pub fn resolve_key(&self) -> String {
        resolve(&self.key, "CREDPOOL_KEY", "credpool:proxies")
    }

    /// API bind address: JSON field → `CREDPOOL_API_ADDR` env var → `127.0.0.1:8090`.
    pub fn resolve_api_addr(&self) -> String {
        resolve(&self.api_addr, "CREDPOOL_API_ADDR", "127.0.0.1:8090")
    }

    /// Crawl threshold: JSON field → `CREDPOOL_THRESHOLD` env var → 10000.
    pub fn resolve_threshold(&self) -> u64 {
        if let Some(n) = self.threshold {
            return n;
        }
        std::env::var("CREDPOOL_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000)
    }

    /// Probe sweep period in seconds. Default: 60.
    pub fn resolve_probe_cycle_secs(&self) -> u64 {
        self.probe_cycle_secs.unwrap_or(60)
    }

    /// Crawl sweep period in seconds. Default: 7200 — listing sites refresh
    /// slowly and resent frequent visitors.
    pub fn resolve_crawl_cycle_secs(&self) -> u64 {
        self.crawl_cycle_secs.unwrap_or(7_200)
    }

    /// Probe reference URL: JSON field → `CREDPOOL_PROBE_URL` env var → default.
    pub fn resolve_probe_url(&self) -> String {
        resolve(&self.probe_url, "CREDPOOL_PROBE_URL", DEFAULT_PROBE_URL)
    }
}

fn resolve(field: &Option<String>, env_key: &str, default: &str) -> String {
    if let Some(v) = field {
        if !v.trim().is_empty() || default.is_empty() {
            return v.clone();
        }
    }
    std::env::var(env_key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Load `credpool.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `CREDPOOL_CONFIG` env var path
/// 2. `./credpool.json`  (process cwd)
/// 3. `../credpool.json` (one level up, when running from a subdirectory)
///
/// Missing file → `DaemonConfig::default()` (silent, env-var fallbacks apply).
/// Parse error → log a warning, return `DaemonConfig::default()`.
pub fn load_daemon_config() -> DaemonConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("credpool.json"),
            std::path::PathBuf::from("../credpool.json"),
        ];
        if let Ok(env_path) = std::env::var("CREDPOOL_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<DaemonConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("credpool.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "credpool.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return DaemonConfig::default();
                }
            },
            Err(_) => continue, // not found at this path — try next
        }
    }

    DaemonConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_config() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.resolve_key(), "credpool:proxies");
        assert_eq!(cfg.resolve_threshold(), 10_000);
        assert_eq!(cfg.resolve_probe_cycle_secs(), 60);
        assert_eq!(cfg.resolve_probe_url(), DEFAULT_PROBE_URL);
    }

    #[test]
    fn json_field_wins_over_default() {
        let cfg: DaemonConfig =
            serde_json::from_str(r#"{"key": "pool:test", "threshold": 5}"#).unwrap();
        assert_eq!(cfg.resolve_key(), "pool:test");
        assert_eq!(cfg.resolve_threshold(), 5);
    }
}

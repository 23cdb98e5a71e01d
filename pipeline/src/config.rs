use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::market::{METAL_PRICE_BAND, MID_RATE_BAND};
use crate::normalize::SanityBand;
use crate::pricing::AlloyFormula;
use crate::resolve::{Concept, Vocabulary};
use crate::source::{MAX_TIMEOUT, SourceConfig, SourceKind};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string for the price ledger.
    pub database_url: String,

    // =========================
    // Fetching
    // =========================
    /// Per-request timeout. Never above 15s.
    pub http_timeout: Duration,

    /// Sent to every source; the bank and quote boards reject bare clients.
    pub user_agent: String,

    /// Sources fetched each cycle. Replaced wholesale by `SOURCES_PATH`.
    pub sources: Vec<SourceConfig>,

    /// Optional deadline for a whole cycle. When it elapses in-flight
    /// fetches are dropped and nothing is written.
    pub cycle_timeout: Option<Duration>,

    // =========================
    // Resolution and pricing
    // =========================
    /// Header wording and metal aliases. Replaced by `VOCABULARY_PATH`.
    pub vocabulary: Vocabulary,

    pub formulas: Vec<AlloyFormula>,

    /// FX code whose mid rate converts USD into local currency.
    pub pricing_currency: String,

    /// Currency written for local-per-kg history rows.
    pub local_currency: String,

    pub mid_rate_band: SanityBand,
    pub metal_price_band: SanityBand,

    /// JSON logs (`APP_ENV=production`).
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| "sqlite://csp_history.db?mode=rwc".to_string());

        let http_timeout = match var("HTTP_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_ms("HTTP_TIMEOUT_MS", &v)?).min(MAX_TIMEOUT),
            None => MAX_TIMEOUT,
        };

        let cycle_timeout = var("CYCLE_TIMEOUT_MS")
            .map(|v| parse_ms("CYCLE_TIMEOUT_MS", &v).map(Duration::from_millis))
            .transpose()?;

        let sources = match var("SOURCES_PATH") {
            Some(path) => load_sources(Path::new(&path))?,
            None => default_sources(),
        };

        let vocabulary = match var("VOCABULARY_PATH") {
            Some(path) => Vocabulary::from_json_file(Path::new(&path))?,
            None => Vocabulary::default(),
        };

        Ok(Self {
            database_url,
            http_timeout,
            user_agent: var("HTTP_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            sources,
            cycle_timeout,
            vocabulary,
            formulas: AlloyFormula::defaults(),
            pricing_currency: currency_var("PRICING_CURRENCY", var("PRICING_CURRENCY"), "USD")?,
            local_currency: currency_var("LOCAL_CURRENCY", var("LOCAL_CURRENCY"), "TWD")?,
            mid_rate_band: MID_RATE_BAND,
            metal_price_band: METAL_PRICE_BAND,
            json_logs: var("APP_ENV").is_some_and(|v| v == "production"),
        })
    }
}

pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("lme", SourceKind::MetalQuotes, "https://quote.fx678.com/exchange/LME")
            .expecting(&[Concept::MetalName, Concept::LastPrice, Concept::Change, Concept::ChangePercent]),
        SourceConfig::new("bot", SourceKind::FxRates, "https://rate.bot.com.tw/xrt?Lang=zh-TW")
            .expecting(&[Concept::Currency, Concept::SpotBuy, Concept::SpotSell])
            .with_as_of_marker("掛牌日期"),
        SourceConfig::new(
            "westmetall",
            SourceKind::ReferenceClose,
            "https://www.westmetall.com/en/markdaten.php",
        )
        .expecting(&[Concept::CashSettlement, Concept::ThreeMonth]),
    ]
}

fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn parse_ms(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn currency_var(key: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    let Some(v) = value else {
        return Ok(default.to_string());
    };
    if v.len() == 3 && v.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(v)
    } else {
        Err(ConfigError::InvalidValue { key, value: v })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.database_url, "sqlite://csp_history.db?mode=rwc");
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
        assert_eq!(cfg.pricing_currency, "USD");
        assert_eq!(cfg.local_currency, "TWD");
        assert!(cfg.cycle_timeout.is_none());
        assert!(!cfg.json_logs);
        assert!(cfg.user_agent.starts_with("Mozilla/5.0"));

        let names: Vec<_> = cfg.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["lme", "bot", "westmetall"]);
        assert_eq!(cfg.sources[1].as_of_marker.as_deref(), Some("掛牌日期"));
        assert_eq!(cfg.formulas.len(), 5);
    }

    #[test]
    fn timeout_is_clamped_and_validated() {
        let cfg = AppConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_MS", "60000"), ("CYCLE_TIMEOUT_MS", "45000")])).unwrap();
        assert_eq!(cfg.http_timeout, MAX_TIMEOUT);
        assert_eq!(cfg.cycle_timeout, Some(Duration::from_secs(45)));

        let cfg = AppConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_MS", "2500")])).unwrap();
        assert_eq!(cfg.http_timeout, Duration::from_millis(2500));

        for bad in ["soon", "0", "-5"] {
            let err = AppConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_MS", bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: "HTTP_TIMEOUT_MS", .. }));
        }
    }

    #[test]
    fn currency_and_env_switches() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("PRICING_CURRENCY", "EUR"),
            ("APP_ENV", "production"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]))
        .unwrap();
        assert_eq!(cfg.pricing_currency, "EUR");
        assert!(cfg.json_logs);
        assert_eq!(cfg.database_url, "sqlite::memory:");

        assert!(AppConfig::from_lookup(lookup(&[("LOCAL_CURRENCY", "twd")])).is_err());
    }

    #[test]
    fn sources_file_replaces_builtin_list() {
        let path = std::env::temp_dir().join(format!("sources-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"name": "bot", "kind": "fx_rates", "url": "http://127.0.0.1:9/xrt"}]"#,
        )
        .unwrap();

        let cfg = AppConfig::from_lookup(lookup(&[("SOURCES_PATH", path.to_str().unwrap())])).unwrap();
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].url, "http://127.0.0.1:9/xrt");
        std::fs::remove_file(&path).ok();

        let err = AppConfig::from_lookup(lookup(&[("SOURCES_PATH", "/nonexistent/sources.json")])).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_vocabulary_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("vocab-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::from_lookup(lookup(&[("VOCABULARY_PATH", path.to_str().unwrap())])).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        std::fs::remove_file(&path).ok();
    }
}

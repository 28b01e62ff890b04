//! Operator configuration
//!
//! Defines all configurable parameters for the operator including the
//! registry region, watch scope, concurrency, deadlines and requeue
//! backoff.

use anyhow::Context;
use ecr_client::{DEFAULT_REGION, EcrRegistryConfig};
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration
///
/// All timeouts and intervals are configurable to allow tuning for
/// different deployment scenarios.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry region; `AWS_REGION` or `us-east-1`
    pub region: String,

    /// Registry endpoint override (e.g. LocalStack)
    pub endpoint_url: Option<String>,

    /// Only watch this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,

    /// Reconciliations allowed to run at the same time
    pub max_concurrent_reconciles: u16,

    /// Deadline for one reconciliation cycle
    pub reconcile_timeout: Duration,

    /// Deadline for one registry call
    pub registry_timeout: Duration,

    /// First requeue delay after a failure
    pub requeue_base_delay: Duration,

    /// Longest requeue delay after repeated failures
    pub requeue_max_delay: Duration,

    /// Re-check interval for satisfied objects; `None` disables it
    pub resync_interval: Option<Duration>,

    /// Address for the health probe listener
    pub health_bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            watch_namespace: None,
            max_concurrent_reconciles: 4,
            reconcile_timeout: Duration::from_secs(30),
            registry_timeout: Duration::from_secs(10),
            requeue_base_delay: Duration::from_secs(1),
            requeue_max_delay: Duration::from_secs(300),
            resync_interval: Some(Duration::from_secs(36_000)), // 10 hours
            health_bind_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables, all optional:
    /// - AWS_REGION (default: us-east-1)
    /// - ECR_ENDPOINT_URL
    /// - WATCH_NAMESPACE (default: all namespaces)
    /// - MAX_CONCURRENT_RECONCILES (default: 4)
    /// - RECONCILE_TIMEOUT (seconds, default: 30)
    /// - REGISTRY_TIMEOUT (seconds, default: 10)
    /// - REQUEUE_BASE_DELAY (seconds, default: 1)
    /// - REQUEUE_MAX_DELAY (seconds, default: 300)
    /// - RESYNC_INTERVAL (seconds, default: 36000, 0 disables)
    /// - HEALTH_BIND_ADDR (default: 0.0.0.0:8081)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable source
    ///
    /// Empty values count as unset. Values that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            Ok(parse::<u64>(key, var(key))?
                .map(Duration::from_secs)
                .unwrap_or(default))
        };

        let resync_interval = match parse::<u64>("RESYNC_INTERVAL", var("RESYNC_INTERVAL"))? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.resync_interval,
        };

        Ok(Self {
            region: var("AWS_REGION").unwrap_or(defaults.region),
            endpoint_url: var("ECR_ENDPOINT_URL"),
            watch_namespace: var("WATCH_NAMESPACE"),
            max_concurrent_reconciles: parse(
                "MAX_CONCURRENT_RECONCILES",
                var("MAX_CONCURRENT_RECONCILES"),
            )?
            .unwrap_or(defaults.max_concurrent_reconciles),
            reconcile_timeout: secs("RECONCILE_TIMEOUT", defaults.reconcile_timeout)?,
            registry_timeout: secs("REGISTRY_TIMEOUT", defaults.registry_timeout)?,
            requeue_base_delay: secs("REQUEUE_BASE_DELAY", defaults.requeue_base_delay)?,
            requeue_max_delay: secs("REQUEUE_MAX_DELAY", defaults.requeue_max_delay)?,
            resync_interval,
            health_bind_addr: var("HEALTH_BIND_ADDR").unwrap_or(defaults.health_bind_addr),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.region.trim().is_empty() {
            anyhow::bail!("region cannot be empty");
        }

        if let Some(endpoint) = &self.endpoint_url {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                anyhow::bail!("endpoint_url must start with http:// or https://");
            }
        }

        if self.max_concurrent_reconciles == 0 {
            anyhow::bail!("max_concurrent_reconciles must be greater than 0");
        }

        if self.reconcile_timeout.is_zero() {
            anyhow::bail!("reconcile_timeout must be greater than 0");
        }

        if self.registry_timeout.is_zero() {
            anyhow::bail!("registry_timeout must be greater than 0");
        }

        if self.registry_timeout > self.reconcile_timeout {
            anyhow::bail!("registry_timeout cannot exceed reconcile_timeout");
        }

        if self.requeue_base_delay.is_zero() {
            anyhow::bail!("requeue_base_delay must be greater than 0");
        }

        if self.requeue_max_delay < self.requeue_base_delay {
            anyhow::bail!("requeue_max_delay cannot be less than requeue_base_delay");
        }

        Ok(())
    }

    /// Settings for the registry gateway
    pub fn registry_config(&self) -> EcrRegistryConfig {
        EcrRegistryConfig {
            region: self.region.clone(),
            endpoint: self.endpoint_url.clone(),
            timeout: Some(self.registry_timeout),
        }
    }
}

fn parse<T>(key: &str, value: Option<String>) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has invalid value '{raw}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.max_concurrent_reconciles, 4);
        assert_eq!(config.resync_interval, Some(Duration::from_secs(36_000)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_region_falls_back_to_default() {
        assert_eq!(from_vars(&[]).unwrap().region, "us-east-1");
        assert_eq!(from_vars(&[("AWS_REGION", "")]).unwrap().region, "us-east-1");
        assert_eq!(
            from_vars(&[("AWS_REGION", "eu-west-1")]).unwrap().region,
            "eu-west-1"
        );
    }

    #[test]
    fn test_overrides() {
        let config = from_vars(&[
            ("WATCH_NAMESPACE", "team-a"),
            ("MAX_CONCURRENT_RECONCILES", "8"),
            ("RECONCILE_TIMEOUT", "60"),
            ("REQUEUE_MAX_DELAY", "120"),
            ("RESYNC_INTERVAL", "0"),
            ("ECR_ENDPOINT_URL", "http://localhost:4566"),
        ])
        .unwrap();

        assert_eq!(config.watch_namespace.as_deref(), Some("team-a"));
        assert_eq!(config.max_concurrent_reconciles, 8);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(60));
        assert_eq!(config.requeue_max_delay, Duration::from_secs(120));
        assert_eq!(config.resync_interval, None);
        assert!(config.validate().is_ok());

        let registry = config.registry_config();
        assert_eq!(registry.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(registry.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_unparseable_value_is_error() {
        let err = from_vars(&[("RECONCILE_TIMEOUT", "soon")]).unwrap_err();
        assert!(err.to_string().contains("RECONCILE_TIMEOUT"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.max_concurrent_reconciles = 0;
        assert!(config.validate().is_err());
        config.max_concurrent_reconciles = 1;

        config.endpoint_url = Some("localhost:4566".to_string());
        assert!(config.validate().is_err());
        config.endpoint_url = None;

        config.registry_timeout = Duration::from_secs(120);
        assert!(config.validate().is_err());
        config.registry_timeout = Duration::from_secs(10);

        config.requeue_max_delay = Duration::from_millis(500);
        assert!(config.validate().is_err());
    }
}

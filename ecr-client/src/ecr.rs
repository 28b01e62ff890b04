//! Amazon ECR gateway
//!
//! Implements [`RegistryGateway`] with `DescribeRepositories` and
//! `CreateRepository`. SDK errors are classified by their service error
//! code; everything the SDK cannot attribute to the service (dispatch,
//! response parsing, timeouts) is transient.

use async_trait::async_trait;
use aws_sdk_ecr::Client;
use aws_sdk_ecr::config::Region;
use aws_sdk_ecr::config::timeout::TimeoutConfig;
use aws_sdk_ecr::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use ecr_core::domain::RepositoryName;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::{CreateOutcome, DEFAULT_REGION, Presence, RegistryGateway};

/// ECR gateway configuration
#[derive(Debug, Clone)]
pub struct EcrRegistryConfig {
    /// AWS region the repositories live in
    pub region: String,

    /// Optional endpoint override (e.g. LocalStack)
    pub endpoint: Option<String>,

    /// Deadline for a single registry operation, retries included
    pub timeout: Option<Duration>,
}

impl EcrRegistryConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            timeout: None,
        }
    }
}

impl Default for EcrRegistryConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

/// Registry gateway backed by Amazon ECR
#[derive(Clone)]
pub struct EcrRegistry {
    client: Client,
    region: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for EcrRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcrRegistry")
            .field("region", &self.region)
            .finish()
    }
}

impl EcrRegistry {
    /// Loads credentials from the default provider chain and builds a gateway
    pub async fn connect(config: EcrRegistryConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self::new(&sdk_config, config)
    }

    /// Builds a gateway from a shared SDK configuration
    ///
    /// Inherits HTTP client, credentials and retry settings from `sdk_config`
    /// and applies the region, endpoint and timeout overrides on top.
    pub fn new(sdk_config: &aws_config::SdkConfig, config: EcrRegistryConfig) -> Self {
        let mut builder = aws_sdk_ecr::config::Builder::from(sdk_config)
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout) = config.timeout {
            let timeout_config = TimeoutConfig::builder().operation_timeout(timeout).build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: config.region,
            timeout: config.timeout,
        }
    }

    /// Create from a pre-built client
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
            timeout: None,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Maps an SDK failure into the registry error taxonomy
    fn classify<E, R>(&self, err: SdkError<E, R>) -> RegistryError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        if let (SdkError::TimeoutError(_), Some(timeout)) = (&err, self.timeout) {
            return RegistryError::TimedOut(timeout);
        }

        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        RegistryError::from_code(code.as_deref(), message)
    }
}

#[async_trait]
impl RegistryGateway for EcrRegistry {
    async fn exists(&self, name: &RepositoryName) -> Result<Presence> {
        debug!(repository = %name, region = %self.region, "Describing repository");

        let result = self
            .client
            .describe_repositories()
            .repository_names(name.as_str())
            .send()
            .await;

        match result {
            Ok(output) => {
                let found = output
                    .repositories()
                    .iter()
                    .any(|repo| repo.repository_name() == Some(name.as_str()));
                Ok(if found {
                    Presence::Present
                } else {
                    Presence::Absent
                })
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_repository_not_found_exception()) =>
            {
                Ok(Presence::Absent)
            }
            Err(err) => match self.classify(err) {
                e if e.is_not_found() => Ok(Presence::Absent),
                e => Err(e),
            },
        }
    }

    async fn create(&self, name: &RepositoryName) -> Result<CreateOutcome> {
        info!(repository = %name, region = %self.region, "Creating repository");

        let result = self
            .client
            .create_repository()
            .repository_name(name.as_str())
            .send()
            .await;

        match result {
            Ok(output) => {
                debug!(
                    repository = %name,
                    uri = output
                        .repository()
                        .and_then(|r| r.repository_uri())
                        .unwrap_or_default(),
                    "Repository created"
                );
                Ok(CreateOutcome::Created)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_repository_already_exists_exception()) =>
            {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => match self.classify(err) {
                e if e.is_already_exists() => Ok(CreateOutcome::AlreadyExists),
                e => Err(e),
            },
        }
    }
}

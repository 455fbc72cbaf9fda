use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub signing: SigningConfig,
    pub links: LinkConfig,
    pub directory: DirectoryConfig,
    pub smtp: SmtpConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Process-wide token signing secret, loaded once at startup and handed to
/// the codec by value. Nothing else reads it.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Base URL the approve/deny links are built against.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub api_token: String,
    /// Group every approved user is added to.
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub admin_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl RegistrationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = RegistrationConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("registration-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            signing: SigningConfig {
                secret_key: get_env("SECRET_KEY", None, true)?,
            },
            links: LinkConfig {
                public_base_url: get_env(
                    "PUBLIC_BASE_URL",
                    Some("http://localhost:8080"),
                    is_prod,
                )?,
            },
            directory: DirectoryConfig {
                base_url: get_env("DIRECTORY_BASE_URL", None, is_prod)?,
                api_token: get_env("DIRECTORY_API_TOKEN", None, is_prod)?,
                group_id: get_env("DIRECTORY_GROUP_ID", None, is_prod)?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                user: get_env("SMTP_USER", None, is_prod)?,
                password: get_env("SMTP_PASSWORD", None, is_prod)?,
                from_email: get_env("FROM_EMAIL", None, is_prod)?,
                admin_email: get_env("ADMIN_EMAIL", None, is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.signing.secret_key.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SECRET_KEY must not be empty"
            )));
        }

        if self.environment == Environment::Prod {
            if self.signing.secret_key.len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SECRET_KEY must be at least 32 characters in production"
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if !self.links.public_base_url.starts_with("https://") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "PUBLIC_BASE_URL must be https in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Configuration
//!
//! Typed view of the namespaced configuration keys a stack is built from.
//! A configuration can be assembled from a flat key map, from a stack YAML
//! file with a `config:` section, and overlaid from `TOPOLOGY_*` environment
//! variables.
//!
//! Every required key is checked before any construction stage runs.
//! Secrets are held as [`SecretString`] and never appear in `Debug` output.
//!
//! # Example
//!
//! ```rust,ignore
//! let yaml = std::fs::read_to_string("Pulumi.dev.yaml")?;
//! let config = StackConfig::from_yaml_str_with_env("iac-pulumi", &yaml, |name| {
//!     std::env::var(name).ok()
//! })?;
//! ```

use ipnet::{IpNet, Ipv4Net};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::ConfigurationError;
use crate::frp::Deferred;

/// Configuration key names
pub mod keys {
    pub const CIDR_BLOCK: &str = "vpc:cidrBlock";
    pub const VPC_NAME: &str = "vpc:name";
    pub const IGW_NAME: &str = "igw:name";
    pub const REGION: &str = "aws:region";
    pub const PUBLIC_ROUTE_DESTINATION: &str = "publicRoute:destinationCIDR";
    pub const KEY_PAIR: &str = "ami:keyPair";
    pub const AMI_ID: &str = "ami:ID";
    pub const MAILGUN_API_KEY: &str = "mg:apikey";
    pub const DOMAIN_NAME: &str = "dns:domainName";
    pub const ACCOUNT_ID: &str = "awsAccount:Id";
    pub const HOSTED_ZONE_ID: &str = "dns:hostedZoneId";
    pub const CERTIFICATE_ARN: &str = "certificateArn";
    pub const DB_PASSWORD: &str = "dbPassword";
    pub const PROFILE: &str = "aws:profile";
    pub const SERVERLESS_ZIP: &str = "serverless:zip";

    /// Required keys in validation order; the address block comes first
    pub const REQUIRED: [&str; 13] = [
        CIDR_BLOCK,
        VPC_NAME,
        IGW_NAME,
        REGION,
        PUBLIC_ROUTE_DESTINATION,
        KEY_PAIR,
        AMI_ID,
        MAILGUN_API_KEY,
        DOMAIN_NAME,
        ACCOUNT_ID,
        HOSTED_ZONE_ID,
        CERTIFICATE_ARN,
        DB_PASSWORD,
    ];

    pub const OPTIONAL: [&str; 2] = [PROFILE, SERVERLESS_ZIP];
}

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "TOPOLOGY_";

/// `Environment` tag value when `aws:profile` is absent
pub const DEFAULT_PROFILE: &str = "dev";

/// Environment variable overriding a key, e.g. `TOPOLOGY_VPC_CIDRBLOCK`
pub fn env_var_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.replace(':', "_").to_uppercase())
}

/// Validated stack configuration
#[derive(Debug)]
pub struct StackConfig {
    pub address_block: Ipv4Net,
    pub vpc_name: String,
    pub igw_name: String,
    pub region: String,
    pub public_route_destination: IpNet,
    pub key_pair: String,
    pub ami_id: String,
    pub mailgun_api_key: SecretString,
    pub domain_name: String,
    pub account_id: String,
    pub hosted_zone_id: String,
    pub certificate_arn: SecretString,
    pub db_password: SecretString,
    pub profile: String,
    pub serverless_zip: Option<String>,
}

/// Stack file layout: only the `config:` section is read
#[derive(Debug, Deserialize)]
struct StackFile {
    #[serde(default)]
    config: BTreeMap<String, serde_yaml::Value>,
}

fn required<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, ConfigurationError> {
    map.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigurationError::MissingKey { key: key.to_string() })
}

fn optional(map: &BTreeMap<String, String>, key: &str) -> Option<String> {
    map.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn scalar(key: &str, value: &serde_yaml::Value) -> Result<String, ConfigurationError> {
    use serde_yaml::Value;
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Mapping(m) if m.contains_key("secure") => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            reason: "encrypted value; decrypt it before building the topology".into(),
        }),
        _ => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            reason: "expected a scalar value".into(),
        }),
    }
}

impl StackConfig {
    /// Build from a flat namespaced key map
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ConfigurationError> {
        for key in keys::REQUIRED {
            required(map, key)?;
        }

        let cidr = required(map, keys::CIDR_BLOCK)?;
        let address_block: Ipv4Net =
            cidr.parse().map_err(|e: ipnet::AddrParseError| ConfigurationError::InvalidValue {
                key: keys::CIDR_BLOCK.into(),
                reason: format!("{cidr}: {e}"),
            })?;

        let destination = required(map, keys::PUBLIC_ROUTE_DESTINATION)?;
        let public_route_destination: IpNet =
            destination
                .parse()
                .map_err(|e: ipnet::AddrParseError| ConfigurationError::InvalidValue {
                    key: keys::PUBLIC_ROUTE_DESTINATION.into(),
                    reason: format!("{destination}: {e}"),
                })?;

        let text = |key: &str| required(map, key).map(str::to_string);
        let secret = |key: &str| required(map, key).map(|v| SecretString::from(v.to_string()));

        let config = Self {
            address_block,
            vpc_name: text(keys::VPC_NAME)?,
            igw_name: text(keys::IGW_NAME)?,
            region: text(keys::REGION)?,
            public_route_destination,
            key_pair: text(keys::KEY_PAIR)?,
            ami_id: text(keys::AMI_ID)?,
            mailgun_api_key: secret(keys::MAILGUN_API_KEY)?,
            domain_name: text(keys::DOMAIN_NAME)?,
            account_id: text(keys::ACCOUNT_ID)?,
            hosted_zone_id: text(keys::HOSTED_ZONE_ID)?,
            certificate_arn: secret(keys::CERTIFICATE_ARN)?,
            db_password: secret(keys::DB_PASSWORD)?,
            profile: optional(map, keys::PROFILE).unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            serverless_zip: optional(map, keys::SERVERLESS_ZIP),
        };

        debug!(
            address_block = %config.address_block,
            region = %config.region,
            profile = %config.profile,
            "stack configuration loaded"
        );
        Ok(config)
    }

    /// Build from a stack YAML file
    ///
    /// Keys in the project's own namespace (`<project>:dbPassword`) are
    /// read without the prefix.
    pub fn from_yaml_str(project: &str, yaml: &str) -> Result<Self, ConfigurationError> {
        Self::from_map(&Self::yaml_map(project, yaml)?)
    }

    fn yaml_map(project: &str, yaml: &str) -> Result<BTreeMap<String, String>, ConfigurationError> {
        let file: StackFile = serde_yaml::from_str(yaml)?;
        let prefix = format!("{project}:");

        file.config
            .iter()
            .map(|(key, value)| {
                let key = key.strip_prefix(&prefix).unwrap_or(key).to_string();
                let value = scalar(&key, value)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Build from a key map with environment overrides applied
    ///
    /// `lookup` maps a variable name to its value; pass
    /// `|name| std::env::var(name).ok()` for the process environment.
    pub fn from_map_with_env<F>(map: &BTreeMap<String, String>, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut map = map.clone();
        overlay_env(&mut map, lookup);
        Self::from_map(&map)
    }

    pub fn from_yaml_str_with_env<F>(project: &str, yaml: &str, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut map = Self::yaml_map(project, yaml)?;
        overlay_env(&mut map, lookup);
        Self::from_map(&map)
    }

    /// Database credential as an already-known secret value
    pub fn db_password_value(&self) -> Deferred<String> {
        Deferred::ready(keys::DB_PASSWORD, self.db_password.expose_secret().to_string()).into_secret()
    }

    pub fn certificate_arn_value(&self) -> Deferred<String> {
        Deferred::ready(keys::CERTIFICATE_ARN, self.certificate_arn.expose_secret().to_string())
            .into_secret()
    }

    pub fn mailgun_api_key_value(&self) -> Deferred<String> {
        Deferred::ready(keys::MAILGUN_API_KEY, self.mailgun_api_key.expose_secret().to_string())
            .into_secret()
    }
}

/// Apply `TOPOLOGY_*` overrides for every known key
pub fn overlay_env<F>(map: &mut BTreeMap<String, String>, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys::REQUIRED.iter().chain(keys::OPTIONAL.iter()) {
        if let Some(value) = lookup(&env_var_name(key)) {
            debug!(key, "configuration key overridden from environment");
            map.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> BTreeMap<String, String> {
        [
            (keys::CIDR_BLOCK, "10.0.0.0/16"),
            (keys::VPC_NAME, "csye6225-vpc"),
            (keys::IGW_NAME, "csye6225-igw"),
            (keys::REGION, "us-east-1"),
            (keys::PUBLIC_ROUTE_DESTINATION, "0.0.0.0/0"),
            (keys::KEY_PAIR, "ec2-key"),
            (keys::AMI_ID, "ami-0123456789"),
            (keys::MAILGUN_API_KEY, "mg-key"),
            (keys::DOMAIN_NAME, "demo.example.com"),
            (keys::ACCOUNT_ID, "123456789012"),
            (keys::HOSTED_ZONE_ID, "Z123"),
            (keys::CERTIFICATE_ARN, "arn:aws:acm:cert"),
            (keys::DB_PASSWORD, "pw1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_from_map() {
        let config = StackConfig::from_map(&complete()).unwrap();
        assert_eq!(config.address_block.to_string(), "10.0.0.0/16");
        assert_eq!(config.profile, DEFAULT_PROFILE);
        assert!(config.serverless_zip.is_none());
        assert_eq!(config.db_password.expose_secret(), "pw1");
    }

    #[test]
    fn test_missing_address_block_reported_first() {
        let mut map = complete();
        map.remove(keys::CIDR_BLOCK);
        map.remove(keys::DB_PASSWORD);

        let err = StackConfig::from_map(&map).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingKey {
                key: "vpc:cidrBlock".into()
            }
        );
    }

    #[test]
    fn test_blank_value_is_missing() {
        let mut map = complete();
        map.insert(keys::AMI_ID.into(), "  ".into());
        assert!(matches!(
            StackConfig::from_map(&map),
            Err(ConfigurationError::MissingKey { key }) if key == "ami:ID"
        ));
    }

    #[test]
    fn test_invalid_cidr() {
        let mut map = complete();
        map.insert(keys::CIDR_BLOCK.into(), "10.0.0.0/33".into());
        assert!(matches!(
            StackConfig::from_map(&map),
            Err(ConfigurationError::InvalidValue { key, .. }) if key == "vpc:cidrBlock"
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = StackConfig::from_map(&complete()).unwrap();
        let rendered = format!("{:?}", config.db_password);
        assert!(!rendered.contains("pw1"));
    }

    #[test]
    fn test_yaml_strips_project_namespace() {
        let yaml = r#"
config:
  aws:region: us-west-2
  aws:profile: demo
  vpc:cidrBlock: 10.1.0.0/16
  vpc:name: main
  igw:name: gateway
  publicRoute:destinationCIDR: 0.0.0.0/0
  ami:keyPair: key
  ami:ID: ami-1
  mg:apikey: mg
  dns:domainName: demo.example.com
  awsAccount:Id: 123456789012
  dns:hostedZoneId: Z1
  iac-pulumi:certificateArn: arn:cert
  iac-pulumi:dbPassword: pw1
"#;
        let config = StackConfig::from_yaml_str("iac-pulumi", yaml).unwrap();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.profile, "demo");
        assert_eq!(config.account_id, "123456789012");
        assert_eq!(config.db_password.expose_secret(), "pw1");
    }

    #[test]
    fn test_yaml_encrypted_value_rejected() {
        let yaml = "config:\n  iac-pulumi:dbPassword:\n    secure: AAABAJ\n";
        assert!(matches!(
            StackConfig::from_yaml_str("iac-pulumi", yaml),
            Err(ConfigurationError::InvalidValue { key, .. }) if key == "dbPassword"
        ));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("vpc:cidrBlock"), "TOPOLOGY_VPC_CIDRBLOCK");
        assert_eq!(env_var_name("dbPassword"), "TOPOLOGY_DBPASSWORD");
    }

    #[test]
    fn test_env_overlay() {
        let config = StackConfig::from_map_with_env(&complete(), |name| match name {
            "TOPOLOGY_VPC_CIDRBLOCK" => Some("172.16.0.0/16".to_string()),
            "TOPOLOGY_AWS_PROFILE" => Some("prod".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.address_block.to_string(), "172.16.0.0/16");
        assert_eq!(config.profile, "prod");
    }

    #[tokio::test]
    async fn test_secret_values_marked() {
        let config = StackConfig::from_map(&complete()).unwrap();
        let password = config.db_password_value();
        assert!(password.is_secret());
        assert_eq!(password.resolve().await.unwrap(), "pw1");
    }
}

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::types::{Destination, EtcdTls, SourceMode};
use crate::utils::logging::{LogFormat, LoggingConfig};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ETCDCTL: &str = "etcdctl";
pub const ENV_PREFIX: &str = "ETCD_BACKUP";

// Custom deserializer for Option<Duration> that accepts integer seconds
fn deserialize_option_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u64>::deserialize(deserializer)? {
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}

/// Raw, unvalidated settings. Layered as: settings file, then
/// `ETCD_BACKUP_*` environment variables, then command-line flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug_enabled: bool,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<SecretString>,
    pub aws_s3_bucket: Option<String>,
    pub aws_s3_region: Option<String>,
    pub aws_s3_endpoint: Option<String>,
    pub aws_s3_path_style: bool,
    pub etcd_v2_datadir: Option<PathBuf>,
    pub etcd_v3_endpoints: Option<String>,
    pub etcd_v3_cacert: Option<PathBuf>,
    pub etcd_v3_cert: Option<PathBuf>,
    pub etcd_v3_key: Option<PathBuf>,
    pub etcdctl_path: Option<PathBuf>,
    pub prefix: Option<String>,
    pub tmp_dir: Option<PathBuf>,
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub snapshot_timeout: Option<Duration>,
    pub log_format: Option<LogFormat>,
    pub metrics_textfile: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: bool,
    pub access_key: String,
    pub secret_key: SecretString,
}

/// Validated configuration for a single backup run.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub source: SourceMode,
    pub s3: S3Settings,
    pub prefix: Option<String>,
    pub etcdctl_path: PathBuf,
    pub tmp_dir: PathBuf,
    pub snapshot_timeout: Option<Duration>,
    pub logging: LoggingConfig,
    pub metrics_textfile: Option<PathBuf>,
}

impl BackupConfig {
    pub fn destination(&self) -> Destination {
        Destination {
            bucket: self.s3.bucket.clone(),
            prefix: self.prefix.clone(),
            region: self.s3.region.clone(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Flags given on the command line take precedence over loaded values.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        fn take<T: Clone>(slot: &mut Option<T>, flag: &Option<T>) {
            if flag.is_some() {
                *slot = flag.clone();
            }
        }

        self.debug_enabled |= cli.debug_enabled;
        self.aws_s3_path_style |= cli.aws_s3_path_style;

        take(&mut self.aws_access_key, &cli.aws_access_key);
        if let Some(secret) = &cli.aws_secret_key {
            self.aws_secret_key = Some(SecretString::new(secret.clone()));
        }
        take(&mut self.aws_s3_bucket, &cli.aws_s3_bucket);
        take(&mut self.aws_s3_region, &cli.aws_s3_region);
        take(&mut self.aws_s3_endpoint, &cli.aws_s3_endpoint);
        take(&mut self.etcd_v2_datadir, &cli.etcd_v2_datadir);
        take(&mut self.etcd_v3_endpoints, &cli.etcd_v3_endpoints);
        take(&mut self.etcd_v3_cacert, &cli.etcd_v3_cacert);
        take(&mut self.etcd_v3_cert, &cli.etcd_v3_cert);
        take(&mut self.etcd_v3_key, &cli.etcd_v3_key);
        take(&mut self.etcdctl_path, &cli.etcdctl_path);
        take(&mut self.prefix, &cli.prefix);
        take(&mut self.tmp_dir, &cli.tmp_dir);
        take(&mut self.log_format, &cli.log_format);
        take(&mut self.metrics_textfile, &cli.metrics_textfile);
        if let Some(secs) = cli.snapshot_timeout {
            self.snapshot_timeout = Some(Duration::from_secs(secs));
        }

        self
    }

    /// Logging is needed before validation so that validation errors can be
    /// reported through it.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::new(self.debug_enabled, self.log_format.unwrap_or_default())
    }

    pub fn validate(self) -> Result<BackupConfig, ConfigError> {
        let source = self.source_mode()?;

        let bucket = non_empty(self.aws_s3_bucket, "--aws_s3_bucket")?;
        let access_key = non_empty(self.aws_access_key, "--aws_access_key")?;
        let secret_key = self
            .aws_secret_key
            .ok_or(ConfigError::MissingField("--aws_secret_key"))?;

        if let Some(timeout) = self.snapshot_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "--snapshot_timeout",
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(BackupConfig {
            source,
            s3: S3Settings {
                bucket,
                region: self.aws_s3_region.filter(|r| !r.is_empty()),
                endpoint: self.aws_s3_endpoint.filter(|e| !e.is_empty()),
                path_style: self.aws_s3_path_style,
                access_key,
                secret_key,
            },
            prefix: self.prefix.filter(|p| !p.is_empty()),
            etcdctl_path: self
                .etcdctl_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ETCDCTL)),
            tmp_dir: self.tmp_dir.unwrap_or_else(std::env::temp_dir),
            snapshot_timeout: self.snapshot_timeout,
            logging: LoggingConfig::new(self.debug_enabled, self.log_format.unwrap_or_default()),
            metrics_textfile: self.metrics_textfile,
        })
    }

    fn source_mode(&self) -> Result<SourceMode, ConfigError> {
        let v2 = self
            .etcd_v2_datadir
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());
        let v3 = self.etcd_v3_endpoints.as_ref().filter(|e| !e.is_empty());

        match (v2, v3) {
            (None, None) => Err(ConfigError::MissingSource),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingSources),
            (Some(data_dir), None) => {
                if !data_dir.is_dir() {
                    return Err(ConfigError::InvalidValue {
                        field: "--etcd_v2_datadir",
                        reason: format!("{} is not a directory", data_dir.display()),
                    });
                }
                Ok(SourceMode::V2 {
                    data_dir: data_dir.clone(),
                })
            }
            (None, Some(endpoints)) => {
                let endpoints = parse_endpoints(endpoints);
                if endpoints.is_empty() {
                    return Err(ConfigError::EmptyEndpoints);
                }
                let tls = EtcdTls {
                    cacert: self.etcd_v3_cacert.clone(),
                    cert: self.etcd_v3_cert.clone(),
                    key: self.etcd_v3_key.clone(),
                };
                Ok(SourceMode::V3 {
                    endpoints,
                    tls: (!tls.is_empty()).then_some(tls),
                })
            }
        }
    }
}

pub fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn base() -> Settings {
        Settings {
            aws_access_key: Some("AKIA".to_string()),
            aws_secret_key: Some(SecretString::new("secret".to_string())),
            aws_s3_bucket: Some("my-bucket".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_source_is_rejected() {
        let err = base().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSource));
    }

    #[test]
    fn both_sources_are_rejected() {
        let data = TempDir::new().unwrap();
        let settings = Settings {
            etcd_v2_datadir: Some(data.path().to_path_buf()),
            etcd_v3_endpoints: Some("http://127.0.0.1:2379".to_string()),
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::ConflictingSources
        ));
    }

    #[test]
    fn v2_datadir_must_exist() {
        let settings = Settings {
            etcd_v2_datadir: Some(PathBuf::from("/definitely/not/here")),
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::InvalidValue { field: "--etcd_v2_datadir", .. }
        ));
    }

    #[test]
    fn v3_endpoints_are_split_and_trimmed() {
        let settings = Settings {
            etcd_v3_endpoints: Some(" https://a:2379, ,https://b:2379 ".to_string()),
            etcd_v3_cacert: Some(PathBuf::from("/etc/etcd/ca.crt")),
            ..base()
        };
        let config = settings.validate().unwrap();

        match config.source {
            SourceMode::V3 { endpoints, tls } => {
                assert_eq!(endpoints, vec!["https://a:2379", "https://b:2379"]);
                assert_eq!(tls.unwrap().cacert, Some(PathBuf::from("/etc/etcd/ca.crt")));
            }
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn blank_endpoint_list_is_rejected() {
        let settings = Settings {
            etcd_v3_endpoints: Some(" , ".to_string()),
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::EmptyEndpoints
        ));
    }

    #[test]
    fn credentials_and_bucket_are_required() {
        let data = TempDir::new().unwrap();
        let settings = Settings {
            etcd_v2_datadir: Some(data.path().to_path_buf()),
            aws_s3_bucket: None,
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::MissingField("--aws_s3_bucket")
        ));

        let settings = Settings {
            etcd_v2_datadir: Some(data.path().to_path_buf()),
            aws_secret_key: None,
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::MissingField("--aws_secret_key")
        ));
    }

    #[test]
    fn defaults_are_applied() {
        let data = TempDir::new().unwrap();
        let settings = Settings {
            etcd_v2_datadir: Some(data.path().to_path_buf()),
            prefix: Some(String::new()),
            ..base()
        };
        let config = settings.validate().unwrap();

        assert_eq!(config.etcdctl_path, PathBuf::from("etcdctl"));
        assert_eq!(config.tmp_dir, std::env::temp_dir());
        assert_eq!(config.prefix, None);
        assert_eq!(config.s3.region, None);
        assert_eq!(config.s3.secret_key.expose_secret(), "secret");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let data = TempDir::new().unwrap();
        let settings = Settings {
            etcd_v2_datadir: Some(data.path().to_path_buf()),
            snapshot_timeout: Some(Duration::ZERO),
            ..base()
        };
        assert!(matches!(
            settings.validate().unwrap_err(),
            ConfigError::InvalidValue { field: "--snapshot_timeout", .. }
        ));
    }

    #[test]
    fn file_values_are_overridden_by_flags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.yaml");
        std::fs::write(
            &path,
            "aws_s3_bucket: from-file\nprefix: file\nsnapshot_timeout: 30\nlog_format: json\n",
        )
        .unwrap();

        let loaded = Settings::load(Some(&path)).unwrap();
        assert_eq!(loaded.aws_s3_bucket.as_deref(), Some("from-file"));
        assert_eq!(loaded.snapshot_timeout, Some(Duration::from_secs(30)));
        assert_eq!(loaded.log_format, Some(LogFormat::Json));

        let cli = Cli {
            prefix: Some("prod".to_string()),
            debug_enabled: true,
            ..Default::default()
        };
        let merged = loaded.merge_cli(&cli);

        assert_eq!(merged.aws_s3_bucket.as_deref(), Some("from-file"));
        assert_eq!(merged.prefix.as_deref(), Some("prod"));
        assert!(merged.debug_enabled);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/backup.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}

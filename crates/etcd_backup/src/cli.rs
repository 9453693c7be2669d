//! Command-line surface

use crate::utils::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Back up etcd data, zip it and upload it to S3.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "etcd-backup", version, about)]
pub struct Cli {
    /// Settings file (yaml, toml or json) supplying defaults for every flag
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enables DEBUG logging
    #[arg(long = "debug_enabled")]
    pub debug_enabled: bool,

    /// AWS Account access key ID
    #[arg(long = "aws_access_key", env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub aws_access_key: Option<String>,

    /// AWS Secret key of the access key
    #[arg(long = "aws_secret_key", env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_key: Option<String>,

    /// Destination S3 bucket
    #[arg(long = "aws_s3_bucket")]
    pub aws_s3_bucket: Option<String>,

    /// AWS Region for S3 bucket
    #[arg(long = "aws_s3_region")]
    pub aws_s3_region: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[arg(long = "aws_s3_endpoint", value_name = "URL")]
    pub aws_s3_endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long = "aws_s3_path_style")]
    pub aws_s3_path_style: bool,

    /// v2 key type data directory
    #[arg(long = "etcd_v2_datadir", value_name = "PATH")]
    pub etcd_v2_datadir: Option<PathBuf>,

    /// Comma-separated v3 etcd endpoints
    #[arg(long = "etcd_v3_endpoints", value_name = "URLS")]
    pub etcd_v3_endpoints: Option<String>,

    /// CA bundle for v3 endpoints
    #[arg(long = "etcd_v3_cacert", value_name = "PATH")]
    pub etcd_v3_cacert: Option<PathBuf>,

    /// Client certificate for v3 endpoints
    #[arg(long = "etcd_v3_cert", value_name = "PATH")]
    pub etcd_v3_cert: Option<PathBuf>,

    /// Client key for v3 endpoints
    #[arg(long = "etcd_v3_key", value_name = "PATH")]
    pub etcd_v3_key: Option<PathBuf>,

    /// etcdctl binary to invoke
    #[arg(long = "etcdctl_path", value_name = "PATH")]
    pub etcdctl_path: Option<PathBuf>,

    /// Prefix for backup file on S3
    #[arg(long = "prefix")]
    pub prefix: Option<String>,

    /// Root for temporary snapshot and archive files
    #[arg(long = "tmp_dir", value_name = "PATH")]
    pub tmp_dir: Option<PathBuf>,

    /// Seconds to wait for etcdctl before giving up
    #[arg(long = "snapshot_timeout", value_name = "SECS")]
    pub snapshot_timeout: Option<u64>,

    /// Log output format
    #[arg(long = "log_format", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Write Prometheus metrics for this run to PATH
    #[arg(long = "metrics_textfile", value_name = "PATH")]
    pub metrics_textfile: Option<PathBuf>,
}

use crate::error::{CourierError, Result};
use crate::io::atomic_write;
use crate::progress::ProgressTimings;
use crate::rider::{default_riders, Rider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "courier.yaml";

pub const PAYPAL_SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this server; gateway return/cancel URLs hang off it.
    #[serde(default = "default_app_url")]
    pub app_url: String,
    /// Directory of static front-end files served as the fallback route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_app_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app_url: default_app_url(),
            public_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressConfig
// ---------------------------------------------------------------------------

/// Longest accepted progress delay (one day).
pub const MAX_PROGRESS_DELAY_SECS: u64 = 86_400;

/// Longest accepted abandonment window or sweep interval (one year).
pub const MAX_PAYMENT_WINDOW_MINS: u64 = 525_600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_assign_delay")]
    pub assign_delay_secs: u64,
    #[serde(default = "default_pickup_delay")]
    pub pickup_delay_secs: u64,
    #[serde(default = "default_delivery_delay")]
    pub delivery_delay_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_unassigned_secs: Option<u64>,
}

fn default_assign_delay() -> u64 {
    5
}

fn default_pickup_delay() -> u64 {
    10
}

fn default_delivery_delay() -> u64 {
    15
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            assign_delay_secs: default_assign_delay(),
            pickup_delay_secs: default_pickup_delay(),
            delivery_delay_secs: default_delivery_delay(),
            retry_unassigned_secs: None,
        }
    }
}

impl ProgressConfig {
    pub fn timings(&self) -> ProgressTimings {
        ProgressTimings {
            assign_rider: Duration::from_secs(self.assign_delay_secs),
            pick_up: Duration::from_secs(self.pickup_delay_secs),
            deliver: Duration::from_secs(self.delivery_delay_secs),
            retry_unassigned: self.retry_unassigned_secs.map(Duration::from_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayBackend {
    /// In-process gateway that approves everything; for development.
    Mock,
    Paypal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalConfig {
    #[serde(default = "default_paypal_api")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
}

fn default_paypal_api() -> String {
    PAYPAL_SANDBOX_API.to_string()
}

fn default_brand_name() -> String {
    "Courier Delivery".to_string()
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self {
            api_base: default_paypal_api(),
            client_id: None,
            client_secret: None,
            brand_name: default_brand_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_gateway")]
    pub gateway: GatewayBackend,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_abandon_after")]
    pub abandon_after_mins: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_mins: u64,
    /// When set, webhooks must carry a matching HMAC signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub paypal: PayPalConfig,
}

fn default_gateway() -> GatewayBackend {
    GatewayBackend::Mock
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_abandon_after() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    15
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway(),
            currency: default_currency(),
            abandon_after_mins: default_abandon_after(),
            sweep_interval_mins: default_sweep_interval(),
            webhook_secret: None,
            paypal: PayPalConfig::default(),
        }
    }
}

impl PaymentsConfig {
    pub fn abandon_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.abandon_after_mins.min(MAX_PAYMENT_WINDOW_MINS) as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_mins.clamp(1, MAX_PAYMENT_WINDOW_MINS) * 60)
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Local,
    Supabase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_bucket() -> String {
    "delivery-attachments".to_string()
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            bucket: default_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    /// URL prefix under which local files are served.
    #[serde(default = "default_public_base")]
    pub public_base: String,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default)]
    pub supabase: SupabaseConfig,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Local
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_base() -> String {
    "/uploads".to_string()
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_dir: default_local_dir(),
            public_base: default_public_base(),
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            supabase: SupabaseConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// MirrorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorBackend {
    None,
    Airtable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    #[serde(default = "default_airtable_api")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_airtable_table")]
    pub table: String,
}

fn default_airtable_api() -> String {
    "https://api.airtable.com/v0".to_string()
}

fn default_airtable_table() -> String {
    "Orders".to_string()
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_base: default_airtable_api(),
            base_id: None,
            api_key: None,
            table: default_airtable_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default = "default_mirror_backend")]
    pub backend: MirrorBackend,
    #[serde(default)]
    pub airtable: AirtableConfig,
}

fn default_mirror_backend() -> MirrorBackend {
    MirrorBackend::None
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend: default_mirror_backend(),
            airtable: AirtableConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default = "default_riders")]
    pub riders: Vec<Rider>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            progress: ProgressConfig::default(),
            payments: PaymentsConfig::default(),
            storage: StorageConfig::default(),
            mirror: MirrorConfig::default(),
            riders: default_riders(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Config {
    /// Read the YAML file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(path, data.as_bytes())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Overlay deployment values and secrets from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; blank values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| CourierError::Config(format!("PORT is not a port number: {port}")))?;
        }
        if let Some(v) = get("APP_URL") {
            self.server.app_url = v;
        }
        if let Some(v) = get("PAYPAL_CLIENT_ID") {
            self.payments.paypal.client_id = Some(v);
        }
        if let Some(v) = get("PAYPAL_CLIENT_SECRET") {
            self.payments.paypal.client_secret = Some(v);
        }
        if let Some(v) = get("PAYPAL_API_BASE") {
            self.payments.paypal.api_base = v;
        }
        if let Some(v) = get("PAYPAL_WEBHOOK_SECRET") {
            self.payments.webhook_secret = Some(v);
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.storage.supabase.url = Some(v);
        }
        if let Some(v) = get("SUPABASE_KEY") {
            self.storage.supabase.key = Some(v);
        }
        if let Some(v) = get("SUPABASE_BUCKET_NAME") {
            self.storage.supabase.bucket = v;
        }
        if let Some(v) = get("AIRTABLE_API_KEY") {
            self.mirror.airtable.api_key = Some(v);
        }
        if let Some(v) = get("AIRTABLE_BASE_ID") {
            self.mirror.airtable.base_id = Some(v);
        }
        Ok(())
    }

    /// Check the config for settings that would fail at runtime.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.riders.is_empty() {
            warnings.push(ConfigWarning::warning(
                "no riders configured: orders will never leave 'placed'",
            ));
        }
        let mut ids: Vec<u32> = self.riders.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            warnings.push(ConfigWarning::error("rider ids must be unique"));
        }

        let p = &self.progress;
        if p.assign_delay_secs == 0 || p.pickup_delay_secs == 0 || p.delivery_delay_secs == 0 {
            warnings.push(ConfigWarning::warning(
                "a zero progress delay makes transitions fire immediately",
            ));
        }
        for (key, secs) in [
            ("assign_delay_secs", p.assign_delay_secs),
            ("pickup_delay_secs", p.pickup_delay_secs),
            ("delivery_delay_secs", p.delivery_delay_secs),
            ("retry_unassigned_secs", p.retry_unassigned_secs.unwrap_or(0)),
        ] {
            if secs > MAX_PROGRESS_DELAY_SECS {
                warnings.push(ConfigWarning::error(format!(
                    "progress.{key} is {secs}: must be at most {MAX_PROGRESS_DELAY_SECS}"
                )));
            }
        }
        if p.retry_unassigned_secs == Some(0) {
            warnings.push(ConfigWarning::error(
                "progress.retry_unassigned_secs must be at least 1 (omit it to disable retries)",
            ));
        }

        if self.payments.gateway == GatewayBackend::Paypal {
            let pp = &self.payments.paypal;
            if pp.client_id.is_none() || pp.client_secret.is_none() {
                warnings.push(ConfigWarning::error(
                    "payments.gateway is paypal but client_id/client_secret are not set",
                ));
            }
        }
        for (key, mins) in [
            ("abandon_after_mins", self.payments.abandon_after_mins),
            ("sweep_interval_mins", self.payments.sweep_interval_mins),
        ] {
            if mins > MAX_PAYMENT_WINDOW_MINS {
                warnings.push(ConfigWarning::error(format!(
                    "payments.{key} is {mins}: must be at most {MAX_PAYMENT_WINDOW_MINS}"
                )));
            }
        }
        if self.payments.abandon_after_mins == 0 {
            warnings.push(ConfigWarning::warning(
                "payments.abandon_after_mins is 0: every pending payment is abandoned on the next sweep",
            ));
        }

        if self.storage.backend == StorageBackend::Supabase
            && (self.storage.supabase.url.is_none() || self.storage.supabase.key.is_none())
        {
            warnings.push(ConfigWarning::error(
                "storage.backend is supabase but url/key are not set",
            ));
        }
        if self.storage.max_files == 0 {
            warnings.push(ConfigWarning::warning(
                "storage.max_files is 0: every upload will be rejected",
            ));
        }

        if self.mirror.backend == MirrorBackend::Airtable
            && (self.mirror.airtable.base_id.is_none() || self.mirror.airtable.api_key.is_none())
        {
            warnings.push(ConfigWarning::error(
                "mirror.backend is airtable but base_id/api_key are not set",
            ));
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

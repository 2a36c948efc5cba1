/*
[INPUT]:  YAML configuration file, TERMINAL_POS_BACKEND_URL environment variable
[OUTPUT]: Parsed workflow configuration
[POS]:    Configuration layer - backend, payment, refund, and simulator settings
[UPDATE]: When adding new configuration options
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};
use terminal_pos_adapter::{ClientConfig, DEFAULT_BACKEND_URL, SimulatorConfiguration};

/// Environment variable that overrides `backend_url`
pub const BACKEND_URL_ENV: &str = "TERMINAL_POS_BACKEND_URL";

/// Top-level configuration for the point-of-sale client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Payments backend base URL
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub refund: RefundConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// What happens to the pending intent when a backend capture fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFailurePolicy {
    /// Drop the intent; the cashier starts over
    #[default]
    ClearPending,
    /// Keep the intent awaiting capture for `retry_capture`
    RetainForRetry,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaymentConfig {
    /// Description sent with every new payment intent
    #[serde(default = "default_description")]
    pub description: String,
    /// Currency for carts built without an explicit one
    #[serde(default = "default_payment_currency")]
    pub default_currency: String,
    /// Currency that also accepts `interac_present`
    #[serde(default = "default_regional_currency")]
    pub regional_debit_currency: String,
    #[serde(default)]
    pub capture_failure_policy: CaptureFailurePolicy,
    /// Cancel replaced or abandoned intents on the backend
    #[serde(default = "default_true")]
    pub cancel_abandoned_intents: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RefundConfig {
    #[serde(default = "default_regional_currency")]
    pub default_currency: String,
}

/// Test-mode settings pushed to a simulated reader before collection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_test_payment_method")]
    pub test_payment_method: String,
    #[serde(default)]
    pub test_card_number: Option<String>,
    /// On-reader tip in minor units
    #[serde(default)]
    pub tip_amount: Option<i64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            http: HttpConfig::default(),
            payment: PaymentConfig::default(),
            refund: RefundConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            description: default_description(),
            default_currency: default_payment_currency(),
            regional_debit_currency: default_regional_currency(),
            capture_failure_policy: CaptureFailurePolicy::default(),
            cancel_abandoned_intents: true,
        }
    }
}

impl Default for RefundConfig {
    fn default() -> Self {
        Self {
            default_currency: default_regional_currency(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            test_payment_method: default_test_payment_method(),
            test_card_number: None,
            tip_amount: None,
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_description() -> String {
    "Tienda en linea".to_string()
}

fn default_payment_currency() -> String {
    "eur".to_string()
}

fn default_regional_currency() -> String {
    "cad".to_string()
}

fn default_test_payment_method() -> String {
    "visa".to_string()
}

fn default_true() -> bool {
    true
}

impl WorkflowConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `TERMINAL_POS_BACKEND_URL` when set and non-empty
    pub fn with_env_overrides(self) -> Self {
        let backend_url = std::env::var(BACKEND_URL_ENV).ok();
        self.with_backend_override(backend_url)
    }

    fn with_backend_override(mut self, backend_url: Option<String>) -> Self {
        if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
        }
    }
}

impl SimulatorConfig {
    pub fn to_configuration(&self) -> SimulatorConfiguration {
        SimulatorConfiguration {
            test_payment_method: self.test_payment_method.clone(),
            test_card_number: self.test_card_number.clone(),
            tip_amount: self.tip_amount,
        }
    }
}

/// アーティファクトレプリケーター設定
///
/// Lambdaランタイムが設定する環境変数と、任意のチューニング値を読み込む。
use std::time::Duration;

use thiserror::Error;

/// ウォッチドッグのデフォルト安全マージン（ミリ秒）
pub const DEFAULT_WATCHDOG_MARGIN_MS: u64 = 500;

/// 応答PUTのデフォルトHTTPタイムアウト（秒）
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 10;

/// 設定のエラー型
#[derive(Debug, Error)]
pub enum ReplicatorConfigError {
    #[error("環境変数が設定されていません: {0}")]
    MissingEnvVar(String),

    #[error("環境変数の値が不正です: {name}={value}")]
    InvalidValue { name: String, value: String },
}

/// レプリケーター設定
///
/// 以下の環境変数から読み込む:
/// - AWS_LAMBDA_LOG_STREAM_NAME: ログストリーム名（Lambdaランタイムが設定）
/// - WATCHDOG_MARGIN_MS: デッドライン前に失敗応答を送る安全マージン（省略時500）
/// - RESPONSE_TIMEOUT_SECS: 応答PUTのタイムアウト（省略時10）
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    log_stream_name: String,
    watchdog_margin: Duration,
    response_timeout: Duration,
}

impl ReplicatorConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ReplicatorConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から設定を読み込む
    fn from_lookup<F>(lookup: F) -> Result<Self, ReplicatorConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_stream_name = lookup("AWS_LAMBDA_LOG_STREAM_NAME")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ReplicatorConfigError::MissingEnvVar("AWS_LAMBDA_LOG_STREAM_NAME".to_string()))?;

        let watchdog_margin_ms = parse_u64(&lookup, "WATCHDOG_MARGIN_MS", DEFAULT_WATCHDOG_MARGIN_MS)?;
        let response_timeout_secs =
            parse_u64(&lookup, "RESPONSE_TIMEOUT_SECS", DEFAULT_RESPONSE_TIMEOUT_SECS)?;

        Ok(Self {
            log_stream_name,
            watchdog_margin: Duration::from_millis(watchdog_margin_ms),
            response_timeout: Duration::from_secs(response_timeout_secs),
        })
    }

    /// 明示的な値で設定を作成（テスト用）
    pub fn new(
        log_stream_name: impl Into<String>,
        watchdog_margin: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            log_stream_name: log_stream_name.into(),
            watchdog_margin,
            response_timeout,
        }
    }

    /// ログストリーム名を取得
    pub fn log_stream_name(&self) -> &str {
        &self.log_stream_name
    }

    /// ウォッチドッグの安全マージンを取得
    pub fn watchdog_margin(&self) -> Duration {
        self.watchdog_margin
    }

    /// 応答PUTのタイムアウトを取得
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }
}

fn parse_u64<F>(lookup: &F, name: &str, default: u64) -> Result<u64, ReplicatorConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|_| ReplicatorConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
    }
}

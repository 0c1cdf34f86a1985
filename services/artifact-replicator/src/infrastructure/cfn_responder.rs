//! CloudFormation応答モジュール
//!
//! カスタムリソースの処理結果をイベントのResponseURL（署名付きS3 URL）にPUTする。
//! 送信は1回のみでリトライしない。失敗はエラーとして返し、呼び出し側でログ出力する。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::domain::{CustomResourceEvent, CustomResourceResponse, LifecycleResponse};

/// 応答送信のエラー型
#[derive(Debug, Error)]
pub enum ResponderError {
    /// ResponseURLが不正
    #[error("ResponseURLが不正です: {0}")]
    InvalidUrl(String),

    /// JSONシリアライズエラー
    #[error("JSONシリアライズエラー: {0}")]
    Serialize(String),

    /// HTTPリクエストエラー
    #[error("HTTPリクエスト失敗: {0}")]
    RequestFailed(String),

    /// 非成功レスポンス
    #[error("応答送信失敗: ステータスコード {0}")]
    UnexpectedStatus(u16),
}

/// ライフサイクル応答の送信トレイト（テスト用の抽象化）
#[async_trait]
pub trait LifecycleResponder: Send + Sync {
    /// 応答をCloudFormationへ送信する
    ///
    /// # 引数
    /// * `event` - 応答先・識別子を含むカスタムリソースイベント
    /// * `response` - 送信する応答
    async fn send(
        &self,
        event: &CustomResourceEvent,
        response: &LifecycleResponse,
    ) -> Result<(), ResponderError>;
}

/// reqwestを使用したResponseURLへのPUT実装
pub struct HttpCfnResponder {
    client: reqwest::Client,
    log_stream_name: String,
}

impl HttpCfnResponder {
    /// タイムアウトを指定して作成
    pub fn new(log_stream_name: impl Into<String>, timeout: Duration) -> Result<Self, ResponderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResponderError::RequestFailed(e.to_string()))?;

        Ok(Self::with_client(client, log_stream_name))
    }

    /// カスタムクライアントで作成（テスト用）
    pub fn with_client(client: reqwest::Client, log_stream_name: impl Into<String>) -> Self {
        Self {
            client,
            log_stream_name: log_stream_name.into(),
        }
    }
}

#[async_trait]
impl LifecycleResponder for HttpCfnResponder {
    async fn send(
        &self,
        event: &CustomResourceEvent,
        response: &LifecycleResponse,
    ) -> Result<(), ResponderError> {
        let url = Url::parse(&event.response_url)
            .map_err(|e| ResponderError::InvalidUrl(e.to_string()))?;

        let body = CustomResourceResponse::new(event, response, &self.log_stream_name);
        let json = serde_json::to_string(&body).map_err(|e| ResponderError::Serialize(e.to_string()))?;

        info!(
            status = response.status.as_str(),
            physical_resource_id = %response.physical_resource_id,
            body_length = json.len(),
            "CloudFormation応答送信開始"
        );

        // 署名付きURLはcontent-typeを署名に含まないため空で送る
        let result = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, json.len().to_string())
            .body(json)
            .send()
            .await;

        match result {
            Ok(http_response) => {
                let status = http_response.status();
                if status.is_success() {
                    info!(status_code = status.as_u16(), "CloudFormation応答送信成功");
                    Ok(())
                } else {
                    warn!(status_code = status.as_u16(), "CloudFormation応答が非成功ステータス");
                    Err(ResponderError::UnexpectedStatus(status.as_u16()))
                }
            }
            Err(err) => {
                warn!(error = %err, "CloudFormation応答送信エラー");
                Err(ResponderError::RequestFailed(err.to_string()))
            }
        }
    }
}

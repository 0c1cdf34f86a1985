/// ライフサイクル応答
///
/// CloudFormationへ返すカスタムリソース応答の値オブジェクトと、
/// ResponseURLにPUTするJSONボディを定義する。
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::custom_resource_event::{CustomResourceEvent, RequestType};

/// 応答ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "SUCCESS",
            ResponseStatus::Failed => "FAILED",
        }
    }
}

/// 1回のinvocationに対して1度だけ送信される応答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleResponse {
    /// 成功/失敗
    pub status: ResponseStatus,
    /// 応答データ（このシステムでは常に空）
    pub data: BTreeMap<String, String>,
    /// CloudFormationに返す物理リソースID
    pub physical_resource_id: String,
    /// 失敗理由（成功時はNone）
    pub failure_reason: Option<String>,
}

impl LifecycleResponse {
    /// 成功応答を作成
    pub fn success(physical_resource_id: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: BTreeMap::new(),
            physical_resource_id: physical_resource_id.into(),
            failure_reason: None,
        }
    }

    /// 失敗応答を作成
    pub fn failed(physical_resource_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            status: ResponseStatus::Failed,
            data: BTreeMap::new(),
            physical_resource_id: physical_resource_id.into(),
            failure_reason: Some(reason.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// 物理リソースIDを決定する
///
/// Createではログストリーム名を採番し、それ以外ではイベントの値をそのまま返す。
/// Updateで異なるIDを返すとCloudFormationが置換と判断し、旧リソースのDeleteが発行されるため。
pub fn physical_resource_id(event: &CustomResourceEvent, log_stream_name: &str) -> String {
    match (&event.request_type, event.physical_resource_id.as_deref()) {
        (RequestType::Create, _) => log_stream_name.to_string(),
        (_, Some(id)) if !id.is_empty() => id.to_string(),
        _ => log_stream_name.to_string(),
    }
}

/// ResponseURLにPUTするJSONボディ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: BTreeMap<String, String>,
}

impl CustomResourceResponse {
    /// イベントと応答からボディを組み立てる
    pub fn new(
        event: &CustomResourceEvent,
        response: &LifecycleResponse,
        log_stream_name: &str,
    ) -> Self {
        let details = format!("See the details in CloudWatch Log Stream: {}", log_stream_name);
        let reason = match &response.failure_reason {
            Some(failure) => format!("{}. {}", failure, details),
            None => details,
        };

        Self {
            status: response.status,
            reason,
            physical_resource_id: response.physical_resource_id.clone(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: response.data.clone(),
        }
    }
}

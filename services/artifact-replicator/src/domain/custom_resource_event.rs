/// CloudFormationカスタムリソースイベント
///
/// CloudFormationからLambdaに渡されるカスタムリソースのライフサイクルイベントを表現する。
/// ResponseURLへの応答に必要なエンベロープ情報と、生のResourcePropertiesを保持する。
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// イベントパースのエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventParseError {
    /// エンベロープのJSON構造が不正
    #[error("カスタムリソースイベントの形式が不正です: {0}")]
    InvalidEnvelope(String),

    /// 応答に必要なフィールドが空
    #[error("カスタムリソースイベントに必須フィールドがありません: {0}")]
    MissingField(&'static str),
}

/// CloudFormationのリクエスト種別
///
/// 未知の値は`Other`として保持し、パース段階では拒否しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    Create,
    Update,
    Delete,
    Other(String),
}

impl RequestType {
    /// ログ出力用の文字列表現
    pub fn as_str(&self) -> &str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
            RequestType::Other(value) => value,
        }
    }
}

impl Default for RequestType {
    fn default() -> Self {
        RequestType::Other(String::new())
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => RequestType::Create,
            "Update" => RequestType::Update,
            "Delete" => RequestType::Delete,
            _ => RequestType::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(request_type: RequestType) -> Self {
        request_type.as_str().to_string()
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CloudFormationカスタムリソースイベントのエンベロープ
///
/// ResponseURL以外は欠けていてもパースできる。応答できるイベントは必ず応答するため。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    /// リクエスト種別（Create/Update/Delete）
    #[serde(default)]
    pub request_type: RequestType,
    /// CloudFormationが発行したリクエストID
    #[serde(default)]
    pub request_id: String,
    /// 応答送信先の署名付きURL
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    /// スタックID
    #[serde(default)]
    pub stack_id: String,
    /// テンプレート上の論理リソースID
    #[serde(default)]
    pub logical_resource_id: String,
    /// カスタムリソースの型（例: Custom::CopyZips）
    #[serde(default)]
    pub resource_type: String,
    /// 物理リソースID（Update/Deleteのみ）
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    /// Lambda関数のARN
    #[serde(default)]
    pub service_token: Option<String>,
    /// リソースプロパティ（生のJSON）
    #[serde(default)]
    pub resource_properties: Value,
}

impl CustomResourceEvent {
    /// Lambdaペイロードからイベントをパースする
    ///
    /// ResponseURLが読めない場合は応答自体が不可能なため、
    /// 呼び出し元はLambdaランタイムにエラーを返すこと。
    pub fn from_value(value: Value) -> Result<Self, EventParseError> {
        let event: Self = serde_json::from_value(value)
            .map_err(|e| EventParseError::InvalidEnvelope(e.to_string()))?;

        if event.response_url.trim().is_empty() {
            return Err(EventParseError::MissingField("ResponseURL"));
        }
        Ok(event)
    }

    /// 応答ボディの識別子に必要なフィールドを検証する
    ///
    /// 欠けていてもResponseURLへFAILEDを返せるよう、パースとは分けて呼び出す。
    pub fn validate_identity(&self) -> Result<(), EventParseError> {
        if self.request_type.as_str().is_empty() {
            return Err(EventParseError::MissingField("RequestType"));
        }

        let required = [
            ("RequestId", &self.request_id),
            ("StackId", &self.stack_id),
            ("LogicalResourceId", &self.logical_resource_id),
        ];
        match required.iter().find(|(_, value)| value.is_empty()) {
            Some(&(name, _)) => Err(EventParseError::MissingField(name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_event_json() -> Value {
        json!({
            "RequestType": "Create",
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:CopyZips",
            "ResponseURL": "https://cloudformation-custom-resource-response-useast1.s3.amazonaws.com/abc",
            "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/onboarding/guid",
            "RequestId": "req-1",
            "LogicalResourceId": "CopyZips",
            "ResourceType": "Custom::CopyZips",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:CopyZips",
                "SourceBucket": "src",
                "DestBucket": "dst",
                "Prefix": "pkg/",
                "Objects": ["a.zip", "b.zip"]
            }
        })
    }

    #[test]
    fn test_parse_create_event() {
        let event = CustomResourceEvent::from_value(create_event_json()).unwrap();

        assert_eq!(event.request_type, RequestType::Create);
        assert_eq!(event.request_id, "req-1");
        assert_eq!(event.logical_resource_id, "CopyZips");
        assert_eq!(event.resource_type, "Custom::CopyZips");
        assert!(event.response_url.starts_with("https://"));
        assert!(event.physical_resource_id.is_none());
        assert_eq!(event.resource_properties["DestBucket"], "dst");
    }

    #[test]
    fn test_parse_delete_event_with_physical_id() {
        let mut value = create_event_json();
        value["RequestType"] = json!("Delete");
        value["PhysicalResourceId"] = json!("2025/01/01/[$LATEST]abcdef");

        let event = CustomResourceEvent::from_value(value).unwrap();

        assert_eq!(event.request_type, RequestType::Delete);
        assert_eq!(
            event.physical_resource_id.as_deref(),
            Some("2025/01/01/[$LATEST]abcdef")
        );
    }

    #[test]
    fn test_parse_missing_response_url() {
        let mut value = create_event_json();
        value.as_object_mut().unwrap().remove("ResponseURL");

        let result = CustomResourceEvent::from_value(value);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ResponseURL"));
    }

    #[test]
    fn test_parse_empty_response_url() {
        let mut value = create_event_json();
        value["ResponseURL"] = json!("  ");

        assert_eq!(
            CustomResourceEvent::from_value(value).unwrap_err(),
            EventParseError::MissingField("ResponseURL")
        );
    }

    #[test]
    fn test_parse_unknown_request_type_keeps_raw_value() {
        let mut value = create_event_json();
        value["RequestType"] = json!("Replace");

        let event = CustomResourceEvent::from_value(value).unwrap();

        assert_eq!(event.request_type, RequestType::Other("Replace".to_string()));
        assert_eq!(event.request_type.to_string(), "Replace");
        assert!(event.validate_identity().is_ok());
        assert_eq!(serde_json::to_value(&event).unwrap()["RequestType"], "Replace");
    }

    #[test]
    fn test_parse_missing_identity_fields_still_answerable() {
        let mut value = create_event_json();
        let object = value.as_object_mut().unwrap();
        object.remove("StackId");
        object.remove("RequestType");

        let event = CustomResourceEvent::from_value(value).unwrap();

        assert!(event.stack_id.is_empty());
        assert_eq!(event.request_type, RequestType::Other(String::new()));
        assert_eq!(
            event.validate_identity().unwrap_err(),
            EventParseError::MissingField("RequestType")
        );
    }

    #[test]
    fn test_validate_identity_reports_first_missing_field() {
        let mut value = create_event_json();
        value.as_object_mut().unwrap().remove("StackId");

        let event = CustomResourceEvent::from_value(value).unwrap();

        assert_eq!(
            event.validate_identity().unwrap_err(),
            EventParseError::MissingField("StackId")
        );
        assert_eq!(
            event.validate_identity().unwrap_err().to_string(),
            "カスタムリソースイベントに必須フィールドがありません: StackId"
        );
    }

    #[test]
    fn test_validate_identity_ok() {
        let event = CustomResourceEvent::from_value(create_event_json()).unwrap();
        assert!(event.validate_identity().is_ok());
    }

    #[test]
    fn test_request_type_display() {
        assert_eq!(RequestType::Create.to_string(), "Create");
        assert_eq!(RequestType::Update.to_string(), "Update");
        assert_eq!(RequestType::Delete.to_string(), "Delete");
    }
}

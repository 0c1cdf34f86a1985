/// レプリケーションリクエスト
///
/// カスタムリソースイベントのResourcePropertiesから、
/// コピー元/コピー先バケット・キープレフィックス・対象オブジェクト名を抽出した不変の値。
/// 1回のinvocation内で生成・消費され、invocationを跨いで保持されない。
use serde::Deserialize;
use thiserror::Error;

use super::custom_resource_event::{CustomResourceEvent, RequestType};

/// レプリケーションリクエスト構築のエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplicationRequestError {
    /// ResourcePropertiesの形式が不正
    #[error("ResourcePropertiesの形式が不正です: {0}")]
    InvalidProperties(String),

    /// 必須プロパティが空
    #[error("必須プロパティが指定されていません: {0}")]
    MissingProperty(&'static str),
}

/// 実行する処理の種別
///
/// Delete以外はすべてコピーとして扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Create,
    Update,
    Delete,
    /// 未知のRequestType
    Other,
}

impl From<&RequestType> for RequestKind {
    fn from(request_type: &RequestType) -> Self {
        match request_type {
            RequestType::Create => RequestKind::Create,
            RequestType::Update => RequestKind::Update,
            RequestType::Delete => RequestKind::Delete,
            RequestType::Other(_) => RequestKind::Other,
        }
    }
}

/// ResourcePropertiesのうちレプリケーションに必要なフィールド
///
/// ServiceToken等の未知のプロパティは無視する。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReplicationProperties {
    #[serde(default)]
    source_bucket: Option<String>,
    #[serde(default)]
    dest_bucket: Option<String>,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    objects: Vec<String>,
}

/// 1回のinvocationで処理するレプリケーション要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRequest {
    kind: RequestKind,
    source_bucket: String,
    dest_bucket: String,
    key_prefix: String,
    object_names: Vec<String>,
}

impl ReplicationRequest {
    /// カスタムリソースイベントからリクエストを構築する
    ///
    /// # 検証ルール
    /// - DestBucketは常に必須
    /// - SourceBucketはDelete以外で必須（Deleteでは参照しない）
    /// - Prefixは省略時に空文字、Objectsは省略時に空リスト
    pub fn from_event(event: &CustomResourceEvent) -> Result<Self, ReplicationRequestError> {
        let properties: ReplicationProperties =
            serde_json::from_value(event.resource_properties.clone())
                .map_err(|e| ReplicationRequestError::InvalidProperties(e.to_string()))?;

        let kind = RequestKind::from(&event.request_type);

        let dest_bucket = properties
            .dest_bucket
            .filter(|b| !b.is_empty())
            .ok_or(ReplicationRequestError::MissingProperty("DestBucket"))?;

        let source_bucket = match kind {
            RequestKind::Delete => properties.source_bucket.unwrap_or_default(),
            RequestKind::Create | RequestKind::Update | RequestKind::Other => properties
                .source_bucket
                .filter(|b| !b.is_empty())
                .ok_or(ReplicationRequestError::MissingProperty("SourceBucket"))?,
        };

        Ok(Self {
            kind,
            source_bucket,
            dest_bucket,
            key_prefix: properties.prefix,
            object_names: properties.objects,
        })
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn source_bucket(&self) -> &str {
        &self.source_bucket
    }

    pub fn dest_bucket(&self) -> &str {
        &self.dest_bucket
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn object_names(&self) -> &[String] {
        &self.object_names
    }
}

/// `prefix + name` 形式のキー一覧を作成
pub fn prefixed_keys(prefix: &str, object_names: &[String]) -> Vec<String> {
    object_names
        .iter()
        .map(|name| format!("{}{}", prefix, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn event(request_type: &str, properties: Value) -> CustomResourceEvent {
        CustomResourceEvent::from_value(json!({
            "RequestType": request_type,
            "ResponseURL": "https://example.com/response",
            "StackId": "stack",
            "RequestId": "req-1",
            "LogicalResourceId": "CopyZips",
            "ResourceProperties": properties
        }))
        .unwrap()
    }

    #[test]
    fn test_from_create_event() {
        let event = event(
            "Create",
            json!({
                "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:CopyZips",
                "SourceBucket": "src",
                "DestBucket": "dst",
                "Prefix": "pkg/",
                "Objects": ["a.zip", "b.zip"]
            }),
        );

        let request = ReplicationRequest::from_event(&event).unwrap();

        assert_eq!(request.kind(), RequestKind::Create);
        assert_eq!(request.source_bucket(), "src");
        assert_eq!(request.dest_bucket(), "dst");
        assert_eq!(request.key_prefix(), "pkg/");
        assert_eq!(request.object_names(), &["a.zip".to_string(), "b.zip".to_string()]);
        assert_eq!(
            prefixed_keys(request.key_prefix(), request.object_names()),
            vec!["pkg/a.zip", "pkg/b.zip"]
        );
    }

    #[test]
    fn test_from_delete_event_without_source_bucket() {
        let event = event(
            "Delete",
            json!({
                "DestBucket": "dst",
                "Prefix": "pkg/",
                "Objects": ["a.zip"]
            }),
        );

        let request = ReplicationRequest::from_event(&event).unwrap();

        assert_eq!(request.kind(), RequestKind::Delete);
        assert_eq!(request.source_bucket(), "");
        assert_eq!(request.object_names(), &["a.zip".to_string()]);
    }

    #[test]
    fn test_from_update_event_requires_source_bucket() {
        let event = event("Update", json!({ "DestBucket": "dst", "Objects": ["a.zip"] }));

        let result = ReplicationRequest::from_event(&event);

        assert_eq!(
            result.unwrap_err(),
            ReplicationRequestError::MissingProperty("SourceBucket")
        );
    }

    #[test]
    fn test_unknown_request_type_is_treated_as_copy() {
        let event = event("Replace", json!({ "SourceBucket": "src", "DestBucket": "dst" }));

        let request = ReplicationRequest::from_event(&event).unwrap();

        assert_eq!(request.kind(), RequestKind::Other);
        assert_eq!(request.source_bucket(), "src");

        let without_source = self::event("Replace", json!({ "DestBucket": "dst" }));
        assert_eq!(
            ReplicationRequest::from_event(&without_source).unwrap_err(),
            ReplicationRequestError::MissingProperty("SourceBucket")
        );
    }

    #[test]
    fn test_missing_dest_bucket() {
        let event = event("Delete", json!({ "Objects": ["a.zip"] }));

        assert_eq!(
            ReplicationRequest::from_event(&event).unwrap_err(),
            ReplicationRequestError::MissingProperty("DestBucket")
        );
    }

    #[test]
    fn test_defaults_for_prefix_and_objects() {
        let event = event("Create", json!({ "SourceBucket": "src", "DestBucket": "dst" }));

        let request = ReplicationRequest::from_event(&event).unwrap();

        assert_eq!(request.key_prefix(), "");
        assert!(request.object_names().is_empty());
    }

    #[test]
    fn test_objects_not_a_list() {
        let event = event(
            "Create",
            json!({ "SourceBucket": "src", "DestBucket": "dst", "Objects": "a.zip" }),
        );

        match ReplicationRequest::from_event(&event).unwrap_err() {
            ReplicationRequestError::InvalidProperties(_) => {}
            other => panic!("Expected InvalidProperties, got {:?}", other),
        }
    }

    #[test]
    fn test_prefixed_keys_preserves_order() {
        let names = vec!["c.zip".to_string(), "a.zip".to_string(), "b.zip".to_string()];

        assert_eq!(
            prefixed_keys("lambda/", &names),
            vec!["lambda/c.zip", "lambda/a.zip", "lambda/b.zip"]
        );
    }
}

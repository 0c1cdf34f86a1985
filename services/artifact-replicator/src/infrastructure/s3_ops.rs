//! S3操作モジュール
//!
//! アーティファクトレプリケーターで使用するオブジェクトストア操作を提供する。
//! - バケット間のオブジェクトコピー（CopyObject）
//! - 複数オブジェクトの一括削除（DeleteObjects）

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{Delete, Error as DeleteError, ObjectIdentifier};
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;
use tracing::{info, warn};

/// S3操作のエラー型
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjectStoreError {
    /// AWS SDK エラー
    #[error("AWS S3 APIエラー: {0}")]
    AwsSdkError(String),

    /// リクエスト構築エラー
    #[error("S3リクエスト構築エラー: {0}")]
    BuildError(String),

    /// DeleteObjectsのレスポンスに含まれたキー単位のエラー
    #[error("一部オブジェクトの削除に失敗: {0}")]
    PartialDelete(String),
}

/// オブジェクトストア操作トレイト（テスト用の抽象化）
#[async_trait]
pub trait ObjectStoreOps: Send + Sync {
    /// オブジェクトをコピーする
    ///
    /// # 引数
    /// * `source_bucket` - コピー元バケット
    /// * `key` - コピー元キー
    /// * `dest_bucket` - コピー先バケット
    /// * `dest_key` - コピー先キー
    async fn copy_object(
        &self,
        source_bucket: &str,
        key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), ObjectStoreError>;

    /// 複数オブジェクトを1回のリクエストで削除する
    ///
    /// # 引数
    /// * `bucket` - 削除対象バケット
    /// * `keys` - 削除するキーのリスト
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), ObjectStoreError>;
}

/// 実際のAWS S3 SDKを使用したS3操作実装
pub struct AwsS3Ops {
    client: S3Client,
}

impl AwsS3Ops {
    /// 新しいAwsS3Opsを作成
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// AWS設定からデフォルトのクライアントを作成
    pub async fn from_config() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = S3Client::new(&config);
        Self::new(client)
    }
}

#[async_trait]
impl ObjectStoreOps for AwsS3Ops {
    async fn copy_object(
        &self,
        source_bucket: &str,
        key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), ObjectStoreError> {
        let result = self
            .client
            .copy_object()
            .copy_source(copy_source(source_bucket, key))
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(
                    source_bucket = %source_bucket,
                    dest_bucket = %dest_bucket,
                    key = %dest_key,
                    "S3 CopyObject成功"
                );
                Ok(())
            }
            Err(err) => {
                let detail = DisplayErrorContext(&err).to_string();
                warn!(
                    source_bucket = %source_bucket,
                    dest_bucket = %dest_bucket,
                    key = %dest_key,
                    error = %detail,
                    "S3 CopyObjectエラー"
                );
                Err(ObjectStoreError::AwsSdkError(detail))
            }
        }
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), ObjectStoreError> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ObjectStoreError::BuildError(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| ObjectStoreError::BuildError(e.to_string()))?;

        let result = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let detail = DisplayErrorContext(&err).to_string();
                warn!(
                    bucket = %bucket,
                    key_count = keys.len(),
                    error = %detail,
                    "S3 DeleteObjectsエラー"
                );
                return Err(ObjectStoreError::AwsSdkError(detail));
            }
        };

        if let Err(err) = delete_failures(output.errors()) {
            warn!(
                bucket = %bucket,
                failed_count = output.errors().len(),
                error = %err,
                "S3 DeleteObjectsで一部キーの削除に失敗"
            );
            return Err(err);
        }

        info!(bucket = %bucket, key_count = keys.len(), "S3 DeleteObjects成功");
        Ok(())
    }
}

/// DeleteObjectsのレスポンスに含まれるキー単位のエラーを検査する
///
/// quietモードでは失敗したキーのみが返るため、1件でもあれば失敗とする。
fn delete_failures(errors: &[DeleteError]) -> Result<(), ObjectStoreError> {
    if errors.is_empty() {
        return Ok(());
    }

    let failures: Vec<String> = errors
        .iter()
        .map(|e| {
            format!(
                "{} ({}: {})",
                e.key().unwrap_or("unknown"),
                e.code().unwrap_or("unknown"),
                e.message().unwrap_or("")
            )
        })
        .collect();

    Err(ObjectStoreError::PartialDelete(failures.join(", ")))
}

/// CopySource（`bucket/key`）を組み立てる
///
/// キーはURLエンコードが必要。区切りの`/`と非予約文字はそのまま残す。
pub fn copy_source(bucket: &str, key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    format!("{}/{}", bucket, encoded)
}

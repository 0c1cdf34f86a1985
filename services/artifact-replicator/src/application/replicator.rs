/// アーティファクトレプリケーター
///
/// スタック作成/更新時にLambda zipをコピー元バケットからコピー先バケットへ複製し、
/// スタック削除時にコピー先から削除する。結果はデッドライン内に1度だけCloudFormationへ応答する。
///
/// # invocationの状態遷移
/// `Started -> {Copying|Deleting} -> {Completed|Failed|TimedOut}`
/// - Completed: SUCCESS応答
/// - Failed: ストア操作またはプロパティ検証の失敗、FAILED応答
/// - TimedOut: ウォッチドッグがFAILED応答を送信済み（メイン処理の完了後も再送しない）
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn, Instrument, Span};

use super::response_latch::ResponseLatch;
use super::watchdog::Watchdog;
use crate::domain::{
    physical_resource_id, prefixed_keys, CustomResourceEvent, EventParseError, LifecycleResponse,
    ReplicationRequest, ReplicationRequestError, RequestKind,
};
use crate::infrastructure::{
    LifecycleResponder, ObjectStoreError, ObjectStoreOps, ReplicatorConfig, ReplicatorConfigError,
};

/// レプリケーション処理のエラー型
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// オブジェクトのコピーに失敗（コピー済みのオブジェクトはロールバックしない）
    #[error("オブジェクトのコピーに失敗 ({copied}件コピー済み): {key}: {source}")]
    CopyFailed {
        key: String,
        copied: usize,
        #[source]
        source: ObjectStoreError,
    },

    /// 一括削除に失敗
    #[error("オブジェクトの削除に失敗: {bucket}: {source}")]
    DeleteFailed {
        bucket: String,
        #[source]
        source: ObjectStoreError,
    },

    /// ResourcePropertiesが不正
    #[error(transparent)]
    InvalidRequest(#[from] ReplicationRequestError),

    /// イベントの識別子が欠けている
    #[error(transparent)]
    InvalidEvent(#[from] EventParseError),
}

/// デッドライン接近による打ち切り
#[derive(Debug, Clone, Error)]
#[error("Lambdaのデッドライン{margin_ms}ms前までに処理が完了しませんでした")]
pub struct TimeoutError {
    pub margin_ms: u64,
}

/// invocationの終端状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// 処理成功、SUCCESS応答を送信
    Completed,
    /// 処理失敗、FAILED応答を送信
    Failed,
    /// ウォッチドッグがFAILED応答を送信
    TimedOut,
}

/// プロビジョニング時のアーティファクトレプリケーター
pub struct ArtifactReplicator<S, R>
where
    S: ObjectStoreOps,
    R: LifecycleResponder + 'static,
{
    store: S,
    responder: Arc<R>,
    log_stream_name: String,
    watchdog_margin: Duration,
    /// invocation単位のログコンテキスト
    span: Span,
}

impl<S, R> ArtifactReplicator<S, R>
where
    S: ObjectStoreOps,
    R: LifecycleResponder + 'static,
{
    /// 新しいArtifactReplicatorを作成
    ///
    /// # 引数
    /// * `store` - オブジェクトストア操作
    /// * `responder` - CloudFormation応答送信
    /// * `config` - ログストリーム名・ウォッチドッグのマージン
    /// * `span` - 全ログに付与するコンテキスト
    pub fn new(store: S, responder: Arc<R>, config: &ReplicatorConfig, span: Span) -> Self {
        Self {
            store,
            responder,
            log_stream_name: config.log_stream_name().to_string(),
            watchdog_margin: config.watchdog_margin(),
            span,
        }
    }

    /// カスタムリソースイベントを処理して応答する
    ///
    /// # 処理フロー
    /// 1. デッドライン - マージンで発火するウォッチドッグを起動
    /// 2. Deleteなら`remove`、それ以外は`copy`を実行
    /// 3. ウォッチドッグを解除
    /// 4. 送信権を取得できた場合のみ結果を応答
    ///
    /// エラーは呼び出し元に伝播せず、必ずFAILED応答に変換する。
    ///
    /// # 引数
    /// * `event` - カスタムリソースイベント
    /// * `deadline_ms` - Lambdaのデッドライン（UNIXエポックミリ秒）
    pub async fn handle(&self, event: &CustomResourceEvent, deadline_ms: u64) -> InvocationOutcome {
        let span = self.span.clone();
        self.handle_inner(event, deadline_ms).instrument(span).await
    }

    async fn handle_inner(&self, event: &CustomResourceEvent, deadline_ms: u64) -> InvocationOutcome {
        info!(
            event = %serde_json::to_string(event).unwrap_or_default(),
            "REQUEST RECEIVED"
        );

        let physical_id = physical_resource_id(event, &self.log_stream_name);
        let latch = Arc::new(ResponseLatch::new());

        let now_ms = chrono::Utc::now().timestamp_millis();
        let fire_in = watchdog_delay(deadline_ms, now_ms, self.watchdog_margin);
        info!(fire_in_ms = duration_ms(fire_in), "ウォッチドッグを起動");
        let watchdog = self.arm_watchdog(fire_in, event, &physical_id, &latch);

        let result = self.dispatch(event).await;

        // 成功・失敗どちらの経路でも応答前に必ず解除する
        let fired = watchdog.disarm().await;

        let response = match &result {
            Ok(()) => LifecycleResponse::success(&physical_id),
            Err(err) => {
                error!(error = %err, detail = ?err, "レプリケーション失敗");
                LifecycleResponse::failed(&physical_id, err)
            }
        };

        if !respond(self.responder.as_ref(), &latch, event, &response).await {
            warn!(
                watchdog_fired = fired,
                main_path_success = response.is_success(),
                "ウォッチドッグが応答済みのため結果の送信をスキップ"
            );
            return InvocationOutcome::TimedOut;
        }

        if response.is_success() {
            info!(physical_resource_id = %physical_id, "レプリケーション完了");
            InvocationOutcome::Completed
        } else {
            InvocationOutcome::Failed
        }
    }

    /// リクエスト種別に応じてcopyまたはremoveのどちらか一方を実行する
    async fn dispatch(&self, event: &CustomResourceEvent) -> Result<(), ReplicationError> {
        event.validate_identity()?;
        let request = ReplicationRequest::from_event(event)?;

        match request.kind() {
            RequestKind::Delete => {
                info!(state = "Deleting", "削除を開始");
                self.remove(
                    request.dest_bucket(),
                    request.key_prefix(),
                    request.object_names(),
                )
                .await?;
            }
            RequestKind::Create | RequestKind::Update | RequestKind::Other => {
                info!(state = "Copying", request_kind = ?request.kind(), "コピーを開始");
                self.copy(
                    request.source_bucket(),
                    request.dest_bucket(),
                    request.key_prefix(),
                    request.object_names(),
                )
                .await?;
            }
        }

        Ok(())
    }

    /// オブジェクトを順番にコピーする
    ///
    /// 途中で失敗した場合はそこで中断し、コピー済みのオブジェクトは残す。
    ///
    /// # 戻り値
    /// * `Ok(usize)` - コピーしたオブジェクト数
    /// * `Err(ReplicationError)` - 最初に失敗したキー
    pub async fn copy(
        &self,
        source_bucket: &str,
        dest_bucket: &str,
        prefix: &str,
        object_names: &[String],
    ) -> Result<usize, ReplicationError> {
        let mut copied = 0usize;

        for key in prefixed_keys(prefix, object_names) {
            match self.store.copy_object(source_bucket, &key, dest_bucket, &key).await {
                Ok(()) => {
                    copied += 1;
                    info!(
                        source_bucket = %source_bucket,
                        dest_bucket = %dest_bucket,
                        key = %key,
                        "オブジェクトをコピー"
                    );
                }
                Err(source) => {
                    return Err(ReplicationError::CopyFailed { key, copied, source });
                }
            }
        }

        info!(copied = copied, "全オブジェクトのコピー完了");
        Ok(copied)
    }

    /// オブジェクトを1回のDeleteObjectsでまとめて削除する
    ///
    /// 対象が空の場合はストアを呼び出さない（S3は空のDeleteObjectsを拒否する）。
    ///
    /// # 戻り値
    /// * `Ok(usize)` - 削除要求したキー数
    /// * `Err(ReplicationError)` - 削除失敗
    pub async fn remove(
        &self,
        bucket: &str,
        prefix: &str,
        object_names: &[String],
    ) -> Result<usize, ReplicationError> {
        let keys = prefixed_keys(prefix, object_names);

        if keys.is_empty() {
            info!(bucket = %bucket, "削除対象がないためDeleteObjectsを省略");
            return Ok(0);
        }

        self.store
            .delete_objects(bucket, &keys)
            .await
            .map_err(|source| ReplicationError::DeleteFailed {
                bucket: bucket.to_string(),
                source,
            })?;

        info!(bucket = %bucket, keys = ?keys, "オブジェクトを削除");
        Ok(keys.len())
    }

    fn arm_watchdog(
        &self,
        fire_in: Duration,
        event: &CustomResourceEvent,
        physical_id: &str,
        latch: &Arc<ResponseLatch>,
    ) -> Watchdog {
        let responder = Arc::clone(&self.responder);
        let latch = Arc::clone(latch);
        let event = event.clone();
        let physical_id = physical_id.to_string();
        let timeout = TimeoutError {
            margin_ms: duration_ms(self.watchdog_margin),
        };
        let span = self.span.clone();

        Watchdog::arm(fire_in, move || {
            async move {
                error!(error = %timeout, "タイムアウト: FAILEDを応答");
                let response = LifecycleResponse::failed(physical_id, &timeout);
                respond(responder.as_ref(), &latch, &event, &response).await;
            }
            .instrument(span)
        })
    }
}

/// 設定読み込みに失敗した場合のFAILED応答
///
/// レプリケーターを構築できないため、ここで1度だけ応答する。
/// `fallback_log_stream`はログストリーム名の代わりに物理リソースIDの採番に使う。
pub async fn report_config_failure<R>(
    responder: &R,
    event: &CustomResourceEvent,
    fallback_log_stream: &str,
    err: &ReplicatorConfigError,
) -> InvocationOutcome
where
    R: LifecycleResponder + ?Sized,
{
    error!(error = %err, "Replicator設定読み込み失敗: FAILEDを応答");

    let response = LifecycleResponse::failed(physical_resource_id(event, fallback_log_stream), err);
    respond(responder, &ResponseLatch::new(), event, &response).await;
    InvocationOutcome::Failed
}

/// ウォッチドッグの発火までの時間
///
/// デッドラインからマージンを引いた時刻までの残り時間。過ぎていれば0。
fn watchdog_delay(deadline_ms: u64, now_ms: i64, margin: Duration) -> Duration {
    let now_ms = u64::try_from(now_ms).unwrap_or(0);
    let remaining_ms = deadline_ms
        .saturating_sub(now_ms)
        .saturating_sub(duration_ms(margin));
    Duration::from_millis(remaining_ms)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// 送信権を取得できた場合のみ応答を送信する
///
/// 送信自体の失敗はログ出力のみで再送しない。
///
/// # 戻り値
/// 送信権を取得した場合は`true`
async fn respond<R>(
    responder: &R,
    latch: &ResponseLatch,
    event: &CustomResourceEvent,
    response: &LifecycleResponse,
) -> bool
where
    R: LifecycleResponder + ?Sized,
{
    if !latch.try_claim() {
        return false;
    }

    if let Err(err) = responder.send(event, response).await {
        error!(
            error = %err,
            status = response.status.as_str(),
            "CloudFormationへの応答送信に失敗"
        );
    }
    true
}

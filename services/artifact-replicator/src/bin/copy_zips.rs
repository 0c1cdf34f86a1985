/// CopyZips Lambda関数
///
/// CloudFormationカスタムリソースとして呼び出され、
/// Create/UpdateではLambda zipをコピー元バケットからリージョンのバケットへ複製し、
/// Deleteではコピー先から削除する。結果はResponseURLへ1度だけ応答する。
use std::sync::Arc;

use artifact_replicator::application::{report_config_failure, ArtifactReplicator};
use artifact_replicator::domain::CustomResourceEvent;
use artifact_replicator::infrastructure::{
    init_logging, invocation_span, AwsS3Ops, HttpCfnResponder, ReplicatorConfig, ReplicatorConfigError,
};
use artifact_replicator::infrastructure::replicator_config::DEFAULT_RESPONSE_TIMEOUT_SECS;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // Lambda関数を初期化して実行
    let func = service_fn(handler);
    lambda_runtime::run(func).await?;
    Ok(())
}

/// Lambda関数のメインハンドラー
///
/// # 処理フロー
/// 1. カスタムリソースイベントのエンベロープをパース
/// 2. 環境変数からReplicatorConfigを読み込み
/// 3. ArtifactReplicatorでコピー/削除を実行して応答
///
/// # 戻り値
/// 応答不能（ResponseURLなし）の場合のみErr、それ以外は常にOk
async fn handler(event: LambdaEvent<Value>) -> Result<(), Error> {
    let LambdaEvent { payload, context } = event;

    let event = match CustomResourceEvent::from_value(payload) {
        Ok(event) => event,
        Err(err) => {
            // ResponseURLが取得できないため応答は不可能
            error!(error = %err, "カスタムリソースイベントのパースに失敗");
            return Err(err.into());
        }
    };

    let config = match ReplicatorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            respond_config_failure(&event, &context.request_id, &err).await;
            return Ok(());
        }
    };

    let responder = match HttpCfnResponder::new(config.log_stream_name(), config.response_timeout()) {
        Ok(responder) => Arc::new(responder),
        Err(err) => {
            // HTTPクライアントが作れない場合は応答も送れない
            error!(error = %err, "HTTPクライアント作成失敗");
            return Err(err.into());
        }
    };

    let store = AwsS3Ops::from_config().await;
    let span = invocation_span(&event);
    let replicator = ArtifactReplicator::new(store, responder, &config, span);

    let outcome = replicator.handle(&event, context.deadline).await;
    info!(outcome = ?outcome, request_id = %event.request_id, "Lambda Handler - End");

    Ok(())
}

/// 設定読み込みに失敗した場合もFAILEDを1度だけ応答する
async fn respond_config_failure(
    event: &CustomResourceEvent,
    lambda_request_id: &str,
    err: &ReplicatorConfigError,
) {
    let timeout = std::time::Duration::from_secs(DEFAULT_RESPONSE_TIMEOUT_SECS);
    let responder = match HttpCfnResponder::new(lambda_request_id, timeout) {
        Ok(responder) => responder,
        Err(build_err) => {
            error!(error = %err, build_error = %build_err, "設定読み込み失敗、HTTPクライアント作成も失敗");
            return;
        }
    };

    let outcome = report_config_failure(&responder, event, lambda_request_id, err).await;
    info!(outcome = ?outcome, request_id = %event.request_id, "Lambda Handler - End");
}

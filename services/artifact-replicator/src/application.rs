// アプリケーション層モジュール
pub mod replicator;
pub mod response_latch;
pub mod watchdog;

// 再エクスポート
pub use replicator::{
    report_config_failure, ArtifactReplicator, InvocationOutcome, ReplicationError, TimeoutError,
};
pub use response_latch::ResponseLatch;
pub use watchdog::Watchdog;

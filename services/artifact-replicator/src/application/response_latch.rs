/// 応答送信ラッチ
///
/// メイン処理とウォッチドッグが共有する単発の完了シグナル。
/// 最初に`try_claim`に成功した側だけが応答を送信できる。
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ResponseLatch {
    claimed: AtomicBool,
}

impl ResponseLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 送信権を取得する
    ///
    /// 最初の呼び出しのみ`true`を返し、以降は常に`false`。
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// デッドライン監視タイマー
///
/// 指定時間後にコールバックを1度だけ実行するタスクを起動する。
/// `Watchdog`はスコープガードとして振る舞い、`disarm`またはdropで必ずキャンセルされる。
/// 発火済みのタイマーに対するキャンセルは何もしない（送信中の応答は最後まで実行される）。
use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct Watchdog {
    /// dropでキャンセルを通知する
    cancel: Option<oneshot::Sender<()>>,
    /// タイマータスク（発火した場合は`true`を返す）
    handle: Option<JoinHandle<bool>>,
}

impl Watchdog {
    /// `fire_in`経過後に`on_fire`を実行するタイマーを起動する
    pub fn arm<F, Fut>(fire_in: Duration, on_fire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                // キャンセルと同時に期限を迎えた場合はキャンセルを優先
                biased;
                _ = cancel_rx => false,
                _ = tokio::time::sleep(fire_in) => {
                    on_fire().await;
                    true
                }
            }
        });

        Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// タイマーをキャンセルし、タスクの終了を待つ
    ///
    /// 既に発火していた場合はコールバックの完了を待ってから`true`を返す。
    pub async fn disarm(mut self) -> bool {
        self.cancel.take();

        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // 送信側のdropで受信側がErrで完了し、未発火のタイマーは停止する
        self.cancel.take();
    }
}

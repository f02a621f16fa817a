// Surface teardown signal

use tokio::sync::watch;

/// Teardown signal observed by a surface task
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once teardown is requested (immediately if it already was)
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|down| *down).await;
    }
}

pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal teardown to every token minted from this sender
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_after_shutdown_returns() {
        let (tx, mut token) = shutdown_channel();
        let mut second = tx.token();
        assert!(!token.is_shutdown());

        tx.shutdown();
        token.wait().await;
        second.wait().await;
        assert!(token.is_shutdown());
        assert!(second.is_shutdown());
    }

    #[test]
    fn test_wait_pending_until_shutdown() {
        let (tx, mut token) = shutdown_channel();
        let mut wait = tokio_test::task::spawn(async move { token.wait().await });

        tokio_test::assert_pending!(wait.poll());
        tx.shutdown();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_wait_when_sender_dropped() {
        let (tx, mut token) = shutdown_channel();
        drop(tx);
        token.wait().await;
        assert!(!token.is_shutdown());
    }
}

//! Gateway on an ephemeral port, stopped on drop or by [`TestServer::stop`].

use rpc_gateway::{Gateway, GatewayError};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    endpoint: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), GatewayError>>>,
}

impl TestServer {
    /// Bind 127.0.0.1:0 and serve `gateway` in a background task.
    pub async fn spawn(gateway: Gateway) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let endpoint = gateway.config().http.endpoint.clone();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            gateway
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Ok(Self {
            addr,
            endpoint,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// URL of the configured endpoint.
    pub fn endpoint_url(&self) -> String {
        self.url(&self.endpoint)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Signal shutdown and wait for the server task to finish.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

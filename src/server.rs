use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::settings::ServerSettings;

/// Bind `settings.addr()` and serve `router` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Fails if the address cannot be bound or the server stops with an I/O error.
pub async fn serve(router: Router, settings: &ServerSettings) -> anyhow::Result<()> {
    let listener = TcpListener::bind(settings.addr()).await?;
    serve_on(listener, router, shutdown_signal()).await
}

/// Serve `router` on an already bound listener until `shutdown` completes.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Errors
///
/// Fails if the server stops with an I/O error.
pub async fn serve_on<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "permission integration listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("permission integration stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    #[tokio::test]
    async fn serve_on_returns_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let router = Router::new().route("/", get(|| async { "ok" }));
        serve_on(listener, router, async {}).await.unwrap();
    }

    #[tokio::test]
    async fn serve_fails_when_port_is_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let settings = ServerSettings {
            host: "127.0.0.1".to_owned(),
            port: taken.local_addr().unwrap().port(),
        };
        assert!(serve(Router::new(), &settings).await.is_err());
    }
}

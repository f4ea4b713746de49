/// Listen for SIGTERM (container/orchestrator termination) or ctrl-c.
/// Mirrors the teacher's `shutdown_signal` in `ssmd-harman::shutdown`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("SIGTERM received"),
        _ = ctrl_c => tracing::info!("ctrl-c received"),
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
}

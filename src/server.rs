use std::{fs, io::ErrorKind, os::unix::fs::FileTypeExt, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    control::{ControlSurface, DynamicParamsUpdate},
    gateway::{
        PaymentGateway,
        error::ReconcileError,
        types::{BillingClaim, ClaimKind},
    },
    ledger::IterationReport,
    protocol::{AdminRequest, AdminResponse, parse_admin_request},
    reputation::ResetOutcome,
};

enum ExitReason {
    SocketMessage,
    Signal(&'static str),
}

pub async fn run(
    socket_path: &Path,
    control: Arc<ControlSurface>,
    gateway: Arc<PaymentGateway>,
) -> Result<()> {
    prepare_socket_path(socket_path)?;
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("unable to bind socket {}", socket_path.display()))?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();

    tracing::info!(
        target: "server",
        socket = %socket_path.display(),
        "admin socket listening (NDJSON)"
    );

    let exit_reason = loop {
        tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            Some(()) = shutdown_rx.recv() => break ExitReason::SocketMessage,
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let control = Arc::clone(&control);
                        let gateway = Arc::clone(&gateway);
                        let shutdown = shutdown_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_client(stream, control, gateway, shutdown).await {
                                tracing::warn!(target: "server", error = %format!("{err:#}"), "client handling failed");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(target: "server", error = %err, "accept failed"),
                }
            }
        }
    };

    cleanup_socket_path(socket_path)?;
    match exit_reason {
        ExitReason::SocketMessage => {
            tracing::info!(target: "server", "stopped: received exit message");
        }
        ExitReason::Signal(signal_name) => {
            tracing::info!(target: "server", signal = signal_name, "stopped: received signal");
        }
    }

    Ok(())
}

async fn handle_client(
    stream: UnixStream,
    control: Arc<ControlSurface>,
    gateway: Arc<PaymentGateway>,
    shutdown: mpsc::UnboundedSender<()>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match parse_admin_request(line) {
            Ok(AdminRequest::Exit) => {
                let _ = shutdown.send(());
                AdminResponse::ok_message("shutting down")
            }
            Ok(request) => dispatch(request, &control, &gateway).await,
            Err(err) => AdminResponse::error("invalid_request", err.to_string()),
        };

        let mut text = serde_json::to_string(&response)
            .context("failed to serialize admin response")?;
        text.push('\n');
        write_half.write_all(text.as_bytes()).await?;
    }

    Ok(())
}

async fn dispatch(
    request: AdminRequest,
    control: &ControlSurface,
    gateway: &PaymentGateway,
) -> AdminResponse {
    match request {
        AdminRequest::GetParams => match control.dynamic_params() {
            Ok(params) => json_data(&params),
            Err(err) => error_response(&err),
        },
        AdminRequest::SetParams {
            minimum_speed,
            minimum_efficiency,
            single_pass_seconds,
        } => {
            let update = DynamicParamsUpdate {
                minimum_speed,
                minimum_efficiency,
                single_pass_seconds,
            };
            match control.set_dynamic_params(update) {
                Ok(params) => json_data(&params),
                Err(err) => error_response(&err),
            }
        }
        AdminRequest::BannedProviders => json_data(&control.banned_providers()),
        AdminRequest::ResetBannedProviders => match control.reset_banned_providers() {
            Ok(ResetOutcome::Cleared { removed }) => AdminResponse::ok_message(format!(
                "banned providers reset successfully ({removed} removed)"
            )),
            Ok(ResetOutcome::NothingToReset) => {
                AdminResponse::ok_message("no banned providers to reset")
            }
            Err(err) => error_response(&err),
        },
        AdminRequest::Status => json_data(&control.status().await),
        AdminRequest::IterationReport {
            agreement_id,
            provider_id,
            provider_name,
            iteration_no,
            duration_sec,
            status,
        } => {
            gateway
                .record_iteration(&IterationReport {
                    agreement_id,
                    provider_id,
                    provider_name,
                    iteration_no,
                    duration_sec,
                    status,
                })
                .await;
            AdminResponse::ok_message("iteration recorded")
        }
        AdminRequest::Invoice {
            claim_id,
            agreement_id,
            provider_id,
            provider_name,
            amount,
        } => {
            let claim = BillingClaim {
                claim_id,
                agreement_id,
                provider_id,
                provider_name,
                amount,
                kind: ClaimKind::Invoice,
            };
            match gateway.accept_invoice(&claim).await {
                Ok(decision) => json_data(&decision),
                Err(err) => error_response(&err),
            }
        }
        AdminRequest::DebitNote {
            claim_id,
            agreement_id,
            provider_id,
            provider_name,
            amount,
        } => {
            let claim = BillingClaim {
                claim_id,
                agreement_id,
                provider_id,
                provider_name,
                amount,
                kind: ClaimKind::DebitNote,
            };
            match gateway.accept_debit_note(&claim).await {
                Ok(decision) => json_data(&decision),
                Err(err) => error_response(&err),
            }
        }
        // Exit is intercepted before dispatch.
        AdminRequest::Exit => AdminResponse::ok_message("shutting down"),
    }
}

fn json_data<T: serde::Serialize>(value: &T) -> AdminResponse {
    match serde_json::to_value(value) {
        Ok(data) => AdminResponse::ok_data(data),
        Err(err) => AdminResponse::error("internal_error", err.to_string()),
    }
}

fn error_response(err: &ReconcileError) -> AdminResponse {
    AdminResponse::error(err.code(), err.message.clone())
}

fn prepare_socket_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("unable to create {}", parent.display()))?;
    }

    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if metadata.file_type().is_socket() || metadata.is_file() {
                fs::remove_file(path)
                    .with_context(|| format!("unable to remove stale socket {}", path.display()))?;
            } else {
                bail!(
                    "socket path exists but is not removable as file/socket: {}",
                    path.display()
                );
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("unable to inspect {}", path.display()));
        }
    }

    Ok(())
}

fn cleanup_socket_path(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("unable to remove {}", path.display())),
    }
}

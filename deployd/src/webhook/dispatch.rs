//! Webhook dispatch
//!
//! Decides what to do with a delivery and enforces the respond-then-execute
//! ordering: the deploy task is gated on the acknowledgment body having been
//! written out, and the command's outcome is only ever logged. The
//! background task holds no handle to the HTTP response, so a late deploy
//! failure cannot reach an already-answered caller.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use http_body::Frame;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::config::{DeployTarget, TargetId};
use crate::deploy::runner::RunError;
use crate::server::handlers::envelope;
use crate::server::state::ServerState;
use crate::webhook::signature::{self, SIGNATURE_HEADER};

/// Header carrying the event type
pub const EVENT_HEADER: &str = "x-github-event";

/// The only event type that triggers a deploy
const PUSH_EVENT: &str = "push";

/// Push payload; only the ref is relevant
#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref", default)]
    git_ref: String,
}

/// What a delivery resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Signature missing or invalid
    Unauthorized,

    /// Valid delivery that does not match the target's event/branch
    Ignored,

    /// Push to the configured branch; run this build command
    Deploy { command: String },
}

/// Classify a delivery for one deploy target.
///
/// An unparseable body with a valid signature is ignored rather than
/// rejected: the branch condition cannot hold, and GitHub redelivers on
/// its own schedule anyway.
pub fn evaluate(
    secret: &SecretString,
    target: &DeployTarget,
    headers: &HeaderMap,
    body: &[u8],
) -> Decision {
    if !signature::verify(secret, body, header_str(headers, SIGNATURE_HEADER)) {
        return Decision::Unauthorized;
    }

    if header_str(headers, EVENT_HEADER) != Some(PUSH_EVENT) {
        return Decision::Ignored;
    }

    let Some(expected_ref) = target.expected_ref() else {
        return Decision::Ignored;
    };

    let git_ref = serde_json::from_slice::<PushPayload>(body)
        .map(|p| p.git_ref)
        .unwrap_or_default();

    if git_ref == expected_ref {
        Decision::Deploy {
            command: target.command().to_string(),
        }
    } else {
        Decision::Ignored
    }
}

/// Handle a webhook delivery for one deploy target.
///
/// The handler never awaits the deploy; completion of this function is the
/// caller's acknowledgment, not the deploy result. The deploy task is
/// parked until the acknowledgment body has actually been written, so a
/// deploy that restarts the service cannot cut the connection ahead of
/// the 202.
pub async fn handle_update(
    state: Arc<ServerState>,
    target_id: TargetId,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = state.config.target(target_id);

    match evaluate(&state.config.webhook_secret, target, &headers, &body) {
        Decision::Unauthorized => {
            warn!("Rejected delivery for {}: invalid signature", target.name());
            envelope(StatusCode::UNAUTHORIZED, false, "Unauthorized", None)
        }
        Decision::Ignored => {
            envelope(StatusCode::OK, true, "Ignoring non-target event.", None)
        }
        Decision::Deploy { command } => {
            info!("Accepted push for {}; deploying `{}`", target.name(), command);
            let response = envelope(
                StatusCode::ACCEPTED,
                true,
                "Deployment initiated",
                Some(json!({ "command": command })),
            );
            let (response, flushed) = with_flush_signal(response);
            spawn_deploy(state.clone(), target_id, command, flushed);
            response
        }
    }
}

/// Wrap a response body so that `flushed` resolves once the body has been
/// written out in full (or errors once it is dropped unread).
fn with_flush_signal(response: Response) -> (Response, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let (parts, body) = response.into_parts();
    let body = Body::new(AckBody {
        inner: body,
        flushed: Some(tx),
    });
    (Response::from_parts(parts, body), rx)
}

/// Response body that signals when it has been fully written
struct AckBody {
    inner: Body,
    flushed: Option<oneshot::Sender<()>>,
}

impl http_body::Body for AckBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(None) => {
                if let Some(tx) = this.flushed.take() {
                    let _ = tx.send(());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }

    // is_end_stream stays at the default `false` so the final poll that
    // fires the signal always happens
    fn size_hint(&self) -> http_body::SizeHint {
        self.inner.size_hint()
    }
}

/// Launch the deploy command fire-and-forget.
///
/// The spawned task's only output channel is the service log.
fn spawn_deploy(
    state: Arc<ServerState>,
    target_id: TargetId,
    command: String,
    flushed: oneshot::Receiver<()>,
) {
    let lock = state.deploy_locks.get(target_id);

    tokio::spawn(async move {
        // Run only once the acknowledgment is on the wire. An Err means the
        // body was dropped unread (caller gone); the delivery was still
        // accepted, so deploy anyway.
        let _ = flushed.await;

        // Serialize overlapping deliveries for the same target; the working
        // directory is shared mutable state
        let _guard = lock.lock().await;

        let name = target_id.name();
        let args = vec![command.clone()];

        match state
            .runner
            .run(&state.config.build_tool, &args, &state.config.work_dir)
            .await
        {
            Ok(outcome) => {
                info!(
                    "Deploy `{}` for {} succeeded (exit code {})",
                    command, name, outcome.exit_code
                );
            }
            Err(RunError::ProcessFailed {
                exit_code,
                stdout,
                stderr,
                ..
            }) => {
                error!(
                    "Deploy `{}` for {} exited with code {}\n--- stdout ---\n{}\n--- stderr ---\n{}",
                    command, name, exit_code, stdout, stderr
                );
            }
            Err(e) => {
                error!("Deploy `{}` for {} failed: {}", command, name, e);
            }
        }
    });
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::signature::sign;
    use axum::http::HeaderValue;

    fn secret() -> SecretString {
        SecretString::from("hook-secret")
    }

    fn target() -> DeployTarget {
        DeployTarget {
            id: TargetId::BackendTest,
            branch: Some("test".to_string()),
        }
    }

    fn signed_headers(body: &[u8], event: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&sign(&secret(), body)).unwrap(),
        );
        headers.insert(EVENT_HEADER, HeaderValue::from_str(event).unwrap());
        headers
    }

    #[test]
    fn missing_signature_is_unauthorized() {
        let body = br#"{"ref":"refs/heads/test"}"#;
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_HEADER, HeaderValue::from_static(PUSH_EVENT));

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(decision, Decision::Unauthorized);
    }

    #[test]
    fn bad_signature_is_unauthorized() {
        let body = br#"{"ref":"refs/heads/test"}"#;
        let mut headers = signed_headers(body, PUSH_EVENT);
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_static("sha256=deadbeef"),
        );

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(decision, Decision::Unauthorized);
    }

    #[test]
    fn non_push_event_is_ignored() {
        let body = br#"{"ref":"refs/heads/test"}"#;
        let headers = signed_headers(body, "ping");

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(decision, Decision::Ignored);
    }

    #[test]
    fn push_to_another_branch_is_ignored() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let headers = signed_headers(body, PUSH_EVENT);

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(decision, Decision::Ignored);
    }

    #[test]
    fn unconfigured_target_is_ignored() {
        let body = br#"{"ref":"refs/heads/test"}"#;
        let headers = signed_headers(body, PUSH_EVENT);
        let unconfigured = DeployTarget {
            id: TargetId::BackendTest,
            branch: None,
        };

        let decision = evaluate(&secret(), &unconfigured, &headers, body);
        assert_eq!(decision, Decision::Ignored);
    }

    #[test]
    fn unparseable_body_with_valid_signature_is_ignored() {
        let body = b"not json";
        let headers = signed_headers(body, PUSH_EVENT);

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(decision, Decision::Ignored);
    }

    #[test]
    fn matching_push_deploys_the_target_command() {
        let body = br#"{"ref":"refs/heads/test"}"#;
        let headers = signed_headers(body, PUSH_EVENT);

        let decision = evaluate(&secret(), &target(), &headers, body);
        assert_eq!(
            decision,
            Decision::Deploy {
                command: "deployPeersTestBackend".to_string()
            }
        );
    }
}

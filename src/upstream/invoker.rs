use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CompletionClient, CompletionOutcome, RetryPolicy, UPSTREAM_BODY_PREVIEW_CHARS};
use crate::error::{GatewayError, IsRetryable};

/// Runs `op` until it yields a non-retryable outcome or the attempt budget is spent.
///
/// `op` receives the 1-based attempt number. A delay is only taken between attempts, never after
/// the last one, and only the calling task is suspended.
pub async fn retry_transient<F, Fut>(policy: &RetryPolicy, mut op: F) -> CompletionOutcome
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = CompletionOutcome>,
{
    let mut delays = policy.delays();
    let mut attempt = 1;

    loop {
        let outcome = op(attempt).await;
        if !outcome.is_retryable() {
            return outcome;
        }

        let Some(delay) = delays.next() else {
            warn!(
                attempt,
                max_attempts = policy.max_attempts(),
                "Upstream still rate limited; giving up"
            );
            return outcome;
        };

        if let CompletionOutcome::TransientFailure { raw_message } = &outcome {
            warn!(
                attempt,
                max_attempts = policy.max_attempts(),
                ?delay,
                raw = %format!("{:.len$}", raw_message, len = UPSTREAM_BODY_PREVIEW_CHARS),
                "Upstream rate limited; backing off"
            );
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Retry loop around a [`CompletionClient`] plus the caller-facing error mapping.
pub struct ResilientInvoker {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
    credential_configured: bool,
}

impl ResilientInvoker {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        policy: RetryPolicy,
        credential_configured: bool,
    ) -> Self {
        Self {
            client,
            policy,
            credential_configured,
        }
    }

    pub async fn invoke(&self, user_message: &str) -> Result<String, GatewayError> {
        if !self.credential_configured {
            return Err(GatewayError::MissingCredential);
        }

        let client = self.client.as_ref();
        let outcome = retry_transient(&self.policy, move |attempt| {
            debug!(attempt, "Calling upstream completion");
            client.complete(user_message)
        })
        .await;

        match outcome {
            CompletionOutcome::Success { content } => Ok(content),
            CompletionOutcome::TransientFailure { raw_message } => {
                Err(GatewayError::Busy { raw_message })
            }
            CompletionOutcome::FatalFailure { raw_message } => {
                Err(GatewayError::from_fatal(raw_message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays scripted outcomes and records when each call happened.
    struct ScriptedClient {
        script: Mutex<VecDeque<CompletionOutcome>>,
        fallback: CompletionOutcome,
        calls: Mutex<Vec<(Instant, String)>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<CompletionOutcome>, fallback: CompletionOutcome) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn always(outcome: CompletionOutcome) -> Arc<Self> {
            Self::new(Vec::new(), outcome)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("calls lock").len()
        }

        fn messages(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(|(_, message)| message.clone())
                .collect()
        }

        /// Gaps between consecutive calls.
        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().expect("calls lock");
            calls.windows(2).map(|w| w[1].0 - w[0].0).collect()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, user_message: &str) -> CompletionOutcome {
            self.calls
                .lock()
                .expect("calls lock")
                .push((Instant::now(), user_message.to_string()));
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn rate_limited() -> CompletionOutcome {
        CompletionOutcome::from_failure("Error code: 429 - Rate limit exceeded")
    }

    fn invoker(client: Arc<ScriptedClient>, policy: RetryPolicy) -> ResilientInvoker {
        ResilientInvoker::new(client, policy, true)
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_two_transient_failures() {
        let client = ScriptedClient::new(
            vec![rate_limited(), rate_limited()],
            CompletionOutcome::success("X"),
        );
        let invoker = invoker(client.clone(), RetryPolicy::default());

        let start = Instant::now();
        let result = invoker.invoke("teach me closures").await;

        assert_eq!(result, Ok("X".to_string()));
        assert_eq!(client.call_count(), 3);
        assert_eq!(
            client.gaps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_runs_shorter_than_budget_end_in_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250), 2.0).expect("policy");
        for failures in 0..5 {
            let client = ScriptedClient::new(
                vec![rate_limited(); failures],
                CompletionOutcome::success("ok"),
            );
            let result = invoker(client.clone(), policy).invoke("q").await;

            assert_eq!(result, Ok("ok".to_string()), "failures = {failures}");
            assert_eq!(client.call_count(), failures + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn credential_failure_stops_after_one_call() {
        let client = ScriptedClient::always(CompletionOutcome::from_failure(
            "Error code: 401 - {\"error\":{\"message\":\"Invalid API key\"}}",
        ));
        let invoker = invoker(client.clone(), RetryPolicy::default());

        let start = Instant::now();
        let err = invoker.invoke("q").await.expect_err("must fail");

        assert!(matches!(err, GatewayError::CredentialRejected { .. }));
        assert_eq!(client.call_count(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn other_fatal_failure_is_not_retried() {
        let raw = "Error code: 400 - unknown model";
        let client = ScriptedClient::new(
            vec![CompletionOutcome::from_failure(raw)],
            CompletionOutcome::success("never reached"),
        );
        let err = invoker(client.clone(), RetryPolicy::default())
            .invoke("q")
            .await
            .expect_err("must fail");

        assert_eq!(
            err,
            GatewayError::Upstream {
                raw_message: raw.to_string()
            }
        );
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_returns_busy_after_budget() {
        let client = ScriptedClient::always(rate_limited());
        let invoker = invoker(client.clone(), RetryPolicy::default());

        let start = Instant::now();
        let err = invoker.invoke("q").await.expect_err("must fail");

        assert!(matches!(err, GatewayError::Busy { .. }));
        assert_eq!(client.call_count(), 3);
        assert_eq!(
            client.gaps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        // No sleep after the final attempt.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn kth_retry_delay_is_geometric() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250), 2.0).expect("policy");
        let client = ScriptedClient::always(rate_limited());
        let _ = invoker(client.clone(), policy).invoke("q").await;

        assert_eq!(client.call_count(), 5);
        let expected: Vec<Duration> = (1..5).map(|k| policy.delay_before_retry(k)).collect();
        assert_eq!(client.gaps(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_credential_short_circuits() {
        let client = ScriptedClient::always(CompletionOutcome::success("unused"));
        let invoker = ResilientInvoker::new(client.clone(), RetryPolicy::default(), false);

        let start = Instant::now();
        let err = invoker.invoke("q").await.expect_err("must fail");

        assert_eq!(err, GatewayError::MissingCredential);
        assert_eq!(client.call_count(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_invocations_are_independent() {
        let client = ScriptedClient::always(CompletionOutcome::success("same"));
        let invoker = invoker(client.clone(), RetryPolicy::default());

        for _ in 0..3 {
            assert_eq!(invoker.invoke("q").await, Ok("same".to_string()));
        }
        assert_eq!(client.messages(), vec!["q", "q", "q"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_message_is_forwarded() {
        let client = ScriptedClient::always(CompletionOutcome::success(""));
        let result = invoker(client.clone(), RetryPolicy::default())
            .invoke("")
            .await;

        assert_eq!(result, Ok(String::new()));
        assert_eq!(client.messages(), vec![String::new()]);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_does_not_block_other_invocations() {
        let slow = ScriptedClient::always(rate_limited());
        let fast = ScriptedClient::always(CompletionOutcome::success("fast"));
        let slow_invoker = invoker(slow.clone(), RetryPolicy::default());
        let fast_invoker = invoker(fast.clone(), RetryPolicy::default());

        let start = Instant::now();
        let (slow_result, fast_elapsed) = tokio::join!(slow_invoker.invoke("a"), async {
            tokio::task::yield_now().await;
            let result = fast_invoker.invoke("b").await;
            assert_eq!(result, Ok("fast".to_string()));
            start.elapsed()
        });

        assert!(matches!(slow_result, Err(GatewayError::Busy { .. })));
        assert_eq!(fast_elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_transient_passes_attempt_numbers() {
        let policy = RetryPolicy::default();
        let mut seen = Vec::new();
        let outcome = retry_transient(&policy, |attempt| {
            seen.push(attempt);
            async move {
                if attempt < 3 {
                    rate_limited()
                } else {
                    CompletionOutcome::success("done")
                }
            }
        })
        .await;

        assert_eq!(outcome, CompletionOutcome::success("done"));
        assert_eq!(seen, vec![1, 2, 3]);
    }
}

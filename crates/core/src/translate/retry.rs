//! Retry loop that resubmits a batch until the reply line count matches.

use super::batch::Batch;
use super::Translator;
use crate::config::RetryPolicy;
use crate::error::PipelineError;
use anyhow::Result;
use tracing::{debug, warn};

/// Translate `batch` until the backend returns exactly one line per input.
///
/// A failed request, an unparseable reply and a wrong-length reply are all
/// the same outcome: the attempt is discarded and the batch resubmitted
/// immediately, with no backoff. The default unbounded policy loops until
/// the count matches; a bounded policy surfaces
/// [`PipelineError::RetryBudgetExhausted`] instead. Count equality is the
/// only acceptance check; content fidelity is not validated here.
pub async fn translate_batch_reliable<T>(
    translator: &T,
    batch: &Batch,
    target_language: &str,
    policy: RetryPolicy,
    verbose: bool,
) -> Result<Vec<String>>
where
    T: Translator + ?Sized,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match translator
            .translate_batch(&batch.lines, target_language)
            .await
        {
            Ok(texts) if texts.len() == batch.len() => return Ok(texts),
            Ok(texts) => {
                let detail = format!(
                    "batch at offset {} returned {} lines for {} inputs",
                    batch.start,
                    texts.len(),
                    batch.len()
                );
                if verbose {
                    warn!("{detail}, retrying");
                } else {
                    debug!("{detail}, retrying");
                }
            }
            Err(err) => {
                let detail = format!("batch at offset {} failed: {err:#}", batch.start);
                if verbose {
                    warn!("{detail}, retrying");
                } else {
                    debug!("{detail}, retrying");
                }
            }
        }
        if let Some(max) = policy.max_attempts {
            if attempts >= max.get() {
                return Err(PipelineError::RetryBudgetExhausted { attempts }.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::batch::BatchLine;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn batch(n: usize) -> Batch {
        Batch {
            start: 0,
            lines: (0..n)
                .map(|i| BatchLine {
                    index: i as u32 + 1,
                    text: format!("line {i}"),
                })
                .collect(),
        }
    }

    /// Scripted translator: each call pops the next canned outcome.
    struct ScriptedTr {
        calls: AtomicU32,
        script: Vec<Result<Vec<String>>>,
    }

    impl ScriptedTr {
        fn new(script: Vec<Result<Vec<String>>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                script,
            }
        }
    }

    #[async_trait]
    impl Translator for ScriptedTr {
        async fn translate_batch(
            &self,
            _lines: &[BatchLine],
            _target_language: &str,
        ) -> Result<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match &self.script[call.min(self.script.len() - 1)] {
                Ok(texts) => Ok(texts.clone()),
                Err(err) => Err(anyhow!("{err:#}")),
            }
        }
    }

    #[tokio::test]
    async fn converges_on_the_first_count_consistent_reply() {
        let good = vec!["a".to_string(), "b".to_string()];
        let tr = ScriptedTr::new(vec![
            Ok(vec!["only one".to_string()]),
            Ok(vec!["one".to_string(), "two".to_string(), "three".to_string()]),
            Ok(good.clone()),
        ]);
        let out = translate_batch_reliable(&tr, &batch(2), "English", RetryPolicy::default(), false)
            .await
            .unwrap();
        assert_eq!(out, good);
        assert_eq!(tr.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn errors_count_as_failed_attempts() {
        let tr = ScriptedTr::new(vec![
            Err(anyhow!("connection reset")),
            Ok(vec!["bonjour".to_string()]),
        ]);
        let out = translate_batch_reliable(&tr, &batch(1), "French", RetryPolicy::default(), true)
            .await
            .unwrap();
        assert_eq!(out, vec!["bonjour"]);
        assert_eq!(tr.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bounded_policy_surfaces_budget_exhaustion() {
        let tr = ScriptedTr::new(vec![Ok(vec![])]);
        let policy = RetryPolicy::bounded(NonZeroU32::new(2).unwrap());
        let err = translate_batch_reliable(&tr, &batch(1), "English", policy, false)
            .await
            .unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::RetryBudgetExhausted { attempts }) => assert_eq!(*attempts, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(tr.calls.load(Ordering::SeqCst), 2);
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use governor::DefaultDirectRateLimiter;
use rig::completion::{self, CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, info_span};

use super::{RateLimitResponse, wait_for_quota};

/// Summary completions under a shared request quota
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
    throttled: Arc<AtomicU64>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
            throttled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Requests that had to wait for quota, across all clones
    pub fn throttled_requests(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = RateLimitResponse<M::Response>;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<completion::CompletionResponse<Self::Response>, CompletionError> {
        wait_for_quota(&self.limiter, &self.throttled, "completion").await;
        let response = self
            .model
            .completion(completion_request)
            .instrument(info_span!("summary_completion"))
            .await?;
        Ok(CompletionResponse {
            choice: response.choice,
            raw_response: RateLimitResponse {
                response: response.raw_response,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use governor::{Quota, RateLimiter};

    use super::*;
    use crate::model::mock::MockCompletionModel;

    #[tokio::test]
    async fn test_exhausted_quota_waits_and_is_counted() {
        let quota = Quota::with_period(Duration::from_millis(50)).unwrap();
        let model = RateLimitedCompletionModel::new(
            MockCompletionModel::with_text("özet"),
            RateLimiter::direct(quota),
        );
        let clone = model.clone();

        for _ in 0..2 {
            let response = model
                .completion_request("metin".to_string())
                .send()
                .await
                .unwrap();
            assert_eq!(response.choice.iter().count(), 1);
        }

        assert_eq!(model.throttled_requests(), 1);
        assert_eq!(clone.throttled_requests(), 1);
    }
}

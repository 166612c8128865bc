//! 지수 백오프 재시도.
//!
//! 일시적 에러(네트워크, 한도 초과, 타임스탬프 스큐)에 대해 제한된
//! 횟수만큼 재시도합니다. 대기 시간은 시도마다 2배씩 증가하며 지터가
//! 적용되고, 호출자가 준 데드라인을 넘지 않습니다.
//!
//! 시도 간 대기는 `tokio::time::sleep`을 사용하므로 테스트에서는
//! `start_paused` 런타임으로 실제 지연 없이 검증할 수 있습니다.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ExchangeError, ExchangeResult};
use folio_core::RetrySettings;

/// 재시도 설정.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 기본 대기 시간 (시도마다 2배 증가)
    pub base_delay: Duration,
    /// 최대 대기 시간
    pub max_delay: Duration,
    /// 지터 적용 여부
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

impl RetryConfig {
    /// n번째 시도 이후의 대기 시간을 계산합니다 (attempt는 1부터).
    fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);

        if self.jitter {
            // 동시 클라이언트의 재시도가 몰리지 않도록 [50%, 100%] 범위로 분산
            let factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }
}

/// 일시적 에러에 대해 `op`를 재시도합니다.
///
/// `op`는 시도마다 새로 호출되므로 서명 요청은 매번 새 타임스탬프로
/// 재서명됩니다. 재시도 불가 에러(인증, 프로토콜)는 즉시 반환됩니다.
/// `deadline`이 지정되면 다음 시도 전과 대기 전에 잔여 시간을 확인하고,
/// 부족하면 `ExchangeError::Timeout`으로 실패합니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    mut op: F,
) -> ExchangeResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ExchangeResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(ExchangeError::Timeout {
                    attempts: attempt - 1,
                });
            }
        }

        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt == max_attempts => {
                warn!(attempt, error = %err, "Retry attempts exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = config.delay_after(attempt);

                if let Some(deadline) = deadline {
                    if Instant::now() + delay >= deadline {
                        return Err(ExchangeError::Timeout { attempts: attempt });
                    }
                }

                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err,
                    "Transient error, backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop always returns")
}

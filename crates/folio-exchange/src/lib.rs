//! 거래소 연결 및 잔고 조회.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - KuCoin 서명 요청 빌더 (HMAC-SHA256, 키 버전별 패스프레이즈 처리)
//! - KuCoin REST 클라이언트 (계좌 잔고, 공개 시세)
//! - 지수 백오프 재시도 및 데드라인 처리
//! - 거래소 에러 분류

pub mod error;
pub mod kucoin;
pub mod retry;
pub mod signer;

pub use error::*;
pub use kucoin::KucoinClient;
pub use retry::{with_retry, RetryConfig};
pub use signer::{KeyVersion, KucoinCredential, KucoinSigner, SignedHeaders};

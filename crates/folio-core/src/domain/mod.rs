//! 포트폴리오 동기화를 위한 도메인 모델.

mod balance;
mod providers;
mod snapshot;
mod sync;

pub use balance::*;
pub use providers::*;
pub use snapshot::*;
pub use sync::*;

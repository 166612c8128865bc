//! 외부 문서 저장소 동기화.
//!
//! Notion 스타일 데이터베이스 클라이언트와, 포트폴리오 스냅샷을
//! 자산 단위 레코드로 upsert하는 동기화기를 제공합니다.

pub mod notion;
pub mod synchronizer;

pub use notion::NotionStore;
pub use synchronizer::{RecordSynchronizer, SynchronizerConfig};

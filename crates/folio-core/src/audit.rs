//! 감사(audit) 기록.
//!
//! 외부에서 관찰 가능한 모든 작업(거래소 호출, 저장소 쓰기)을
//! 구조화된 항목으로 기록합니다. 기록은 호출 완료 순서로 추가되는
//! append-only 사이드 채널이며, 싱크 실패가 본 작업의 지연이나 실패로
//! 이어지지 않도록 fire-and-forget 채널로 분리되어 있습니다.
//!
//! 자격증명에서 파생된 필드(시크릿, 패스프레이즈, 서명, API 키, 토큰)는
//! 방출 전에 반드시 마스킹됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// 마스킹 대상 파라미터 키 (소문자 부분 일치).
const REDACTED_KEYS: [&str; 7] = [
    "secret",
    "passphrase",
    "signature",
    "sign",
    "api_key",
    "token",
    "authorization",
];

/// 마스킹 시 대체되는 값.
pub const REDACTED: &str = "***REDACTED***";

/// 작업 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum AuditOutcome {
    /// 성공
    Success,
    /// 실패 (에러 종류 포함)
    Failure {
        /// 에러 종류 (예: "RATE_LIMITED")
        error_kind: String,
        /// 에러 메시지
        message: String,
    },
}

impl AuditOutcome {
    /// 실패 결과 생성.
    pub fn failure(error_kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure {
            error_kind: error_kind.into(),
            message: message.into(),
        }
    }
}

/// 감사 항목. 기록 후 수정/삭제되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 요청 식별자
    pub request_id: Uuid,
    /// 기록 시각 (호출 완료 시점)
    pub timestamp: DateTime<Utc>,
    /// 작업 이름 (예: "exchange.get_accounts")
    pub operation: String,
    /// 파라미터 (자격증명 필드 마스킹 완료)
    pub parameters: Value,
    /// 소요 시간 (밀리초)
    pub duration_ms: u64,
    /// 작업 결과
    pub outcome: AuditOutcome,
}

/// 파라미터 JSON에서 자격증명 파생 필드를 재귀적으로 마스킹합니다.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(k, v)| {
                    let key_lower = k.to_lowercase();
                    if REDACTED_KEYS.iter().any(|r| key_lower.contains(r)) {
                        (k.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// 감사 기록기.
///
/// 복제 비용이 저렴한 핸들로, 각 컴포넌트에 주입되어 사용됩니다.
/// `record`는 논블로킹이며, 싱크가 사라진 경우에도 본 작업에 영향을
/// 주지 않고 조용히 무시됩니다.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditRecorder {
    /// 기록기와 수신 채널을 생성합니다.
    ///
    /// 수신측은 [`spawn_audit_sink`]에 넘기거나, 테스트에서 직접 소비할
    /// 수 있습니다.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 싱크가 없는 기록기를 생성합니다 (테스트용).
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    /// 작업 하나를 기록합니다.
    ///
    /// 파라미터는 방출 전에 마스킹됩니다. 전송 실패는 경고 로그만 남기고
    /// 무시됩니다 (감사 실패가 본 작업을 실패시키지 않음).
    pub fn record(
        &self,
        operation: impl Into<String>,
        parameters: Value,
        outcome: AuditOutcome,
        duration: std::time::Duration,
    ) {
        let entry = AuditEntry {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            operation: operation.into(),
            parameters: redact(&parameters),
            duration_ms: duration.as_millis() as u64,
            outcome,
        };

        if self.tx.send(entry).is_err() {
            warn!("Audit sink unavailable, entry dropped");
        }
    }
}

/// 감사 싱크 태스크를 시작합니다.
///
/// 수신한 항목을 `audit` 타깃의 구조화 로그로 방출합니다. 채널이 닫히면
/// 종료됩니다.
pub fn spawn_audit_sink(
    mut rx: mpsc::UnboundedReceiver<AuditEntry>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            match &entry.outcome {
                AuditOutcome::Success => {
                    info!(
                        target: "audit",
                        request_id = %entry.request_id,
                        operation = %entry.operation,
                        parameters = %entry.parameters,
                        duration_ms = entry.duration_ms,
                        outcome = "success",
                        "audit"
                    );
                }
                AuditOutcome::Failure {
                    error_kind,
                    message,
                } => {
                    info!(
                        target: "audit",
                        request_id = %entry.request_id,
                        operation = %entry.operation,
                        parameters = %entry.parameters,
                        duration_ms = entry.duration_ms,
                        outcome = "failure",
                        error_kind = %error_kind,
                        error = %message,
                        "audit"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_credential_fields() {
        let params = json!({
            "api_key": "abcd1234",
            "api_secret": "s3cret",
            "passphrase": "hunter2",
            "kc_api_sign": "base64sig",
            "account_type": "trade",
            "nested": { "notion_token": "ntn_xxx", "symbol": "BTC" },
        });

        let redacted = redact(&params);

        assert_eq!(redacted["api_key"], REDACTED);
        assert_eq!(redacted["api_secret"], REDACTED);
        assert_eq!(redacted["passphrase"], REDACTED);
        assert_eq!(redacted["kc_api_sign"], REDACTED);
        assert_eq!(redacted["nested"]["notion_token"], REDACTED);
        // 자격증명이 아닌 필드는 유지
        assert_eq!(redacted["account_type"], "trade");
        assert_eq!(redacted["nested"]["symbol"], "BTC");
    }

    #[tokio::test]
    async fn test_record_delivers_redacted_entry() {
        let (recorder, mut rx) = AuditRecorder::channel();

        recorder.record(
            "exchange.get_accounts",
            json!({ "account_type": "trade", "api_key": "abcd" }),
            AuditOutcome::Success,
            std::time::Duration::from_millis(42),
        );

        let entry = rx.recv().await.expect("감사 항목 수신 실패");
        assert_eq!(entry.operation, "exchange.get_accounts");
        assert_eq!(entry.duration_ms, 42);
        assert_eq!(entry.parameters["api_key"], REDACTED);
        assert_eq!(entry.outcome, AuditOutcome::Success);
    }

    #[test]
    fn test_record_without_sink_does_not_panic() {
        let recorder = AuditRecorder::disabled();
        recorder.record(
            "sync.create",
            json!({}),
            AuditOutcome::failure("REMOTE_WRITE_ERROR", "503"),
            std::time::Duration::from_millis(1),
        );
    }
}

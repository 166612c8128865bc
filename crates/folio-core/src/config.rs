//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정은 프로세스 시작 시 한 번 로드되며 이후 읽기 전용입니다.
//! 자격증명(API 키/시크릿/패스프레이즈, Notion 토큰)은 TOML이 아닌
//! 환경 변수에서만 로드됩니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 거래소 설정
    #[serde(default)]
    pub exchange: ExchangeSettings,
    /// 문서 저장소(Notion) 설정
    #[serde(default)]
    pub store: StoreSettings,
    /// 포트폴리오 분석 설정
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    /// 재시도/백오프 설정
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            exchange: ExchangeSettings::default(),
            store: StoreSettings::default(),
            portfolio: PortfolioSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 처리 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 거래소 설정.
///
/// 자격증명(`KUCOIN_API_KEY` 등)은 환경 변수에서 별도로 로드됩니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeSettings {
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// API 키 버전 (1 또는 2, 기본값 2)
    pub key_version: u8,
    /// 조회할 계좌 유형 ("main" | "trade" | "all")
    pub account_type: String,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.kucoin.com".to_string(),
            timeout_secs: 20,
            key_version: 2,
            account_type: "trade".to_string(),
        }
    }
}

/// 문서 저장소(Notion) 설정.
///
/// 토큰(`NOTION_TOKEN`)과 데이터베이스 ID(`NOTION_DATABASE_ID`)는
/// 환경 변수에서 로드됩니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    /// API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com".to_string(),
            timeout_secs: 20,
        }
    }
}

/// 포트폴리오 분석 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortfolioSettings {
    /// 더스트 판정 기준 (평가액, USD 기준)
    pub dust_threshold: Decimal,
    /// 집중 리스크 판정 기준 (전체 대비 %)
    pub concentration_threshold: Decimal,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            dust_threshold: Decimal::new(10, 0),
            concentration_threshold: Decimal::new(40, 0),
        }
    }
}

/// 재시도/백오프 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 기본 대기 시간 (밀리초, 시도마다 2배 증가)
    pub base_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    pub max_delay_ms: u64,
    /// 지터 적용 여부
    pub jitter: bool,
    /// 작업 전체 데드라인 기본값 (초)
    pub deadline_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter: true,
            deadline_secs: 30,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `FOLIO__` 접두사와 `__` 구분자를 사용해 파일 값을
    /// 오버라이드합니다 (예: `FOLIO__SERVER__PORT=8080`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3333)?
            // 파일에서 로드 (없으면 기본값 사용)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("FOLIO")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

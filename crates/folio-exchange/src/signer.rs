//! KuCoin 서명 요청 빌더.
//!
//! 인증 요청에 필요한 KC-API-* 헤더 집합을 생성합니다.
//! 서명 = Base64(HMAC-SHA256(secret, `{timestamp}{METHOD}{path+query}{body}`)).
//! 패스프레이즈는 키 버전에 따라 처리가 다릅니다:
//! - v2 (기본): Base64(HMAC-SHA256(secret, passphrase))
//! - v1: 평문 그대로 전송
//!
//! 빌더 자체는 시계 외의 부수 효과가 없는 순수 함수이며, 타임스탬프
//! 스큐 검증은 하지 않습니다 (스큐 위반은 원격 측 인증 실패로 나타나며
//! 클라이언트가 처리).

use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// KuCoin API 키 버전.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyVersion {
    /// 레거시: 패스프레이즈 평문 전송
    V1,
    /// 현행: 패스프레이즈를 시크릿으로 HMAC 서명
    #[default]
    V2,
}

impl KeyVersion {
    /// KC-API-KEY-VERSION 헤더 값.
    pub fn as_header(&self) -> &'static str {
        match self {
            KeyVersion::V1 => "1",
            KeyVersion::V2 => "2",
        }
    }

    /// 숫자 설정값에서 변환. 알 수 없는 값은 최신 버전으로 처리합니다.
    pub fn from_config(version: u8) -> Self {
        match version {
            1 => KeyVersion::V1,
            _ => KeyVersion::V2,
        }
    }
}

/// KuCoin API 자격증명.
///
/// 로드 이후 불변이며 프로세스 수명 동안 클라이언트가 소유합니다.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`, `api_passphrase`)를
///   마스킹합니다.
#[derive(Clone)]
pub struct KucoinCredential {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: SecretString,
    /// API 패스프레이즈
    pub api_passphrase: SecretString,
    /// REST API 기본 URL
    pub base_url: String,
    /// API 키 버전
    pub key_version: KeyVersion,
}

impl fmt::Debug for KucoinCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("KucoinCredential")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("api_passphrase", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("key_version", &self.key_version)
            .finish()
    }
}

impl KucoinCredential {
    /// 새 자격증명 생성.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_passphrase: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            api_passphrase: SecretString::from(api_passphrase.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_version: KeyVersion::default(),
        }
    }

    /// 키 버전 지정.
    pub fn with_key_version(mut self, version: KeyVersion) -> Self {
        self.key_version = version;
        self
    }

    /// 환경 변수에서 생성.
    ///
    /// # 환경변수
    /// - `KUCOIN_API_KEY`: API 키 (필수)
    /// - `KUCOIN_API_SECRET`: API 시크릿 (필수)
    /// - `KUCOIN_API_PASSPHRASE`: API 패스프레이즈 (필수)
    /// - `KUCOIN_BASE_URL`: 기본 URL (기본값: https://api.kucoin.com)
    /// - `KUCOIN_KEY_VERSION`: 키 버전 (기본값: 2)
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("KUCOIN_API_KEY").ok()?;
        let api_secret = std::env::var("KUCOIN_API_SECRET").ok()?;
        let api_passphrase = std::env::var("KUCOIN_API_PASSPHRASE").ok()?;
        let base_url = std::env::var("KUCOIN_BASE_URL")
            .unwrap_or_else(|_| "https://api.kucoin.com".to_string());
        let key_version = std::env::var("KUCOIN_KEY_VERSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(KeyVersion::from_config)
            .unwrap_or_default();

        Some(Self::new(api_key, api_secret, api_passphrase, base_url).with_key_version(key_version))
    }
}

/// 서명된 요청 헤더 집합.
///
/// 호출마다 생성되고 응답 수신 후 폐기됩니다.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// KC-API-KEY
    pub api_key: String,
    /// KC-API-SIGN
    pub signature: String,
    /// KC-API-TIMESTAMP (밀리초)
    pub timestamp: String,
    /// KC-API-PASSPHRASE (버전에 따라 평문 또는 서명)
    pub passphrase: String,
    /// KC-API-KEY-VERSION
    pub key_version: &'static str,
}

impl SignedHeaders {
    /// reqwest 요청에 헤더를 적용합니다.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("KC-API-KEY", &self.api_key)
            .header("KC-API-SIGN", &self.signature)
            .header("KC-API-TIMESTAMP", &self.timestamp)
            .header("KC-API-PASSPHRASE", &self.passphrase)
            .header("KC-API-KEY-VERSION", self.key_version)
            .header("Content-Type", "application/json")
    }
}

/// KuCoin 요청 서명기.
pub struct KucoinSigner {
    credential: KucoinCredential,
}

impl KucoinSigner {
    /// 새 서명기 생성.
    pub fn new(credential: KucoinCredential) -> Self {
        Self { credential }
    }

    /// 현재 타임스탬프(밀리초) 반환.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    /// HMAC-SHA256 서명 후 Base64 인코딩.
    fn hmac_b64(secret: &str, message: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("Invalid key");
        mac.update(message.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    /// 키 버전에 따른 패스프레이즈 헤더 값.
    fn passphrase_header(&self) -> String {
        let passphrase = self.credential.api_passphrase.expose_secret();
        match self.credential.key_version {
            KeyVersion::V1 => passphrase.to_string(),
            KeyVersion::V2 => {
                Self::hmac_b64(self.credential.api_secret.expose_secret(), passphrase)
            }
        }
    }

    /// 현재 시각으로 요청을 서명합니다.
    ///
    /// `path_with_query`는 쿼리 문자열을 포함한 경로입니다
    /// (예: `/api/v1/accounts?type=trade`). GET 요청의 `body`는 빈
    /// 문자열이어야 합니다.
    pub fn sign(&self, method: &str, path_with_query: &str, body: &str) -> SignedHeaders {
        self.sign_at(Self::timestamp_ms(), method, path_with_query, body)
    }

    /// 지정된 타임스탬프로 요청을 서명합니다.
    ///
    /// 동일 입력에 대해 항상 동일한 서명을 생성합니다 (결정적).
    pub fn sign_at(
        &self,
        timestamp_ms: u64,
        method: &str,
        path_with_query: &str,
        body: &str,
    ) -> SignedHeaders {
        let timestamp = timestamp_ms.to_string();
        let prehash = format!(
            "{}{}{}{}",
            timestamp,
            method.to_uppercase(),
            path_with_query,
            body
        );
        let signature = Self::hmac_b64(self.credential.api_secret.expose_secret(), &prehash);

        SignedHeaders {
            api_key: self.credential.api_key.clone(),
            signature,
            timestamp,
            passphrase: self.passphrase_header(),
            key_version: self.credential.key_version.as_header(),
        }
    }
}

//! 포트폴리오 브릿지 API 서버.
//!
//! 거래소 잔고 조회, 포트폴리오 집계, 문서 저장소 동기화, 리포트
//! 생성을 위한 Axum 기반 HTTP 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use folio_api::routes::create_api_router;
use folio_api::state::AppState;
use folio_core::{
    init_logging, spawn_audit_sink, AccountType, AppConfig, AuditRecorder, ExchangeSettings,
};
use folio_exchange::{KeyVersion, KucoinClient, KucoinCredential, RetryConfig};
use folio_portfolio::{Aggregator, AggregatorConfig};
use folio_sync::{NotionStore, RecordSynchronizer};

/// 환경 변수의 자격증명과 파일 설정을 합쳐 거래소 자격증명을 만듭니다.
///
/// `KUCOIN_API_KEY`, `KUCOIN_API_SECRET`, `KUCOIN_API_PASSPHRASE`가 모두
/// 있어야 합니다. base URL과 키 버전은 설정 파일 값을 따릅니다.
fn load_credential(settings: &ExchangeSettings) -> Option<KucoinCredential> {
    let api_key = std::env::var("KUCOIN_API_KEY").ok()?;
    let api_secret = std::env::var("KUCOIN_API_SECRET").ok()?;
    let api_passphrase = std::env::var("KUCOIN_API_PASSPHRASE").ok()?;

    Some(
        KucoinCredential::new(api_key, api_secret, api_passphrase, &settings.base_url)
            .with_key_version(KeyVersion::from_config(settings.key_version)),
    )
}

/// 애플리케이션 상태 조립.
fn create_app_state(config: &AppConfig, audit: AuditRecorder) -> anyhow::Result<AppState> {
    let credential = load_credential(&config.exchange).context(
        "KuCoin credentials missing. Set KUCOIN_API_KEY, KUCOIN_API_SECRET, KUCOIN_API_PASSPHRASE.",
    )?;
    let kucoin = KucoinClient::new(credential, config.exchange.timeout_secs)
        .context("Failed to create exchange client")?
        .with_retry_config(RetryConfig::from(&config.retry))
        .with_audit(audit.clone());
    let kucoin = Arc::new(kucoin);

    let notion_token =
        std::env::var("NOTION_TOKEN").context("NOTION_TOKEN environment variable missing")?;
    let notion_database = std::env::var("NOTION_DATABASE_ID")
        .context("NOTION_DATABASE_ID environment variable missing")?;
    let store = NotionStore::new(notion_token, notion_database, config.store.timeout_secs)
        .context("Failed to create document store client")?
        .with_base_url(&config.store.base_url);

    let default_account = config
        .exchange
        .account_type
        .parse::<AccountType>()
        .unwrap_or_else(|message| {
            warn!(%message, "Falling back to default account type");
            AccountType::default()
        });

    // deadline_secs = 0은 무제한을 의미
    let sync_deadline = match config.retry.deadline_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let synchronizer = RecordSynchronizer::new(Arc::new(store)).with_audit(audit.clone());
    let aggregator = Aggregator::new(AggregatorConfig::from(&config.portfolio));

    Ok(
        AppState::new(kucoin.clone(), kucoin, aggregator, synchronizer)
            .with_audit(audit)
            .with_default_account(default_account)
            .with_sync_deadline(sync_deadline),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 설정 로드 (FOLIO_CONFIG로 경로 오버라이드 가능)
    let config_path =
        std::env::var("FOLIO_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting portfolio bridge server");

    // 감사 싱크 시작
    let (audit, audit_rx) = AuditRecorder::channel();
    let _audit_task = spawn_audit_sink(audit_rx);

    let state = Arc::new(create_app_state(&config, audit)?);
    info!(
        exchange = state.balances.name(),
        account = %state.default_account,
        "Application state initialized"
    );

    let app = create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid server address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => warn!("Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => warn!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

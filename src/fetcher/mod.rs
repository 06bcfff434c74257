//! HTTP 요청 모듈 - 도서 페이지와 카탈로그 API 호출
//!
//! `HttpFetch` 트레이트 뒤에 전송 계층을 숨겨서 요약 조회 로직을 네트워크 없이
//! 테스트할 수 있게 합니다. 모든 요청에는 User-Agent 헤더가 붙습니다.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// 기본 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("booknote/", env!("CARGO_PKG_VERSION"));

/// 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Response
// ============================================================================

/// HTTP 응답
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// 상태 코드
    pub status: u16,
    /// 최종 URL (리다이렉트 반영)
    pub url: String,
    /// 응답 본문
    pub body: String,
}

impl FetchResponse {
    /// 2xx 여부
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx가 아니면 에러
    pub fn ensure_success(self) -> Result<Self> {
        if !self.is_success() {
            bail!("HTTP {} ({})", self.status, self.url);
        }
        Ok(self)
    }

    /// 본문을 JSON으로 파싱
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .with_context(|| format!("JSON 응답 파싱 실패: {}", self.url))
    }
}

// ============================================================================
// HttpFetch Trait
// ============================================================================

/// HTTP GET 인터페이스
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET 요청
    ///
    /// 전송 오류만 `Err`이며, 2xx 이외 상태는 응답으로 돌려줍니다.
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}

// ============================================================================
// PageFetcher
// ============================================================================

/// reqwest 기반 HTTP 클라이언트
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// 기본 User-Agent로 생성
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// User-Agent를 지정하여 생성
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let user_agent = if user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            user_agent
        };

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for PageFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9,fa;q=0.8")
            .send()
            .await
            .with_context(|| format!("HTTP 요청 실패: {}", url))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.context("응답 본문 읽기 실패")?;

        Ok(FetchResponse {
            status,
            url: final_url,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

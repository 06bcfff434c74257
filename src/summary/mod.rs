//! 요약 조회 모듈 - 외부 카탈로그에서 도서 설명 가져오기
//!
//! 세 단계를 순서대로 시도하고 처음으로 충분히 긴 설명을 찾으면 멈춥니다.
//!
//! 1. 기본 카탈로그(Google Books) ISBN 조회
//! 2. 기본 카탈로그 제목+저자 검색 (설명이 없는 결과는 상세 조회)
//! 3. 보조 카탈로그(Open Library) 검색
//!
//! 각 단계의 전송 오류, 2xx 이외 상태, 파싱 실패는 "이 단계에서 못 찾음"으로
//! 처리하고 다음 단계로 넘어갑니다. 호출자에게는 에러를 돌려주지 않습니다.

use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::extract::{normalize_whitespace, strip_tags, truncate_chars};
use crate::fetcher::HttpFetch;

/// 요약 최대 길이 (문자 수)
pub const MAX_SUMMARY_CHARS: usize = 500;

/// 요약으로 인정하는 최소 길이 (이 값보다 길어야 함)
const MIN_SUMMARY_CHARS: usize = 20;

/// ISBN으로 인정하는 최소 길이 (이 값보다 길어야 함)
const MIN_ISBN_CHARS: usize = 5;

/// 검색 결과 중 살펴볼 최대 개수
const MAX_RESULTS: usize = 3;

/// 보조 카탈로그에서 설명으로 쓸 수 있는 필드 (순서대로)
const SECONDARY_FIELDS: [&str; 3] = ["description", "first_sentence", "notes"];

/// 부제 구분자 (콜론, 긴 대시, 공백으로 둘러싼 하이픈)
static SUBTITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:：–—]|\s-\s").expect("valid subtitle regex"));

// ============================================================================
// Endpoints
// ============================================================================

/// 카탈로그 서비스 기본 URL
#[derive(Debug, Clone)]
pub struct SummaryEndpoints {
    /// 기본 카탈로그 (Google Books API)
    pub primary: String,
    /// 보조 카탈로그 (Open Library)
    pub secondary: String,
}

impl Default for SummaryEndpoints {
    fn default() -> Self {
        Self {
            primary: "https://www.googleapis.com/books/v1".to_string(),
            secondary: "https://openlibrary.org".to_string(),
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Google Books 검색 응답
#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default)]
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    #[serde(default)]
    description: Option<String>,
}

/// Open Library 검색 응답
#[derive(Debug, Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<Value>,
}

// ============================================================================
// SummaryResolver
// ============================================================================

/// 요약 조회기
pub struct SummaryResolver {
    fetcher: Arc<dyn HttpFetch>,
    endpoints: SummaryEndpoints,
}

impl SummaryResolver {
    /// 기본 엔드포인트로 생성
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self::with_endpoints(fetcher, SummaryEndpoints::default())
    }

    /// 엔드포인트를 지정하여 생성
    pub fn with_endpoints(fetcher: Arc<dyn HttpFetch>, endpoints: SummaryEndpoints) -> Self {
        Self {
            fetcher,
            endpoints,
        }
    }

    /// 요약 조회
    ///
    /// 모든 단계가 실패하면 빈 문자열을 반환합니다.
    pub async fn resolve(&self, title: &str, author: &str, isbn: Option<&str>) -> String {
        let isbn = isbn.and_then(isbn_query);
        let terms = search_terms(title, author);

        if let Some(isbn) = &isbn {
            if let Some(summary) = settle("primary-isbn", self.primary_by_isbn(isbn).await) {
                return summary;
            }
        }

        if !terms.is_empty() {
            if let Some(summary) = settle("primary-search", self.primary_search(&terms).await) {
                return summary;
            }
        }

        let secondary_query = match &isbn {
            Some(isbn) => Some(format!("isbn:{}", isbn)),
            None if !terms.is_empty() => Some(terms.plain()),
            None => None,
        };
        if let Some(query) = secondary_query {
            if let Some(summary) = settle("secondary", self.secondary_search(&query).await) {
                return summary;
            }
        }

        tracing::debug!("요약을 찾지 못함: {}", title);
        String::new()
    }

    /// 1단계: ISBN 조회
    async fn primary_by_isbn(&self, isbn: &str) -> Result<Option<String>> {
        let url = endpoint(
            &self.endpoints.primary,
            "volumes",
            &[("q", format!("isbn:{}", isbn))],
        )?;
        let list: VolumeList = self.get_json(&url).await?;

        Ok(list
            .items
            .iter()
            .filter_map(|volume| volume.volume_info.description.as_deref())
            .find_map(accept))
    }

    /// 2단계: 제목+저자 검색, 설명이 없으면 상세 조회
    async fn primary_search(&self, terms: &SearchTerms) -> Result<Option<String>> {
        let url = endpoint(
            &self.endpoints.primary,
            "volumes",
            &[
                ("q", terms.qualified()),
                ("maxResults", MAX_RESULTS.to_string()),
            ],
        )?;
        let list: VolumeList = self.get_json(&url).await?;

        for volume in list.items.iter().take(MAX_RESULTS) {
            // 짧은 설명이라도 있으면 상세 조회하지 않음
            if let Some(description) = volume.volume_info.description.as_deref() {
                match accept(description) {
                    Some(summary) => return Ok(Some(summary)),
                    None => continue,
                }
            }

            if volume.id.is_empty() {
                continue;
            }

            // 상세 조회 실패는 이 결과만 포기
            match self.primary_detail(&volume.id).await {
                Ok(Some(summary)) => return Ok(Some(summary)),
                Ok(None) => {}
                Err(e) => tracing::debug!("상세 조회 실패 ({}): {:#}", volume.id, e),
            }
        }

        Ok(None)
    }

    async fn primary_detail(&self, id: &str) -> Result<Option<String>> {
        let url = endpoint(&self.endpoints.primary, &format!("volumes/{}", id), &[])?;
        let volume: Volume = self.get_json(&url).await?;
        Ok(volume.volume_info.description.as_deref().and_then(accept))
    }

    /// 3단계: 보조 카탈로그 검색
    async fn secondary_search(&self, query: &str) -> Result<Option<String>> {
        let url = endpoint(
            &self.endpoints.secondary,
            "search.json",
            &[("q", query.to_string()), ("limit", MAX_RESULTS.to_string())],
        )?;
        let results: SearchDocs = self.get_json(&url).await?;

        Ok(results
            .docs
            .iter()
            .take(MAX_RESULTS)
            .find_map(|doc| {
                SECONDARY_FIELDS
                    .iter()
                    .filter_map(|field| doc.get(*field))
                    .filter_map(text_of)
                    .find_map(|text| accept(&text))
            }))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.fetcher.get(url).await?.ensure_success()?.json()
    }
}

/// 단계 결과 정리: 실패는 기록만 하고 `None`
fn settle(stage: &str, result: Result<Option<String>>) -> Option<String> {
    match result {
        Ok(Some(summary)) => {
            tracing::info!("요약 조회 성공 ({})", stage);
            Some(summary)
        }
        Ok(None) => {
            tracing::debug!("요약 없음 ({})", stage);
            None
        }
        Err(e) => {
            tracing::debug!("요약 조회 실패 ({}): {:#}", stage, e);
            None
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 검색어 (부제를 뗀 제목, 첫 번째 저자)
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchTerms {
    title: String,
    author: String,
}

impl SearchTerms {
    fn is_empty(&self) -> bool {
        self.title.is_empty()
    }

    /// 필드 한정 검색어 (`intitle:... inauthor:...`)
    fn qualified(&self) -> String {
        if self.author.is_empty() {
            format!("intitle:{}", self.title)
        } else {
            format!("intitle:{} inauthor:{}", self.title, self.author)
        }
    }

    /// 일반 검색어
    fn plain(&self) -> String {
        normalize_whitespace(&format!("{} {}", self.title, self.author))
    }
}

fn search_terms(title: &str, author: &str) -> SearchTerms {
    let title = strip_tags(title);
    let title = match SUBTITLE_SEPARATOR.find(&title) {
        Some(m) => title[..m.start()].to_string(),
        None => title.clone(),
    };
    let author = author.split(',').next().unwrap_or_default();

    SearchTerms {
        title: normalize_whitespace(&title),
        author: normalize_whitespace(author),
    }
}

/// 카탈로그 조회에 쓸 ISBN
///
/// 하이픈과 공백을 뗀 뒤 숫자(마지막 자리는 `X` 허용)만으로 된 경우에만
/// 사용합니다. Amazon ASIN(`B0...`)은 여기서 걸러집니다.
fn isbn_query(raw: &str) -> Option<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect::<String>()
        .trim()
        .to_uppercase();

    let body = isbn.strip_suffix('X').unwrap_or(&isbn);
    let valid = isbn.len() > MIN_ISBN_CHARS
        && !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit());
    valid.then_some(isbn)
}

fn endpoint(base: &str, path: &str, params: &[(&str, String)]) -> Result<String> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw).with_context(|| format!("잘못된 URL: {}", raw))?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url.to_string())
}

/// 문자열, `{value}` 객체, 또는 그 배열에서 텍스트 추출
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("value").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_of).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

/// 태그 제거, 공백 정리 후 길이 조건을 만족하면 500자로 잘라 반환
fn accept(raw: &str) -> Option<String> {
    let text = strip_tags(raw);
    if text.chars().count() > MIN_SUMMARY_CHARS {
        Some(truncate_chars(&text, MAX_SUMMARY_CHARS))
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

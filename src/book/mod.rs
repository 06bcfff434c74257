//! 도서 레코드 모듈
//!
//! 사이트 어댑터가 만들어내는 유일한 도메인 엔티티(`BookRecord`)와
//! 조회 실패 분류(`LookupError`)를 정의합니다.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::router::SiteId;

// ============================================================================
// BookRecord
// ============================================================================

/// 한 권의 도서 서지 정보
///
/// `title`을 제외한 모든 필드는 비어 있을 수 있지만 항상 문자열입니다.
/// 템플릿 치환 시 자리표시자가 그대로 남지 않도록 `None`을 쓰지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// 제목 (HTML 엔티티가 남아 있을 수 있음)
    pub title: String,
    /// 저자 (", "로 연결)
    pub author: String,
    /// 번역자
    pub translator: String,
    /// 페이지 수 (숫자 문자열)
    pub pages: String,
    /// 표지 이미지 절대 URL
    pub cover: String,
    /// 출판사
    pub publisher: String,
    /// 출간일 (자유 형식 또는 YYYY-MM-DD)
    pub date_published: String,
    /// 언어
    pub language: String,
    /// ISBN (없으면 ASIN)
    pub isbn: String,
    /// 정규 URL
    pub url: String,
    /// 사이트 제공 설명
    pub description: String,
    /// 외부 카탈로그에서 가져온 요약 (최대 500자)
    pub summary: String,
}

impl BookRecord {
    /// 제목과 URL만 채운 레코드 생성
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// 템플릿 자리표시자 이름과 값 쌍
    ///
    /// 자리표시자 이름은 노트 템플릿에서 쓰는 camelCase 표기입니다.
    pub fn fields(&self) -> [(&'static str, &str); 12] {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("translator", &self.translator),
            ("pages", &self.pages),
            ("cover", &self.cover),
            ("publisher", &self.publisher),
            ("datePublished", &self.date_published),
            ("language", &self.language),
            ("isbn", &self.isbn),
            ("url", &self.url),
            ("description", &self.description),
            ("summary", &self.summary),
        ]
    }
}

// ============================================================================
// Errors
// ============================================================================

/// 도서 조회 실패 분류
///
/// 요약 조회 실패는 여기에 포함되지 않습니다. 요약은 빈 문자열로 남습니다.
#[derive(Debug, Error)]
pub enum LookupError {
    /// 지원하지 않는 URL
    #[error("지원하지 않는 URL입니다: {0}")]
    UnsupportedSource(String),

    /// 페이지 요청 실패 (전송 오류 또는 2xx 이외 상태)
    #[error("페이지를 가져오지 못했습니다 ({url}): {message}")]
    Fetch { url: String, message: String },

    /// 페이지는 받았지만 도서 정보를 찾지 못함
    #[error("도서 데이터를 가져오지 못했습니다 ({site})")]
    ExtractionMiss { site: SiteId },
}

// ============================================================================
// Tests
// ============================================================================

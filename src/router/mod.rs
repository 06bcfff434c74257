//! 소스 라우터 - URL로 도서 사이트 판별
//!
//! Amazon은 URL 형태가 워낙 다양해서(상품 경로, 단축 도메인, 쿼리 파라미터,
//! 국가별 도메인) 별도 패턴군으로 먼저 검사하고, 나머지 사이트는
//! 사이트당 패턴 하나짜리 표로 검사합니다. 나머지 사이트들은 도메인이 서로
//! 겹치지 않으므로 표 순서는 결과에 영향을 주지 않습니다.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// SiteId
// ============================================================================

/// 지원하는 도서 사이트
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteId {
    Goodreads,
    Amazon,
    Taaghche,
    Fidibo,
}

impl SiteId {
    /// 모든 사이트
    pub const ALL: [SiteId; 4] = [
        SiteId::Goodreads,
        SiteId::Amazon,
        SiteId::Taaghche,
        SiteId::Fidibo,
    ];

    /// 소문자 식별자
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteId::Goodreads => "goodreads",
            SiteId::Amazon => "amazon",
            SiteId::Taaghche => "taaghche",
            SiteId::Fidibo => "fidibo",
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SiteId::ALL
            .into_iter()
            .find(|site| site.as_str() == lowered)
            .ok_or_else(|| format!("알 수 없는 사이트: {}", s))
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// Amazon 국가별 도메인 (amazon.com, amazon.de, amazon.co.uk, amazon.com.au ...)
const AMAZON_HOST: &str = r"(?:[a-z0-9-]+\.)*amazon\.(?:com?\.[a-z]{2}|[a-z]{2,3})";

static AMAZON_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // 상품 경로: /dp/, /gp/product/, /gp/aw/d/, /exec/obidos/ASIN/, /o/ASIN/
        format!(
            r"(?i)^https?://{AMAZON_HOST}/(?:[^?#]*/)?(?:dp|gp/product|gp/aw/d|exec/obidos/asin|o/asin)/[a-z0-9]{{10}}(?:[/?#]|$)"
        ),
        // 단축 링크: a.co/d/...
        r"(?i)^https?://(?:www\.)?a\.co/d/[a-z0-9]+".to_string(),
        // 단축 링크: amzn.to/..., amzn.eu/d/...
        r"(?i)^https?://(?:www\.)?amzn\.(?:to|eu|asia)/[a-z0-9/]+".to_string(),
        // 쿼리 파라미터: ?asin=XXXXXXXXXX
        format!(r"(?i)^https?://{AMAZON_HOST}/[^#]*[?&]asin=[a-z0-9]{{10}}(?:[&#]|$)"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid amazon pattern"))
    .collect()
});

static SITE_PATTERNS: LazyLock<Vec<(SiteId, Regex)>> = LazyLock::new(|| {
    [
        (
            SiteId::Goodreads,
            r"(?i)^https?://(?:www\.|m\.)?goodreads\.com/(?:[a-z]{2}/)?book/show/\d+",
        ),
        (
            SiteId::Taaghche,
            r"(?i)^https?://(?:www\.)?taaghche\.com/book/\d+",
        ),
        (
            SiteId::Fidibo,
            r"(?i)^https?://(?:www\.)?fidibo\.com/books?/[^/?#]+",
        ),
    ]
    .into_iter()
    .map(|(site, pattern)| (site, Regex::new(pattern).expect("valid site pattern")))
    .collect()
});

// ============================================================================
// identify
// ============================================================================

/// URL이 가리키는 사이트 판별
///
/// 어느 패턴에도 맞지 않으면 `None`을 반환합니다.
pub fn identify(url: &str) -> Option<SiteId> {
    let url = url.trim();

    if AMAZON_PATTERNS.iter().any(|re| re.is_match(url)) {
        return Some(SiteId::Amazon);
    }

    SITE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(url))
        .map(|(site, _)| *site)
}

// ============================================================================
// Tests
// ============================================================================

//! 사이트 어댑터 모듈
//!
//! 사이트마다 마크업 특성과 데이터 품질 문제가 달라서 어댑터를 하나씩 둡니다.
//! 어댑터는 네트워크를 쓰지 않는 순수 함수입니다. 페이지 HTML과 요청 URL을
//! 받아 `BookRecord`를 만들고, 제목을 찾지 못하면 `None`을 반환합니다.

mod amazon;
mod fidibo;
mod goodreads;
mod taaghche;

pub use amazon::{clean_title, Amazon};
pub use fidibo::Fidibo;
pub use goodreads::{format_date_from_timestamp, Goodreads};
pub use taaghche::Taaghche;

use crate::book::BookRecord;
use crate::extract::Page;
use crate::router::SiteId;

// ============================================================================
// SiteAdapter Trait
// ============================================================================

/// 사이트별 추출기 트레이트
pub trait SiteAdapter: Send + Sync {
    /// 담당 사이트
    fn site(&self) -> SiteId;

    /// 파싱된 페이지에서 도서 레코드 추출
    fn extract(&self, page: &Page) -> Option<BookRecord>;
}

/// 사이트에 맞는 어댑터
pub fn adapter(site: SiteId) -> &'static dyn SiteAdapter {
    match site {
        SiteId::Goodreads => &Goodreads,
        SiteId::Amazon => &Amazon,
        SiteId::Taaghche => &Taaghche,
        SiteId::Fidibo => &Fidibo,
    }
}

/// 페이지 HTML에서 도서 레코드 추출
pub fn extract(site: SiteId, html: &str, url: &str) -> Option<BookRecord> {
    let page = Page::parse(html, url);
    let record = adapter(site).extract(&page);

    match &record {
        Some(book) => tracing::debug!("{} 추출 성공: {}", site, book.title),
        None => tracing::debug!("{} 추출 실패: {}", site, url),
    }

    record
}

/// ISBN에서 하이픈과 공백 제거
pub(crate) fn compact_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !matches!(c, '-' | ' ' | '\u{2010}' | '\u{2011}'))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_dispatch() {
        for site in SiteId::ALL {
            assert_eq!(adapter(site).site(), site);
        }
    }

    #[test]
    fn test_extract_without_title_returns_none() {
        let html = "<html><body><p>Nothing to see</p></body></html>";
        for site in SiteId::ALL {
            assert!(extract(site, html, "https://example.com").is_none());
        }
    }

    #[test]
    fn test_compact_isbn() {
        assert_eq!(compact_isbn("978-0-13-468599-1"), "9780134685991");
        assert_eq!(compact_isbn("0 441 17271 7"), "0441172717");
    }
}

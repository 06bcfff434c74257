//! Fidibo(فیدیبو) 어댑터
//!
//! 구조화 데이터가 없어서 모든 필드를 라벨이 붙은 행(표의 `tr`, 또는 두 칸짜리
//! 목록 항목)에서 읽습니다. 라벨 칸의 페르시아어 텍스트로 행을 찾고
//! 옆 칸의 값을 가져옵니다.

use scraper::ElementRef;

use super::{compact_isbn, SiteAdapter};
use crate::book::BookRecord;
use crate::extract::{
    element_text, leading_number, normalize_whitespace, select_within, to_ascii_digits, Page,
    Rule,
};
use crate::router::SiteId;

/// 행 라벨 (페르시아어 표기)
mod label {
    /// 저자
    pub const AUTHOR: &str = "نویسنده";
    /// 페이지 수
    pub const PAGES: &str = "تعداد صفحات";
    /// 출판사
    pub const PUBLISHER: &str = "ناشر";
    /// 번역자
    pub const TRANSLATOR: &str = "مترجم";
    /// 출간일
    pub const DATE: &str = "تاریخ انتشار";
    /// 언어
    pub const LANGUAGE: &str = "زبان";
    /// ISBN
    pub const ISBN: &str = "شابک";
}

/// 라벨/값 행 후보 셀렉터
const ROW_SELECTORS: [&str; 2] = ["tr", "li"];

/// Fidibo 어댑터
pub struct Fidibo;

impl SiteAdapter for Fidibo {
    fn site(&self) -> SiteId {
        SiteId::Fidibo
    }

    fn extract(&self, page: &Page) -> Option<BookRecord> {
        let title = page.first(&[
            Rule::Text("h1"),
            Rule::Attr(r#"meta[property="og:title"]"#, "content"),
        ]);
        if title.is_empty() {
            return None;
        }

        let rows = labeled_rows(page);
        let lookup = |key: &str| -> Option<String> {
            let key = normalize_persian(key);
            rows.iter()
                .find(|(label, _)| label.contains(&key))
                .map(|(_, value)| value.clone())
        };

        let pages = lookup(label::PAGES).unwrap_or_default();
        let isbn = lookup(label::ISBN).unwrap_or_default();

        Some(BookRecord {
            title,
            author: lookup(label::AUTHOR).unwrap_or_default(),
            translator: lookup(label::TRANSLATOR).unwrap_or_default(),
            pages: leading_number(&pages).unwrap_or_default(),
            cover: page.first(&[
                Rule::Attr(r#"meta[property="og:image"]"#, "content"),
                Rule::Attr(".book-image img", "src"),
                Rule::Attr(".book-cover img", "src"),
            ]),
            publisher: lookup(label::PUBLISHER).unwrap_or_default(),
            date_published: to_ascii_digits(&lookup(label::DATE).unwrap_or_default()),
            language: lookup(label::LANGUAGE).unwrap_or_default(),
            isbn: compact_isbn(&to_ascii_digits(&isbn)),
            url: page.canonical_url(),
            description: page.first(&[
                Rule::Text(".book-description"),
                Rule::Text(".more-info"),
                Rule::Attr(r#"meta[property="og:description"]"#, "content"),
                Rule::Attr(r#"meta[name="description"]"#, "content"),
            ]),
            summary: String::new(),
        })
    }
}

/// 라벨/값 행 목록 (라벨은 정규화됨)
fn labeled_rows(page: &Page) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for css in ROW_SELECTORS {
        for row in page.select(css) {
            let cells = match css {
                "tr" => select_within(&row, "td, th"),
                _ => row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| matches!(child.value().name(), "span" | "div"))
                    .collect(),
            };
            if cells.len() < 2 {
                continue;
            }

            let label = normalize_persian(&element_text(&cells[0]));
            let value = cell_value(&cells[1]);
            if !label.is_empty() && !value.is_empty() {
                rows.push((label, value));
            }
        }
    }

    rows
}

/// 값 칸 텍스트 (링크가 여러 개면 ", "로 연결)
fn cell_value(cell: &ElementRef<'_>) -> String {
    let links: Vec<String> = select_within(cell, "a")
        .iter()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    if links.len() > 1 {
        links.join(", ")
    } else {
        element_text(cell)
    }
}

/// 아랍 문자 변형을 페르시아 표기로 통일하고 ZWNJ 제거
fn normalize_persian(text: &str) -> String {
    let unified: String = text
        .chars()
        .filter(|c| *c != '\u{200c}')
        .map(|c| match c {
            'ي' | 'ى' => 'ی',
            'ك' => 'ک',
            _ => c,
        })
        .collect();
    normalize_whitespace(&unified)
}

// ============================================================================
// Tests
// ============================================================================

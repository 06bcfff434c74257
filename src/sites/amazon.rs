//! Amazon 어댑터
//!
//! 제목은 셀렉터 폴백 목록으로 찾고 JSON-LD 제목은 마지막 수단으로 씁니다.
//! 저자/번역자는 바이라인의 기여 라벨로 나누고, 페이지 수·출판사·출간일은
//! 상세 정보 목록에서 키워드가 들어 있는 항목의 마지막 구분자 뒤 값을 읽습니다.
//!
//! 설명은 클라이언트 스크립트가 불러오는 영역이라 항상 비워 둡니다.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use serde_json::Value;

use super::{compact_isbn, SiteAdapter};
use crate::book::BookRecord;
use crate::extract::{
    element_text, join_names, leading_number, normalize_whitespace, select_within, strip_bidi,
    trailing_segment, Page, Rule,
};
use crate::router::SiteId;
use crate::structured::find_json_ld;

/// 제목 끝의 괄호 묶음
static TRAILING_PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(([^()]*)\)\s*$").expect("valid parenthetical regex")
});

/// 마케팅 분류 키워드
static CATEGORY_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:books?|editions?|series|novels?|classics?|library|collections?|gifts?|boxed set|box set|paperback|hardcover|kindle|volumes?|trilogy|saga|cookbooks?|guides?)\b",
    )
    .expect("valid keyword regex")
});

static ASIN_IN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(?:dp|gp/product|gp/aw/d|exec/obidos/asin|o/asin)/([a-z0-9]{10})|[?&]asin=([a-z0-9]{10})")
        .expect("valid asin regex")
});

/// 길이만으로 제거하는 괄호 내용의 최소 길이 (문자 수)
const LONG_PARENTHETICAL_CHARS: usize = 30;

/// 상세 정보 목록 항목 셀렉터
const DETAIL_ROWS: [&str; 4] = [
    "#detailBullets_feature_div li",
    "#productDetails_detailBullets_sections1 tr",
    "#productDetails_techSpec_section_1 tr",
    ".detail-bullet-list li",
];

/// Amazon 어댑터
pub struct Amazon;

impl SiteAdapter for Amazon {
    fn site(&self) -> SiteId {
        SiteId::Amazon
    }

    fn extract(&self, page: &Page) -> Option<BookRecord> {
        let ld = find_json_ld(page.document()).unwrap_or(Value::Null);

        let title = clean_title(&page.first(&[
            Rule::Text("#productTitle"),
            Rule::Text("#ebooksProductTitle"),
            Rule::Text("h1#title span"),
            Rule::Text("h1#title"),
            Rule::Attr(r#"meta[name="title"]"#, "content"),
            Rule::Json(&ld, "name"),
        ]));
        if title.is_empty() {
            return None;
        }

        let byline = Byline::parse(page);
        let rows = detail_rows(page);

        let pages = page.first(&[
            Rule::Value(detail_value(&rows, |t| t.contains("print length"))),
            Rule::Value(detail_value(&rows, |t| t.contains("pages"))),
            Rule::Text("#rpi-attribute-book_details-fiona_pages .rpi-attribute-value"),
            Rule::Text("#rpi-attribute-book_details-ebook_pages .rpi-attribute-value"),
            Rule::Json(&ld, "numberOfPages"),
        ]);

        let isbn = page.first(&[
            Rule::Value(detail_value(&rows, |t| t.contains("isbn-13"))),
            Rule::Value(detail_value(&rows, |t| t.contains("isbn-10"))),
            Rule::Text("#rpi-attribute-book_details-isbn13 .rpi-attribute-value"),
            Rule::Text("#rpi-attribute-book_details-isbn10 .rpi-attribute-value"),
            Rule::Json(&ld, "isbn"),
            Rule::Value(detail_value(&rows, |t| t.starts_with("asin"))),
            Rule::Attr("input#ASIN", "value"),
            Rule::Value(asin_from_url(page.url())),
        ]);

        Some(BookRecord {
            title,
            author: page.first(&[
                Rule::Value(Some(byline.authors.join(", "))),
                Rule::Value(ld.get("author").map(join_names)),
            ]),
            translator: byline.translators.join(", "),
            pages: leading_number(&pages).unwrap_or_default(),
            cover: page.first(&[
                Rule::Attr("#landingImage", "data-old-hires"),
                Rule::Attr("#imgBlkFront", "data-old-hires"),
                Rule::Attr("#ebooksImgBlkFront", "data-old-hires"),
                Rule::Attr("#landingImage", "src"),
                Rule::Attr("#imgBlkFront", "src"),
                Rule::Attr("#ebooksImgBlkFront", "src"),
                Rule::Json(&ld, "image"),
            ]),
            publisher: page.first(&[
                Rule::Value(detail_value(&rows, |t| {
                    t.contains("publisher") && !t.contains("publication")
                })),
                Rule::Text("#rpi-attribute-book_details-publisher .rpi-attribute-value"),
                Rule::Json(&ld, "publisher.name"),
                Rule::Json(&ld, "publisher"),
            ]),
            date_published: page.first(&[
                Rule::Value(detail_value(&rows, |t| {
                    t.contains("publication date") || t.contains("publish date")
                })),
                Rule::Text("#rpi-attribute-book_details-publication_date .rpi-attribute-value"),
                Rule::Json(&ld, "datePublished"),
            ]),
            language: page.first(&[
                Rule::Value(detail_value(&rows, |t| t.contains("language"))),
                Rule::Text("#rpi-attribute-language .rpi-attribute-value"),
                Rule::Json(&ld, "inLanguage"),
            ]),
            isbn: compact_isbn(&isbn),
            url: page.canonical_url(),
            description: String::new(),
            summary: String::new(),
        })
    }
}

// ============================================================================
// Title
// ============================================================================

/// 제목 끝의 마케팅 분류 괄호 제거
///
/// 괄호 내용이 분류 키워드를 포함하거나 30자 이상이면 제거하고, 더 이상
/// 해당하지 않을 때까지 반복합니다. 제거 결과가 비면 원래 제목을 유지합니다.
pub fn clean_title(raw: &str) -> String {
    let original = normalize_whitespace(raw);
    let mut title = original.as_str();

    while let Some(caps) = TRAILING_PARENTHETICAL.captures(title) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let is_marketing = CATEGORY_KEYWORDS.is_match(inner)
            || inner.chars().count() >= LONG_PARENTHETICAL_CHARS;
        if !is_marketing {
            break;
        }

        let start = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
        let stripped = title[..start].trim_end();
        if stripped.is_empty() {
            break;
        }
        title = stripped;
    }

    title.to_string()
}

// ============================================================================
// Byline
// ============================================================================

/// 바이라인에서 나눈 기여자
#[derive(Debug, Default)]
struct Byline {
    authors: Vec<String>,
    translators: Vec<String>,
}

impl Byline {
    fn parse(page: &Page) -> Self {
        let mut byline = Self::default();

        for entry in page.select("#bylineInfo .author") {
            let name = contributor_name(&entry);
            if name.is_empty() {
                continue;
            }

            let role = select_within(&entry, ".contribution")
                .first()
                .map(element_text)
                .unwrap_or_default()
                .to_lowercase();

            let target = if role.contains("translator") {
                &mut byline.translators
            } else if role.contains("author") || role_is_empty(&role) {
                &mut byline.authors
            } else {
                tracing::debug!("바이라인 역할 무시: {} ({})", name, role);
                continue;
            };

            if !target.contains(&name) {
                target.push(name);
            }
        }

        byline
    }
}

fn contributor_name(entry: &ElementRef<'_>) -> String {
    ["a.a-link-normal", ".contributorNameID", "a"]
        .into_iter()
        .flat_map(|css| select_within(entry, css))
        .map(|el| element_text(&el))
        .find(|name| !name.is_empty())
        .unwrap_or_default()
}

/// 괄호와 쉼표만 남은 라벨은 빈 라벨로 취급
fn role_is_empty(role: &str) -> bool {
    role.chars()
        .all(|c| c.is_whitespace() || matches!(c, '(' | ')' | ','))
}

// ============================================================================
// Detail bullets
// ============================================================================

/// 상세 정보 항목의 텍스트
///
/// 표 형식(`th`/`td`)은 `"라벨 : 값"`으로 합쳐 목록 형식과 같게 다룹니다.
fn detail_rows(page: &Page) -> Vec<String> {
    DETAIL_ROWS
        .into_iter()
        .flat_map(|css| page.select(css))
        .map(|row| {
            let header = select_within(&row, "th").first().map(element_text);
            let cell = select_within(&row, "td").first().map(element_text);
            let text = match (header, cell) {
                (Some(header), Some(cell)) => format!("{} : {}", header, cell),
                _ => element_text(&row),
            };
            normalize_whitespace(&strip_bidi(&text))
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// 키워드 조건에 맞는 첫 항목의 값
fn detail_value<F>(rows: &[String], matches: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    rows.iter()
        .find(|row| matches(&row.to_lowercase()))
        .map(|row| trailing_segment(row))
        .filter(|value| !value.is_empty())
}

fn asin_from_url(url: &str) -> Option<String> {
    let caps = ASIN_IN_URL.captures(url)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_uppercase())
}

// ============================================================================
// Tests
// ============================================================================

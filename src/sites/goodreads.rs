//! Goodreads 어댑터
//!
//! 제목, 저자, 표지, 페이지 수는 JSON-LD에서, 출판사와 출간 시각은
//! Next.js 하이드레이션 페이로드의 상세 정보 노드에서 가져옵니다.
//!
//! 알려진 한계: Goodreads 구조화 데이터는 번역자를 저자와 구분하지 않습니다.
//! 번역자는 항상 `author`에 섞여 들어가며 `translator`는 비워 둡니다.
//! 이름만으로 역할을 추측하지 않습니다.

use chrono::{Local, TimeZone};
use serde_json::{Map, Value};

use super::{compact_isbn, SiteAdapter};
use crate::book::BookRecord;
use crate::extract::{element_text, join_names, leading_number, strip_tags, Page, Rule};
use crate::router::SiteId;
use crate::structured::{
    find_app_state, find_by_predicate, find_by_predicate_linked, find_json_ld, json_path,
    scalar_to_string,
};

/// 설명으로 인정하는 최소 길이 (문자 수)
const MIN_DESCRIPTION_CHARS: usize = 50;

/// 상세 정보 노드를 찾을 후보 루트 (순서대로)
const DETAIL_ROOTS: [&str; 4] = ["props.pageProps.apolloState", "props.pageProps", "props", ""];

/// 엔티티 캐시 경로
const APOLLO_STATE: &str = "props.pageProps.apolloState";

/// 현재 페이지 도서로 이어지는 쿼리 루트 (엔티티 캐시 안)
const ROOT_QUERY: &str = "props.pageProps.apolloState.ROOT_QUERY";

/// 화면 텍스트에서 ISBN 복구용 패턴 (순서대로)
const ISBN_PATTERNS: [&str; 4] = [
    r"ISBN-?13:?\s*([\d-]{13,17})",
    r"ISBN-?10:?\s*([\dXx-]{10,13})",
    r"ISBN:?\s*(97[89][\d-]{10,14})",
    r"ISBN:?\s*([\dXx-]{10,17})",
];

/// 설명 컨테이너 셀렉터 (순서대로)
const DESCRIPTION_SELECTORS: [&str; 4] = [
    r#"[data-testid="description"] .Formatted"#,
    ".BookPageMetadataSection__description .Formatted",
    r#"#description span[style*="display:none"]"#,
    "#description span",
];

/// Goodreads 어댑터
pub struct Goodreads;

impl SiteAdapter for Goodreads {
    fn site(&self) -> SiteId {
        SiteId::Goodreads
    }

    fn extract(&self, page: &Page) -> Option<BookRecord> {
        let ld = find_json_ld(page.document()).unwrap_or(Value::Null);
        let state = find_app_state(page.document()).unwrap_or(Value::Null);
        let null = Value::Null;
        let details = find_details(&state).unwrap_or(&null);

        let title = page.first(&[
            Rule::Json(&ld, "name"),
            Rule::Text(r#"h1[data-testid="bookTitle"]"#),
            Rule::Text("h1#bookTitle"),
            Rule::Attr(r#"meta[property="og:title"]"#, "content"),
        ]);
        if title.is_empty() {
            return None;
        }

        let author = page.first(&[
            Rule::Value(ld.get("author").map(join_names)),
            Rule::Value(rendered_names(page, ".ContributorLink__name")),
            Rule::Value(rendered_names(page, "a.authorName span")),
        ]);

        let pages = page.first(&[
            Rule::Json(&ld, "numberOfPages"),
            Rule::Json(details, "numPages"),
            Rule::Pattern(r"(\d+)\s+pages"),
        ]);

        let publication = details
            .get("publicationTime")
            .and_then(publication_date);

        let isbn = page.first(&[
            Rule::Json(details, "isbn13"),
            Rule::Json(details, "isbn"),
            Rule::Json(details, "asin"),
            Rule::Json(&ld, "isbn"),
            Rule::Pattern(ISBN_PATTERNS[0]),
            Rule::Pattern(ISBN_PATTERNS[1]),
            Rule::Pattern(ISBN_PATTERNS[2]),
            Rule::Pattern(ISBN_PATTERNS[3]),
        ]);

        let mut description_rules = vec![
            Rule::Value(payload_description(&state)),
            Rule::Value(
                ld.get("description")
                    .and_then(Value::as_str)
                    .map(strip_tags),
            ),
        ];
        description_rules.extend(DESCRIPTION_SELECTORS.into_iter().map(Rule::Text));

        Some(BookRecord {
            title,
            author,
            translator: String::new(),
            pages: leading_number(&pages).unwrap_or_default(),
            cover: page.first(&[
                Rule::Json(&ld, "image"),
                Rule::Attr("img.ResponsiveImage", "src"),
                Rule::Attr(r#"meta[property="og:image"]"#, "content"),
            ]),
            publisher: page.first(&[
                Rule::Json(details, "publisher"),
                Rule::Json(&ld, "publisher.name"),
                Rule::Json(&ld, "publisher"),
            ]),
            date_published: page.first(&[
                Rule::Value(publication),
                Rule::Pattern(r"(?:First )?[Pp]ublished\s+([A-Z][a-z]+ \d{1,2}, \d{4})"),
            ]),
            language: page.first(&[
                Rule::Json(&ld, "inLanguage"),
                Rule::Json(details, "language.name"),
            ]),
            isbn: compact_isbn(&isbn),
            url: page.canonical_url(),
            description: page.first(&description_rules),
            summary: String::new(),
        })
    }
}

// ============================================================================
// Hydration payload helpers
// ============================================================================

/// 출판 상세 정보 노드 모양
///
/// `publisher`와 `publicationTime`을 갖고 `format`/`numPages`/`asin` 중
/// 하나를 가진 객체
fn is_book_details(obj: &Map<String, Value>) -> bool {
    obj.contains_key("publisher")
        && obj.contains_key("publicationTime")
        && ["format", "numPages", "asin"]
            .iter()
            .any(|key| obj.contains_key(*key))
}

/// 후보 루트를 순서대로 탐색해 첫 번째 상세 정보 노드 반환
///
/// 엔티티 캐시에는 비슷한 책과 다른 판의 `Book:*` 엔티티도 들어 있으므로
/// `ROOT_QUERY`에서 참조를 따라가 현재 도서를 먼저 봅니다.
fn find_details(state: &Value) -> Option<&Value> {
    search_payload(state, &DETAIL_ROOTS, is_book_details)
}

/// 페이로드에서 충분히 긴 `description` 문자열 찾기
///
/// `description({"stripped":true})`처럼 인자가 붙은 키도 포함합니다.
fn payload_description(state: &Value) -> Option<String> {
    search_payload(state, &[""], |obj| long_description(obj).is_some())
        .and_then(Value::as_object)
        .and_then(long_description)
}

/// `ROOT_QUERY`부터, 이어서 후보 루트를 순서대로 탐색
fn search_payload<'a, P>(state: &'a Value, roots: &[&str], predicate: P) -> Option<&'a Value>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    let references = json_path(state, APOLLO_STATE).and_then(Value::as_object);

    let from_query = match (references, json_path(state, ROOT_QUERY)) {
        (Some(refs), Some(query)) => find_by_predicate_linked(query, refs, &predicate),
        _ => None,
    };

    from_query.or_else(|| {
        roots
            .iter()
            .filter_map(|path| json_path(state, path))
            .find_map(|root| match references {
                Some(refs) => find_by_predicate_linked(root, refs, &predicate),
                None => find_by_predicate(root, &predicate),
            })
    })
}

fn long_description(obj: &Map<String, Value>) -> Option<String> {
    obj.iter()
        .filter(|(key, _)| key.as_str() == "description" || key.starts_with("description("))
        .filter_map(|(_, value)| value.as_str())
        .map(strip_tags)
        .find(|text| text.chars().count() > MIN_DESCRIPTION_CHARS)
}

fn rendered_names(page: &Page, css: &str) -> Option<String> {
    let mut names: Vec<String> = Vec::new();
    for name in page.select(css).iter().map(element_text) {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

// ============================================================================
// Dates
// ============================================================================

/// 밀리초 타임스탬프를 로컬 달력 기준 `YYYY-MM-DD`로 변환
///
/// 문자열 자르기가 아니라 달력 구성요소로 계산하므로 시간대에 따라
/// 날짜가 올바르게 바뀝니다.
pub fn format_date_from_timestamp(millis: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// `publicationTime` 값 해석 (숫자, 숫자 문자열, 그 밖의 문자열)
fn publication_date(value: &Value) -> Option<String> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match millis {
        Some(ms) => format_date_from_timestamp(ms),
        None => scalar_to_string(value),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head>
            <link rel="canonical" href="https://www.goodreads.com/book/show/44767458-dune">
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "Book",
                "name": "Dune",
                "image": "https://images.gr-assets.com/dune.jpg",
                "bookFormat": "Paperback",
                "numberOfPages": 658,
                "inLanguage": "English",
                "isbn": "9780441172719",
                "author": [
                    {"@type": "Person", "name": "Frank Herbert"},
                    {"@type": "Person", "name": "Jane Translator"}
                ],
                "description": "Short."
            }
            </script>
        </head>
        <body>
            <h1 data-testid="bookTitle">Dune</h1>
            <script id="__NEXT_DATA__" type="application/json">
            {
                "props": {
                    "pageProps": {
                        "apolloState": {
                            "ROOT_QUERY": {"getBookByLegacyId": {"__ref": "Book:1"}},
                            "Book:1": {
                                "title": "Dune",
                                "description": "Set on the desert planet Arrakis, Dune is the story of the boy Paul Atreides.",
                                "details": {
                                    "asin": "B00B7NPRY8",
                                    "format": "Paperback",
                                    "numPages": 658,
                                    "publicationTime": 1700000000000,
                                    "publisher": "Ace",
                                    "isbn13": "978-0441172719",
                                    "language": {"name": "English"}
                                },
                                "work": {"__ref": "Work:1"}
                            },
                            "Work:1": {"bestBook": {"__ref": "Book:1"}}
                        }
                    }
                }
            }
            </script>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_full_page() {
        let page = Page::parse(PAGE, "https://www.goodreads.com/book/show/44767458?ref=x");
        let book = Goodreads.extract(&page).expect("record");

        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Frank Herbert, Jane Translator");
        assert_eq!(book.translator, "");
        assert_eq!(book.pages, "658");
        assert_eq!(book.cover, "https://images.gr-assets.com/dune.jpg");
        assert_eq!(book.publisher, "Ace");
        assert_eq!(book.language, "English");
        assert_eq!(book.isbn, "9780441172719");
        assert_eq!(book.url, "https://www.goodreads.com/book/show/44767458-dune");
        assert!(book.description.starts_with("Set on the desert planet Arrakis"));
        assert_eq!(
            Some(book.date_published),
            format_date_from_timestamp(1_700_000_000_000)
        );
    }

    #[test]
    fn test_format_date_from_timestamp() {
        let date = format_date_from_timestamp(1_700_000_000_000).expect("date");
        let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("regex");
        assert!(re.is_match(&date), "{}", date);
        // 2023-11-14T22:13:20Z, 시간대에 따라 14일 또는 15일
        assert!(date == "2023-11-14" || date == "2023-11-15", "{}", date);

        let expected = Local
            .timestamp_millis_opt(1_700_000_000_000)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string());
        assert_eq!(Some(date), expected);
    }

    #[test]
    fn test_publication_date_variants() {
        assert_eq!(
            publication_date(&serde_json::json!("1700000000000")),
            format_date_from_timestamp(1_700_000_000_000)
        );
        assert_eq!(
            publication_date(&serde_json::json!("August 1965")).as_deref(),
            Some("August 1965")
        );
        assert_eq!(publication_date(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_details_found_in_nested_page_props_without_apollo() {
        let state = serde_json::json!({
            "props": {"pageProps": {"book": {"details": {
                "publisher": "Penguin", "publicationTime": 0, "numPages": 10
            }}}}
        });
        let details = find_details(&state).expect("details");
        assert_eq!(details["publisher"], "Penguin");
    }

    #[test]
    fn test_current_book_wins_over_similar_books_in_cache() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">{"@type": "Book", "name": "Dune"}</script>
            </head><body>
            <script id="__NEXT_DATA__" type="application/json">
            {"props": {"pageProps": {"apolloState": {
                "Book:kca://book/amzn-similar": {
                    "description": "A different book entirely, recommended because readers also liked it.",
                    "details": {"publisher": "Wrong Publisher", "publicationTime": 0,
                                "format": "Hardcover", "isbn13": "9999999999999"}
                },
                "ROOT_QUERY": {"getBookByLegacyId({\"legacyId\":\"44767458\"})": {"__ref": "Book:kca://book/main"}},
                "Book:kca://book/main": {
                    "description": "Set on the desert planet Arrakis, Dune is the story of the boy Paul Atreides.",
                    "details": {"publisher": "Ace", "publicationTime": 1700000000000,
                                "format": "Paperback", "isbn13": "9780441172719"}
                }
            }}}}
            </script>
            </body></html>
        "#;
        let page = Page::parse(html, "https://www.goodreads.com/book/show/44767458");
        let book = Goodreads.extract(&page).expect("record");

        assert_eq!(book.publisher, "Ace");
        assert_eq!(book.isbn, "9780441172719");
        assert_eq!(book.date_published, format_date_from_timestamp(1_700_000_000_000).expect("date"));
        assert!(book.description.starts_with("Set on the desert planet"), "{}", book.description);
    }

    #[test]
    fn test_isbn_recovered_from_visible_text() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">{"@type": "Book", "name": "Obscure"}</script>
            </head><body>
            <div class="EditionDetails">Format 200 pages, Paperback
            ISBN-13: 978-1-4028-9462-6</div>
            </body></html>
        "#;
        let page = Page::parse(html, "https://www.goodreads.com/book/show/1");
        let book = Goodreads.extract(&page).expect("record");
        assert_eq!(book.isbn, "9781402894626");
        assert_eq!(book.pages, "200");
        assert_eq!(book.publisher, "");
        assert_eq!(book.date_published, "");
    }

    #[test]
    fn test_description_falls_back_to_json_ld_then_markup() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">{"@type": "Book", "name": "Book", "description": "<b>A</b> long structured data description that is surely beyond fifty characters."}</script>
            </head><body></body></html>
        "#;
        let page = Page::parse(html, "https://www.goodreads.com/book/show/1");
        let book = Goodreads.extract(&page).expect("record");
        assert_eq!(
            book.description,
            "A long structured data description that is surely beyond fifty characters."
        );

        let html = r#"
            <html><head>
            <script type="application/ld+json">{"@type": "Book", "name": "Book"}</script>
            </head><body>
            <div data-testid="description"><span class="Formatted">Rendered   blurb.</span></div>
            </body></html>
        "#;
        let page = Page::parse(html, "https://www.goodreads.com/book/show/1");
        let book = Goodreads.extract(&page).expect("record");
        assert_eq!(book.description, "Rendered blurb.");
    }
}

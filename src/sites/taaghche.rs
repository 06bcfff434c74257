//! Taaghche(طاقچه) 어댑터
//!
//! JSON-LD만 사용합니다. 일부 필드는 `workExample` 객체(또는 배열의 첫 항목)에
//! 들어 있으므로 도서 엔티티에서 찾지 못하면 그쪽을 봅니다.
//! 번역자도 저자처럼 목록일 수 있어 같은 이름 연결 규칙을 씁니다.

use serde_json::Value;

use super::{compact_isbn, SiteAdapter};
use crate::book::BookRecord;
use crate::extract::{join_names, leading_number, strip_tags, to_ascii_digits, Page, Rule};
use crate::router::SiteId;
use crate::structured::find_json_ld;

/// Taaghche 어댑터
pub struct Taaghche;

impl SiteAdapter for Taaghche {
    fn site(&self) -> SiteId {
        SiteId::Taaghche
    }

    fn extract(&self, page: &Page) -> Option<BookRecord> {
        let ld = find_json_ld(page.document())?;
        let example = work_example(&ld);

        let title = page.first(&[Rule::Json(&ld, "name"), Rule::Json(&example, "name")]);
        if title.is_empty() {
            return None;
        }

        let pages = page.first(&[
            Rule::Json(&ld, "numberOfPages"),
            Rule::Json(&example, "numberOfPages"),
        ]);

        let isbn = page.first(&[Rule::Json(&ld, "isbn"), Rule::Json(&example, "isbn")]);

        let description = page.first(&[
            Rule::Value(ld.get("description").and_then(Value::as_str).map(strip_tags)),
            Rule::Attr(r#"meta[property="og:description"]"#, "content"),
        ]);

        Some(BookRecord {
            title,
            author: page.first(&[
                Rule::Value(names(&ld, "author")),
                Rule::Value(names(&example, "author")),
            ]),
            translator: page.first(&[
                Rule::Value(names(&ld, "translator")),
                Rule::Value(names(&example, "translator")),
            ]),
            pages: leading_number(&pages).unwrap_or_default(),
            cover: page.first(&[
                Rule::Json(&ld, "image"),
                Rule::Json(&ld, "image.url"),
                Rule::Json(&ld, "image.0"),
                Rule::Json(&example, "image"),
                Rule::Attr(r#"meta[property="og:image"]"#, "content"),
            ]),
            publisher: page.first(&[
                Rule::Json(&ld, "publisher.name"),
                Rule::Json(&ld, "publisher"),
                Rule::Json(&example, "publisher.name"),
                Rule::Json(&example, "publisher"),
            ]),
            date_published: page.first(&[
                Rule::Json(&ld, "datePublished"),
                Rule::Json(&example, "datePublished"),
            ]),
            language: page.first(&[
                Rule::Json(&ld, "inLanguage"),
                Rule::Json(&example, "inLanguage"),
            ]),
            isbn: compact_isbn(&to_ascii_digits(&isbn)),
            url: page.first(&[Rule::Json(&ld, "url"), Rule::Value(Some(page.canonical_url()))]),
            description,
            summary: String::new(),
        })
    }
}

/// `workExample` (객체 또는 배열의 첫 항목)
fn work_example(ld: &Value) -> Value {
    match ld.get("workExample") {
        Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
        Some(example @ Value::Object(_)) => example.clone(),
        _ => Value::Null,
    }
}

fn names(entity: &Value, key: &str) -> Option<String> {
    entity.get(key).map(join_names)
}

// ============================================================================
// Tests
// ============================================================================

//! 필드 추출 모듈 - 순서가 있는 폴백 규칙
//!
//! 사이트 마크업은 자주 바뀌므로 필드 하나를 여러 규칙(CSS 셀렉터, 속성,
//! 페이지 전체 텍스트 정규식, JSON 경로)으로 순서대로 시도하고
//! 처음으로 비어 있지 않은 결과를 채택합니다. 모든 규칙이 실패하면
//! 빈 문자열을 반환합니다.

use std::cell::OnceCell;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::structured::json_str;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// 콜론 또는 앞뒤 공백이 있는 대시
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:：]|\s[-–—]\s").expect("valid separator regex"));

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid number regex"));

/// 화면에 보이지 않는 텍스트를 담는 요소
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

// ============================================================================
// Rule
// ============================================================================

/// 필드 추출 규칙
#[derive(Debug, Clone)]
pub enum Rule<'a> {
    /// CSS 셀렉터에 맞는 요소의 텍스트
    Text(&'a str),
    /// CSS 셀렉터에 맞는 요소의 속성 값
    Attr(&'a str, &'a str),
    /// 페이지 전체 텍스트에 대한 정규식 (캡처 그룹 1, 없으면 전체 매치)
    Pattern(&'a str),
    /// JSON 값의 점 표기 경로
    Json(&'a Value, &'a str),
    /// 미리 계산된 후보 값
    Value(Option<String>),
}

impl Rule<'_> {
    /// 규칙 적용
    pub fn apply(&self, page: &Page) -> Option<String> {
        match self {
            Rule::Text(css) => page
                .select(css)
                .into_iter()
                .map(|el| element_text(&el))
                .find(|text| !text.is_empty()),
            Rule::Attr(css, attr) => page
                .select(css)
                .into_iter()
                .filter_map(|el| el.value().attr(attr).map(str::to_string))
                .find(|value| !value.trim().is_empty()),
            Rule::Pattern(pattern) => {
                let re = match Regex::new(pattern) {
                    Ok(re) => re,
                    Err(e) => {
                        tracing::debug!("잘못된 정규식 {}: {}", pattern, e);
                        return None;
                    }
                };
                let caps = re.captures(page.text())?;
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
            }
            Rule::Json(value, path) => json_str(value, path),
            Rule::Value(value) => value.clone(),
        }
    }
}

/// 후보 중 공백 정리 후 처음으로 비어 있지 않은 값
///
/// 후보는 지연 평가되므로 앞선 후보가 성공하면 뒤의 후보는 계산되지 않습니다.
pub fn first_non_empty<I>(candidates: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|candidate| normalize_whitespace(&candidate))
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
}

// ============================================================================
// Page
// ============================================================================

/// 파싱된 도서 페이지
pub struct Page {
    document: Html,
    url: String,
    text: OnceCell<String>,
}

impl Page {
    /// HTML 파싱
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            url: url.to_string(),
            text: OnceCell::new(),
        }
    }

    /// 파싱된 문서
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// 요청한 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 화면에 보이는 텍스트 (줄 단위)
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| visible_text(&self.document))
    }

    /// 셀렉터에 맞는 모든 요소
    ///
    /// 셀렉터가 잘못되었으면 빈 목록입니다.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(e) => {
                tracing::debug!("잘못된 셀렉터 {}: {:?}", css, e);
                Vec::new()
            }
        }
    }

    /// 규칙을 순서대로 시도해 첫 번째 성공 값 반환
    pub fn first(&self, rules: &[Rule<'_>]) -> String {
        first_non_empty(rules.iter().map(|rule| rule.apply(self)))
    }

    /// 정규 URL (`link[rel=canonical]`), 없으면 요청한 URL
    pub fn canonical_url(&self) -> String {
        let canonical = self.first(&[
            Rule::Attr(r#"link[rel="canonical"]"#, "href"),
            Rule::Attr(r#"meta[property="og:url"]"#, "content"),
        ]);
        if canonical.starts_with("http") {
            canonical
        } else {
            self.url.clone()
        }
    }
}

/// 요소 하위에서 셀렉터에 맞는 요소들
pub fn select_within<'a>(element: &ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// 요소의 텍스트 (공백 정리)
pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let line = normalize_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

// ============================================================================
// Text Helpers
// ============================================================================

/// 연속 공백을 공백 하나로 줄이고 양끝 공백 제거
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// HTML 엔티티 디코딩 (`&amp;` → `&`)
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let fragment = Html::parse_fragment(text);
    fragment.root_element().text().collect::<String>()
}

/// HTML 태그 제거 후 엔티티 디코딩, 공백 정리
pub fn strip_tags(text: &str) -> String {
    let without_tags = TAG.replace_all(text, " ");
    normalize_whitespace(&decode_entities(&without_tags))
}

/// 방향 제어 문자 제거 (LRM, RLM, 임베딩/오버라이드)
pub fn strip_bidi(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}'))
        .collect()
}

/// 마지막 구분자(콜론 또는 공백으로 둘러싼 대시) 뒤의 텍스트
///
/// 구분자가 없으면 전체 텍스트를 반환합니다.
pub fn trailing_segment(text: &str) -> String {
    let cleaned = strip_bidi(text);
    let start = SEPARATOR
        .find_iter(&cleaned)
        .last()
        .map(|m| m.end())
        .unwrap_or(0);
    normalize_whitespace(&cleaned[start..])
}

/// 페르시아/아랍-인도 숫자를 ASCII 숫자로 변환
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06f0}'..='\u{06f9}' => char::from(b'0' + (c as u32 - 0x06f0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

/// 텍스트 안의 첫 번째 정수
pub fn leading_number(text: &str) -> Option<String> {
    let ascii = to_ascii_digits(text);
    NUMBER.find(&ascii).map(|m| m.as_str().to_string())
}

/// 이름 목록을 ", "로 연결
///
/// 문자열, `name` 필드를 가진 객체, 또는 둘이 섞인 배열을 받습니다.
pub fn join_names(value: &Value) -> String {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(single_name).collect(),
        other => single_name(other).into_iter().collect(),
    };
    names.join(", ")
}

fn single_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => normalize_whitespace(s),
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .map(normalize_whitespace)?,
        _ => return None,
    };

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// 문자 단위로 자르기 (UTF-8 안전)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

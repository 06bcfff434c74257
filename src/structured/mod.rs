//! 구조화 데이터 탐색 모듈
//!
//! 페이지에 내장된 JSON 섬(JSON-LD 스크립트, 하이드레이션 페이로드)을 찾고,
//! 중첩된 JSON 그래프에서 특정 모양의 노드를 깊이 우선으로 탐색합니다.
//!
//! 하이드레이션 페이로드는 엔티티를 참조 테이블로 정규화하는 경우가 많습니다
//! (`{"__ref": "Book:123"}`). 참조를 따라가면 공유/순환 그래프가 되므로
//! 방문 집합은 노드 주소(identity)로 관리합니다.

use std::collections::HashSet;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

/// JSON-LD 스크립트 셀렉터
const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// 하이드레이션 페이로드 셀렉터 (Next.js)
const APP_STATE_SELECTOR: &str = "script#__NEXT_DATA__";

/// 참조 노드 키
const REF_KEY: &str = "__ref";

/// 우선 탐색 자식 키
const DETAILS_KEY: &str = "details";

// ============================================================================
// Embedded JSON discovery
// ============================================================================

/// 도서를 설명하는 첫 번째 JSON-LD 엔티티 찾기
///
/// - `@type`이 정확히 `"Book"`인 블록
/// - `@type`이 `"Book"` 또는 `"Product"`를 포함하는 배열인 블록
/// - `@graph` 컨테이너(또는 최상위 배열) 안의 위 조건을 만족하는 엔티티
///
/// 파싱에 실패한 블록은 조용히 건너뜁니다.
pub fn find_json_ld(document: &Html) -> Option<Value> {
    let selector = Selector::parse(JSON_LD_SELECTOR).ok()?;

    for element in document.select(&selector) {
        let raw = element.text().collect::<String>();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let json: Value = match serde_json::from_str(trimmed) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!("JSON-LD 블록 파싱 실패, 건너뜀: {}", e);
                continue;
            }
        };

        if let Some(found) = qualifying_entity(json) {
            return Some(found);
        }
    }

    None
}

fn qualifying_entity(json: Value) -> Option<Value> {
    match json {
        Value::Array(items) => items.into_iter().find_map(qualifying_entity),
        Value::Object(mut obj) => {
            if is_book_type(obj.get("@type")) {
                return Some(Value::Object(obj));
            }
            match obj.remove("@graph") {
                Some(Value::Array(members)) => members
                    .into_iter()
                    .find(|member| is_book_type(member.get("@type"))),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_book_type(type_value: Option<&Value>) -> bool {
    match type_value {
        Some(Value::String(s)) => s == "Book",
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t == "Book" || t == "Product"),
        _ => false,
    }
}

/// 하이드레이션 페이로드(`__NEXT_DATA__`) 파싱
pub fn find_app_state(document: &Html) -> Option<Value> {
    let selector = Selector::parse(APP_STATE_SELECTOR).ok()?;
    let element = document.select(&selector).next()?;
    let raw = element.text().collect::<String>();

    match serde_json::from_str(raw.trim()) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::debug!("하이드레이션 페이로드 파싱 실패: {}", e);
            None
        }
    }
}

// ============================================================================
// Predicate search
// ============================================================================

/// 조건을 만족하는 첫 번째 객체 노드를 깊이 우선으로 탐색
///
/// 객체와 배열만 내려가며 스칼라 값은 불투명한 리프로 취급합니다.
/// 각 객체에서는 `details` 자식을 다른 자식보다 먼저 살펴봅니다.
pub fn find_by_predicate<'a, P>(root: &'a Value, predicate: P) -> Option<&'a Value>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    search(root, None, &predicate)
}

/// 참조 테이블을 따라가며 탐색
///
/// `{"__ref": "Book:1"}` 형태의 노드를 만나면 `references["Book:1"]`로
/// 이어서 탐색합니다. 같은 엔티티는 한 번만 방문합니다.
pub fn find_by_predicate_linked<'a, P>(
    root: &'a Value,
    references: &'a Map<String, Value>,
    predicate: P,
) -> Option<&'a Value>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    search(root, Some(references), &predicate)
}

fn search<'a, P>(
    root: &'a Value,
    references: Option<&'a Map<String, Value>>,
    predicate: &P,
) -> Option<&'a Value>
where
    P: Fn(&Map<String, Value>) -> bool,
{
    let mut visited: HashSet<*const Value> = HashSet::new();
    let mut worklist: Vec<&'a Value> = vec![root];

    while let Some(node) = worklist.pop() {
        if !visited.insert(node as *const Value) {
            continue;
        }

        match node {
            Value::Object(obj) => {
                if let Some(target) = resolve_ref(obj, references) {
                    worklist.push(target);
                    continue;
                }

                if predicate(obj) {
                    return Some(node);
                }

                // 스택이므로 역순으로 넣고, details는 마지막에 넣어 먼저 꺼냄
                let children: Vec<&Value> = obj
                    .iter()
                    .filter(|(key, value)| key.as_str() != DETAILS_KEY && is_container(value))
                    .map(|(_, value)| value)
                    .collect();
                worklist.extend(children.into_iter().rev());
                if let Some(details) = obj.get(DETAILS_KEY).filter(|v| is_container(v)) {
                    worklist.push(details);
                }
            }
            Value::Array(items) => {
                worklist.extend(items.iter().filter(|v| is_container(v)).rev());
            }
            _ => {}
        }
    }

    None
}

fn resolve_ref<'a>(
    obj: &'a Map<String, Value>,
    references: Option<&'a Map<String, Value>>,
) -> Option<&'a Value> {
    let references = references?;
    if obj.len() != 1 {
        return None;
    }
    let key = obj.get(REF_KEY)?.as_str()?;
    references.get(key)
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

// ============================================================================
// Path access
// ============================================================================

/// 점 표기 경로로 값 조회 (`"author.0.name"`)
pub fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(obj) => obj.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// 경로의 값을 문자열로 조회
///
/// 숫자와 불리언은 문자열로 바꾸고, 빈 문자열과 그 밖의 타입은 `None`입니다.
pub fn json_str(value: &Value, path: &str) -> Option<String> {
    scalar_to_string(json_path(value, path)?)
}

/// 스칼라 값을 문자열로 변환
pub fn scalar_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Tests
// ============================================================================

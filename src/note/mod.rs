//! 노트 모듈 - 템플릿 치환과 노트 파일 생성
//!
//! 템플릿의 `{{field}}` 자리표시자를 `BookRecord` 값으로 바꾸고, 볼트 안의
//! 폴더에 겹치지 않는 이름으로 마크다운 파일을 만듭니다.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::book::BookRecord;
use crate::extract::{decode_entities, normalize_whitespace};

/// 기본 노트 템플릿 (YAML frontmatter)
pub const DEFAULT_TEMPLATE: &str = r#"---
title: "{{title}}"
author: "{{author}}"
translator: "{{translator}}"
pages: "{{pages}}"
cover: "{{cover}}"
publisher: "{{publisher}}"
datePublished: "{{datePublished}}"
language: "{{language}}"
isbn: "{{isbn}}"
url: "{{url}}"
description: "{{description}}"
summary: "{{summary}}"
tags: "book"
---
"#;

/// 파일 이름에 쓸 수 없는 문자
const ILLEGAL_FILE_CHARS: [char; 13] =
    ['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// 이름이 비었을 때 쓰는 파일 이름
const FALLBACK_NAME: &str = "Untitled";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z]+)\s*\}\}").expect("valid placeholder regex"));

// ============================================================================
// Rendering
// ============================================================================

/// 템플릿 치환
///
/// 알 수 없는 자리표시자는 그대로 둡니다. 치환된 값은 다시 검사하지 않습니다.
pub fn render(template: &str, record: &BookRecord) -> String {
    let fields = record.fields();

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            fields
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| escape_value(value))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// 큰따옴표 YAML 문자열 안에 넣을 수 있도록 이스케이프
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 제목으로 파일 이름 만들기 (확장자 제외)
pub fn note_file_name(title: &str) -> String {
    let decoded = decode_entities(title);
    let cleaned: String = decoded
        .chars()
        .map(|c| if ILLEGAL_FILE_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    let name = normalize_whitespace(&cleaned);
    let name = name.trim_matches('.').trim();

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

// ============================================================================
// NoteWriter
// ============================================================================

/// 볼트에 노트 파일을 쓰는 작성기
pub struct NoteWriter {
    vault: PathBuf,
    folder: String,
}

impl NoteWriter {
    pub fn new(vault: impl Into<PathBuf>, folder: impl Into<String>) -> Self {
        Self {
            vault: vault.into(),
            folder: folder.into(),
        }
    }

    /// 노트가 저장될 폴더
    pub fn target_dir(&self) -> PathBuf {
        let folder = self.folder.trim().trim_matches('/');
        if folder.is_empty() {
            self.vault.clone()
        } else {
            self.vault.join(folder)
        }
    }

    /// 노트 작성
    ///
    /// 같은 이름의 파일이 있으면 `<이름> 1.md`, `<이름> 2.md` 순서로
    /// 비어 있는 이름을 찾습니다.
    pub fn write(&self, record: &BookRecord, template: &str) -> Result<PathBuf> {
        let dir = self.target_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("폴더 생성 실패: {}", dir.display()))?;

        let content = render(template, record);
        let base = note_file_name(&record.title);

        for n in 0u32.. {
            let path = candidate_path(&dir, &base, n);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())
                        .with_context(|| format!("노트 쓰기 실패: {}", path.display()))?;
                    tracing::info!("노트 작성: {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("노트 생성 실패: {}", path.display()))
                }
            }
        }

        anyhow::bail!("사용 가능한 파일 이름이 없습니다: {}", dir.display())
    }
}

fn candidate_path(dir: &Path, base: &str, n: u32) -> PathBuf {
    if n == 0 {
        dir.join(format!("{}.md", base))
    } else {
        dir.join(format!("{} {}.md", base, n))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> BookRecord {
        BookRecord {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            pages: "412".to_string(),
            isbn: "9780441172719".to_string(),
            url: "https://www.goodreads.com/book/show/44767458-dune".to_string(),
            description: "He said \"spice\"\nC:\\path\r\tend".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_default_template_resolves_every_field() {
        let rendered = render(DEFAULT_TEMPLATE, &sample());

        assert!(!rendered.contains("{{"), "{}", rendered);
        assert!(rendered.contains(r#"title: "Dune""#));
        assert!(rendered.contains(r#"translator: """#));
        assert!(rendered.contains(r#"summary: """#));
        assert!(rendered.contains(r#"description: "He said \"spice\"\nC:\\path\tend""#));
    }

    #[test]
    fn test_render_keeps_unknown_tokens() {
        let rendered = render("{{ title }} / {{rating}}", &sample());
        assert_eq!(rendered, "Dune / {{rating}}");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let record = BookRecord::new("{{author}}", "");
        let rendered = render("{{title}}|{{author}}", &record);
        assert_eq!(rendered, "{{author}}|");
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_value(r"a\b"), r"a\\b");
        assert_eq!(escape_value("a\r\nb"), r"a\nb");
        assert_eq!(escape_value("plain"), "plain");
    }

    #[test]
    fn test_note_file_name() {
        assert_eq!(note_file_name("Dune: Deluxe Edition"), "Dune Deluxe Edition");
        assert_eq!(note_file_name("Tom &amp; Jerry / Vol. 1"), "Tom & Jerry Vol. 1");
        assert_eq!(note_file_name("What? [Part #2]"), "What Part 2");
        assert_eq!(note_file_name(" ::: "), "Untitled");
        assert_eq!(note_file_name(""), "Untitled");
    }

    #[test]
    fn test_write_picks_unique_names() {
        let vault = TempDir::new().expect("temp dir");
        let writer = NoteWriter::new(vault.path(), "Books");

        let first = writer.write(&sample(), DEFAULT_TEMPLATE).expect("first");
        let second = writer.write(&sample(), DEFAULT_TEMPLATE).expect("second");
        let third = writer.write(&sample(), DEFAULT_TEMPLATE).expect("third");

        assert_eq!(first, vault.path().join("Books").join("Dune.md"));
        assert_eq!(second, vault.path().join("Books").join("Dune 1.md"));
        assert_eq!(third, vault.path().join("Books").join("Dune 2.md"));

        let content = fs::read_to_string(&first).expect("read");
        assert!(content.starts_with("---\ntitle: \"Dune\""));
    }

    #[test]
    fn test_empty_folder_writes_to_vault_root() {
        let vault = TempDir::new().expect("temp dir");
        let writer = NoteWriter::new(vault.path(), "");
        assert_eq!(writer.target_dir(), vault.path());
    }
}

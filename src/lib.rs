//! booknote - 도서 페이지에서 서지 노트 만들기
//!
//! Goodreads, Amazon, Taaghche, Fidibo 도서 페이지에서 서지 정보를 추출하고
//! 외부 카탈로그 요약을 붙여 템플릿 기반 마크다운 노트로 기록합니다.

pub mod book;
pub mod cli;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod lookup;
pub mod note;
pub mod router;
pub mod sites;
pub mod structured;
pub mod summary;

// Re-exports
pub use book::{BookRecord, LookupError};
pub use config::{get_config_dir, Settings};
pub use fetcher::{FetchResponse, HttpFetch, PageFetcher};
pub use lookup::BookLookup;
pub use note::{note_file_name, render, NoteWriter, DEFAULT_TEMPLATE};
pub use router::{identify, SiteId};
pub use sites::{extract, SiteAdapter};
pub use summary::{SummaryEndpoints, SummaryResolver};

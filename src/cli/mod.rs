//! CLI 모듈
//!
//! booknote CLI 명령어 정의 및 구현

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::book::{BookRecord, LookupError};
use crate::config::Settings;
use crate::fetcher::{HttpFetch, PageFetcher, DEFAULT_USER_AGENT};
use crate::lookup::BookLookup;
use crate::note::{render, NoteWriter};
use crate::router::{identify, SiteId};
use crate::summary::SummaryResolver;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "booknote")]
#[command(version, about = "도서 페이지 URL로 서지 노트 만들기", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 도서 정보를 가져와 노트 작성
    Fetch {
        /// 도서 페이지 URL (Goodreads, Amazon, Taaghche, Fidibo)
        url: String,

        /// URL 판별 대신 사용할 사이트 (goodreads, amazon, taaghche, fidibo)
        #[arg(long)]
        site: Option<SiteId>,

        /// 노트 볼트 경로
        #[arg(long)]
        vault: Option<PathBuf>,

        /// 볼트 안의 노트 폴더
        #[arg(long)]
        folder: Option<String>,

        /// 노트 템플릿 파일
        #[arg(long)]
        template: Option<PathBuf>,

        /// 외부 카탈로그 요약 조회 건너뛰기
        #[arg(long)]
        no_summary: bool,

        /// 노트 대신 레코드를 JSON으로 출력
        #[arg(long)]
        json: bool,

        /// 파일을 만들지 않고 렌더링 결과만 출력
        #[arg(long)]
        dry_run: bool,
    },

    /// URL이 어느 사이트인지 확인
    Detect {
        /// 확인할 URL
        url: String,
    },

    /// 설정 확인
    Config {
        /// 기본 설정 파일 생성
        #[arg(long)]
        init: bool,
    },
}

/// `fetch` 명령어의 설정 덮어쓰기 플래그
#[derive(Debug, Default)]
struct FetchFlags {
    vault: Option<PathBuf>,
    folder: Option<String>,
    template: Option<PathBuf>,
    no_summary: bool,
}

impl FetchFlags {
    fn apply(self, settings: &mut Settings) {
        if let Some(vault) = self.vault {
            settings.vault_dir = vault;
        }
        if let Some(folder) = self.folder {
            settings.folder = folder;
        }
        if let Some(template) = self.template {
            settings.template_file = Some(template);
        }
        if self.no_summary {
            settings.fetch_summary = false;
        }
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fetch {
            url,
            site,
            vault,
            folder,
            template,
            no_summary,
            json,
            dry_run,
        } => {
            let flags = FetchFlags {
                vault,
                folder,
                template,
                no_summary,
            };
            cmd_fetch(&url, site, flags, json, dry_run).await
        }
        Commands::Detect { url } => cmd_detect(&url),
        Commands::Config { init } => cmd_config(init),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 가져오기 명령어 (fetch)
///
/// 페이지에서 서지 정보를 추출하고 요약을 보강한 뒤 노트를 작성합니다.
async fn cmd_fetch(
    url: &str,
    site: Option<SiteId>,
    flags: FetchFlags,
    json: bool,
    dry_run: bool,
) -> Result<()> {
    let mut settings = Settings::load();
    flags.apply(&mut settings);

    let fetcher: Arc<dyn HttpFetch> = Arc::new(
        PageFetcher::with_user_agent(&settings.user_agent).context("HTTP 클라이언트 초기화 실패")?,
    );

    let mut lookup = BookLookup::new(fetcher.clone());
    if settings.fetch_summary {
        lookup = lookup.with_summaries(SummaryResolver::new(fetcher));
    }

    println!("[*] 도서 정보 가져오는 중: {}", url);
    let record = match site {
        Some(site) => lookup.lookup_as(site, url).await?,
        None => lookup.lookup(url).await?,
    };

    if json {
        let out = serde_json::to_string_pretty(&record).context("JSON 직렬화 실패")?;
        println!("{}", out);
        return Ok(());
    }

    print_record(&record);

    let template = settings.template()?;
    if dry_run {
        println!("\n{}", render(&template, &record));
        return Ok(());
    }

    let writer = NoteWriter::new(&settings.vault_dir, settings.folder.as_str());
    let path = writer.write(&record, &template).context("노트 작성 실패")?;

    println!("\n[OK] 노트가 생성되었습니다");
    println!("     경로: {}", path.display());

    Ok(())
}

/// 판별 명령어 (detect)
fn cmd_detect(url: &str) -> Result<()> {
    let site = identify(url).ok_or_else(|| LookupError::UnsupportedSource(url.to_string()))?;
    println!("[OK] {}", site);
    Ok(())
}

/// 설정 명령어 (config)
///
/// `--init`이면 기본 설정 파일을 만들고, 현재 적용되는 설정을 출력합니다.
fn cmd_config(init: bool) -> Result<()> {
    let path = Settings::default_path();

    if init {
        if path.exists() {
            println!("[!] 설정 파일이 이미 있습니다: {}", path.display());
        } else {
            Settings::default().save_to(&path)?;
            println!("[OK] 설정 파일 생성: {}", path.display());
        }
        println!();
    }

    let settings = Settings::load();
    let template = settings
        .template_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(기본 템플릿)".to_string());
    let user_agent = if settings.user_agent.is_empty() {
        DEFAULT_USER_AGENT
    } else {
        settings.user_agent.as_str()
    };

    println!("booknote v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("[*] 설정 파일: {}", path.display());
    println!("    볼트: {}", settings.vault_dir.display());
    println!("    폴더: {}", settings.folder);
    println!("    템플릿: {}", template);
    println!("    User-Agent: {}", user_agent);
    println!(
        "    요약 조회: {}",
        if settings.fetch_summary { "사용" } else { "사용 안 함" }
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 레코드 요약 출력 (빈 필드 제외)
fn print_record(record: &BookRecord) {
    println!("[OK] {}", record.title);
    for (name, value) in record.fields().into_iter().skip(1) {
        if !value.is_empty() {
            println!("     {:<14} {}", name, truncate_text(value, 60));
        }
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

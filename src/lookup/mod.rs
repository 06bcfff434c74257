//! 도서 조회 파이프라인
//!
//! URL 판별 → 페이지 요청 → 사이트별 추출 → 요약 보강 순서로 진행합니다.
//! 요약 단계는 실패해도 레코드를 돌려주며, 앞의 세 단계만 에러가 됩니다.

use std::sync::Arc;

use crate::book::{BookRecord, LookupError};
use crate::fetcher::HttpFetch;
use crate::router::{identify, SiteId};
use crate::sites;
use crate::summary::SummaryResolver;

/// 도서 조회기
pub struct BookLookup {
    fetcher: Arc<dyn HttpFetch>,
    summaries: Option<SummaryResolver>,
}

impl BookLookup {
    /// 요약 조회 없이 생성
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            summaries: None,
        }
    }

    /// 요약 조회기 연결
    pub fn with_summaries(mut self, resolver: SummaryResolver) -> Self {
        self.summaries = Some(resolver);
        self
    }

    /// URL에서 도서 레코드 조회
    pub async fn lookup(&self, url: &str) -> Result<BookRecord, LookupError> {
        let url = url.trim();
        let site = identify(url).ok_or_else(|| LookupError::UnsupportedSource(url.to_string()))?;
        self.lookup_as(site, url).await
    }

    /// 사이트를 지정하여 조회 (URL 판별 생략)
    pub async fn lookup_as(&self, site: SiteId, url: &str) -> Result<BookRecord, LookupError> {
        let url = url.trim();
        tracing::info!("{} 페이지 요청: {}", site, url);
        let response = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| LookupError::Fetch {
                url: url.to_string(),
                message: format!("{:#}", e),
            })?;

        if !response.is_success() {
            return Err(LookupError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", response.status),
            });
        }

        // Html은 Send가 아니므로 await 이전에 추출을 끝냄
        let mut record =
            sites::extract(site, &response.body, url).ok_or(LookupError::ExtractionMiss { site })?;
        tracing::info!("추출 완료: {}", record.title);

        if let Some(resolver) = &self.summaries {
            let isbn = (!record.isbn.is_empty()).then_some(record.isbn.as_str());
            record.summary = resolver.resolve(&record.title, &record.author, isbn).await;
        }

        Ok(record)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::fetcher::FetchResponse;
    use crate::summary::SummaryEndpoints;

    const BOOK_URL: &str = "https://www.goodreads.com/book/show/44767458-dune";

    const BOOK_PAGE: &str = r#"
        <html><head>
        <script type="application/ld+json">
        {"@type": "Book", "name": "Dune", "author": [{"name": "Frank Herbert"}], "isbn": "9780441172719"}
        </script>
        </head><body></body></html>
    "#;

    enum Reply {
        Page(u16, String),
        Refused,
    }

    /// URL 조각별로 응답을 돌려주는 가짜 클라이언트
    struct FakeFetcher {
        routes: Vec<(&'static str, Reply)>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(routes: Vec<(&'static str, Reply)>) -> Arc<Self> {
            Arc::new(Self {
                routes,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl HttpFetch for FakeFetcher {
        async fn get(&self, url: &str) -> Result<FetchResponse> {
            self.calls.lock().expect("lock").push(url.to_string());

            match self.routes.iter().find(|(fragment, _)| url.contains(fragment)) {
                Some((_, Reply::Page(status, body))) => Ok(FetchResponse {
                    status: *status,
                    url: url.to_string(),
                    body: body.clone(),
                }),
                Some((_, Reply::Refused)) => anyhow::bail!("connection refused"),
                None => Ok(FetchResponse {
                    status: 404,
                    url: url.to_string(),
                    body: String::new(),
                }),
            }
        }
    }

    fn endpoints() -> SummaryEndpoints {
        SummaryEndpoints {
            primary: "https://books.test/v1".to_string(),
            secondary: "https://ol.test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unsupported_url_is_rejected_without_fetching() {
        let fake = FakeFetcher::new(Vec::new());
        let lookup = BookLookup::new(fake.clone());

        let err = lookup.lookup("https://example.com/book/1").await.expect_err("unsupported");
        assert!(matches!(err, LookupError::UnsupportedSource(_)));
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures() {
        let fake = FakeFetcher::new(vec![
            ("/book/show/1", Reply::Page(503, String::new())),
            ("/book/show/2", Reply::Refused),
        ]);
        let lookup = BookLookup::new(fake);

        let err = lookup
            .lookup("https://www.goodreads.com/book/show/1")
            .await
            .expect_err("503");
        assert!(matches!(err, LookupError::Fetch { ref message, .. } if message == "HTTP 503"));

        let err = lookup
            .lookup("https://www.goodreads.com/book/show/2")
            .await
            .expect_err("refused");
        assert!(matches!(err, LookupError::Fetch { ref message, .. } if message.contains("refused")));
    }

    #[tokio::test]
    async fn test_page_without_book_data_is_extraction_miss() {
        let fake = FakeFetcher::new(vec![(
            "taaghche.com",
            Reply::Page(200, "<html><body><h1>x</h1></body></html>".to_string()),
        )]);
        let lookup = BookLookup::new(fake);

        let err = lookup
            .lookup("https://taaghche.com/book/12345")
            .await
            .expect_err("miss");
        assert!(matches!(err, LookupError::ExtractionMiss { site: SiteId::Taaghche }));
    }

    #[tokio::test]
    async fn test_forced_site_skips_url_check() {
        let fake = FakeFetcher::new(vec![("mirror.test", Reply::Page(200, BOOK_PAGE.to_string()))]);
        let lookup = BookLookup::new(fake);

        let record = lookup
            .lookup_as(SiteId::Goodreads, "https://mirror.test/dune")
            .await
            .expect("record");
        assert_eq!(record.title, "Dune");
        assert_eq!(record.url, "https://mirror.test/dune");
    }

    #[tokio::test]
    async fn test_lookup_without_summaries() {
        let fake = FakeFetcher::new(vec![("goodreads.com", Reply::Page(200, BOOK_PAGE.to_string()))]);
        let lookup = BookLookup::new(fake.clone());

        let record = lookup.lookup(BOOK_URL).await.expect("record");
        assert_eq!(record.title, "Dune");
        assert_eq!(record.author, "Frank Herbert");
        assert_eq!(record.summary, "");
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_attaches_summary() {
        let summary = "A stunning blend of adventure and mysticism, environmentalism and politics.";
        let fake = FakeFetcher::new(vec![
            ("goodreads.com", Reply::Page(200, BOOK_PAGE.to_string())),
            (
                "q=isbn%3A9780441172719",
                Reply::Page(
                    200,
                    serde_json::json!({"items": [{"id": "a", "volumeInfo": {"description": summary}}]})
                        .to_string(),
                ),
            ),
        ]);
        let lookup = BookLookup::new(fake.clone())
            .with_summaries(SummaryResolver::with_endpoints(fake.clone(), endpoints()));

        let record = lookup.lookup(BOOK_URL).await.expect("record");
        assert_eq!(record.isbn, "9780441172719");
        assert_eq!(record.summary, summary);
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn test_summary_failure_still_returns_record() {
        let fake = FakeFetcher::new(vec![
            ("goodreads.com", Reply::Page(200, BOOK_PAGE.to_string())),
            ("books.test", Reply::Refused),
            ("ol.test", Reply::Page(500, String::new())),
        ]);
        let lookup = BookLookup::new(fake.clone())
            .with_summaries(SummaryResolver::with_endpoints(fake.clone(), endpoints()));

        let record = lookup.lookup(BOOK_URL).await.expect("record");
        assert_eq!(record.title, "Dune");
        assert_eq!(record.summary, "");
    }
}

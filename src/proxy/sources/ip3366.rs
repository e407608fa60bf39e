//! ip3366 free-proxy listings. The site only keeps ten pages per category.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{PageWalker, PagedSource, SourceOptions, SourceSink};

const START_URL: &str = "http://www.ip3366.net/?stype=1";
const MAX_PAGES: usize = 10;

pub fn source(timeout_secs: u64, interval_secs: u64) -> PagedSource<Walker> {
    PagedSource::new(
        "ip3366",
        SourceOptions::new(timeout_secs, interval_secs, 0),
        Walker,
    )
}

pub struct Walker;

#[async_trait]
impl PageWalker for Walker {
    async fn walk(&self, sink: SourceSink) {
        let mut page = 1usize;
        while page <= MAX_PAGES {
            if sink.cancelled() {
                return;
            }
            let url = format!("{START_URL}&page={page}");
            let html = match fetch_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("ip3366: fetch {url} failed: {e}");
                    if !sink.retry_gap().await {
                        return;
                    }
                    continue;
                }
            };

            let rows = parse_rows(&html);
            if rows.is_empty() {
                return;
            }
            for candidate in rows {
                if !sink.emit(candidate).await {
                    return;
                }
            }

            if !sink.page_gap().await {
                return;
            }
            page += 1;
        }
    }
}

fn parse_rows(html: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(td_sel)) = (
        Selector::parse("table.table-bordered tbody tr"),
        Selector::parse("td"),
    ) else {
        return rows;
    };

    for row in document.select(&row_sel) {
        let tds: Vec<String> = row
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        // ip, port, anonymity, type, location, speed, checked, verified
        if tds.len() >= 8 {
            rows.push(format!("{}://{}:{}", tds[3].to_lowercase(), tds[0], tds[1]));
        }
    }
    rows
}

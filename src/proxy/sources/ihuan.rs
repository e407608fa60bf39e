//! ihuan free-proxy listings. Pages are linked through a pagination bar
//! whose hrefs are opaque tokens, so the walker accumulates a {page label →
//! href} map as it goes and follows it to the next page.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{PageWalker, PagedSource, SourceOptions, SourceSink};

const START_URL: &str = "https://ip.ihuan.me/";

pub fn source(timeout_secs: u64, interval_secs: u64, max_count: usize) -> PagedSource<Walker> {
    PagedSource::new(
        "ihuan",
        SourceOptions::new(timeout_secs, interval_secs, max_count),
        Walker,
    )
}

pub struct Walker;

#[async_trait]
impl PageWalker for Walker {
    async fn walk(&self, sink: SourceSink) {
        let mut pagemap: HashMap<String, String> = HashMap::new();
        let mut page = 1usize;
        let mut url = START_URL.to_string();

        loop {
            if sink.cancelled() {
                return;
            }
            let html = match fetch_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("ihuan: fetch {url} failed: {e}");
                    if !sink.retry_gap().await {
                        return;
                    }
                    continue;
                }
            };

            let parsed = parse_page(&html);
            if parsed.rows.is_empty() {
                return; // table gone: shape changed or listing exhausted
            }
            for candidate in parsed.rows {
                if !sink.emit(candidate).await {
                    return;
                }
            }
            if parsed.links.is_empty() {
                return; // no pagination bar, nothing further to follow
            }

            pagemap.extend(parsed.links);
            // the current page's own link is useless from here on
            pagemap.remove(&page.to_string());

            if !sink.page_gap().await {
                return;
            }
            page += 1;
            let Some(href) = pagemap.get(&page.to_string()) else {
                return; // past the last linked page
            };
            url = format!("{START_URL}{href}");
        }
    }
}

struct ParsedPage {
    rows: Vec<String>,
    links: HashMap<String, String>,
}

fn parse_page(html: &str) -> ParsedPage {
    let mut parsed = ParsedPage {
        rows: Vec::new(),
        links: HashMap::new(),
    };
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(td_sel), Ok(link_sel)) = (
        Selector::parse("table.table-hover tbody tr"),
        Selector::parse("td"),
        Selector::parse("ul.pagination li a"),
    ) else {
        return parsed;
    };

    for row in document.select(&row_sel) {
        let tds: Vec<String> = row
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        // ip, port, location, isp, https, anonymity, ... — "支持" marks
        // CONNECT-capable endpoints
        if tds.len() >= 10 {
            let scheme = if tds[4] == "支持" { "https" } else { "http" };
            parsed.rows.push(format!("{}://{}:{}", scheme, tds[0], tds[1]));
        }
    }

    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let label = link.text().collect::<String>().trim().to_string();
        if !label.is_empty() {
            parsed.links.insert(label, href.to_string());
        }
    }

    parsed
}

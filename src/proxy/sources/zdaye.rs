//! zdaye free-proxy listings. The site publishes one thread of proxies per
//! day, so the walker first resolves the newest thread from the current
//! month's index, then pages through that thread.

use async_trait::async_trait;
use chrono::Datelike;
use scraper::{Html, Selector};
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{PageWalker, PagedSource, SourceOptions, SourceSink};

const START_URL: &str = "https://www.zdaye.com";

pub fn source(timeout_secs: u64, interval_secs: u64) -> PagedSource<Walker> {
    PagedSource::new(
        "zdaye",
        SourceOptions::new(timeout_secs, interval_secs, 0),
        Walker,
    )
}

pub struct Walker;

#[async_trait]
impl PageWalker for Walker {
    async fn walk(&self, sink: SourceSink) {
        let now = chrono::Local::now();
        let index_url = format!("{START_URL}/dayProxy/{}/{}/1.html", now.year(), now.month());

        let day_path = loop {
            if sink.cancelled() {
                return;
            }
            let html = match fetch_page(&index_url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("zdaye: fetch {index_url} failed: {e}");
                    if !sink.retry_gap().await {
                        return;
                    }
                    continue;
                }
            };
            match parse_day_path(&html) {
                Some(path) => break path,
                None => {
                    warn!("zdaye: no thread on the month index, abandoning source");
                    return;
                }
            }
        };

        let mut page = 1usize;
        loop {
            if sink.cancelled() {
                return;
            }
            let url = format!("{START_URL}{day_path}/{page}.html");
            let html = match fetch_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("zdaye: fetch {url} failed: {e}");
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

/// Href of the newest day thread, minus its `.html` suffix so page numbers
/// can be appended.
fn parse_day_path(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("h3.thread_title a").ok()?;
    let link = document.select(&link_sel).next()?;
    let href = link.value().attr("href")?;
    if href.is_empty() {
        return None;
    }
    Some(href.strip_suffix(".html").unwrap_or(href).to_string())
}

fn parse_rows(html: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(td_sel)) = (
        Selector::parse("table#ipc tbody tr"),
        Selector::parse("td"),
    ) else {
        return rows;
    };

    for row in document.select(&row_sel) {
        let tds: Vec<String> = row
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        // ip, port, type, anonymity, location
        if tds.len() >= 5 {
            rows.push(format!("{}://{}:{}", tds[2].to_lowercase(), tds[0], tds[1]));
        }
    }
    rows
}

//! kxdaili free-proxy listings: two categories, at most ten pages each.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{PageWalker, PagedSource, SourceOptions, SourceSink};

const START_URL: &str = "http://www.kxdaili.com/dailiip";
const MAX_PAGES: usize = 10;

pub fn source(timeout_secs: u64, interval_secs: u64) -> PagedSource<Walker> {
    PagedSource::new(
        "kxdaili",
        SourceOptions::new(timeout_secs, interval_secs, 0),
        Walker,
    )
}

pub struct Walker;

#[async_trait]
impl PageWalker for Walker {
    async fn walk(&self, sink: SourceSink) {
        for category in 1..=2usize {
            let mut page = 1usize;
            while page <= MAX_PAGES {
                if sink.cancelled() {
                    return;
                }
                let url = format!("{START_URL}/{category}/{page}.html");
                let html = match fetch_page(&url).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("kxdaili: fetch {url} failed: {e}");
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
}

fn parse_rows(html: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(td_sel)) = (
        Selector::parse("table.active tbody tr"),
        Selector::parse("td"),
    ) else {
        return rows;
    };

    for row in document.select(&row_sel) {
        let tds: Vec<String> = row
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if tds.len() >= 7 {
            // The protocol cell reads "HTTP" or "HTTP,HTTPS"; the longer form
            // marks CONNECT-capable endpoints.
            let scheme = if tds[3].len() < 5 { "http" } else { "https" };
            rows.push(format!("{}://{}:{}", scheme, tds[0], tds[1]));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::parse_rows;

    #[test]
    fn protocol_cell_picks_the_scheme() {
        let html = r#"
            <table class="active"><tbody>
              <tr>
                <td>222.74.73.202</td><td>42055</td><td>高匿</td><td>HTTP</td>
                <td>3.0秒</td><td>内蒙古</td><td>今天</td>
              </tr>
              <tr>
                <td>120.25.253.234</td><td>812</td><td>高匿</td><td>HTTP,HTTPS</td>
                <td>1.2秒</td><td>广东</td><td>今天</td>
              </tr>
            </tbody></table>"#;
        assert_eq!(
            parse_rows(html),
            vec![
                "http://222.74.73.202:42055".to_string(),
                "https://120.25.253.234:812".to_string(),
            ]
        );
    }
}

//! yqie free-proxy listing: a single static page, so this source is a
//! stateless single pass with no workers to stop.

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::mpsc;
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{CandidateSource, CHANNEL_DEPTH};

const START_URL: &str = "http://ip.yqie.com/ipproxy.htm";

pub fn source() -> YqieSource {
    YqieSource
}

pub struct YqieSource;

#[async_trait]
impl CandidateSource for YqieSource {
    fn name(&self) -> &'static str {
        "yqie"
    }

    async fn start(&self) -> Option<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::spawn(async move {
            let html = match fetch_page(START_URL).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("yqie: fetch failed: {e}");
                    return;
                }
            };
            for candidate in parse_rows(&html) {
                if tx.send(candidate).await.is_err() {
                    return;
                }
            }
        });
        Some(rx)
    }
}

fn parse_rows(html: &str) -> Vec<String> {
    let mut rows = Vec::new();
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(td_sel)) = (
        Selector::parse("table#GridViewOrder tr"),
        Selector::parse("td"),
    ) else {
        return rows;
    };

    for row in document.select(&row_sel) {
        let tds: Vec<String> = row
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if tds.len() >= 6 {
            rows.push(format!("{}://{}:{}", tds[4].to_lowercase(), tds[0], tds[1]));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::parse_rows;

    #[test]
    fn parses_grid_rows() {
        let html = r#"
            <table id="GridViewOrder">
              <tr><th>IP</th><th>端口</th><th>位置</th><th>匿名</th><th>类型</th><th>验证</th></tr>
              <tr>
                <td>47.106.105.236</td><td>80</td><td>广东</td><td>高匿</td>
                <td>HTTP</td><td>今天</td>
              </tr>
            </table>"#;
        assert_eq!(parse_rows(html), vec!["http://47.106.105.236:80".to_string()]);
    }
}

//! kuaidaili free-proxy listings: two categories (high-anonymity and
//! transparent), paged until the site answers "Invalid Page".

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::warn;

use super::fetch_page;
use crate::proxy::source::{PageWalker, PagedSource, SourceOptions, SourceSink};

const START_URL: &str = "https://www.kuaidaili.com/free/";

pub fn source(timeout_secs: u64, interval_secs: u64, max_count: usize) -> PagedSource<Walker> {
    PagedSource::new(
        "kuaidaili",
        SourceOptions::new(timeout_secs, interval_secs, max_count),
        Walker,
    )
}

pub struct Walker;

#[async_trait]
impl PageWalker for Walker {
    async fn walk(&self, sink: SourceSink) {
        let lists = [
            format!("{START_URL}inha/"),
            format!("{START_URL}intr/"),
        ];

        for list in &lists {
            let mut page = 1usize;
            loop {
                if sink.cancelled() {
                    return;
                }
                let url = format!("{list}{page}/");
                let html = match fetch_page(&url).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("kuaidaili: fetch {url} failed: {e}");
                        if !sink.retry_gap().await {
                            return;
                        }
                        continue;
                    }
                };
                if html.contains("Invalid Page") {
                    break; // past the last page of this list
                }

                let rows = parse_rows(&html);
                if rows.is_empty() {
                    warn!("kuaidaili: no proxy table at {url}, abandoning source");
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
    let (Ok(row_sel), Ok(ip_sel), Ok(port_sel), Ok(typ_sel)) = (
        Selector::parse("table.table-bordered tbody tr"),
        Selector::parse(r#"td[data-title="IP"]"#),
        Selector::parse(r#"td[data-title="PORT"]"#),
        Selector::parse(r#"td[data-title="类型"]"#),
    ) else {
        return rows;
    };

    for row in document.select(&row_sel) {
        let cell = |sel: &Selector| {
            row.select(sel)
                .next()
                .map(|td| td.text().collect::<String>().trim().to_string())
        };
        let (Some(ip), Some(port), Some(typ)) =
            (cell(&ip_sel), cell(&port_sel), cell(&typ_sel))
        else {
            continue;
        };
        rows.push(format!("{}://{}:{}", typ.to_lowercase(), ip, port));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::parse_rows;

    const SAMPLE: &str = r#"
        <table class="table table-bordered table-striped"><tbody>
          <tr>
            <td data-title="IP">58.20.232.245</td>
            <td data-title="PORT">9091</td>
            <td data-title="类型">HTTP</td>
          </tr>
          <tr>
            <td data-title="IP">117.74.65.215</td>
            <td data-title="PORT">443</td>
            <td data-title="类型">HTTPS</td>
          </tr>
        </tbody></table>"#;

    #[test]
    fn parses_listing_rows() {
        let rows = parse_rows(SAMPLE);
        assert_eq!(
            rows,
            vec![
                "http://58.20.232.245:9091".to_string(),
                "https://117.74.65.215:443".to_string(),
            ]
        );
    }

    #[test]
    fn missing_table_yields_nothing() {
        assert!(parse_rows("<html><body>nothing here</body></html>").is_empty());
    }
}

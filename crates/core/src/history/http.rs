use crate::config::Settings;
use crate::domain::price::PriceSeries;
use crate::history::types::parse_price_history;
use crate::history::{Lookback, PriceClient};
use crate::html;
use anyhow::{Context, Result};

/// Price client for the portfolio site. Requests are issued once; a failed request
/// is reported to the caller as is.
#[derive(Debug, Clone)]
pub struct HttpPriceClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPriceClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = crate::net::build_client(settings)?;
        Ok(Self::new(http, &settings.base_url))
    }

    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn history_url(&self, api_route: &str, id: &str, lookback: Lookback) -> String {
        self.url(&format!("{api_route}/{id}/{}", lookback.days()))
    }

    pub fn page_url(&self, site_route: &str, ticker: &str) -> String {
        self.url(&format!("{site_route}/{}/", ticker.to_lowercase()))
    }
}

#[async_trait::async_trait]
impl PriceClient for HttpPriceClient {
    async fn resolve_id(&self, ticker: &str, site_route: &str, attribute: &str) -> Result<String> {
        let url = self.page_url(site_route, ticker);
        let page = crate::net::get_text(&self.http, &url).await?;
        let id = scrape_attribute(&page, attribute)
            .with_context(|| format!("no element with {attribute} on {url}"))?;
        tracing::debug!(%ticker, %id, "resolved internal id");
        Ok(id)
    }

    async fn fetch_history(
        &self,
        api_route: &str,
        id: &str,
        lookback: Lookback,
    ) -> Result<PriceSeries> {
        let url = self.history_url(api_route, id, lookback);
        let text = crate::net::get_text(&self.http, &url).await?;
        parse_price_history(&text).with_context(|| format!("bad price history from {url}"))
    }
}

/// Value of `attribute` on the first element carrying it, if non-blank.
pub fn scrape_attribute(page: &str, attribute: &str) -> Option<String> {
    html::find_by_attr(page, attribute)
        .and_then(|el| el.attr(attribute))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpPriceClient {
        HttpPriceClient::new(reqwest::Client::new(), "https://statusinvest.com.br/")
    }

    #[test]
    fn builds_endpoint_urls() {
        let c = client();
        assert_eq!(
            c.history_url("api/cotacoes/acao/chart", "itsa4", Lookback::Days180),
            "https://statusinvest.com.br/api/cotacoes/acao/chart/itsa4/180"
        );
        assert_eq!(
            c.page_url("fiis", "HGLG11"),
            "https://statusinvest.com.br/fiis/hglg11/"
        );
    }

    #[test]
    fn scrapes_first_attribute_value() {
        let page = r#"<html><body><div class="top"><span>HGLG11</span></div>
            <div id="main-2" data-company-id="584" data-company-name="CSHG"></div>
            <div data-company-id="999"></div></body></html>"#;
        assert_eq!(scrape_attribute(page, "data-company-id").as_deref(), Some("584"));
        assert_eq!(scrape_attribute(page, "data-missing"), None);
        assert_eq!(scrape_attribute(r#"<i data-company-id=" "></i>"#, "data-company-id"), None);
    }
}

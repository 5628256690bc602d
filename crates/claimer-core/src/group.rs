//! Sale and collection pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::AppError;
use crate::models::Harvest;
use crate::throttle::Pacer;
use crate::traits::Fetcher;

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

static ENDED: LazyLock<Selector> = LazyLock::new(|| parse_selector!("div.not_active_notification"));
static CELL: LazyLock<Selector> = LazyLock::new(|| parse_selector!("div.game_cell"));
static CELL_LINK: LazyLock<Selector> = LazyLock::new(|| parse_selector!("a[href]"));
static CONNECTED: LazyLock<Selector> = LazyLock::new(|| parse_selector!("div.blurb_outer"));

/// Harvest listing links from one rendered group page.
///
/// A page carrying an "ended" notice yields nothing. A cell carrying a blurb
/// is tied to another sale or collection and also lands in `more`.
pub fn extract_group_page(html: &str) -> Harvest {
    let doc = Html::parse_document(html);
    let mut harvest = Harvest::default();

    if doc.select(&ENDED).next().is_some() {
        tracing::info!("Sale ended");
        return harvest;
    }

    for cell in doc.select(&CELL) {
        let Some(href) = cell
            .select(&CELL_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            tracing::debug!("Skipping listing cell without a link");
            continue;
        };
        harvest.listings.insert(href.to_string());
        if cell.select(&CONNECTED).next().is_some() {
            harvest.more.insert(href.to_string());
        }
    }
    harvest
}

/// Crawls sale and collection pages through a [`Fetcher`].
#[derive(Clone)]
pub struct GroupCrawler<F: Fetcher> {
    fetcher: F,
    pacer: Pacer,
    page_cap: Option<u32>,
}

impl<F: Fetcher> GroupCrawler<F> {
    pub fn new(fetcher: F, pacer: Pacer) -> Self {
        Self {
            fetcher,
            pacer,
            page_cap: None,
        }
    }

    /// Stop a collection crawl after this many pages.
    pub fn with_page_cap(mut self, page_cap: Option<u32>) -> Self {
        self.page_cap = page_cap;
        self
    }

    /// Fetch a group and accumulate its listings.
    ///
    /// A sale is a single page. A collection is fetched page by page from 1
    /// until the server answers 404 or the page cap is reached. Any other
    /// failure aborts the crawl.
    pub async fn crawl(
        &self,
        group_url: &str,
        is_sale: bool,
        cancel: &CancellationToken,
    ) -> Result<Harvest, AppError> {
        let max_page = if is_sale { Some(1) } else { self.page_cap };
        let mut harvest = Harvest::default();
        let mut page: u32 = 1;

        while max_page.is_none_or(|max| page <= max) {
            let url = if is_sale {
                group_url.to_string()
            } else {
                page_url(group_url, page)?
            };
            tracing::info!(%page, "Getting page");

            let body = match self.fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(AppError::NotFound(_)) => break,
                Err(e) => return Err(e),
            };
            page += 1;
            harvest.merge(extract_group_page(&body));
            self.pacer.pause(cancel).await?;
        }

        tracing::info!(count = harvest.listings.len(), url = %group_url, "Got listings");
        Ok(harvest)
    }
}

fn page_url(group_url: &str, page: u32) -> Result<String, AppError> {
    let mut url =
        Url::parse(group_url).map_err(|_| AppError::UnsupportedSource(group_url.to_string()))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    Ok(url.into())
}

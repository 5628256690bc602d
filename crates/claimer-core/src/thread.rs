//! Discussion threads fetched through their JSON continuation chains.
//!
//! A thread's JSON is a sequence of listings whose children are the root
//! post (`t3`), replies (`t1`), or `more` stubs naming further chains. Each
//! stub child is fetched as `<base>/thread/<id>.json?threaded=false`.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, ParseFailure};
use crate::models::Harvest;
use crate::patterns::SourcePatterns;
use crate::throttle::Pacer;
use crate::traits::Fetcher;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid CSS selector: a[href]"));

#[derive(Deserialize)]
struct Listing {
    kind: String,
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<Thing>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "data")]
enum Thing {
    #[serde(rename = "t3")]
    Post {
        #[serde(default)]
        selftext_html: Option<String>,
    },
    #[serde(rename = "t1")]
    Reply {
        #[serde(default)]
        body_html: Option<String>,
    },
    #[serde(rename = "more")]
    More { children: Vec<String> },
}

/// Extracts listing and group links embedded in a thread's comments.
#[derive(Clone)]
pub struct ThreadCrawler<F: Fetcher> {
    fetcher: F,
    pacer: Pacer,
    patterns: SourcePatterns,
}

impl<F: Fetcher> ThreadCrawler<F> {
    pub fn new(fetcher: F, pacer: Pacer, patterns: SourcePatterns) -> Self {
        Self {
            fetcher,
            pacer,
            patterns,
        }
    }

    /// Visit every reachable chain once and split the linked URLs into
    /// listings (`listings`) and groups (`more`). A URL matching both
    /// patterns lands in both sets.
    pub async fn crawl(
        &self,
        thread_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Harvest, AppError> {
        let base = self.patterns.thread_base(thread_url)?;
        let mut harvest = Harvest::default();
        let mut chains = vec![String::new()];
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(chain) = chains.pop() {
            if !seen.insert(chain.clone()) {
                continue;
            }
            tracing::info!(chain = %chain, "Getting a comment chain");
            let json_url = format!("{base}{chain}.json?threaded=false");
            let body = self.fetcher.fetch(&json_url).await?;

            let (bodies, more) = parse_chain(&json_url, &body)?;
            chains.extend(more.into_iter().map(|id| format!("/thread/{id}")));
            for text in bodies {
                for href in linked_urls(&text) {
                    if self.patterns.is_listing(&href) {
                        harvest.listings.insert(href.clone());
                    }
                    if self.patterns.is_group(&href) {
                        harvest.more.insert(href);
                    }
                }
            }
            self.pacer.pause(cancel).await?;
        }

        tracing::info!(
            listings = harvest.listings.len(),
            groups = harvest.more.len(),
            url = %thread_url,
            "Got thread links"
        );
        Ok(harvest)
    }
}

/// Split one chain response into comment bodies and child chain ids.
fn parse_chain(json_url: &str, body: &str) -> Result<(Vec<String>, Vec<String>), AppError> {
    let malformed =
        |detail: String| AppError::parsing(json_url, ParseFailure::MalformedThread(detail));
    let listings: Vec<Listing> =
        serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;

    let mut bodies = Vec::new();
    let mut more = Vec::new();
    for listing in listings {
        if !listing.kind.eq_ignore_ascii_case("listing") {
            return Err(malformed(format!("unexpected kind {:?}", listing.kind)));
        }
        for child in listing.data.children {
            match child {
                Thing::Post { selftext_html: text } | Thing::Reply { body_html: text } => {
                    if let Some(text) = text.filter(|t| !t.is_empty()) {
                        bodies.push(text);
                    }
                }
                Thing::More { children } => more.extend(children),
            }
        }
    }
    Ok((bodies, more))
}

/// Anchor targets of an entity-escaped HTML fragment.
fn linked_urls(escaped: &str) -> Vec<String> {
    let decoded = html_escape::decode_html_entities(escaped);
    let fragment = Html::parse_fragment(&decoded);
    fragment
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

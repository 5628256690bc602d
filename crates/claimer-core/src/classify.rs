//! Listing classification over a rendered page.
//!
//! The page checks run in a fixed order and every branch ends in either an
//! [`Outcome`] or a [`ParseFailure`] naming the branch that did not match.

use std::time::Duration;

use crate::error::{AppError, ParseFailure};
use crate::models::{Classification, Outcome};
use crate::patterns::SourcePatterns;
use crate::traits::{Renderer, WindowHandle};

pub const NOT_FOUND: &str = "div.not_found_game_page";
pub const PURCHASE_BANNER: &str = "div.purchase_banner_inner h2";
pub const BUY_ROW_BUTTON: &str = "div.buy_row a.buy_btn";
pub const DOWNLOAD_SECTION_BUTTON: &str = "section.game_download a.buy_btn";
pub const UPLOADS: &str = "div.uploads";
pub const WEB_EMBED: &str = "div.html_embed_widget";
pub const SALE_RATE: &str = ".sale_rate";
pub const DIRECT_DOWNLOAD: &str = "a.direct_download_btn";
pub const CLAIM_BUTTON: &str = "div.claim_to_download_box form button";
pub const CLAIM_MESSAGE: &str = "div.game_download_page div.inner_column p";

const OWNED: &str = "You own this";
const DOWNLOAD_NOW: &str = "Download Now";
const FULL_DISCOUNT: &str = "100";
const DOWNLOAD_OR_CLAIM: &str = "Download or claim";
const NO_THANKS: &str = "No thanks, just take me to the downloads";
const FOR_PROMOTION: &str = "for the promotion";
const CLAIMED: &str = "You claimed this game";

/// Drives a [`Renderer`] through the listing decision procedure.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: SourcePatterns,
    window_settle: Duration,
}

impl Classifier {
    pub fn new(patterns: SourcePatterns) -> Self {
        Self {
            patterns,
            window_settle: Duration::from_secs(1),
        }
    }

    /// Time to wait before checking whether the download page opened in a
    /// new browsing context.
    pub fn with_window_settle(mut self, window_settle: Duration) -> Self {
        self.window_settle = window_settle;
        self
    }

    /// Classify one listing.
    pub async fn classify<R: Renderer>(
        &self,
        url: &str,
        renderer: &R,
    ) -> Result<Outcome, AppError> {
        let url = self.patterns.canonical_listing(url)?;
        let fail = |reason: ParseFailure| AppError::parsing(url.as_str(), reason);
        tracing::info!(%url, "Handling listing");

        renderer.navigate(&url).await?;

        if renderer.find_region(NOT_FOUND).await?.is_some() {
            return Ok(Classification::Removed.into());
        }

        if let Some(banner) = renderer.find_region(PURCHASE_BANNER).await? {
            if banner.text.contains(OWNED) {
                tracing::info!(%url, "Already claimed");
                return Ok(Classification::Claimed.into());
            }
        }

        let button = match renderer.find_region(BUY_ROW_BUTTON).await? {
            Some(button) => button,
            None => match renderer.find_region(DOWNLOAD_SECTION_BUTTON).await? {
                Some(button) => button,
                None => {
                    if renderer.find_region(UPLOADS).await?.is_some() {
                        return Ok(Classification::DlOnly.into());
                    }
                    if renderer.find_region(WEB_EMBED).await?.is_some() {
                        return Ok(Classification::Web.into());
                    }
                    return Err(fail(ParseFailure::UnrecognizedPage));
                }
            },
        };

        let label = button.text.as_str();
        let lower = label.to_lowercase();
        if label.contains(DOWNLOAD_NOW) {
            match renderer.find_region(SALE_RATE).await? {
                None => Ok(Classification::AlwaysFree.into()),
                Some(rate) if rate.text.contains(FULL_DISCOUNT) => {
                    Ok(Classification::DlOnly.into())
                }
                Some(rate) => Err(fail(ParseFailure::InconsistentSaleRate(rate.text))),
            }
        } else if lower.contains("buy now") || lower.contains("pre-order") {
            Ok(Classification::Buy.into())
        } else if label.contains(DOWNLOAD_OR_CLAIM) {
            self.claim(&url, renderer).await
        } else {
            Err(fail(ParseFailure::UnexpectedPurchaseControl(label.to_string())))
        }
    }

    /// Walk the purchase sub-page through to the claim confirmation.
    async fn claim<R: Renderer>(&self, url: &str, renderer: &R) -> Result<Outcome, AppError> {
        let fail = |reason: ParseFailure| AppError::parsing(url, reason);
        let original = renderer.current_window().await?;

        renderer.navigate(&format!("{url}/purchase")).await?;

        let no_thanks = renderer
            .find_region(DIRECT_DOWNLOAD)
            .await?
            .ok_or_else(|| fail(ParseFailure::MissingDirectDownload))?;
        if !no_thanks.text.contains(NO_THANKS) {
            return Err(fail(ParseFailure::UnexpectedDirectDownload(no_thanks.text)));
        }
        let before = renderer.window_handles().await?;
        renderer.activate(&no_thanks).await?;

        self.adopt_new_window(renderer, &original, &before).await?;

        let claim_button = renderer
            .find_region(CLAIM_BUTTON)
            .await?
            .ok_or_else(|| fail(ParseFailure::MissingClaimButton))?;
        if !claim_button.text.to_lowercase().contains("claim") {
            return Err(fail(ParseFailure::UnexpectedClaimButton(claim_button.text)));
        }
        renderer.activate(&claim_button).await?;

        let message = renderer
            .find_region(CLAIM_MESSAGE)
            .await?
            .ok_or_else(|| fail(ParseFailure::MissingConfirmation))?;
        if message.text.contains(FOR_PROMOTION) {
            tracing::info!(%url, "Just claimed, part of a sale");
            Ok(Outcome::with_more(Classification::Claimed))
        } else if message.text.contains(CLAIMED) {
            tracing::info!(%url, "Just claimed");
            Ok(Classification::Claimed.into())
        } else {
            Err(fail(ParseFailure::UnexpectedConfirmation(message.text)))
        }
    }

    /// If activating a control opened a browsing context absent from
    /// `before`, switch into it and close the original.
    async fn adopt_new_window<R: Renderer>(
        &self,
        renderer: &R,
        original: &WindowHandle,
        before: &[WindowHandle],
    ) -> Result<(), AppError> {
        if !self.window_settle.is_zero() {
            tokio::time::sleep(self.window_settle).await;
        }
        let handles = renderer.window_handles().await?;
        let Some(new_handle) = handles.iter().find(|h| !before.contains(h)) else {
            return Ok(());
        };
        tracing::debug!(window = %new_handle, "Download page opened in a new window");
        renderer.close_window(original).await?;
        renderer.switch_window(new_handle).await?;
        Ok(())
    }
}

/// Smoke-test for `ChromiumRenderer`.
///
/// Launches Chromium, opens <https://example.com>, and checks that the
/// heading region can be found and read.
///
/// Run with:
///   cargo run -p claimer-client --example renderer_smoke
use claimer_client::{BrowserOptions, ChromiumLauncher};
use claimer_core::traits::{Renderer, RendererLauncher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let launcher = ChromiumLauncher::new(BrowserOptions {
        headless: true,
        ..BrowserOptions::default()
    });
    println!("Launching browser…");
    let renderer = launcher.launch().await?;

    renderer.navigate("https://example.com").await?;
    let heading = renderer.find_region("h1").await?;
    let missing = renderer.find_region("div.not_found_game_page").await?;
    let windows = renderer.window_handles().await?;
    renderer.close().await?;

    let heading = heading.ok_or_else(|| anyhow::anyhow!("Expected <h1> not found"))?;
    assert_eq!(heading.text.trim(), "Example Domain");
    assert!(missing.is_none());
    assert_eq!(windows.len(), 1, "expected a single browsing context");

    println!("OK: heading {:?}, {} window(s)", heading.text, windows.len());
    Ok(())
}

//! Fetch a progress page once and print what the browser would render.

use clap::Parser;
use parallelization_issues::cli::PollOptions;
use parallelization_issues::config::setup_logging;
use parallelization_issues::status_page::{PageStatusFetcher, RenderedPage};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opts = PollOptions::parse();
    setup_logging(opts.debug)?;

    let mut page = RenderedPage::default();
    PageStatusFetcher::new(reqwest::Client::new(), opts.url)
        .run(&mut page)
        .await;
    println!("{}", page.body());
    Ok(())
}

//! One-shot status poller.
//!
//! A [`PageStatusFetcher`] requests a page's own address once, reads the body as text, and
//! replaces a [`Document`]'s body with either the progress markup or the error markup.
//! Both stages (request, body-to-text) fail into the same error render.

use std::fmt::Display;
use std::future::Future;

use tracing::debug;
use url::Url;

/// Heading shown above the response body.
pub const PROGRESS_HEADING: &str = "Simulation In Progress";

/// Heading shown above the error.
pub const ERROR_HEADING: &str = "Error";

/// Markup for a successful fetch. The body is inserted verbatim, not escaped.
pub fn render_progress(body: &str) -> String {
    format!("<h1>{PROGRESS_HEADING}</h1><p>{body}</p>")
}

/// Markup for any failure in the fetch chain.
pub fn render_error(error: &impl Display) -> String {
    format!("<h1>{ERROR_HEADING}</h1><p>{error}</p>")
}

/// First stage: issue the request.
pub trait StatusSource {
    /// The response, not yet read.
    type Body: StatusBody<Error = Self::Error>;
    /// Whatever the transport surfaces on failure.
    type Error: Display;

    /// Issue a single GET for `url` with default headers.
    fn request(&self, url: &Url) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send;
}

/// Second stage: read the full body as text.
pub trait StatusBody {
    /// Whatever the body reader surfaces on failure.
    type Error: Display;

    /// Consume the response and return its text.
    fn text(self) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Something whose visible content can be replaced wholesale.
pub trait Document {
    /// Overwrite everything previously rendered with `markup`.
    fn replace_body(&mut self, markup: String);
}

/// An in-memory document, used by the `poll_status` binary and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedPage {
    body: String,
    renders: usize,
}

impl RenderedPage {
    /// The current body markup.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// How many times the body has been replaced.
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl Document for RenderedPage {
    fn replace_body(&mut self, markup: String) {
        self.body = markup;
        self.renders += 1;
    }
}

/// Fetches a page's own address and renders the outcome, exactly once.
#[derive(Debug)]
pub struct PageStatusFetcher<S> {
    source: S,
    target: Url,
}

impl<S: StatusSource> PageStatusFetcher<S> {
    /// The target is read once, here.
    pub fn new(source: S, target: Url) -> Self {
        Self { source, target }
    }

    /// The address that will be requested.
    pub fn target(&self) -> &Url {
        &self.target
    }

    async fn fetch(&self) -> Result<String, S::Error> {
        let response = self.source.request(&self.target).await?;
        response.text().await
    }

    /// Run the fetch and render into `document`. Consumes the fetcher; there is no retry.
    pub async fn run<D: Document>(self, document: &mut D) {
        let markup = match self.fetch().await {
            Ok(body) => render_progress(&body),
            Err(err) => render_error(&err),
        };
        document.replace_body(markup);
    }
}

impl StatusSource for reqwest::Client {
    type Body = reqwest::Response;
    type Error = reqwest::Error;

    fn request(&self, url: &Url) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send {
        debug!("Requesting status from {url}");
        self.get(url.clone()).send()
    }
}

impl StatusBody for reqwest::Response {
    type Error = reqwest::Error;

    fn text(self) -> impl Future<Output = Result<String, Self::Error>> + Send {
        reqwest::Response::text(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Outcome {
        Body(&'static str),
        RequestFails(&'static str),
        TextFails(&'static str),
    }

    struct Scripted {
        outcome: Outcome,
        requests: Arc<AtomicUsize>,
    }

    struct ScriptedBody(Result<String, String>);

    impl StatusSource for Scripted {
        type Body = ScriptedBody;
        type Error = String;

        fn request(
            &self,
            _url: &Url,
        ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let outcome = self.outcome;
            async move {
                match outcome {
                    Outcome::Body(text) => Ok(ScriptedBody(Ok(text.to_string()))),
                    Outcome::RequestFails(err) => Err(err.to_string()),
                    Outcome::TextFails(err) => Ok(ScriptedBody(Err(err.to_string()))),
                }
            }
        }
    }

    impl StatusBody for ScriptedBody {
        type Error = String;

        fn text(self) -> impl Future<Output = Result<String, Self::Error>> + Send {
            async move { self.0 }
        }
    }

    fn target() -> Url {
        Url::parse("http://localhost:9000/simulate-problems/progress").expect("url")
    }

    async fn render(outcome: Outcome) -> (RenderedPage, usize) {
        let requests = Arc::new(AtomicUsize::new(0));
        let fetcher = PageStatusFetcher::new(
            Scripted {
                outcome,
                requests: requests.clone(),
            },
            target(),
        );
        let mut page = RenderedPage::default();
        fetcher.run(&mut page).await;
        (page, requests.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn body_is_rendered_under_progress_heading() {
        let (page, _) = render(Outcome::Body("42%")).await;
        assert_eq!(page.body(), "<h1>Simulation In Progress</h1><p>42%</p>");
    }

    #[tokio::test]
    async fn empty_body_renders_empty_paragraph() {
        let (page, _) = render(Outcome::Body("")).await;
        assert_eq!(page.body(), "<h1>Simulation In Progress</h1><p></p>");
    }

    #[tokio::test]
    async fn request_failure_renders_error() {
        let (page, _) = render(Outcome::RequestFails("NetworkError")).await;
        assert_eq!(page.body(), "<h1>Error</h1><p>NetworkError</p>");
    }

    #[tokio::test]
    async fn text_failure_takes_the_same_path() {
        let (from_text, _) = render(Outcome::TextFails("NetworkError")).await;
        let (from_request, _) = render(Outcome::RequestFails("NetworkError")).await;
        assert_eq!(from_text, from_request);
    }

    #[tokio::test]
    async fn markup_is_not_escaped() {
        let (page, _) = render(Outcome::Body("<b>Thread 1</b> & co")).await;
        assert_eq!(
            page.body(),
            "<h1>Simulation In Progress</h1><p><b>Thread 1</b> & co</p>"
        );
    }

    #[tokio::test]
    async fn one_request_and_one_render_per_run() {
        for outcome in [
            Outcome::Body("ok"),
            Outcome::RequestFails("down"),
            Outcome::TextFails("consumed"),
        ] {
            let (page, requests) = render(outcome).await;
            assert_eq!(requests, 1);
            assert_eq!(page.render_count(), 1);
        }
    }

    #[tokio::test]
    async fn render_overwrites_previous_content() {
        let mut page = RenderedPage::default();
        page.replace_body("<p>Loading</p>".to_string());
        let fetcher = PageStatusFetcher::new(
            Scripted {
                outcome: Outcome::Body("done"),
                requests: Arc::new(AtomicUsize::new(0)),
            },
            target(),
        );
        assert_eq!(fetcher.target(), &target());
        fetcher.run(&mut page).await;
        assert_eq!(page.body(), "<h1>Simulation In Progress</h1><p>done</p>");
        assert_eq!(page.render_count(), 2);
    }
}

use formats::DatasetKind;
use foundation::CountryCode;
use gloo_net::http::Request;
use streaming::{DatasetSource, FetchFailure, FetchFuture, parse_body};

/// Browser `fetch` against the static-file store.
pub struct GlooSource {
    base_url: String,
}

impl GlooSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl DatasetSource for GlooSource {
    fn location(&self, country: &CountryCode, kind: DatasetKind) -> String {
        kind.url(&self.base_url, country)
    }

    fn fetch<'a>(&'a self, country: &'a CountryCode, kind: DatasetKind) -> FetchFuture<'a> {
        let url = self.location(country, kind);
        Box::pin(async move {
            let resp = Request::get(&url)
                .send()
                .await
                .map_err(|e| FetchFailure::transport(country, kind, e.to_string()))?;
            if !resp.ok() {
                return Err(FetchFailure::not_found(country, kind, Some(resp.status())));
            }
            let body = resp
                .binary()
                .await
                .map_err(|e| FetchFailure::transport(country, kind, e.to_string()))?;
            parse_body(country, kind, &body)
        })
    }
}

//! Dataset fetchers.
//!
//! A [`DatasetSource`] turns `(country, kind)` into a parsed
//! [`FeatureCollection`] or a typed [`FetchFailure`]. Failures are values,
//! never panics, and nothing here retries: the next user submission is the
//! retry.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use formats::{DatasetKind, FeatureCollection};
use foundation::CountryCode;
use tracing::{debug, warn};

use crate::error::FetchFailure;

/// Boxed fetch future. Not `Send`: the engine runs on a single UI thread.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<FeatureCollection, FetchFailure>> + 'a>>;

pub trait DatasetSource {
    /// Where `(country, kind)` is read from, for logs and diagnostics.
    fn location(&self, country: &CountryCode, kind: DatasetKind) -> String;

    fn fetch<'a>(&'a self, country: &'a CountryCode, kind: DatasetKind) -> FetchFuture<'a>;
}

/// Parses a fetched body, mapping parse errors to `Malformed`.
pub fn parse_body(
    country: &CountryCode,
    kind: DatasetKind,
    body: &[u8],
) -> Result<FeatureCollection, FetchFailure> {
    FeatureCollection::from_geojson_slice(body).map_err(|e| {
        warn!(country = %country, kind = %kind, error = %e, "dataset body is not a feature collection");
        FetchFailure::malformed(country, kind, &e)
    })
}

/// Remote static-file store: `GET <base>/<code>_<kind>.geojson`.
#[cfg(not(target_arch = "wasm32"))]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DatasetSource for HttpSource {
    fn location(&self, country: &CountryCode, kind: DatasetKind) -> String {
        kind.url(&self.base_url, country)
    }

    fn fetch<'a>(&'a self, country: &'a CountryCode, kind: DatasetKind) -> FetchFuture<'a> {
        let url = self.location(country, kind);
        Box::pin(async move {
            debug!(%url, "fetching dataset");
            let resp = match self.client.get(&url).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(%url, error = %err, "dataset request failed");
                    return Err(FetchFailure::transport(country, kind, err.to_string()));
                }
            };

            let status = resp.status();
            if !status.is_success() {
                warn!(%url, status = status.as_u16(), "dataset request returned an error status");
                return Err(FetchFailure::not_found(country, kind, Some(status.as_u16())));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|err| FetchFailure::transport(country, kind, err.to_string()))?;
            parse_body(country, kind, &body)
        })
    }
}

/// Local directory laid out like the static-file store.
#[cfg(not(target_arch = "wasm32"))]
pub struct FilesystemSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FilesystemSource {
    pub fn new(root: impl AsRef<std::path::Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DatasetSource for FilesystemSource {
    fn location(&self, country: &CountryCode, kind: DatasetKind) -> String {
        self.root.join(kind.file_name(country)).display().to_string()
    }

    fn fetch<'a>(&'a self, country: &'a CountryCode, kind: DatasetKind) -> FetchFuture<'a> {
        let path = self.root.join(kind.file_name(country));
        Box::pin(async move {
            debug!(path = %path.display(), "reading dataset");
            match tokio::fs::read(&path).await {
                Ok(data) => parse_body(country, kind, &data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(FetchFailure::not_found(country, kind, None))
                }
                Err(e) => Err(FetchFailure::transport(country, kind, e.to_string())),
            }
        })
    }
}

/// In-memory dataset store keyed by `(code, kind)`. Missing entries behave
/// like an HTTP 404.
#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    payloads: BTreeMap<(String, DatasetKind), String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, country: &CountryCode, kind: DatasetKind, geojson: impl Into<String>) {
        self.payloads
            .insert((country.as_str().to_string(), kind), geojson.into());
    }

    pub fn with(mut self, country: &CountryCode, kind: DatasetKind, geojson: impl Into<String>) -> Self {
        self.insert(country, kind, geojson);
        self
    }
}

impl DatasetSource for StaticSource {
    fn location(&self, country: &CountryCode, kind: DatasetKind) -> String {
        format!("memory:{}", kind.file_name(country))
    }

    fn fetch<'a>(&'a self, country: &'a CountryCode, kind: DatasetKind) -> FetchFuture<'a> {
        let payload = self
            .payloads
            .get(&(country.as_str().to_string(), kind))
            .cloned();
        Box::pin(async move {
            match payload {
                Some(text) => parse_body(country, kind, text.as_bytes()),
                None => Err(FetchFailure::not_found(country, kind, Some(404))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DatasetSource, FilesystemSource, StaticSource};
    use crate::error::FetchFailureKind;
    use formats::DatasetKind;
    use foundation::CountryCode;

    const ONE_FEATURE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"hierid":"COL.1"},
         "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#;

    fn col() -> CountryCode {
        CountryCode::parse("COL").expect("code")
    }

    #[tokio::test]
    async fn filesystem_source_reads_and_parses() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("COL_ir.geojson"), ONE_FEATURE).expect("write");
        std::fs::write(dir.path().join("COL_adm2.geojson"), "not json").expect("write");

        let source = FilesystemSource::new(dir.path());
        let fc = source.fetch(&col(), DatasetKind::Ir).await.expect("fetch");
        assert_eq!(fc.len(), 1);

        let err = source.fetch(&col(), DatasetKind::Adm2).await.unwrap_err();
        assert_eq!(err.failure, FetchFailureKind::Malformed);

        let err = source
            .fetch(&col(), DatasetKind::IrProblematic)
            .await
            .unwrap_err();
        assert_eq!(err.failure, FetchFailureKind::NotFound { status: None });
    }

    #[tokio::test]
    async fn static_source_misses_are_404() {
        let source = StaticSource::new().with(&col(), DatasetKind::Ir, ONE_FEATURE);
        assert!(source.fetch(&col(), DatasetKind::Ir).await.is_ok());
        let err = source.fetch(&col(), DatasetKind::Adm2).await.unwrap_err();
        assert_eq!(err.failure, FetchFailureKind::NotFound { status: Some(404) });
        assert_eq!(source.location(&col(), DatasetKind::Adm2), "memory:COL_adm2.geojson");
    }

    #[test]
    fn http_source_builds_store_urls() {
        let source = super::HttpSource::new("https://data.example/countries/");
        assert_eq!(
            source.location(&col(), DatasetKind::Adm2),
            "https://data.example/countries/COL_adm2.geojson"
        );
    }
}

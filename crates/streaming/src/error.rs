use formats::{DatasetKind, FeatureCollectionError};
use foundation::CountryCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// Non-success HTTP status, or a missing file (`status: None`).
    NotFound { status: Option<u16> },
    /// The request never produced a response.
    Transport,
    /// The body arrived but is not a GeoJSON FeatureCollection.
    Malformed,
}

/// A terminal, non-retried dataset fetch failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub country: CountryCode,
    pub kind: DatasetKind,
    pub failure: FetchFailureKind,
    pub detail: String,
}

impl FetchFailure {
    pub fn not_found(country: &CountryCode, kind: DatasetKind, status: Option<u16>) -> Self {
        let detail = match status {
            Some(code) => format!("HTTP {code}"),
            None => "no such file".to_string(),
        };
        Self {
            country: country.clone(),
            kind,
            failure: FetchFailureKind::NotFound { status },
            detail,
        }
    }

    pub fn transport(country: &CountryCode, kind: DatasetKind, detail: impl Into<String>) -> Self {
        Self {
            country: country.clone(),
            kind,
            failure: FetchFailureKind::Transport,
            detail: detail.into(),
        }
    }

    pub fn malformed(country: &CountryCode, kind: DatasetKind, err: &FeatureCollectionError) -> Self {
        Self {
            country: country.clone(),
            kind,
            failure: FetchFailureKind::Malformed,
            detail: err.to_string(),
        }
    }

    /// Whether the remedy is "there is no dataset for this country".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.failure,
            FetchFailureKind::NotFound { .. } | FetchFailureKind::Transport
        )
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        if self.is_not_found() {
            format!("No {} dataset is available for {}.", self.kind.label(), self.country)
        } else {
            format!(
                "The {} dataset for {} could not be read.",
                self.kind.label(),
                self.country
            )
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} fetch failed: {}",
            self.country, self.kind, self.detail
        )
    }
}

impl std::error::Error for FetchFailure {}

#[cfg(test)]
mod tests {
    use super::FetchFailure;
    use formats::{DatasetKind, FeatureCollectionError};
    use foundation::CountryCode;

    #[test]
    fn messages_name_country_and_dataset() {
        let zzz = CountryCode::parse("ZZZ").expect("code");
        let f = FetchFailure::not_found(&zzz, DatasetKind::Adm2, Some(404));
        assert!(f.is_not_found());
        assert_eq!(
            f.user_message(),
            "No ADM2 boundaries dataset is available for ZZZ."
        );
        assert_eq!(f.to_string(), "ZZZ adm2 fetch failed: HTTP 404");

        let m = FetchFailure::malformed(
            &zzz,
            DatasetKind::Ir,
            &FeatureCollectionError::NotAFeatureCollection,
        );
        assert!(!m.is_not_found());
        assert!(m.user_message().contains("could not be read"));
    }
}

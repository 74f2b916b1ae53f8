use foundation::CountryCode;

/// The per-country GeoJSON documents published by the data pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    /// Administrative level-2 boundaries carrying `case_type`.
    Adm2,
    /// Impact-region polygons keyed by `hierid`.
    Ir,
    /// The subset of impact regions flagged as problematic.
    IrProblematic,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [DatasetKind::Adm2, DatasetKind::Ir, DatasetKind::IrProblematic];

    pub fn suffix(self) -> &'static str {
        match self {
            DatasetKind::Adm2 => "adm2",
            DatasetKind::Ir => "ir",
            DatasetKind::IrProblematic => "ir_problematic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Adm2 => "ADM2 boundaries",
            DatasetKind::Ir => "impact regions",
            DatasetKind::IrProblematic => "problematic impact regions",
        }
    }

    /// `<code>_<suffix>.geojson`
    pub fn file_name(self, country: &CountryCode) -> String {
        format!("{}_{}.geojson", country.as_str(), self.suffix())
    }

    /// Joins `base` and the file name with exactly one slash.
    pub fn url(self, base: &str, country: &CountryCode) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.file_name(country))
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.suffix().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown dataset kind: {s} (expected adm2, ir or ir_problematic)"))
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetKind;
    use foundation::CountryCode;

    #[test]
    fn urls_are_deterministic() {
        let usa = CountryCode::parse("usa").expect("code");
        assert_eq!(
            DatasetKind::Adm2.url("/outputs/geometries/countries/", &usa),
            "/outputs/geometries/countries/USA_adm2.geojson"
        );
        assert_eq!(
            DatasetKind::Ir.url("https://cdn.example/data", &usa),
            "https://cdn.example/data/USA_ir.geojson"
        );
        assert_eq!(
            DatasetKind::IrProblematic.file_name(&usa),
            "USA_ir_problematic.geojson"
        );
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("IR".parse::<DatasetKind>(), Ok(DatasetKind::Ir));
        assert!("adm1".parse::<DatasetKind>().is_err());
    }
}

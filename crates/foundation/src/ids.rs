/// ISO 3166-1 alpha-3 country code, normalized to upper case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryCode(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryCodeError {
    pub input: String,
}

impl std::fmt::Display for CountryCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid country code {:?}: expected three ASCII letters",
            self.input
        )
    }
}

impl std::error::Error for CountryCodeError {}

impl CountryCode {
    pub fn parse(input: &str) -> Result<Self, CountryCodeError> {
        let trimmed = input.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryCodeError {
                input: input.to_string(),
            });
        }
        Ok(CountryCode(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CountryCode {
    type Err = CountryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CountryCode::parse(s)
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::CountryCode;

    #[test]
    fn normalizes_case_and_whitespace() {
        let code = CountryCode::parse(" usa ").expect("valid");
        assert_eq!(code.as_str(), "USA");
        assert_eq!(code.to_string(), "USA");
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(CountryCode::parse("US").is_err());
        assert!(CountryCode::parse("USA1").is_err());
        assert!(CountryCode::parse("U5A").is_err());
        assert!(CountryCode::parse("").is_err());
    }
}

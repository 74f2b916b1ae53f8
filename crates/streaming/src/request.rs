use formats::DatasetKind;
use foundation::CountryCode;

/// Identifies a dataset request in a deterministic, stable way.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

/// Monotonic request id source.
#[derive(Debug, Clone)]
pub struct RequestIssuer {
    next: u64,
}

impl Default for RequestIssuer {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl RequestIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Request {
        let req = Request(self.next);
        self.next += 1;
        req
    }
}

/// One outstanding fetch, tagged with the confirmation it belongs to.
///
/// The completed result is handed back to the engine together with this
/// ticket; the engine compares `country` and `generation` against the
/// currently confirmed country and discards mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTicket {
    pub request: Request,
    pub country: CountryCode,
    pub generation: u64,
    pub kind: DatasetKind,
}

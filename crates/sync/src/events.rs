use formats::DatasetKind;
use foundation::CountryCode;

use crate::counts::CaseCounts;

/// Signals from the engine to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// ADM2 data for `country` is applied and idle; clears the loading
    /// indicator.
    DataLoaded { country: CountryCode },
    DatasetError {
        country: CountryCode,
        kind: DatasetKind,
        message: String,
    },
    /// `None` when the selection was cleared.
    SelectionChanged { adm2_id: Option<String> },
    CaseCountsUpdated {
        country: CountryCode,
        counts: CaseCounts,
    },
}

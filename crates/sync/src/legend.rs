use std::fmt;

use layers::{CaseType, Color};
use scene::LayerStore;

use crate::counts::CaseCounts;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub case: CaseType,
    pub label: &'static str,
    pub description: &'static str,
    pub color: Color,
    pub count: usize,
    pub active: bool,
}

/// Legend panel: the two layer toggles plus one entry per canonical case.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub adm2_visible: bool,
    pub ir_visible: bool,
    pub entries: Vec<LegendEntry>,
    pub unclassified: usize,
}

impl Legend {
    pub fn build(store: &LayerStore, counts: &CaseCounts) -> Self {
        let visibility = store.visibility();
        let entries = CaseType::ALL
            .into_iter()
            .map(|case| LegendEntry {
                case,
                label: case.label(),
                description: case.description(),
                color: case.color(),
                count: counts.get(case),
                active: store.filters().is_active(case),
            })
            .collect();
        Self {
            adm2_visible: visibility.adm2,
            ir_visible: visibility.ir,
            entries,
            unclassified: counts.unclassified(),
        }
    }

    pub fn entry(&self, case: CaseType) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.case == case)
    }
}

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |on: bool| if on { "x" } else { " " };
        writeln!(f, "[{}] ADM2 boundaries", mark(self.adm2_visible))?;
        writeln!(f, "[{}] Impact regions", mark(self.ir_visible))?;
        for e in &self.entries {
            writeln!(
                f,
                "  [{}] {:<8} {} {:>6}  {}",
                mark(e.active),
                e.label,
                e.color,
                e.count,
                e.description
            )?;
        }
        if self.unclassified > 0 {
            writeln!(f, "  unclassified: {}", self.unclassified)?;
        }
        Ok(())
    }
}

//! Color/style registry for the `case_type` classification.
//!
//! Raw labels from the data are resolved to a [`CaseType`] once, here; every
//! other component works with the canonical value.

use serde_json::{Value, json};

/// A CSS hex color such as `#3772ff`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color(&'static str);

impl Color {
    pub const fn hex(hex: &'static str) -> Self {
        Color(hex)
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

pub const DEFAULT_CASE_COLOR: Color = Color::hex("#CCCCCC");
pub const ADM2_OUTLINE_COLOR: Color = Color::hex("#000000");
pub const IR_FILL_COLOR: Color = Color::hex("#32CD32");
pub const IR_OUTLINE_COLOR: Color = Color::hex("#000000");
pub const IR_HOVER_COLOR: Color = Color::hex("#00FFFF");

/// Canonical classification of how an ADM2 unit relates to the impact
/// regions it overlaps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaseType {
    Case1,
    Case2a,
    Case2b,
    Case3a,
    Case3b,
    Case4,
}

impl CaseType {
    pub const ALL: [CaseType; 6] = [
        CaseType::Case1,
        CaseType::Case2a,
        CaseType::Case2b,
        CaseType::Case3a,
        CaseType::Case3b,
        CaseType::Case4,
    ];

    /// Short canonical label, always the first alias.
    pub fn label(self) -> &'static str {
        self.aliases()[0]
    }

    pub fn description(self) -> &'static str {
        match self {
            CaseType::Case1 => "IR = ADM2",
            CaseType::Case2a => "IR covers multiple ADM2s",
            CaseType::Case2b => "IR partially covers multiple ADM2s",
            CaseType::Case3a => "ADM2 = multiple IRs",
            CaseType::Case3b => "ADM2 partially covered by multiple IRs",
            CaseType::Case4 => "ADM2 with no IR assigned",
        }
    }

    /// Every spelling the data pipeline has published for this case.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            CaseType::Case1 => &["Case 1", "Case 1: IR = ADM2"],
            CaseType::Case2a => &["Case 2a", "Case 2: IR covers multiple ADM2s"],
            CaseType::Case2b => &["Case 2b"],
            CaseType::Case3a => &["Case 3a", "Case 3: ADM2 = multiple IRs"],
            CaseType::Case3b => &["Case 3b"],
            CaseType::Case4 => &["Case 4", "Case 4: ADM2 with no IR assigned"],
        }
    }

    pub fn color(self) -> Color {
        match self {
            CaseType::Case1 => Color::hex("#3772ff"),
            CaseType::Case2a => Color::hex("#33a02c"),
            CaseType::Case2b => Color::hex("#b2df8a"),
            CaseType::Case3a => Color::hex("#ffe74c"),
            CaseType::Case3b => Color::hex("#df2935"),
            CaseType::Case4 => Color::hex("#aaaaaa"),
        }
    }

    /// Resolves a raw `case_type` label by exact alias match, the same
    /// comparison the renderer filter makes. Unknown labels resolve to `None`.
    pub fn resolve(label: &str) -> Option<CaseType> {
        CaseType::ALL
            .into_iter()
            .find(|case| case.aliases().contains(&label))
    }
}

impl std::fmt::Display for CaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Color for a raw label, falling back to the default swatch.
pub fn color_for_label(label: &str) -> Color {
    CaseType::resolve(label)
        .map(CaseType::color)
        .unwrap_or(DEFAULT_CASE_COLOR)
}

/// Data-driven fill color: a `match` over every alias of every case.
pub fn case_fill_color_expression(property: &str) -> Value {
    let mut expr = vec![json!("match"), json!(["get", property])];
    for case in CaseType::ALL {
        expr.push(json!(case.aliases()));
        expr.push(json!(case.color().as_str()));
    }
    expr.push(json!(DEFAULT_CASE_COLOR.as_str()));
    Value::Array(expr)
}

/// Paint parameters for the engine-owned layers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub adm2_fill_opacity: f64,
    pub adm2_outline_width: f64,
    pub ir_fill_opacity: f64,
    pub ir_outline_width: f64,
    pub ir_hover_opacity: f64,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            adm2_fill_opacity: 0.7,
            adm2_outline_width: 2.0,
            ir_fill_opacity: 0.5,
            ir_outline_width: 1.0,
            ir_hover_opacity: 0.7,
        }
    }
}

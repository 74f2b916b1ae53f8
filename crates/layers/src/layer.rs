use serde_json::{Map, Value, json};

use crate::filter::FilterExpr;
use crate::symbology::{
    ADM2_OUTLINE_COLOR, IR_FILL_COLOR, IR_HOVER_COLOR, IR_OUTLINE_COLOR, LayerStyle,
    case_fill_color_expression,
};

pub const CASE_TYPE_PROPERTY: &str = "case_type";
pub const ADM2_ID_PROPERTY: &str = "adm2_id";
pub const HIERID_PROPERTY: &str = "hierid";

/// Data sources owned by the synchronization engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    Adm2,
    Ir,
}

impl SourceId {
    pub const ALL: [SourceId; 2] = [SourceId::Adm2, SourceId::Ir];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Adm2 => "adm2-regions",
            SourceId::Ir => "impact-regions",
        }
    }

    /// Render layers drawn from this source, bottom to top.
    pub fn layers(self) -> &'static [LayerId] {
        match self {
            SourceId::Adm2 => &[LayerId::Adm2Fill, LayerId::Adm2Outline],
            SourceId::Ir => &[LayerId::IrFill, LayerId::IrOutline, LayerId::IrHover],
        }
    }
}

/// Logical render layers. The engine maps each one to exactly one surface
/// layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    Adm2Fill,
    Adm2Outline,
    IrFill,
    IrOutline,
    IrHover,
}

impl LayerId {
    pub const ALL: [LayerId; 5] = [
        LayerId::Adm2Fill,
        LayerId::Adm2Outline,
        LayerId::IrFill,
        LayerId::IrOutline,
        LayerId::IrHover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::Adm2Fill => "adm2-fill",
            LayerId::Adm2Outline => "adm2-outline",
            LayerId::IrFill => "impact-fill",
            LayerId::IrOutline => "impact-outline",
            LayerId::IrHover => "impact-hover",
        }
    }

    pub fn source(self) -> SourceId {
        match self {
            LayerId::Adm2Fill | LayerId::Adm2Outline => SourceId::Adm2,
            LayerId::IrFill | LayerId::IrOutline | LayerId::IrHover => SourceId::Ir,
        }
    }

    pub fn kind(self) -> LayerKind {
        match self {
            LayerId::Adm2Outline | LayerId::IrOutline => LayerKind::Line,
            LayerId::Adm2Fill | LayerId::IrFill | LayerId::IrHover => LayerKind::Fill,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerKind {
    Fill,
    Line,
}

impl LayerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Line => "line",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Fill { color: Value, opacity: f64 },
    Line { color: Value, width: f64 },
}

/// Everything a surface needs to create one render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: LayerId,
    pub paint: Paint,
    pub visible: bool,
    pub filter: Option<FilterExpr>,
}

impl LayerSpec {
    pub fn new(id: LayerId, style: &LayerStyle, visible: bool) -> Self {
        let paint = match id {
            LayerId::Adm2Fill => Paint::Fill {
                color: case_fill_color_expression(CASE_TYPE_PROPERTY),
                opacity: style.adm2_fill_opacity,
            },
            LayerId::Adm2Outline => Paint::Line {
                color: json!(ADM2_OUTLINE_COLOR.as_str()),
                width: style.adm2_outline_width,
            },
            LayerId::IrFill => Paint::Fill {
                color: json!(IR_FILL_COLOR.as_str()),
                opacity: style.ir_fill_opacity,
            },
            LayerId::IrOutline => Paint::Line {
                color: json!(IR_OUTLINE_COLOR.as_str()),
                width: style.ir_outline_width,
            },
            LayerId::IrHover => Paint::Fill {
                color: json!(IR_HOVER_COLOR.as_str()),
                opacity: style.ir_hover_opacity,
            },
        };
        // The hover layer starts out highlighting nothing.
        let filter = (id == LayerId::IrHover).then(|| FilterExpr::match_none(HIERID_PROPERTY));
        Self {
            id,
            paint,
            visible,
            filter,
        }
    }

    pub fn source(&self) -> SourceId {
        self.id.source()
    }

    /// Style-spec layer object.
    pub fn to_style_json(&self) -> Value {
        let mut paint = Map::new();
        match &self.paint {
            Paint::Fill { color, opacity } => {
                paint.insert("fill-color".to_string(), color.clone());
                paint.insert("fill-opacity".to_string(), json!(opacity));
            }
            Paint::Line { color, width } => {
                paint.insert("line-color".to_string(), color.clone());
                paint.insert("line-width".to_string(), json!(width));
            }
        }

        let mut obj = Map::new();
        obj.insert("id".to_string(), json!(self.id.as_str()));
        obj.insert("type".to_string(), json!(self.id.kind().as_str()));
        obj.insert("source".to_string(), json!(self.source().as_str()));
        obj.insert(
            "layout".to_string(),
            json!({ "visibility": visibility_value(self.visible) }),
        );
        obj.insert("paint".to_string(), Value::Object(paint));
        if let Some(filter) = &self.filter {
            obj.insert("filter".to_string(), filter.to_expression());
        }
        Value::Object(obj)
    }
}

pub fn visibility_value(visible: bool) -> &'static str {
    if visible { "visible" } else { "none" }
}

/// Shown/hidden intent for the two data layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerVisibility {
    pub adm2: bool,
    pub ir: bool,
}

impl LayerVisibility {
    pub fn new(adm2: bool, ir: bool) -> Self {
        Self { adm2, ir }
    }
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            adm2: true,
            ir: true,
        }
    }
}

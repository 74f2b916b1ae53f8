/// The impact region under the pointer, by `hierid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverTarget {
    hierid: Option<String>,
}

impl HoverTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hierid(&self) -> Option<&str> {
        self.hierid.as_deref()
    }

    /// Returns `true` if the target changed.
    pub fn enter(&mut self, hierid: Option<String>) -> bool {
        if self.hierid == hierid {
            return false;
        }
        self.hierid = hierid;
        true
    }

    /// Returns `true` if something was hovered.
    pub fn leave(&mut self) -> bool {
        self.hierid.take().is_some()
    }
}

use layers::{HandlerId, PointerEventKind, RenderSurface};

/// Holds at most one attached pointer handler. Re-attaching always detaches
/// the previous token first.
#[derive(Debug, Default)]
pub(crate) struct HandlerSlot {
    handler: Option<HandlerId>,
}

impl HandlerSlot {
    pub(crate) fn attach<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        kind: PointerEventKind,
        layer: &str,
    ) {
        self.release(surface);
        self.handler = Some(surface.attach(kind, layer));
    }

    pub(crate) fn release<S: RenderSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(handler) = self.handler.take() {
            surface.detach(handler);
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn holds(&self, handler: HandlerId) -> bool {
        self.handler == Some(handler)
    }
}

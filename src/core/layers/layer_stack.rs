//=========================================================================
// Layer Stack
//=========================================================================
//
// Ordered storage for layers and overlays.
//
// Layers are inserted below every overlay, overlays always go on top.
// Update order is bottom to top; detach order is top to bottom.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::Layer;

//=== LayerStack ==========================================================

/// Layers followed by overlays, in update order.
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    overlay_start: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Stack Operations -------------------------------------------------

    /// Inserts a layer above existing layers and below every overlay.
    pub fn push_layer<L>(&mut self, layer: L)
    where
        L: Layer + 'static,
    {
        debug!(target: "frame_loop", "Pushing layer {}", layer.name());
        self.layers.insert(self.overlay_start, Box::new(layer));
        self.overlay_start += 1;
    }

    /// Pushes an overlay on top of the stack.
    pub fn push_overlay<L>(&mut self, overlay: L)
    where
        L: Layer + 'static,
    {
        debug!(target: "frame_loop", "Pushing overlay {}", overlay.name());
        self.layers.push(Box::new(overlay));
    }

    /// Removes the topmost non-overlay layer.
    ///
    /// The caller owns the returned layer; `on_detach` is not called.
    pub fn pop_layer(&mut self) -> Option<Box<dyn Layer>> {
        if self.overlay_start == 0 {
            warn!(target: "frame_loop", "pop_layer on a stack with no layers");
            return None;
        }
        self.overlay_start -= 1;
        Some(self.layers.remove(self.overlay_start))
    }

    /// Removes the topmost overlay.
    pub fn pop_overlay(&mut self) -> Option<Box<dyn Layer>> {
        if self.layers.len() == self.overlay_start {
            return None;
        }
        self.layers.pop()
    }

    /// Drops every layer and overlay.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.overlay_start = 0;
    }

    //--- Iteration --------------------------------------------------------

    /// Bottom to top.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Box<dyn Layer>> {
        self.layers.iter_mut()
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    //--- Queries ----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn overlay_count(&self) -> usize {
        self.layers.len() - self.overlay_start
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layers::FrameContext;

    struct Named(&'static str);

    impl Layer for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn on_update(&mut self, _ctx: &mut FrameContext) {}
    }

    #[test]
    fn layers_stay_below_overlays() {
        let mut stack = LayerStack::new();
        stack.push_overlay(Named("hud"));
        stack.push_layer(Named("world"));
        stack.push_overlay(Named("console"));
        stack.push_layer(Named("sky"));

        assert_eq!(stack.names(), vec!["world", "sky", "hud", "console"]);
        assert_eq!(stack.len(), 4);
        assert_eq!(stack.overlay_count(), 2);
    }

    #[test]
    fn pop_layer_takes_topmost_layer_only() {
        let mut stack = LayerStack::new();
        stack.push_layer(Named("world"));
        stack.push_layer(Named("sky"));
        stack.push_overlay(Named("hud"));

        let popped = stack.pop_layer().unwrap();
        assert_eq!(popped.name(), "sky");
        assert_eq!(stack.names(), vec!["world", "hud"]);

        stack.pop_layer().unwrap();
        assert!(stack.pop_layer().is_none());
        assert_eq!(stack.names(), vec!["hud"]);
    }

    #[test]
    fn pop_overlay_leaves_layers() {
        let mut stack = LayerStack::new();
        stack.push_layer(Named("world"));
        assert!(stack.pop_overlay().is_none());

        stack.push_overlay(Named("hud"));
        assert_eq!(stack.pop_overlay().unwrap().name(), "hud");
        assert_eq!(stack.names(), vec!["world"]);
    }

    #[test]
    fn clear_empties_stack() {
        let mut stack = LayerStack::new();
        stack.push_layer(Named("world"));
        stack.push_overlay(Named("hud"));

        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.overlay_count(), 0);

        stack.push_layer(Named("again"));
        assert_eq!(stack.names(), vec!["again"]);
    }
}

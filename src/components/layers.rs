use crate::canvas::{BlendMode, Layer, PixelGrid};
use crate::compositor::CompositeLayer;

/// Above this many layers compositing gets noticeably slow.
pub const MAX_RECOMMENDED_LAYERS: usize = 200;

// ============================================================================
// LAYER MANAGER - ordered layer stack + selection cursor
// ============================================================================

/// Ordered layer stack (index 0 = bottom) with a current-layer cursor.
///
/// The manager is never constructed empty and `current` always indexes a
/// valid layer as long as the caller never removes the last one.
#[derive(Clone, Debug)]
pub struct LayerManager {
    layers: Vec<Layer>,
    current: usize,
}

impl LayerManager {
    pub fn new(first: Layer) -> Self {
        Self {
            layers: vec![first],
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Layer> {
        self.layers.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &Layer {
        &self.layers[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.current]
    }

    /// Select a layer; out-of-range indices are ignored.
    pub fn set_current(&mut self, index: usize) {
        if index < self.layers.len() {
            self.current = index;
        }
    }

    /// Append a layer on top.  The selection does not move.
    pub fn add(&mut self, pixels: PixelGrid, name: String, blend_mode: BlendMode) {
        self.layers.push(Layer::from_grid(name, pixels, blend_mode));
        if self.layers.len() > MAX_RECOMMENDED_LAYERS {
            tracing::warn!(
                "{} layers exceeds the recommended maximum of {}",
                self.layers.len(),
                MAX_RECOMMENDED_LAYERS
            );
        }
    }

    /// Remove and return the layer at `index`, clamping the cursor to the new
    /// top.  Removing the final layer is the caller's responsibility to refuse.
    pub fn remove(&mut self, index: usize) -> Option<Layer> {
        if index >= self.layers.len() {
            return None;
        }
        let removed = self.layers.remove(index);
        self.current = self.current.min(self.layers.len().saturating_sub(1));
        Some(removed)
    }

    /// Move the layer at `index` so that it ends up at `destination`.
    pub fn move_layer(&mut self, index: usize, destination: usize) {
        if index >= self.layers.len() || destination >= self.layers.len() {
            return;
        }
        let layer = self.layers.remove(index);
        self.layers.insert(destination, layer);
    }

    pub fn rename(&mut self, index: usize, name: String) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.name = name;
        }
    }

    pub fn set_blend_mode(&mut self, index: usize, blend_mode: BlendMode) {
        if let Some(layer) = self.layers.get_mut(index) {
            layer.blend_mode = blend_mode;
        }
    }

    /// Copy the layer at `index` directly above itself and select the copy.
    pub fn duplicate(&mut self, index: usize) -> bool {
        let Some(src) = self.layers.get(index) else {
            return false;
        };
        let mut dup = src.clone();
        dup.name = format!("{} Copy", src.name);

        let new_idx = index + 1;
        self.layers.insert(new_idx, dup);
        self.current = new_idx;
        true
    }

    /// Swap in a whole stack (history restore).  An empty stack is rejected.
    pub fn replace_all(&mut self, layers: Vec<Layer>, current: usize) {
        if layers.is_empty() {
            tracing::warn!("LayerManager::replace_all: refusing empty layer stack");
            return;
        }
        self.current = current.min(layers.len() - 1);
        self.layers = layers;
    }

    /// Compositor input, bottom to top.  When `preview` is given it stands in
    /// for the current layer's pixels.
    pub fn composite_layers<'a>(&'a self, preview: Option<&'a PixelGrid>) -> Vec<CompositeLayer<'a>> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, layer)| CompositeLayer {
                pixels: match preview {
                    Some(p) if i == self.current => p,
                    _ => &layer.pixels,
                },
                blend_mode: layer.blend_mode,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn named(name: &str) -> Layer {
        Layer::new(name.to_string(), 2, 2, Rgba([0, 0, 0, 255]))
    }

    fn names(manager: &LayerManager) -> Vec<&str> {
        manager.iter().map(|l| l.name.as_str()).collect()
    }

    fn stack(count: usize) -> LayerManager {
        let mut manager = LayerManager::new(named("L0"));
        for i in 1..count {
            manager.add(PixelGrid::new(2, 2), format!("L{i}"), BlendMode::Normal);
        }
        manager
    }

    #[test]
    fn test_add_appends_without_moving_cursor() {
        let manager = stack(3);
        assert_eq!(names(&manager), vec!["L0", "L1", "L2"]);
        assert_eq!(manager.current_index(), 0);
    }

    #[test]
    fn test_set_current_ignores_out_of_range() {
        let mut manager = stack(3);
        manager.set_current(2);
        assert_eq!(manager.current_index(), 2);
        manager.set_current(3);
        assert_eq!(manager.current_index(), 2);
        assert_eq!(manager.current().name, "L2");
    }

    #[test]
    fn test_remove_clamps_cursor() {
        let mut manager = stack(3);
        manager.set_current(2);
        let removed = manager.remove(2).unwrap();
        assert_eq!(removed.name, "L2");
        assert_eq!(manager.current_index(), 1);
        assert!(manager.remove(5).is_none());
    }

    #[test]
    fn test_remove_below_cursor_keeps_index() {
        let mut manager = stack(3);
        manager.set_current(1);
        manager.remove(0);
        assert_eq!(manager.current_index(), 1);
        assert_eq!(manager.current().name, "L2");
    }

    #[test]
    fn test_move_layer() {
        let mut manager = stack(4);
        manager.move_layer(0, 2);
        assert_eq!(names(&manager), vec!["L1", "L2", "L0", "L3"]);
        manager.move_layer(3, 0);
        assert_eq!(names(&manager), vec!["L3", "L1", "L2", "L0"]);
    }

    #[test]
    fn test_move_layer_out_of_range_is_noop() {
        let mut manager = stack(3);
        manager.move_layer(0, 3);
        manager.move_layer(7, 0);
        assert_eq!(names(&manager), vec!["L0", "L1", "L2"]);
    }

    #[test]
    fn test_rename_and_blend_mode() {
        let mut manager = stack(2);
        manager.rename(1, "Ink".into());
        manager.set_blend_mode(1, BlendMode::Normal);
        manager.rename(9, "ignored".into());
        assert_eq!(names(&manager), vec!["L0", "Ink"]);
    }

    #[test]
    fn test_duplicate_inserts_above_and_selects() {
        let mut manager = stack(2);
        assert!(manager.duplicate(0));
        assert_eq!(names(&manager), vec!["L0", "L0 Copy", "L1"]);
        assert_eq!(manager.current_index(), 1);
        assert!(!manager.duplicate(10));
    }

    #[test]
    fn test_replace_all_clamps_cursor() {
        let mut manager = stack(1);
        manager.replace_all(vec![named("A"), named("B")], 5);
        assert_eq!(manager.current_index(), 1);
        manager.replace_all(Vec::new(), 0);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_composite_layers_substitutes_preview() {
        let mut manager = stack(3);
        manager.set_current(1);
        let preview = PixelGrid::new_filled(2, 2, Rgba([1, 2, 3, 4]));
        let input = manager.composite_layers(Some(&preview));
        assert_eq!(input.len(), 3);
        assert!(std::ptr::eq(input[1].pixels, &preview));
        assert!(std::ptr::eq(input[0].pixels, &manager.layers()[0].pixels));

        let plain = manager.composite_layers(None);
        assert!(std::ptr::eq(plain[1].pixels, &manager.layers()[1].pixels));
    }
}

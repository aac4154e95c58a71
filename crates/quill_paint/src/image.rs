use std::sync::Arc;

use quill_core::{ISize, Rect};
use quill_gpu::Texture;

/// A rendered or uploaded texture that can be drawn
#[derive(Clone, Debug)]
pub struct Image {
    texture: Arc<Texture>,
}

impl Image {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self { texture }
    }

    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn size(&self) -> ISize {
        self.texture.size()
    }

    /// Full image bounds in pixels
    pub fn bounds(&self) -> Rect {
        Rect::from(self.size().to_size())
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture)
    }
}

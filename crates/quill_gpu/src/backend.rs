//! The seam between recorded render passes and whatever executes them

use crate::allocator::Allocator;
use crate::command::RenderPass;
use crate::Result;

/// Executes render passes
///
/// Passes are executed in submission order. A pass that samples a texture
/// must be submitted after the pass that rendered it.
pub trait Backend {
    fn name(&self) -> &'static str;

    fn allocator(&self) -> &dyn Allocator;

    fn submit(&mut self, pass: RenderPass) -> Result<()>;
}

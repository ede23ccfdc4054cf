//! Reusable layer surfaces.

use render::Surface;

/// Frame-sized premultiplied surfaces handed out per layer and returned after
/// compositing, so steady-state rendering does not allocate.
#[derive(Debug)]
pub struct SurfacePool {
    width: u32,
    height: u32,
    free: Vec<Surface>,
    allocated: usize,
}

impl SurfacePool {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: Vec::new(),
            allocated: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Drop pooled surfaces if the frame size changed.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (self.width, self.height) != (width, height) {
            self.width = width;
            self.height = height;
            self.free.clear();
            self.allocated = 0;
        }
    }

    /// A cleared surface of the pool's size.
    pub fn acquire(&mut self) -> Surface {
        match self.free.pop() {
            Some(mut surface) => {
                surface.clear();
                surface
            }
            None => {
                self.allocated += 1;
                Surface::premultiplied(self.width, self.height)
            }
        }
    }

    /// Return a surface. Surfaces of another size are dropped.
    pub fn release(&mut self, surface: Surface) {
        if surface.size() == (self.width, self.height) && surface.depth().is_none() {
            self.free.push(surface);
        }
    }

    /// Surfaces created since the last resize.
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

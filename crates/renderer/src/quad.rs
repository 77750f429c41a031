use tracing::debug;

use crate::backend::{BufferId, GraphicsBackend, VertexLayout};

/// Triangle-strip corners covering clip space: bottom-left, bottom-right,
/// top-left, top-right.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
pub const QUAD_VERTEX_COUNT: u32 = 4;
pub const QUAD_COMPONENTS: u32 = 2;

/// Static vertex buffer the fragment stage is rasterised through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullScreenQuad {
    buffer: BufferId,
}

impl FullScreenQuad {
    pub fn create<B: GraphicsBackend + ?Sized>(backend: &mut B) -> Self {
        let buffer = backend.create_vertex_buffer(&QUAD_VERTICES);
        debug!(buffer = buffer.raw(), "uploaded full-screen quad");
        Self { buffer }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn layout(&self) -> VertexLayout {
        VertexLayout::packed_f32(QUAD_COMPONENTS)
    }

    pub fn vertex_count(&self) -> u32 {
        QUAD_VERTEX_COUNT
    }

    pub fn release<B: GraphicsBackend + ?Sized>(self, backend: &mut B) {
        debug!(buffer = self.buffer.raw(), "releasing full-screen quad");
        backend.delete_buffer(self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendCall, RecordingBackend};

    #[test]
    fn quad_spans_clip_space_as_a_strip() {
        let mut backend = RecordingBackend::new();
        let quad = FullScreenQuad::create(&mut backend);

        let uploaded = backend
            .calls()
            .iter()
            .find_map(|call| match call {
                BackendCall::CreateBuffer(_, data) => Some(data.clone()),
                _ => None,
            })
            .expect("buffer upload");
        assert_eq!(uploaded, QUAD_VERTICES.to_vec());
        assert_eq!(quad.vertex_count() * quad.layout().components, 8);

        let xs: Vec<f32> = uploaded.iter().step_by(2).copied().collect();
        let ys: Vec<f32> = uploaded.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn release_deletes_buffer() {
        let mut backend = RecordingBackend::new();
        let quad = FullScreenQuad::create(&mut backend);
        quad.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }
}

use crate::backend::UniformKind;

use super::reflect::UniformSlot;

/// CPU mirror of one uniform block; flushed to the GPU buffer before a draw.
#[derive(Debug, Clone)]
pub(crate) struct UniformStaging {
    bytes: Vec<u8>,
    dirty: bool,
}

/// A typed value headed for a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

impl UniformValue {
    fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
        }
    }
}

impl UniformStaging {
    pub fn new(size: u32) -> Self {
        Self {
            bytes: vec![0; size as usize],
            // Upload the zeroed block once so unset members read as zero.
            dirty: true,
        }
    }

    /// Writes `value` at the slot's offset. Returns `false` and leaves the
    /// block untouched if the value's shape does not match the slot or it
    /// would overrun the block.
    pub fn write(&mut self, slot: &UniformSlot, value: UniformValue) -> bool {
        if slot.kind != value.kind() {
            return false;
        }
        let start = slot.offset as usize;
        let end = start + slot.kind.byte_len();
        let Some(target) = self.bytes.get_mut(start..end) else {
            return false;
        };
        match value {
            UniformValue::Float(value) => target.copy_from_slice(bytemuck::bytes_of(&value)),
            UniformValue::Vec2(value) => target.copy_from_slice(bytemuck::cast_slice(&value)),
        }
        self.dirty = true;
        true
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns whether an upload is needed and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

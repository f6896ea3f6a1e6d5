//! Binding slots remember what was last left active at every binding point, so consecutive
//! draws sharing resources do not enable them over and over again.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::buffer::VertexBinding;
use crate::errors::*;
use crate::resource::{ResourceId, TextureUnit};
use crate::texture::TextureKind;

/// The content of one binding point, `None` when nothing is known to be active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot<K> {
    current: Option<K>,
}

impl<K> Default for Slot<K> {
    fn default() -> Self {
        Slot { current: None }
    }
}

impl<K: Copy + PartialEq> Slot<K> {
    #[inline]
    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Forgets the active key without deactivating it.
    #[inline]
    pub fn reset(&mut self) -> Option<K> {
        self.current.take()
    }

    /// Makes `key` the active one. If it already is, nothing happens. Otherwise the previous
    /// key is deactivated with `disable` before `enable` is called. Returns whether `enable`
    /// has been called.
    ///
    /// If any of the callbacks fails, the slot is left empty.
    pub fn enable_if_changed<C, FD, FE>(
        &mut self,
        ctx: &mut C,
        key: K,
        disable: FD,
        enable: FE,
    ) -> Result<bool>
    where
        FD: FnOnce(&mut C, K) -> Result<()>,
        FE: FnOnce(&mut C) -> Result<()>,
    {
        if self.current == Some(key) {
            return Ok(false);
        }

        if let Some(previous) = self.current.take() {
            disable(ctx, previous)?;
        }

        enable(ctx)?;
        self.current = Some(key);
        Ok(true)
    }

    /// Empties the slot if it holds a key matching `f`.
    pub fn forget<F: Fn(&K) -> bool>(&mut self, f: F) -> bool {
        if self.current.as_ref().map(f).unwrap_or(false) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureUnitSlots {
    pub texture: Slot<(ResourceId, TextureKind)>,
    pub sampler: Slot<ResourceId>,
}

/// Every binding point of a context.
#[derive(Debug, Clone)]
pub struct BindingSlots {
    pub vertex_format: Slot<ResourceId>,
    pub vertex_buffers: BTreeMap<u32, Slot<(ResourceId, VertexBinding)>>,
    pub index_buffer: Slot<ResourceId>,
    pub shader: Slot<ResourceId>,
    pub shader_buffer: Slot<ResourceId>,
    pub textures: SmallVec<[TextureUnitSlots; 8]>,
}

impl BindingSlots {
    pub fn new(texture_units: usize) -> Self {
        BindingSlots {
            vertex_format: Slot::default(),
            vertex_buffers: BTreeMap::new(),
            index_buffer: Slot::default(),
            shader: Slot::default(),
            shader_buffer: Slot::default(),
            textures: (0..texture_units).map(|_| TextureUnitSlots::default()).collect(),
        }
    }

    pub fn vertex_buffer(&mut self, index: u32) -> &mut Slot<(ResourceId, VertexBinding)> {
        self.vertex_buffers.entry(index).or_insert_with(Slot::default)
    }

    pub fn texture_unit(&mut self, unit: TextureUnit) -> Result<&mut TextureUnitSlots> {
        let len = self.textures.len();
        self.textures.get_mut(unit.index()).ok_or_else(|| {
            Error::InvalidState(format!("{:?} exceeds the {} texture units", unit, len))
        })
    }

    /// Forgets the vertex buffers and index buffer. They belong to the vertex format
    /// they were enabled with.
    pub fn reset_vertex_input(&mut self) {
        self.vertex_buffers.clear();
        self.index_buffer.reset();
    }

    /// Forgets everything, e.g. after the context has been touched behind our back.
    pub fn reset(&mut self) {
        self.vertex_format.reset();
        self.reset_vertex_input();
        self.shader.reset();
        self.shader_buffer.reset();

        for v in &mut self.textures {
            *v = TextureUnitSlots::default();
        }
    }

    /// Empties every slot holding `id`.
    pub fn forget(&mut self, id: ResourceId) {
        if self.vertex_format.forget(|&v| v == id) {
            self.reset_vertex_input();
        }

        for v in self.vertex_buffers.values_mut() {
            v.forget(|&(v, _)| v == id);
        }

        self.index_buffer.forget(|&v| v == id);
        self.shader.forget(|&v| v == id);
        self.shader_buffer.forget(|&v| v == id);

        for v in &mut self.textures {
            v.texture.forget(|&(v, _)| v == id);
            v.sampler.forget(|&v| v == id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{self, Rng};

    #[derive(Debug, PartialEq)]
    enum Call {
        Enable(u32),
        Disable(u32),
    }

    fn enable(slot: &mut Slot<u32>, calls: &mut Vec<Call>, key: u32) -> bool {
        slot.enable_if_changed(
            calls,
            key,
            |calls, prev| {
                calls.push(Call::Disable(prev));
                Ok(())
            },
            |calls| {
                calls.push(Call::Enable(key));
                Ok(())
            },
        )
        .unwrap()
    }

    #[test]
    fn dedupe() {
        let mut slot = Slot::default();
        let mut calls = Vec::new();

        assert!(enable(&mut slot, &mut calls, 1));
        assert!(!enable(&mut slot, &mut calls, 1));
        assert_eq!(calls, vec![Call::Enable(1)]);

        calls.clear();
        assert!(enable(&mut slot, &mut calls, 2));
        assert_eq!(calls, vec![Call::Disable(1), Call::Enable(2)]);
        assert_eq!(slot.current(), Some(2));
    }

    #[test]
    fn failure_empties() {
        let mut slot = Slot::default();
        let mut calls = Vec::new();
        enable(&mut slot, &mut calls, 1);

        let result = slot.enable_if_changed(
            &mut calls,
            2,
            |_, _| Ok(()),
            |_| Err(Error::Backend("lost".into())),
        );

        assert!(result.is_err());
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn random_sequence() {
        let mut rng = rand::thread_rng();
        let mut slot = Slot::default();
        let mut calls = Vec::new();
        let mut model: Option<u32> = None;

        for _ in 0..1024 {
            let key = rng.gen_range(0, 4);
            calls.clear();
            enable(&mut slot, &mut calls, key);

            let expected = match model {
                Some(v) if v == key => vec![],
                Some(v) => vec![Call::Disable(v), Call::Enable(key)],
                None => vec![Call::Enable(key)],
            };

            assert_eq!(calls, expected);
            model = Some(key);
        }
    }

    #[test]
    fn forget() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        let mut slots = BindingSlots::new(2);
        let binding = VertexBinding {
            index: 0,
            offset: 0,
            stride: 4,
        };

        slots.vertex_format.current = Some(a);
        slots.vertex_buffer(0).current = Some((b, binding));
        slots.index_buffer.current = Some(b);
        slots.texture_unit(TextureUnit(1)).unwrap().texture.current = Some((b, TextureKind::D2));
        assert!(slots.texture_unit(TextureUnit(2)).is_err());

        slots.forget(b);
        assert_eq!(slots.vertex_format.current(), Some(a));
        assert_eq!(slots.vertex_buffer(0).current(), None);
        assert_eq!(slots.index_buffer.current(), None);
        assert_eq!(slots.textures[1].texture.current(), None);

        slots.index_buffer.current = Some(b);
        slots.forget(a);
        assert_eq!(slots.vertex_format.current(), None);
        assert_eq!(slots.index_buffer.current(), None);
    }
}

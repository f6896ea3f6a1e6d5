use super::*;

use crate::backends::{DrawCall, IndexedDraw};
use crate::visual::{Camera, Visual};

/// What a `draw` has submitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawStats {
    /// Number of passes activated.
    pub passes: usize,
    /// Number of draw-calls handed to the device. Passes with nothing to draw are skipped.
    pub submissions: usize,
}

impl<D: Device> Backend<D> {
    fn enable_texture(&mut self, texture: Texture, unit: TextureUnit) -> Result<()> {
        match texture {
            Texture::D1(v) => self.enable(v, unit),
            Texture::D2(v) => self.enable(v, unit),
            Texture::D2Array(v) => self.enable(v, unit),
            Texture::D3(v) => self.enable(v, unit),
            Texture::Cube(_) => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }

    fn disable_texture_id(&mut self, id: ResourceId, kind: TextureKind, unit: TextureUnit) -> Result<()> {
        match kind {
            TextureKind::D1 => self.disable_id::<Texture1D>(id, unit),
            TextureKind::D2 => self.disable_id::<Texture2D>(id, unit),
            TextureKind::D2Array => self.disable_id::<Texture2DArray>(id, unit),
            TextureKind::D3 => self.disable_id::<Texture3D>(id, unit),
            TextureKind::Cube => Err(Error::UnsupportedKind(ResourceKind::TextureCube)),
        }
    }
}

impl<D: Device> Renderer<D> {
    /// Draws `visual` with every pass of its effects, in order. Resources are enabled
    /// through the binding slots, so anything left active by a previous draw is not
    /// enabled again.
    ///
    /// The camera could be `None` for draws that do not depend on it, e.g. full-screen
    /// passes.
    pub fn draw(&mut self, camera: Option<&dyn Camera>, visual: &Visual) -> Result<DrawStats> {
        let format = visual
            .vertex_format()
            .ok_or_else(|| Error::NullResource("vertex format of visual".into()))?;

        let changed = self.slots.vertex_format.enable_if_changed(
            &mut self.backend,
            format.id(),
            |b, prev| b.disable_id::<VertexFormat>(prev, ()),
            |b| b.enable(&**format, ()),
        )?;

        if changed {
            self.slots.reset_vertex_input();
        }

        for (binding, buffer) in visual.vertex_group().iter() {
            self.slots.vertex_buffer(binding.index).enable_if_changed(
                &mut self.backend,
                (buffer.id(), binding),
                |b, (id, prev)| b.disable_id::<VertexBuffer>(id, prev),
                |b| b.enable(buffer, binding),
            )?;
        }

        if let Some(ib) = visual.index_buffer() {
            self.slots.index_buffer.enable_if_changed(
                &mut self.backend,
                ib.id(),
                |b, prev| b.disable_id::<IndexBuffer>(prev, ()),
                |b| b.enable(&**ib, ()),
            )?;
        }

        let mut stats = DrawStats::default();
        for pass in visual.passes() {
            self.changes.clear();
            self.states.apply(pass.states(), &mut self.changes);
            self.backend.apply_states(&self.changes)?;

            let shader = pass.shader();
            self.slots.shader.enable_if_changed(
                &mut self.backend,
                shader.id(),
                |b, prev| b.disable_id::<Shader>(prev, ()),
                |b| b.enable(&**shader, ()),
            )?;

            if let Some(sb) = pass.shader_buffer() {
                self.slots.shader_buffer.enable_if_changed(
                    &mut self.backend,
                    sb.id(),
                    |b, prev| b.disable_id::<ShaderBuffer>(prev, ()),
                    |b| b.enable(&**sb, ()),
                )?;
            }

            for &(unit, ref texture) in pass.textures() {
                let texture = texture.as_texture();
                if texture.kind() == TextureKind::Cube {
                    return Err(Error::UnsupportedKind(ResourceKind::TextureCube));
                }

                self.slots.texture_unit(unit)?.texture.enable_if_changed(
                    &mut self.backend,
                    (texture.id(), texture.kind()),
                    |b, (id, kind)| b.disable_texture_id(id, kind, unit),
                    |b| b.enable_texture(texture, unit),
                )?;
            }

            for &(unit, ref sampler) in pass.samplers() {
                self.slots.texture_unit(unit)?.sampler.enable_if_changed(
                    &mut self.backend,
                    sampler.id(),
                    |b, prev| b.disable_id::<Sampler>(prev, unit),
                    |b| b.enable(&**sampler, unit),
                )?;
            }

            // Values are pushed on every activation, the program could have been switched
            // since the last push.
            for uniform in pass.uniforms() {
                let location = match uniform.location() {
                    Some(location) => location,
                    None => {
                        let backend = &mut self.backend;
                        let program = backend.caches.shaders.object(shader.id()).ok_or_else(|| {
                            Error::NullResource(format!("program of {}", shader.id()))
                        })?;

                        let location = backend
                            .device
                            .uniform_location(program, uniform.name())
                            .ok_or_else(|| Error::UniformNotFound(uniform.name().to_owned()))?;

                        uniform.set_location(location);
                        location
                    }
                };

                let value = uniform.value(camera, visual);
                self.backend.device.update_uniform(location, &value)?;
            }

            stats.passes += 1;

            let call = match visual.index_buffer() {
                Some(ib) => DrawCall {
                    primitive: visual.primitive(),
                    first_vertex: 0,
                    vertex_count: ib.element_count(),
                    index: Some(IndexedDraw {
                        format: ib.format(),
                        count: ib.element_count(),
                        offset: ib.data_offset(),
                    }),
                    instances: pass.instances(),
                },
                None => DrawCall {
                    primitive: visual.primitive(),
                    first_vertex: 0,
                    vertex_count: visual.vertex_count(),
                    index: None,
                    instances: pass.instances(),
                },
            };

            if call.vertex_count == 0 {
                trace!("Skips pass {} of visual, nothing to draw.", stats.passes - 1);
                continue;
            }

            self.backend.device.draw(&call)?;
            stats.submissions += 1;
        }

        Ok(stats)
    }
}

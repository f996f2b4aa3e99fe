//! Material templates and per-decal material instances.
//!
//! A template is built once per decal kind from the kind's projector shader
//! and shared read-only. Each spawned decal gets its own [`Material`] copied
//! from the template, so assigning a texture never touches the template.

use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::texture::TextureHandle;

/// Render queue of opaque geometry.
pub const GEOMETRY_QUEUE: u32 = 2000;
/// Queue projectors are moved to when their shader sorts before geometry.
pub const PROJECTOR_QUEUE: u32 = 2500;
/// Queue for transparent quads.
pub const TRANSPARENT_QUEUE: u32 = 3000;

/// Factor applied to a template's tint alpha to soften stacked decals.
const TINT_ALPHA_FACTOR: f32 = 0.9;

/// A shader program known to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    /// Default render queue of the shader.
    pub render_queue: u32,
    /// Default tint, if the shader exposes one.
    pub tint: Option<Vec4>,
    /// Whether the shader samples a companion normal map.
    pub normal_map: bool,
}

impl Shader {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            render_queue: GEOMETRY_QUEUE,
            tint: None,
            normal_map: false,
        }
    }
}

/// Shader lookup provided by the renderer. Finding a shader may compile it,
/// so the cache calls this at most once per decal kind.
pub trait ShaderLibrary: Send + Sync {
    fn find(&self, name: &str) -> Option<Shader>;
}

/// Color blending of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source alpha over one-minus-source-alpha.
    Alpha,
    Additive,
}

/// Shared, immutable material prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTemplate {
    /// `None` for the unlit fallback used by quads.
    pub shader: Option<Shader>,
    pub blend: BlendMode,
    pub tint: Vec4,
    pub texture_offset: Vec2,
    pub texture_scale: Vec2,
    /// Shader-side texture and normal animation.
    pub animated: bool,
    pub instancing: bool,
    pub render_queue: u32,
}

/// Shared handle to a template.
pub type TemplateHandle = Arc<MaterialTemplate>;

impl MaterialTemplate {
    /// Canonical projector configuration for `shader`: no animation,
    /// standard alpha blending, reset texture offset and scale, tint alpha
    /// scaled down and clamped.
    #[must_use]
    pub fn projector(shader: Shader) -> Self {
        let tint = shader.tint.map_or(Vec4::ONE, |tint| {
            tint.with_w((tint.w * TINT_ALPHA_FACTOR).clamp(0.0, 1.0))
        });
        Self {
            blend: BlendMode::Alpha,
            tint,
            texture_offset: Vec2::ZERO,
            texture_scale: Vec2::ONE,
            animated: false,
            instancing: true,
            render_queue: shader.render_queue,
            shader: Some(shader),
        }
    }

    /// Unlit white transparent material for quad decals.
    #[must_use]
    pub fn unlit_quad() -> Self {
        Self {
            shader: None,
            blend: BlendMode::Alpha,
            tint: Vec4::ONE,
            texture_offset: Vec2::ZERO,
            texture_scale: Vec2::ONE,
            animated: false,
            instancing: false,
            render_queue: TRANSPARENT_QUEUE,
        }
    }
}

/// Per-decal material instance.
#[derive(Debug, Clone)]
pub struct Material {
    template: TemplateHandle,
    pub texture: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
    pub texture_offset: Vec2,
    pub texture_scale: Vec2,
    pub render_queue: u32,
}

impl Material {
    /// Copy a template; no shader work happens here.
    #[must_use]
    pub fn from_template(template: &TemplateHandle) -> Self {
        Self {
            template: Arc::clone(template),
            texture: None,
            normal_map: None,
            texture_offset: template.texture_offset,
            texture_scale: template.texture_scale,
            render_queue: template.render_queue,
        }
    }

    /// Material for a projector decal, moved into the projector queue if its
    /// shader would sort before geometry.
    #[must_use]
    pub fn for_projector(template: &TemplateHandle) -> Self {
        let mut material = Self::from_template(template);
        if material.render_queue < GEOMETRY_QUEUE {
            material.render_queue = PROJECTOR_QUEUE;
        }
        material
    }

    /// Fresh unlit quad material.
    #[must_use]
    pub fn unlit_quad() -> Self {
        Self::from_template(&Arc::new(MaterialTemplate::unlit_quad()))
    }

    #[must_use]
    pub fn template(&self) -> &TemplateHandle {
        &self.template
    }

    /// Assign the main texture, and the normal map when the shader uses one.
    pub fn set_texture(&mut self, texture: TextureHandle, normal_map: Option<TextureHandle>) {
        self.texture = Some(texture);
        self.normal_map = normal_map.filter(|_| {
            self.template
                .shader
                .as_ref()
                .is_some_and(|shader| shader.normal_map)
        });
        self.texture_offset = Vec2::ZERO;
        self.texture_scale = Vec2::ONE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;

    #[test]
    fn projector_template_is_canonical() {
        let shader = Shader {
            tint: Some(Vec4::new(1.0, 0.5, 0.5, 1.0)),
            ..Shader::new("decal/projector")
        };
        let template = MaterialTemplate::projector(shader);
        assert_eq!(template.blend, BlendMode::Alpha);
        assert!(!template.animated);
        assert_eq!(template.texture_offset, Vec2::ZERO);
        assert_eq!(template.texture_scale, Vec2::ONE);
        assert!((template.tint.w - 0.9).abs() < 1e-6);
        assert_eq!(template.tint.x, 1.0);
    }

    #[test]
    fn instances_are_isolated() {
        let template = Arc::new(MaterialTemplate::projector(Shader::new("decal/spray")));
        let mut a = Material::from_template(&template);
        let b = Material::from_template(&template);

        a.set_texture(Arc::new(Texture::blank("a", 1, 1)), None);
        assert!(a.texture.is_some());
        assert!(b.texture.is_none());
        assert!(Arc::ptr_eq(a.template(), b.template()));
    }

    #[test]
    fn projector_queue_is_raised_above_geometry() {
        let shader = Shader {
            render_queue: 1000,
            ..Shader::new("decal/projector")
        };
        let template = Arc::new(MaterialTemplate::projector(shader));
        assert_eq!(Material::for_projector(&template).render_queue, PROJECTOR_QUEUE);

        let shader = Shader {
            render_queue: 3100,
            ..Shader::new("decal/projector")
        };
        let template = Arc::new(MaterialTemplate::projector(shader));
        assert_eq!(Material::for_projector(&template).render_queue, 3100);
    }

    #[test]
    fn normal_map_needs_shader_support() {
        let texture = Arc::new(Texture::blank("main", 2, 2));
        let normal = Arc::new(Texture::blank("normal", 2, 2));

        let mut plain = Material::unlit_quad();
        plain.set_texture(Arc::clone(&texture), Some(Arc::clone(&normal)));
        assert!(plain.normal_map.is_none());

        let shader = Shader {
            normal_map: true,
            ..Shader::new("decal/projector")
        };
        let mut lit = Material::from_template(&Arc::new(MaterialTemplate::projector(shader)));
        lit.set_texture(texture, Some(normal));
        assert!(lit.normal_map.is_some());
    }
}

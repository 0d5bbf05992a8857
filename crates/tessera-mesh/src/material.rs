//! Surface materials: shared surface properties, a shading model, and
//! optional texture maps.
//!
//! Materials are immutable once built and shared behind `Arc`. Every
//! derivation produces a new [`MaterialId`], so caches keyed by id never
//! alias a modified copy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

// ---------------------------------------------------------------------------
// MaterialId
// ---------------------------------------------------------------------------

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique material identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

impl MaterialId {
    fn next() -> Self {
        Self(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// How a texture is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sampler {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    /// Anisotropic filtering level; 1 disables it.
    pub anisotropy: u16,
    pub generate_mipmaps: bool,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            anisotropy: 1,
            generate_mipmaps: true,
        }
    }
}

/// Image metadata. Pixel data lives with the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// RGBA8 footprint of the base level.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A texture bound with a particular sampler. The image is shared; the
/// sampler belongs to the binding.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureMap {
    pub texture: Arc<Texture>,
    pub sampler: Sampler,
}

impl TextureMap {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            sampler: Sampler::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Surface and shading
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Properties every shading model shares.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceProps {
    /// Linear RGB in `[0, 1]`.
    pub color: Vec3,
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,
    pub wireframe: bool,
    pub vertex_colors: bool,
    pub map: Option<TextureMap>,
}

impl Default for SurfaceProps {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            wireframe: false,
            vertex_colors: false,
            map: None,
        }
    }
}

impl SurfaceProps {
    /// Color packed as `0xRRGGBB`.
    pub fn color_hex(&self) -> u32 {
        let c = (self.color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        ((c.x as u32) << 16) | ((c.y as u32) << 8) | c.z as u32
    }

    pub fn set_color_hex(&mut self, hex: u32) {
        self.color = Vec3::new(
            ((hex >> 16) & 0xff) as f32,
            ((hex >> 8) & 0xff) as f32,
            (hex & 0xff) as f32,
        ) / 255.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhongParams {
    pub specular: Vec3,
    pub shininess: f32,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            specular: Vec3::splat(0x11 as f32 / 255.0),
            shininess: 30.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StandardParams {
    pub roughness: f32,
    pub metalness: f32,
    pub env_map_intensity: f32,
    pub emissive_intensity: f32,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            roughness: 1.0,
            metalness: 0.0,
            env_map_intensity: 1.0,
            emissive_intensity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicalParams {
    pub standard: StandardParams,
    pub clearcoat: f32,
    pub transmission: f32,
}

/// Lighting model, ordered roughly from cheapest to most expensive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shading {
    Basic,
    Lambert,
    Phong(PhongParams),
    Standard(StandardParams),
    Physical(PhysicalParams),
}

impl Shading {
    pub fn type_name(&self) -> &'static str {
        match self {
            Shading::Basic => "MeshBasicMaterial",
            Shading::Lambert => "MeshLambertMaterial",
            Shading::Phong(_) => "MeshPhongMaterial",
            Shading::Standard(_) => "MeshStandardMaterial",
            Shading::Physical(_) => "MeshPhysicalMaterial",
        }
    }

    /// Default shading for a transport type tag.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "MeshBasicMaterial" => Shading::Basic,
            "MeshLambertMaterial" => Shading::Lambert,
            "MeshPhongMaterial" => Shading::Phong(PhongParams::default()),
            "MeshStandardMaterial" => Shading::Standard(StandardParams::default()),
            "MeshPhysicalMaterial" => Shading::Physical(PhysicalParams::default()),
            _ => return None,
        })
    }

    /// Physically based models (standard and physical).
    pub fn is_physically_based(&self) -> bool {
        matches!(self, Shading::Standard(_) | Shading::Physical(_))
    }
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    id: MaterialId,
    pub surface: SurfaceProps,
    pub shading: Shading,
}

impl Material {
    pub fn new(surface: SurfaceProps, shading: Shading) -> Self {
        Self {
            id: MaterialId::next(),
            surface,
            shading,
        }
    }

    /// Untextured material of the given shading and color.
    pub fn colored(shading: Shading, color: Vec3) -> Self {
        Self::new(
            SurfaceProps {
                color,
                ..SurfaceProps::default()
            },
            shading,
        )
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.shading.type_name()
    }

    /// Same surface under a different shading model.
    pub fn derive(&self, shading: Shading) -> Material {
        Self::new(self.surface.clone(), shading)
    }

    pub fn with_wireframe(&self, wireframe: bool) -> Material {
        let mut surface = self.surface.clone();
        surface.wireframe = wireframe;
        Self::new(surface, self.shading)
    }

    /// Same material with its texture map resampled. Returns a plain copy
    /// under a new id when there is no map.
    pub fn with_sampler(&self, sampler: Sampler) -> Material {
        let mut surface = self.surface.clone();
        if let Some(map) = surface.map.as_mut() {
            map.sampler = sampler;
        }
        Self::new(surface, self.shading)
    }

    /// Texture bytes referenced by this material.
    pub fn texture_bytes(&self) -> usize {
        self.surface
            .map
            .as_ref()
            .map_or(0, |map| map.texture.byte_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Material::colored(Shading::Basic, Vec3::ONE);
        let b = Material::colored(Shading::Basic, Vec3::ONE);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_derive_keeps_surface() {
        let standard = Material::colored(
            Shading::Standard(StandardParams::default()),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let basic = standard.derive(Shading::Basic);
        assert_ne!(basic.id(), standard.id());
        assert_eq!(basic.surface, standard.surface);
        assert_eq!(basic.type_name(), "MeshBasicMaterial");
    }

    #[test]
    fn test_with_sampler_changes_map_only() {
        let texture = Arc::new(Texture::new("albedo", 256, 256));
        let material = Material::new(
            SurfaceProps {
                map: Some(TextureMap::new(texture.clone())),
                ..SurfaceProps::default()
            },
            Shading::Lambert,
        );
        let sampler = Sampler {
            anisotropy: 8,
            ..Sampler::default()
        };
        let resampled = material.with_sampler(sampler);
        let map = resampled.surface.map.as_ref().unwrap();
        assert_eq!(map.sampler.anisotropy, 8);
        assert!(Arc::ptr_eq(&map.texture, &texture));
        assert_eq!(material.surface.map.as_ref().unwrap().sampler, Sampler::default());
        assert_eq!(resampled.texture_bytes(), 256 * 256 * 4);
    }

    #[test]
    fn test_color_hex() {
        let mut surface = SurfaceProps::default();
        surface.set_color_hex(0x3366ff);
        assert_eq!(surface.color_hex(), 0x3366ff);
        assert_eq!(SurfaceProps::default().color_hex(), 0xffffff);
    }

    #[test]
    fn test_type_names() {
        for name in [
            "MeshBasicMaterial",
            "MeshLambertMaterial",
            "MeshPhongMaterial",
            "MeshStandardMaterial",
            "MeshPhysicalMaterial",
        ] {
            assert_eq!(Shading::from_type_name(name).unwrap().type_name(), name);
        }
        assert!(Shading::from_type_name("ShaderMaterial").is_none());
        assert!(Shading::Physical(PhysicalParams::default()).is_physically_based());
        assert!(!Shading::Phong(PhongParams::default()).is_physically_based());
    }
}

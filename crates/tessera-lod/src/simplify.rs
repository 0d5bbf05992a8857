//! Pure simplification rules. Caching lives in the engine.

use tessera_config::LodConfig;
use tessera_mesh::{
    Geometry, Material, Primitive, Sampler, Shading, TextureFilter, decimate_triangles,
    stride_for_detail,
};

use crate::cache::{MaterialKey, ShadingTier, TextureTier};
use crate::level::DetailLevel;

/// Above this ratio lit physically based materials become unlit.
const UNLIT_RATIO: f32 = 0.8;
/// Above this ratio they become single-light diffuse.
const LAMBERT_RATIO: f32 = 0.5;
/// Above this ratio distant textures stop generating mipmaps.
const NO_MIPMAP_RATIO: f32 = 0.7;

/// Cache bucket for a detail fraction: whole percent.
pub(crate) fn detail_bucket(detail: f32) -> u8 {
    (detail.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Derive a reduced geometry from the original.
///
/// Known primitives are regenerated with fewer segments; anything else is
/// stride-decimated.
pub(crate) fn simplified_geometry(
    original: &Geometry,
    primitive: Option<&Primitive>,
    detail: f32,
) -> Geometry {
    match primitive {
        Some(primitive) => primitive.with_detail(detail).build(),
        None => decimate_triangles(
            original,
            stride_for_detail(original.triangle_count(), detail),
        ),
    }
}

fn shading_tier(shading: &Shading, distance_ratio: f32) -> ShadingTier {
    let tenths = (distance_ratio.clamp(0.0, 1.0) * 10.0).floor() as u8;
    let reduced = if tenths == 0 {
        ShadingTier::Original
    } else {
        ShadingTier::Reduced(tenths)
    };
    match shading {
        Shading::Standard(_) | Shading::Physical(_) => {
            if distance_ratio > UNLIT_RATIO {
                ShadingTier::Unlit
            } else if distance_ratio >= LAMBERT_RATIO {
                ShadingTier::Lambert
            } else {
                reduced
            }
        }
        Shading::Phong(_) if distance_ratio < LAMBERT_RATIO => reduced,
        _ => ShadingTier::Original,
    }
}

/// Decide which derived material an object at `level` should use.
pub(crate) fn plan_material(
    original: &Material,
    level: DetailLevel,
    distance_ratio: f32,
    config: &LodConfig,
) -> MaterialKey {
    let mut key = MaterialKey {
        source: original.id(),
        shading: ShadingTier::Original,
        wireframe: false,
        texture: TextureTier::Original,
    };
    if !level.is_reduced() {
        return key;
    }
    if config.optimize_materials {
        key.shading = shading_tier(&original.shading, distance_ratio);
    }
    key.wireframe = level == DetailLevel::Low
        && config.wireframe_for_distant
        && !original.surface.wireframe;
    if config.optimize_textures && original.surface.map.is_some() {
        key.texture = match level {
            DetailLevel::Low => TextureTier::Low {
                mipmaps: distance_ratio <= NO_MIPMAP_RATIO,
            },
            _ => TextureTier::Mild,
        };
    }
    key
}

pub(crate) fn is_identity(key: &MaterialKey) -> bool {
    key.shading == ShadingTier::Original && !key.wireframe && key.texture == TextureTier::Original
}

fn reduce_intensity(shading: Shading, factor: f32) -> Shading {
    match shading {
        Shading::Standard(mut p) => {
            p.env_map_intensity *= factor;
            p.metalness *= factor;
            Shading::Standard(p)
        }
        Shading::Physical(mut p) => {
            p.standard.env_map_intensity *= factor;
            p.standard.metalness *= factor;
            Shading::Physical(p)
        }
        Shading::Phong(mut p) => {
            p.shininess *= factor;
            Shading::Phong(p)
        }
        other => other,
    }
}

/// Build the material described by `key` from its source. Color, opacity,
/// side, map and vertex-color mode always carry over.
pub(crate) fn build_material(original: &Material, key: &MaterialKey) -> Material {
    let shading = match key.shading {
        ShadingTier::Original => original.shading,
        ShadingTier::Reduced(tenths) => {
            reduce_intensity(original.shading, 1.0 - f32::from(tenths) / 10.0)
        }
        ShadingTier::Lambert => Shading::Lambert,
        ShadingTier::Unlit => Shading::Basic,
    };
    let mut surface = original.surface.clone();
    if key.wireframe {
        surface.wireframe = true;
    }
    if let Some(map) = surface.map.as_mut() {
        match key.texture {
            TextureTier::Original => {}
            TextureTier::Mild => map.sampler.anisotropy = (map.sampler.anisotropy / 2).max(1),
            TextureTier::Low { mipmaps } => {
                map.sampler = Sampler {
                    min_filter: TextureFilter::Linear,
                    mag_filter: TextureFilter::Linear,
                    anisotropy: 1,
                    generate_mipmaps: mipmaps && map.sampler.generate_mipmaps,
                };
            }
        }
    }
    Material::new(surface, shading)
}

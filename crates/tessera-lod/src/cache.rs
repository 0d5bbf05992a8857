//! Caches of simplified geometry and derived materials.
//!
//! Entries are shared `Arc`s so every object at the same signature and
//! detail bucket renders the same instance. Eviction is by reference: an
//! entry survives cleanup only while some mesh in the scene still uses it.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tessera_mesh::{Geometry, Material, MaterialId, ShapeSignature};

/// Simplified geometry keyed by source signature and detail percentage.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: FxHashMap<(ShapeSignature, u8), Arc<Geometry>>,
}

impl GeometryCache {
    /// Return the cached entry or build, store and return a new one.
    pub fn get_or_insert_with(
        &mut self,
        signature: ShapeSignature,
        bucket: u8,
        build: impl FnOnce() -> Geometry,
    ) -> Arc<Geometry> {
        if let Some(existing) = self.entries.get(&(signature, bucket)) {
            return existing.clone();
        }
        let geometry = Arc::new(build());
        self.entries.insert((signature, bucket), geometry.clone());
        geometry
    }

    /// Drop entries whose address is not in `referenced`. Returns the number evicted.
    pub fn retain_referenced(&mut self, referenced: &FxHashSet<usize>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, g| referenced.contains(&(Arc::as_ptr(g) as usize)));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Shading change applied to a source material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadingTier {
    Original,
    /// Same model with intensities scaled down by `tenths / 10`.
    Reduced(u8),
    /// Single-light diffuse model.
    Lambert,
    /// Unlit flat color.
    Unlit,
}

/// Sampler change applied to the source material's texture map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTier {
    Original,
    /// Anisotropy halved.
    Mild,
    /// Linear filtering, no anisotropy, mipmaps optional.
    Low { mipmaps: bool },
}

/// Identity of a derived material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub source: MaterialId,
    pub shading: ShadingTier,
    pub wireframe: bool,
    pub texture: TextureTier,
}

#[derive(Debug, Default)]
pub struct MaterialCache {
    entries: FxHashMap<MaterialKey, Arc<Material>>,
}

impl MaterialCache {
    pub fn get_or_insert_with(
        &mut self,
        key: MaterialKey,
        build: impl FnOnce() -> Material,
    ) -> Arc<Material> {
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(build()))
            .clone()
    }

    pub fn retain_referenced(&mut self, referenced: &FxHashSet<usize>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, m| referenced.contains(&(Arc::as_ptr(m) as usize)));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_mesh::{Primitive, Shading};

    #[test]
    fn test_geometry_cache_reuses_entries() {
        let mut cache = GeometryCache::default();
        let source = Primitive::sphere(1.0, 8, 4).build();
        let a = cache.get_or_insert_with(source.signature(), 50, || source.duplicate());
        let b = cache.get_or_insert_with(source.signature(), 50, || unreachable!());
        let c = cache.get_or_insert_with(source.signature(), 20, || source.duplicate());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_geometry_cache_evicts_unreferenced() {
        let mut cache = GeometryCache::default();
        let source = Primitive::sphere(1.0, 8, 4).build();
        let kept = cache.get_or_insert_with(source.signature(), 50, || source.duplicate());
        let _dropped = cache.get_or_insert_with(source.signature(), 20, || source.duplicate());
        let referenced: FxHashSet<usize> = [Arc::as_ptr(&kept) as usize].into_iter().collect();
        assert_eq!(cache.retain_referenced(&referenced), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_material_cache_keyed_by_tier() {
        let mut cache = MaterialCache::default();
        let source = Material::colored(Shading::Lambert, glam::Vec3::ONE);
        let key = MaterialKey {
            source: source.id(),
            shading: ShadingTier::Unlit,
            wireframe: false,
            texture: TextureTier::Original,
        };
        let a = cache.get_or_insert_with(key, || source.derive(Shading::Basic));
        let b = cache.get_or_insert_with(key, || unreachable!());
        assert!(Arc::ptr_eq(&a, &b));
        let wire = MaterialKey {
            wireframe: true,
            ..key
        };
        let c = cache.get_or_insert_with(wire, || source.with_wireframe(true));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }
}

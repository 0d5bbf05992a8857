//! Errors produced while validating or constructing geometry.

/// Reasons a geometry or a geometry operation is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// An attribute declares an item size the kernel cannot interpret.
    #[error("attribute `{attribute}` must have item size {expected}, got {found}")]
    InvalidItemSize {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    /// A buffer length is not a whole number of items.
    #[error("attribute `{attribute}` holds {len} values, not a multiple of {item_size}")]
    MisalignedBuffer {
        attribute: &'static str,
        len: usize,
        item_size: usize,
    },

    /// An optional attribute does not cover every vertex.
    #[error("attribute `{attribute}` has {found} items but the geometry has {expected} vertices")]
    CountMismatch {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    /// The index buffer references a vertex that does not exist.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// A profile or outline has too few points.
    #[error("need at least {required} points, got {found}")]
    TooFewPoints { required: usize, found: usize },

    /// An outline encloses no area.
    #[error("shape outline encloses no area")]
    DegenerateShape,

    /// A numeric parameter is outside its legal range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// A boolean operation name was not recognised.
    #[error("unknown boolean operation `{0}` (expected union, subtract or intersect)")]
    UnknownOperation(String),
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for cull tree operations.

use crate::drawable::DrawableId;

/// Why a bounding rectangle was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum GeometryFault {
    /// A coordinate was NaN or infinite (usually a failed projection upstream).
    #[error("non-finite coordinate")]
    NonFinite,
    /// A minimum corner lies past its maximum corner.
    #[error("minimum corner exceeds maximum corner")]
    Inverted,
    /// The rectangle does not touch the tree's world extent.
    #[error("outside the world extent")]
    OutsideExtent,
    /// A view polygon has fewer than three corners or no area.
    #[error("view polygon has no area")]
    Degenerate,
    /// A view polygon turns both ways, or winds around more than once.
    #[error("view polygon is not convex")]
    NonConvex,
}

/// Why a [`CullConfig`][crate::CullConfig] was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ConfigFault {
    /// Fan-out must be at least 2 for a split to make progress.
    #[error("fan-out {0} is below the minimum of 2")]
    FanOutTooSmall(usize),
    /// The split threshold must be at least 1.
    #[error("split threshold must be at least 1")]
    ZeroSplitThreshold,
}

/// Errors reported by the cull tree and the drawable registry.
///
/// Structural errors are reported before any mutation takes place, so a
/// failed operation leaves the tree exactly as it was.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CullError {
    /// The drawable's local bounds cannot be placed in the tree.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryFault),

    /// A child index was past the node's fan-out, or the node has no children.
    #[error("child index {index} out of range for a node with {len} children")]
    OutOfRange {
        /// The requested child index.
        index: usize,
        /// Number of children the node actually has.
        len: usize,
    },

    /// The drawable is already held by the tree.
    #[error("drawable {0} is already in the cull tree")]
    AlreadyPresent(DrawableId),

    /// The tree configuration is unusable.
    #[error("invalid cull tree configuration: {0}")]
    InvalidConfig(#[from] ConfigFault),

    /// The drawable behind this id has been destroyed.
    #[error("drawable {0} no longer exists")]
    DanglingReference(DrawableId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_fault() {
        let err = CullError::from(GeometryFault::Inverted);
        assert_eq!(
            err.to_string(),
            "invalid geometry: minimum corner exceeds maximum corner"
        );

        let err = CullError::OutOfRange { index: 4, len: 4 };
        assert_eq!(
            err.to_string(),
            "child index 4 out of range for a node with 4 children"
        );

        let err = CullError::AlreadyPresent(DrawableId(7));
        assert_eq!(err.to_string(), "drawable #7 is already in the cull tree");

        let err = CullError::from(ConfigFault::FanOutTooSmall(1));
        assert_eq!(
            err.to_string(),
            "invalid cull tree configuration: fan-out 1 is below the minimum of 2"
        );
    }

    #[test]
    fn faults_are_error_sources() {
        use core::error::Error;

        let err = CullError::from(GeometryFault::NonConvex);
        assert_eq!(err, CullError::InvalidGeometry(GeometryFault::NonConvex));
        let source = err.source().map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("view polygon is not convex"));
        assert!(CullError::AlreadyPresent(DrawableId(1)).source().is_none());
    }
}

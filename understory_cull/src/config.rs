// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning parameters for a cull tree.

use crate::error::{ConfigFault, CullError};

/// Subdivision policy for a [`CullTree`][crate::CullTree].
///
/// Nodes split lazily: a node below `max_depth` subdivides into `fan_out`
/// children the first time a drawable that fits a single child arrives while
/// the node already holds `split_threshold` drawables. Denser datasets
/// usually want a larger threshold; deep zoom ranges want a larger depth.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CullConfig {
    /// Deepest level a node may live at. The root is depth 0; nodes at this
    /// depth never subdivide.
    pub max_depth: u32,
    /// Direct drawable count at which a childless node splits.
    pub split_threshold: usize,
    /// Number of children per split (4 for a quad split).
    pub fan_out: usize,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            split_threshold: 8,
            fan_out: 4,
        }
    }
}

impl CullConfig {
    /// Default policy with the given maximum depth.
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Set the maximum depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the split threshold.
    pub fn with_split_threshold(mut self, split_threshold: usize) -> Self {
        self.split_threshold = split_threshold;
        self
    }

    /// Set the fan-out.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Check that the policy can make progress.
    pub fn validate(&self) -> Result<(), CullError> {
        if self.fan_out < 2 {
            return Err(ConfigFault::FanOutTooSmall(self.fan_out).into());
        }
        if self.split_threshold == 0 {
            return Err(ConfigFault::ZeroSplitThreshold.into());
        }
        Ok(())
    }
}

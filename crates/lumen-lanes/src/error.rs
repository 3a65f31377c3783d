// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors raised by the render lanes.

use lumen_core::renderer::{RenderError, ResourceError};
use thiserror::Error;

/// The ways a lane can fail to produce its result.
///
/// A failed lane leaves no GPU resources behind: everything it allocated is
/// released when the error propagates.
#[derive(Error, Debug)]
pub enum LaneError {
    /// Creating or using a GPU resource failed.
    #[error("GPU resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The input texture has a zero dimension.
    #[error("texture '{label}' is empty")]
    EmptySource {
        /// Label of the offending texture.
        label: String,
    },

    /// The input texture has no shader view.
    #[error("texture '{label}' cannot be sampled")]
    NotSampled {
        /// Label of the offending texture.
        label: String,
    },

    /// The final pyramid level read back nothing.
    #[error("luminance readback returned no texels")]
    EmptyReadback,

    /// A camera produced a view-projection that cannot be inverted.
    #[error("view-projection for '{0}' is singular")]
    SingularView(String),

    /// No WGSL source exists for the program.
    #[error("no shader source for program '{0}'")]
    MissingProgram(&'static str),
}

impl From<LaneError> for RenderError {
    fn from(err: LaneError) -> Self {
        match err {
            LaneError::Resource(e) => RenderError::ResourceError(e),
            other => RenderError::RenderingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_errors_keep_their_kind_in_render_error() {
        let err: RenderError = LaneError::from(ResourceError::OutOfBounds).into();
        assert!(matches!(
            err,
            RenderError::ResourceError(ResourceError::OutOfBounds)
        ));
    }

    #[test]
    fn test_lane_specific_errors_become_rendering_failures() {
        let err: RenderError = LaneError::EmptySource {
            label: "hdr".to_string(),
        }
        .into();
        match err {
            RenderError::RenderingFailed(msg) => assert_eq!(msg, "texture 'hdr' is empty"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

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

//! Error types of the rendering contracts.
//!
//! Backend failures surface as [`ResourceError`]; orchestration failures as
//! [`RenderError`], which wraps them.

use crate::renderer::api::pipeline::RenderPipelineId;
use crate::renderer::api::shader::ShaderModuleId;
use std::fmt;

/// An error raised while creating or looking up a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The requested shader module does not exist.
    NotFound {
        /// The missing module.
        id: ShaderModuleId,
    },
    /// The backend has no implementation of the program the module declares.
    UnsupportedProgram {
        /// Label of the module.
        label: String,
        /// Name of the program.
        program: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::NotFound { id } => write!(f, "No shader module {id:?}"),
            ShaderError::UnsupportedProgram { label, program } => {
                write!(f, "Shader '{label}' uses unsupported program '{program}'")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error raised while creating or binding a render pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The backend rejected the pipeline.
    CompilationFailed {
        /// Label of the pipeline.
        label: Option<String>,
        /// Backend message.
        details: String,
    },
    /// The pipeline names a shader module that does not exist.
    InvalidShaderModuleForPipeline {
        /// The missing module.
        id: ShaderModuleId,
        /// Label of the pipeline.
        pipeline_label: Option<String>,
    },
    /// The pipeline handle is unknown.
    InvalidRenderPipeline {
        /// The unknown handle.
        id: RenderPipelineId,
    },
    /// The program cannot write the requested color target format.
    IncompatibleColorTarget(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::CompilationFailed { label, details } => write!(
                f,
                "Pipeline '{}' failed to build: {details}",
                label.as_deref().unwrap_or("unlabelled")
            ),
            PipelineError::InvalidShaderModuleForPipeline { id, pipeline_label } => write!(
                f,
                "Pipeline '{}' references missing shader module {id:?}",
                pipeline_label.as_deref().unwrap_or("unlabelled")
            ),
            PipelineError::InvalidRenderPipeline { id } => write!(f, "No render pipeline {id:?}"),
            PipelineError::IncompatibleColorTarget(msg) => {
                write!(f, "Incompatible color target: {msg}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// An error raised by a backend while creating, using or destroying a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader module error.
    Shader(ShaderError),
    /// A pipeline error.
    Pipeline(PipelineError),
    /// No resource has the given handle.
    NotFound,
    /// The handle cannot be used for this operation.
    InvalidHandle,
    /// The backend failed, e.g. out of memory or a poisoned lock.
    BackendError(String),
    /// A size, face or range lies outside the resource.
    OutOfBounds,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline error: {err}"),
            ResourceError::NotFound => write!(f, "Resource not found."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle."),
            ResourceError::BackendError(msg) => write!(f, "Backend error: {msg}"),
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

/// An error raised while setting up or rendering a frame.
#[derive(Debug)]
pub enum RenderError {
    /// A unit or lane was used before its resources were created.
    NotInitialized,
    /// Setup failed, e.g. invalid settings or no adapter.
    InitializationFailed(String),
    /// A frame could not be rendered.
    RenderingFailed(String),
    /// A GPU resource operation failed.
    ResourceError(ResourceError),
    /// Something that should not happen did.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => write!(f, "Not initialized."),
            RenderError::InitializationFailed(msg) => write!(f, "Initialization failed: {msg}"),
            RenderError::RenderingFailed(msg) => write!(f, "Rendering failed: {msg}"),
            RenderError::ResourceError(err) => write!(f, "Resource operation failed: {err}"),
            RenderError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::UnsupportedProgram {
            label: "sky".to_string(),
            program: "custom".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader 'sky' uses unsupported program 'custom'"
        );
    }

    #[test]
    fn resource_error_wraps_shader_error() {
        let res_err: ResourceError = ShaderError::NotFound {
            id: ShaderModuleId(42),
        }
        .into();
        assert_eq!(
            format!("{res_err}"),
            "Shader error: No shader module ShaderModuleId(42)"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn render_error_wraps_resource_error() {
        let render_err: RenderError = ResourceError::OutOfBounds.into();
        assert_eq!(
            format!("{render_err}"),
            "Resource operation failed: Resource access out of bounds."
        );
        let source = render_err.source().unwrap();
        assert!(source.source().is_none());
    }
}

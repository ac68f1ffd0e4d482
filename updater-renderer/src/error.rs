//! Error types for updater-renderer.

use thiserror::Error;

/// All errors that can arise from compiling or rendering PR templates.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A configured template does not compile. Raised at load time, before
    /// any package is processed.
    #[error("template {name} does not compile: {source}")]
    Compile {
        name: &'static str,
        #[source]
        source: tera::Error,
    },

    /// Rendering a compiled template failed.
    #[error("failed to render template {name}: {source}")]
    Render {
        name: &'static str,
        #[source]
        source: tera::Error,
    },

    /// The context could not be converted into a tera context.
    #[error("context serialization error: {0}")]
    Context(#[from] tera::Error),
}

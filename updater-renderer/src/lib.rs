//! # updater-renderer
//!
//! Tera-based engine that renders pull request titles and bodies from the
//! templates in `aqua-registry-updater.yaml`.
//!
//! Templates are written with Go-style field references (`{{.PackageName}}`);
//! they are translated to Tera expressions when compiled.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use updater_core::config::Templates;
//! use updater_core::PackageName;
//! use updater_renderer::{PrTemplates, TemplateContext};
//!
//! fn title() -> Option<String> {
//!     let templates = PrTemplates::compile(&Templates::defaults()).ok()?;
//!     let ctx = TemplateContext::for_update(&PackageName::from("cli/cli"), "v2.0.0", "v2.1.0");
//!     templates.render_update(&ctx).ok().map(|pr| pr.title)
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{PrTemplates, RenderedPr, TemplateKind};
pub use error::RenderError;

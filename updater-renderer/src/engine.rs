//! Tera rendering engine: [`TemplateKind`] enum and [`PrTemplates`].
//!
//! # Template kinds
//!
//! | Kind                | Used for                              |
//! |---------------------|---------------------------------------|
//! | `pr_title`          | version update PR title               |
//! | `pr_body`           | version update PR body                |
//! | `transfer_pr_title` | repository transfer PR title          |
//! | `transfer_pr_body`  | repository transfer PR body           |
//! | `scaffold_pr_title` | re-scaffold PR title (validated only) |
//! | `scaffold_pr_body`  | re-scaffold PR body (validated only)  |

use tera::Tera;

use updater_core::config::Templates;

use crate::context::TemplateContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// TemplateKind
// ---------------------------------------------------------------------------

/// Every configurable PR template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    PrTitle,
    PrBody,
    TransferPrTitle,
    TransferPrBody,
    ScaffoldPrTitle,
    ScaffoldPrBody,
}

impl TemplateKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [TemplateKind] {
        &[
            TemplateKind::PrTitle,
            TemplateKind::PrBody,
            TemplateKind::TransferPrTitle,
            TemplateKind::TransferPrBody,
            TemplateKind::ScaffoldPrTitle,
            TemplateKind::ScaffoldPrBody,
        ]
    }

    /// Registered template name; also the config key.
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::PrTitle         => "pr_title",
            TemplateKind::PrBody          => "pr_body",
            TemplateKind::TransferPrTitle => "transfer_pr_title",
            TemplateKind::TransferPrBody  => "transfer_pr_body",
            TemplateKind::ScaffoldPrTitle => "scaffold_pr_title",
            TemplateKind::ScaffoldPrBody  => "scaffold_pr_body",
        }
    }

    /// The configured source text for this kind.
    pub fn source<'a>(&self, templates: &'a Templates) -> &'a str {
        match self {
            TemplateKind::PrTitle         => &templates.pr_title,
            TemplateKind::PrBody          => &templates.pr_body,
            TemplateKind::TransferPrTitle => &templates.transfer_pr_title,
            TemplateKind::TransferPrBody  => &templates.transfer_pr_body,
            TemplateKind::ScaffoldPrTitle => &templates.scaffold_pr_title,
            TemplateKind::ScaffoldPrBody  => &templates.scaffold_pr_body,
        }
    }
}

// ---------------------------------------------------------------------------
// Go-style field references
// ---------------------------------------------------------------------------

/// Rewrite `{{.Field}}` / `{{ .Field }}` actions as Tera's `{{ Field }}`.
///
/// Anything else between braces is passed through untouched and left for
/// Tera to accept or reject. Literal text that Tera would read as a tag or a
/// comment (`{%`, `{#`) is wrapped in a raw block so it renders verbatim.
pub fn translate_go_fields(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        push_literal(&mut out, &rest[..start]);
        let action = &rest[start + 2..];
        let Some(end) = action.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = action[..end].trim();
        match inner.strip_prefix('.') {
            Some(field)
                if !field.is_empty()
                    && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                out.push_str("{{ ");
                out.push_str(field);
                out.push_str(" }}");
            }
            _ => {
                out.push_str("{{");
                out.push_str(&action[..end]);
                out.push_str("}}");
            }
        }
        rest = &action[end + 2..];
    }
    push_literal(&mut out, rest);
    out
}

fn push_literal(out: &mut String, text: &str) {
    if text.contains("{%") || text.contains("{#") {
        out.push_str("{% raw %}");
        out.push_str(text);
        out.push_str("{% endraw %}");
    } else {
        out.push_str(text);
    }
}

// ---------------------------------------------------------------------------
// PrTemplates
// ---------------------------------------------------------------------------

/// A rendered pull request title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPr {
    pub title: String,
    pub body: String,
}

/// The six PR templates, compiled once at load time and reused per package.
pub struct PrTemplates {
    tera: Tera,
}

impl PrTemplates {
    /// Compile every template kind. The first template that fails to compile
    /// is reported by name.
    pub fn compile(templates: &Templates) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        for kind in TemplateKind::all() {
            let source = translate_go_fields(kind.source(templates));
            tera.add_raw_template(kind.name(), &source)
                .map_err(|source| RenderError::Compile {
                    name: kind.name(),
                    source,
                })?;
        }
        Ok(PrTemplates { tera })
    }

    /// Render a single template kind.
    pub fn render(&self, kind: TemplateKind, ctx: &TemplateContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        self.tera
            .render(kind.name(), &tera_ctx)
            .map_err(|source| RenderError::Render {
                name: kind.name(),
                source,
            })
    }

    /// Title and body of a version update PR.
    pub fn render_update(&self, ctx: &TemplateContext) -> Result<RenderedPr, RenderError> {
        Ok(RenderedPr {
            title: self.render(TemplateKind::PrTitle, ctx)?,
            body: self.render(TemplateKind::PrBody, ctx)?,
        })
    }

    /// Title and body of a repository transfer PR.
    pub fn render_transfer(&self, ctx: &TemplateContext) -> Result<RenderedPr, RenderError> {
        Ok(RenderedPr {
            title: self.render(TemplateKind::TransferPrTitle, ctx)?,
            body: self.render(TemplateKind::TransferPrBody, ctx)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

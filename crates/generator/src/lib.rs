// Static site generation: templates in, HTML/RSS/sitemap out

pub mod pages;
pub mod site;
pub mod template;

pub use site::{BuildReport, SiteGenerator, SiteOptions};
pub use template::{Bindings, RenderOptions, TemplateLoader, render, write_default_templates};

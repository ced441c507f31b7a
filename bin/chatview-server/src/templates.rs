//! Server-side page rendering.
//!
//! Templates are compiled into the binary; minijinja auto-escapes anything
//! rendered into a `.html` template, so message text is safe to interpolate.

use chatview_core::ViewSnapshot;
use minijinja::{context, Environment};

const INDEX: &str = "index.html";

pub struct Templates {
    env: Environment<'static>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX, include_str!("../templates/index.html"))?;
        Ok(Self { env })
    }

    /// Render the chat page for `view`.
    pub fn index(
        &self,
        view: &ViewSnapshot,
        masked_key: Option<&str>,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX)?.render(context! {
            view => view,
            has_api_key => masked_key.is_some(),
            masked_key => masked_key,
            version => env!("CARGO_PKG_VERSION"),
        })
    }
}

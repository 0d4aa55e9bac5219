//! Server-rendered pages. Templates are compiled into the binary.

use crate::auth::CurrentUser;
use crate::error::AppResult;
use axum::response::Html;
use tera::{Context, Tera};

const TEMPLATES: [(&str, &str); 9] = [
    ("base.html", include_str!("../templates/base.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("admin.html", include_str!("../templates/admin.html")),
    ("upload.html", include_str!("../templates/upload.html")),
    ("escenarios.html", include_str!("../templates/escenarios.html")),
    ("configurescenarios.html", include_str!("../templates/configurescenarios.html")),
    ("simulador.html", include_str!("../templates/simulador.html")),
    ("final_report.html", include_str!("../templates/final_report.html")),
];

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, ctx: &Context) -> AppResult<Html<String>> {
        Ok(Html(self.tera.render(name, ctx)?))
    }
}

/// Context shared by every wizard page: the signed-in user and the step.
pub fn page_context(user: &CurrentUser, step: u8) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user", user);
    ctx.insert("step", &step);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_compile() {
        let views = Views::new().unwrap();
        let mut ctx = Context::new();
        ctx.insert("error", "Usuario o contraseña incorrectos");
        let html = views.render("login.html", &ctx).unwrap();
        assert!(html.0.contains("Usuario o contraseña incorrectos"));
    }
}

//! Email template rendering engine.
//!
//! Handlebars templates for the account verification email. The link is
//! built by the caller and inserted unescaped; the plain text variant is not
//! HTML and is rendered without escaping.

use crate::error::{NotificationError, NotificationResult};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    /// HTML body content.
    pub html: String,
    /// Plain text body content.
    pub text: String,
    /// Email subject line.
    pub subject: String,
}

/// Data for the account verification email.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationEmailData {
    pub username: String,
    pub server_name: String,
    pub verification_url: String,
    pub expiry_hours: i64,
}

/// Template engine for rendering email templates.
#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        handlebars
            .register_template_string("verification_html", VERIFICATION_HTML_TEMPLATE)
            .map_err(|e| {
                NotificationError::TemplateError(format!(
                    "Failed to register verification_html: {}",
                    e
                ))
            })?;
        handlebars
            .register_template_string("verification_text", VERIFICATION_TEXT_TEMPLATE)
            .map_err(|e| {
                NotificationError::TemplateError(format!(
                    "Failed to register verification_text: {}",
                    e
                ))
            })?;

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    fn render<T: Serialize>(&self, template_name: &str, data: &T) -> NotificationResult<String> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    /// Render the account verification email.
    pub fn render_verification(
        &self,
        data: &VerificationEmailData,
    ) -> NotificationResult<RenderedEmail> {
        debug!(user = %data.username, "Rendering verification email");

        let html = self.render("verification_html", data)?;
        let text = self.render("verification_text", data)?;

        Ok(RenderedEmail {
            html,
            text,
            subject: format!("Verifica tu cuenta - {}", data.server_name),
        })
    }
}

const VERIFICATION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Verifica tu cuenta</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #111827;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #1f2937; border-radius: 8px; padding: 40px;">
        <h1 style="color: #fbbf24; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Bienvenido a {{server_name}}
        </h1>
        <p style="color: #e5e7eb; font-size: 16px; line-height: 24px; margin: 0 0 24px 0; text-align: center;">
          Hola <strong>{{username}}</strong>, gracias por registrarte. Haz clic en el botón para activar tu cuenta.
        </p>
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{{verification_url}}}" style="display: inline-block; background-color: #d97706; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                Verificar cuenta
              </a>
            </td>
          </tr>
        </table>
        <p style="color: #9ca3af; font-size: 12px; text-align: center; margin: 16px 0 0 0;">
          Si el botón no funciona, copia este enlace en tu navegador:<br>
          <a href="{{{verification_url}}}" style="color: #fbbf24; word-break: break-all;">{{{verification_url}}}</a>
        </p>
        <p style="color: #9ca3af; font-size: 12px; text-align: center; margin: 16px 0 0 0;">
          Este enlace expira en {{expiry_hours}} horas.
        </p>
        <p style="color: #6b7280; font-size: 12px; text-align: center; margin: 24px 0 0 0;">
          Si no creaste esta cuenta, puedes ignorar este correo.
        </p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const VERIFICATION_TEXT_TEMPLATE: &str = r#"Bienvenido a {{{server_name}}}

Hola {{{username}}},

Gracias por registrarte. Abre el siguiente enlace para activar tu cuenta:

{{{verification_url}}}

Este enlace expira en {{expiry_hours}} horas.

Si no creaste esta cuenta, puedes ignorar este correo."#;

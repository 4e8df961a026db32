//! Init-time credential validation against the configured HTTP
//! side-channel.

use zgate_core::diag::{bib1, Diagnostic};
use zgate_core::{GatewayError, Result};

/// Substitute `{user}`/`{pass}` into the URL template (URL-encoded) and
/// perform a GET. Anything but a 2xx answer rejects the credentials with
/// 1014; a missing username or password never reaches the wire.
pub(crate) async fn check_credentials(
    template: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<()> {
    let (username, password) = match (username, password) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(Diagnostic::new(
                bib1::AUTHENTICATION_FAILED,
                "credentials not supplied",
            )
            .into())
        }
    };

    let url = template
        .replace("{user}", &urlencoding::encode(username))
        .replace("{pass}", &urlencoding::encode(password));

    let response = reqwest::get(&url)
        .await
        .map_err(|e| GatewayError::Internal(format!("authentication service: {}", e)))?;

    if response.status().is_success() {
        tracing::debug!(user = username, "credentials accepted");
        Ok(())
    } else {
        tracing::warn!(user = username, status = %response.status(), "credentials rejected");
        Err(Diagnostic::new(bib1::AUTHENTICATION_FAILED, "credentials are bad").into())
    }
}

//! `saro-deploy unit` — print the rendered supervision unit.

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::unit::{render_unit, unit_digest};
use crate::output::json;

/// Run the unit command.
///
/// The unit text goes to stdout even with `--quiet`, so it can be piped.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn run(app: &AppContext) -> Result<()> {
    app.config.validate()?;
    let unit = render_unit(&app.config);
    if app.is_json() {
        json::print(&serde_json::json!({
            "path": app.config.unit_path().display().to_string(),
            "digest": unit_digest(&unit),
            "contents": unit,
        }))
    } else {
        print!("{unit}");
        Ok(())
    }
}

//! Infrastructure implementation of the `UnitWriter` port.
//!
//! Both paths write a sibling temp file in the unit directory and rename it
//! over the target, so systemd never reads a half-written unit.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::application::ports::{CommandRunner, UnitWriter};
use crate::domain::config::Privilege;
use crate::domain::error::DeployError;

/// Installs unit files directly when running as root, or through
/// `sudo -n tee` + `sudo -n mv` otherwise.
pub struct SystemUnitWriter<'a, R> {
    runner: &'a R,
    privilege: Privilege,
}

impl<'a, R: CommandRunner> SystemUnitWriter<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, privilege: Privilege) -> Self {
        Self { runner, privilege }
    }

    async fn write_with_sudo(&self, path: &Path, contents: &str) -> Result<()> {
        let target = path.display().to_string();
        let staged = format!("{target}.tmp");

        let tee = self
            .runner
            .run_with_stdin("sudo", &["-n", "tee", &staged], contents.as_bytes())
            .await
            .context("running sudo tee")?;
        if !tee.status.success() {
            return Err(privilege_required(path, &tee.stderr));
        }

        let mv = self
            .runner
            .run("sudo", &["-n", "mv", "-f", &staged, &target])
            .await
            .context("running sudo mv")?;
        if !mv.status.success() {
            self.discard_staged(&staged).await;
            return Err(privilege_required(path, &mv.stderr));
        }
        Ok(())
    }

    /// Best-effort removal of a staged unit that could not be moved into place.
    async fn discard_staged(&self, staged: &str) {
        match self.runner.run("sudo", &["-n", "rm", "-f", staged]).await {
            Ok(out) if out.status.success() => {}
            Ok(out) => tracing::warn!(
                %staged,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "could not remove staged unit"
            ),
            Err(e) => tracing::warn!(%staged, error = %e, "could not remove staged unit"),
        }
    }
}

impl<R: CommandRunner> UnitWriter for SystemUnitWriter<'_, R> {
    async fn write_unit(&self, path: &Path, contents: &str) -> Result<()> {
        tracing::debug!(unit = %path.display(), privilege = ?self.privilege, "installing unit");
        match self.privilege {
            Privilege::Sudo => self.write_with_sudo(path, contents).await,
            Privilege::Root => {
                let path = path.to_path_buf();
                let contents = contents.to_string();
                tokio::task::spawn_blocking(move || write_atomic(&path, &contents))
                    .await
                    .context("unit write task panicked")?
            }
        }
    }
}

/// Write `contents` to `path` through a temp file in the same directory.
///
/// # Errors
///
/// Returns `DeployError::PrivilegeRequired` when the directory is not
/// writable by this process.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| {
        anyhow::Error::from(DeployError::PrivilegeRequired {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    })?;
    staged
        .write_all(contents.as_bytes())
        .with_context(|| format!("writing temp file in {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions on {}", staged.path().display()))?;
    }

    staged.persist(path).map_err(|e| {
        anyhow::Error::from(DeployError::PrivilegeRequired {
            path: path.to_path_buf(),
            detail: e.error.to_string(),
        })
    })?;
    Ok(())
}

fn privilege_required(path: &Path, stderr: &[u8]) -> anyhow::Error {
    DeployError::PrivilegeRequired {
        path: path.to_path_buf(),
        detail: String::from_utf8_lossy(stderr).trim().to_string(),
    }
    .into()
}

//! systemd unit rendering.

use sha2::{Digest, Sha256};

use crate::domain::config::{DeployConfig, FALLBACK_PATH};

/// Render the supervision unit for `cfg`.
///
/// The output depends only on `cfg`, so rendering twice yields identical
/// bytes and a redeploy with unchanged config rewrites the same file.
/// Values are written verbatim; `DeployConfig::validate` keeps them to one
/// line and keeps `ExecStart=` arguments free of whitespace.
#[must_use]
pub fn render_unit(cfg: &DeployConfig) -> String {
    let bin = cfg.venv_bin();
    let server = &cfg.server;

    let mut service = vec!["Type=simple".to_string()];
    if let Some(user) = &server.user {
        service.push(format!("User={user}"));
    }
    if let Some(group) = &server.group {
        service.push(format!("Group={group}"));
    }
    service.extend([
        format!("WorkingDirectory={}", cfg.deploy_path.display()),
        format!("Environment=\"PATH={}:{FALLBACK_PATH}\"", bin.display()),
        format!("Environment=\"VIRTUAL_ENV={}\"", cfg.venv_path().display()),
        format!(
            "ExecStart={}/gunicorn --workers {} --bind {} --timeout {} {}",
            bin.display(),
            server.workers,
            server.bind,
            server.timeout_secs,
            server.app
        ),
        "ExecReload=/bin/kill -s HUP $MAINPID".to_string(),
        "KillMode=mixed".to_string(),
        "KillSignal=SIGTERM".to_string(),
        "TimeoutStopSec=30".to_string(),
        "Restart=always".to_string(),
        "RestartSec=5".to_string(),
    ]);

    format!(
        "[Unit]\nDescription={}\nAfter=network.target\n\n[Service]\n{}\n\n[Install]\nWantedBy=multi-user.target\n",
        cfg.app_name,
        service.join("\n")
    )
}

/// Short SHA-256 fingerprint of a unit, for change reporting.
#[must_use]
pub fn unit_digest(contents: &str) -> String {
    let digest = Sha256::digest(contents.as_bytes());
    hex_encode(&digest[..6])
}

/// Lowercase hex encoding.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use sentinel_config::{KEYRING_SERVICE, KEYRING_STORE_KEY};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

const VALID_KEYS: &str = "server.bind, camera.stream_url, camera.boundary, \
                          camera.connect_timeout_secs, camera.response_timeout_secs, \
                          camera.user_agent, store.url, store.anon_key_env, \
                          store.timeout_secs, watch.url, watch.retry_delay_secs";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    if out.store.anon_key.is_some() {
        out.store.anon_key = Some("****".into());
    }
    out
}

/// Format config as TOML-ish text, masking the store key.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "[server]");
    let _ = writeln!(out, "bind = \"{}\"", cfg.server.bind);

    let _ = writeln!(out, "\n[camera]");
    let _ = writeln!(out, "stream_url = \"{}\"", cfg.camera.stream_url);
    let _ = writeln!(out, "boundary = \"{}\"", cfg.camera.boundary);
    let _ = writeln!(out, "connect_timeout_secs = {}", cfg.camera.connect_timeout_secs);
    let _ = writeln!(out, "response_timeout_secs = {}", cfg.camera.response_timeout_secs);
    if let Some(ref ua) = cfg.camera.user_agent {
        let _ = writeln!(out, "user_agent = \"{ua}\"");
    }

    let _ = writeln!(out, "\n[store]");
    if let Some(ref url) = cfg.store.url {
        let _ = writeln!(out, "url = \"{url}\"");
    }
    if cfg.store.anon_key.is_some() {
        let _ = writeln!(out, "anon_key = \"****\"");
    }
    if let Some(ref env) = cfg.store.anon_key_env {
        let _ = writeln!(out, "anon_key_env = \"{env}\"");
    }
    let _ = writeln!(out, "timeout_secs = {}", cfg.store.timeout_secs);

    let _ = writeln!(out, "\n[watch]");
    let _ = writeln!(out, "url = \"{}\"", cfg.watch.url);
    let _ = write!(out, "retry_delay_secs = {}", cfg.watch.retry_delay_secs);

    out
}

fn save(cfg: &Config, global: &GlobalOpts) -> Result<std::path::PathBuf, CliError> {
    let path = config::config_file(global);
    config::save_config_to(cfg, &path)?;
    Ok(path)
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn keyring_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "keyring".into(),
        reason: format!("failed to store the key in the keyring: {e}"),
    }
}

fn store_in_keyring(secret: &str) -> Result<(), CliError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_STORE_KEY)
        .map_err(keyring_err)?
        .set_password(secret)
        .map_err(keyring_err)
}

/// Offer keyring or plaintext storage for the store key.
///
/// Returns `Some(key)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_key_storage(secret: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the anon key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_in_keyring(secret)?;
        eprintln!("   ✓ Anon key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be a whole number, got '{value}'"),
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Apply one `config set` assignment.
fn set_value(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "server.bind" => cfg.server.bind = value,
        "camera.stream_url" => cfg.camera.stream_url = value,
        "camera.boundary" => cfg.camera.boundary = value,
        "camera.connect_timeout_secs" => {
            cfg.camera.connect_timeout_secs = parse_number(key, &value)?;
        }
        "camera.response_timeout_secs" => {
            cfg.camera.response_timeout_secs = parse_number(key, &value)?;
        }
        "camera.user_agent" => cfg.camera.user_agent = non_empty(value),
        "store.url" => cfg.store.url = non_empty(value),
        "store.anon_key_env" => cfg.store.anon_key_env = non_empty(value),
        "store.timeout_secs" => cfg.store.timeout_secs = parse_number(key, &value)?,
        "watch.url" => cfg.watch.url = value,
        "watch.retry_delay_secs" => cfg.watch.retry_delay_secs = parse_number(key, &value)?,
        "store.anon_key" => {
            return Err(CliError::Validation {
                field: key.into(),
                reason: "use `sentinel config set-key` so the key never lands in shell history"
                    .into(),
            });
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {VALID_KEYS}"),
            });
        }
    }
    // Catch a bad camera URL or bind address before it reaches disk.
    cfg.camera.validate()?;
    cfg.server.bind_addr()?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load(global)?);
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_file(global).display());
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load(global)?;
            set_value(&mut cfg, &key, value)?;
            let path = save(&cfg, global)?;
            if !global.quiet {
                eprintln!("✓ Set {key} in {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::SetKey => {
            let key = rpassword::prompt_password("Anon key: ").map_err(prompt_err)?;
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "anon_key".into(),
                    reason: "key cannot be empty".into(),
                });
            }
            store_in_keyring(key.trim())?;
            if !global.quiet {
                eprintln!("✓ Anon key stored in system keyring");
            }
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);
    eprintln!("SentinelPro configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    if path.exists()
        && !Confirm::new()
            .with_prompt("A config file already exists. Overwrite it?")
            .default(false)
            .interact()
            .map_err(prompt_err)?
    {
        return Ok(());
    }

    let defaults = Config::default();
    let mut cfg = Config::default();

    cfg.camera.stream_url = Input::new()
        .with_prompt("Camera stream URL")
        .default(defaults.camera.stream_url)
        .interact_text()
        .map_err(prompt_err)?;

    cfg.server.bind = Input::new()
        .with_prompt("Relay listen address")
        .default(defaults.server.bind)
        .interact_text()
        .map_err(prompt_err)?;

    let store_url: String = Input::new()
        .with_prompt("Record store URL (blank to skip)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    cfg.store.url = non_empty(store_url);

    if cfg.store.is_configured() {
        let key = rpassword::prompt_password("Anon key: ").map_err(prompt_err)?;
        if key.trim().is_empty() {
            return Err(CliError::Validation {
                field: "anon_key".into(),
                reason: "key cannot be empty".into(),
            });
        }
        cfg.store.anon_key = prompt_key_storage(key.trim())?;
    }

    cfg.camera.validate()?;
    cfg.server.bind_addr()?;
    let path = save(&cfg, global)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("\n  Start the relay: sentinel serve");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_updates_nested_fields() {
        let mut cfg = Config::default();
        assert!(set_value(&mut cfg, "watch.retry_delay_secs", "9".into()).is_ok());
        assert!(set_value(&mut cfg, "camera.response_timeout_secs", "4".into()).is_ok());
        assert_eq!(cfg.camera.response_timeout_secs, 4);
        assert!(set_value(&mut cfg, "store.url", "https://db.example.com".into()).is_ok());
        assert_eq!(cfg.watch.retry_delay_secs, 9);
        assert_eq!(cfg.store.url.as_deref(), Some("https://db.example.com"));

        assert!(set_value(&mut cfg, "store.url", String::new()).is_ok());
        assert!(cfg.store.url.is_none());
    }

    #[test]
    fn set_value_rejects_unknown_and_invalid() {
        let mut cfg = Config::default();
        assert!(matches!(
            set_value(&mut cfg, "camera.fps", "30".into()),
            Err(CliError::Validation { .. })
        ));
        assert!(set_value(&mut cfg, "store.timeout_secs", "soon".into()).is_err());
        assert!(set_value(&mut cfg, "camera.stream_url", "rtsp://cam/stream".into()).is_err());
        assert!(set_value(&mut cfg, "store.anon_key", "secret".into()).is_err());
    }

    #[test]
    fn show_masks_anon_key() {
        let mut cfg = Config::default();
        cfg.store.anon_key = Some("super-secret".into());
        let text = format_config_redacted(&cfg);
        assert!(text.contains("anon_key = \"****\""));
        assert!(!text.contains("super-secret"));
        assert_eq!(redacted(&cfg).store.anon_key.as_deref(), Some("****"));
    }
}

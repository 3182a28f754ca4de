use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use cosmoscale_azure::AzureBackend;
use cosmoscale_core::Settings;

pub fn check(config: &Path) -> anyhow::Result<()> {
    let settings = Settings::from_file(config)
        .with_context(|| format!("loading {}", config.display()))?;
    // Building the backend decodes every primary key without touching the network.
    AzureBackend::from_settings(&settings, settings.call_timeout()?)?;

    info!(path = %config.display(), "configuration valid");
    print!("{}", describe(&settings));
    Ok(())
}

fn describe(settings: &Settings) -> String {
    let collections = settings.collections();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "cloud {:?}, subscription {}, concurrency {}, call timeout {}{}",
        settings.azure.cloud,
        settings.azure.subscription,
        settings.run.concurrency,
        settings.run.call_timeout,
        if settings.run.dry_run { ", dry run" } else { "" },
    );
    for collection in &collections {
        let policy = &collection.policy;
        let _ = writeln!(
            out,
            "  {}: threshold {:.2}, margin {:.2}, floor {} RU/s",
            collection.id, policy.threshold_rate, policy.increase_rate, policy.default_value,
        );
    }
    let _ = writeln!(out, "{} collections configured", collections.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETTINGS: &str = r#"
[azure]
cloud = "public"
subscription = "sub"
tenant_id = "tenant"
client_id = "client"
client_secret = "secret"

[run]
dry_run = true

[[accounts]]
database_account = "acct"
resource_group = "rg"
primary_key = "Y29zbW9zY2FsZS10ZXN0LWtleQ=="

[[accounts.databases]]
key = "dbKey"
name = "orders"

[[accounts.databases.collections]]
key = "collKey"
name = "lines"
default_value = 400
threshold_rate = 0.7
increase_rate = 0.1
"#;

    fn write_settings(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("cosmoscale.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn valid_settings_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), SETTINGS);
        check(&path).unwrap();
    }

    #[test]
    fn describe_lists_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), SETTINGS);
        let settings = Settings::from_file(&path).unwrap();

        let text = describe(&settings);
        assert!(text.starts_with("cloud Public, subscription sub, concurrency 4, call timeout 30s, dry run"));
        assert!(text.contains("  acct/orders/lines: threshold 0.70, margin 0.10, floor 400 RU/s"));
        assert!(text.ends_with("1 collections configured\n"));
    }

    #[test]
    fn bad_primary_key_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            dir.path(),
            &SETTINGS.replace("Y29zbW9zY2FsZS10ZXN0LWtleQ==", "not base64!"),
        );
        let err = check(&path).unwrap_err();
        assert!(format!("{err:#}").contains("acct"), "{err:#}");
    }

    #[test]
    fn invalid_policy_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            dir.path(),
            &SETTINGS.replace("threshold_rate = 0.7", "threshold_rate = 0.0"),
        );
        assert!(check(&path).is_err());
    }
}

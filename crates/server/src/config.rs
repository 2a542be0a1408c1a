use std::{collections::HashMap, fs, time::Duration};

use provisioner::ProvisionerConfig;
use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub chart_path: String,
    pub store_domain: String,
    pub store_prefix: String,
    pub reconcile_interval_secs: u64,
    pub helm_bin: String,
    pub kubectl_bin: String,
    pub kube_context: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:3001".into(),
            chart_path: "./charts/store".into(),
            store_domain: "localtest.me".into(),
            store_prefix: "store-".into(),
            reconcile_interval_secs: 5,
            helm_bin: "helm".into(),
            kubectl_bin: "kubectl".into(),
            kube_context: None,
        }
    }
}

impl Settings {
    pub fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            store_prefix: self.store_prefix.clone(),
            store_domain: self.store_domain.clone(),
            reconcile_interval: Duration::from_secs(self.reconcile_interval_secs),
        }
    }
}

/// Defaults, then `server.toml`, then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(file = SETTINGS_FILE, %error, "ignoring unreadable settings file");
            return;
        }
    };
    let get = |key: &str| {
        file_cfg.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    if let Some(v) = get("bind_addr") {
        settings.server_bind = v;
    }
    if let Some(v) = get("chart_path") {
        settings.chart_path = v;
    }
    if let Some(v) = get("store_domain") {
        settings.store_domain = v;
    }
    if let Some(v) = get("store_prefix") {
        settings.store_prefix = v;
    }
    if let Some(v) = get("reconcile_interval_secs") {
        set_interval(settings, &v);
    }
    if let Some(v) = get("helm_bin") {
        settings.helm_bin = v;
    }
    if let Some(v) = get("kubectl_bin") {
        settings.kubectl_bin = v;
    }
    if let Some(v) = get("kube_context") {
        settings.kube_context = Some(v);
    }
}

pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("APP__CHART_PATH") {
        settings.chart_path = v;
    }
    if let Some(v) = var("APP__STORE_DOMAIN") {
        settings.store_domain = v;
    }
    if let Some(v) = var("APP__STORE_PREFIX") {
        settings.store_prefix = v;
    }
    if let Some(v) = var("APP__RECONCILE_INTERVAL_SECS") {
        set_interval(settings, &v);
    }

    if let Some(v) = var("HELM_BIN") {
        settings.helm_bin = v;
    }
    if let Some(v) = var("APP__HELM_BIN") {
        settings.helm_bin = v;
    }
    if let Some(v) = var("KUBECTL_BIN") {
        settings.kubectl_bin = v;
    }
    if let Some(v) = var("APP__KUBECTL_BIN") {
        settings.kubectl_bin = v;
    }

    if let Some(v) = var("APP__KUBE_CONTEXT") {
        settings.kube_context = Some(v).filter(|context| !context.trim().is_empty());
    }
}

fn set_interval(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => settings.reconcile_interval_secs = secs,
        _ => warn!(value = raw, "ignoring invalid reconcile interval"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

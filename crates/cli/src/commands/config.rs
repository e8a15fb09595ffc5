use std::env;
use std::fs;
use std::path::Path;

use orcamento_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let validity_days = config.quotes.validity_days.to_string();
    let fields = [
        Field {
            key_path: "quotes.validity_days",
            env_keys: &["ORCAMENTO_QUOTES_VALIDITY_DAYS"],
            value: &validity_days,
        },
        Field {
            key_path: "quotes.currency",
            env_keys: &["ORCAMENTO_QUOTES_CURRENCY"],
            value: &config.quotes.currency,
        },
        Field {
            key_path: "quotes.default_phone_country_code",
            env_keys: &["ORCAMENTO_QUOTES_DEFAULT_PHONE_COUNTRY_CODE"],
            value: &config.quotes.default_phone_country_code,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["ORCAMENTO_LOGGING_LEVEL", "ORCAMENTO_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["ORCAMENTO_LOGGING_FORMAT", "ORCAMENTO_LOG_FORMAT"],
            value: config.logging.format.as_str(),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, field.value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_keys_are_attributed_to_the_file() -> Result<(), toml::de::Error> {
        let doc = "[quotes]\nvalidity_days = 15\n".parse::<Value>()?;

        assert!(contains_path(&doc, "quotes.validity_days"));
        assert!(!contains_path(&doc, "quotes.currency"));
        assert_eq!(field_source("quotes.currency", &[], Some(&doc), None), "default");
        assert_eq!(
            field_source("quotes.validity_days", &[], Some(&doc), None),
            "file (config file)"
        );
        Ok(())
    }
}

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::process::Command;
use std::{collections::HashMap, env};

fn expand_cmdline_env(cmdline: &str) -> String {
    // Expand ${VAR} from environment; special-case ${APP_BIN}
    // -> DASHCFG_APP_BIN (quoted if contains whitespace) or default "dashboard-cli"
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(cmdline, |caps: &regex::Captures| {
        let key = &caps[1];
        if key == "APP_BIN" {
            if let Some(v) = env_map.get("DASHCFG_APP_BIN") {
                // Quote if contains whitespace to keep it a single arg in shlex::split
                let needs_quote = v.chars().any(|c| c.is_whitespace());
                if needs_quote {
                    let escaped = v.replace('"', "\\\"");
                    return format!("\"{escaped}\"");
                }
                return v.to_string();
            }
            return "dashboard-cli".to_string();
        }
        env_map.get(key).cloned().unwrap_or_default()
    })
    .to_string()
}

pub fn run_cmdline_to_json(cmdline: &str) -> Result<JsonValue> {
    let expanded = expand_cmdline_env(cmdline);
    let parts = shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    if parts.is_empty() {
        return Err(anyhow!("Empty command line"));
    }
    let program = &parts[0];
    let args = &parts[1..];
    let output = Command::new(program)
        .args(args)
        .env("DASHCFG_JSON", "1")
        .output()
        .with_context(|| format!("spawning {expanded}"))?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(anyhow!("Command failed: {}\n{}", cmdline, err));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let v: JsonValue = serde_json::from_str(&text).with_context(|| "parsing command JSON")?;
    Ok(v)
}

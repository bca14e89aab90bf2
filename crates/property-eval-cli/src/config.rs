use std::fs;
use std::path::Path;

use property_eval_core::EngineConfig;

/// Load and validate the engine configuration. Defaults when no path is given.
pub fn load(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;

    let is_yaml = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let config: EngineConfig = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config '{}': {}", path, e))?
    };

    config.validate()?;
    tracing::debug!(path = path, "engine configuration loaded");
    Ok(config)
}

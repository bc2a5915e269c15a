use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Load and parse a scenario from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open scenario file '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse scenario file '{}'", config_path.display()))?;

    info!(
        "Scenario has {} facilities, {} sources and {} sinks",
        config.facilities.len(),
        config.sources.len(),
        config.sinks.len()
    );

    config.validate()?;

    Ok(config)
}

/// CLI arguments that can override scenario settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub duration: Option<u32>,
    pub timestep: Option<Duration>,
}

/// Apply CLI overrides to a loaded scenario
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(duration) = overrides.duration {
        info!(
            "Overriding duration: {} -> {} timesteps",
            config.general.duration, duration
        );
        config.general.duration = duration;
    }

    if let Some(timestep) = overrides.timestep {
        info!(
            "Overriding timestep: {:?} -> {:?}",
            config.general.timestep, timestep
        );
        config.general.timestep = timestep;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

/// Read `general.log_level` without validating the rest of the file.
///
/// Logging is set up before the scenario is loaded, so this only looks at
/// the one field and gives up quietly on anything malformed.
pub fn peek_log_level(config_path: &Path) -> Option<String> {
    let file = File::open(config_path).ok()?;
    let value: serde_yaml::Value = serde_yaml::from_reader(file).ok()?;
    value
        .get("general")?
        .get("log_level")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"
general:
  duration: 12
  timestep: 30days
  log_level: debug
recipes:
  tritium:
    nuclides: { T: 1.0 }
facilities:
  - name: tank
    archetype: DecayStorage
    incommod: Tritium
    outcommod: Stored_Tritium
sources:
  - name: supply
    commodity: Tritium
    recipe: tritium
"#;

    fn scenario_file(yaml: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();
        temp_file
    }

    #[test]
    fn test_load_scenario() {
        let temp_file = scenario_file(SCENARIO);
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.duration, 12);
        assert_eq!(config.general.timestep, Duration::from_secs(30 * 86_400));
        assert_eq!(config.facilities[0].name, "tank");
    }

    #[test]
    fn test_load_rejects_invalid_scenario() {
        let temp_file = scenario_file(&SCENARIO.replace("duration: 12", "duration: 0"));
        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("duration"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/scenario.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to open scenario file"));
    }

    #[test]
    fn test_apply_overrides() {
        let temp_file = scenario_file(SCENARIO);
        let mut config = load_config(temp_file.path()).unwrap();

        let overrides = CliOverrides {
            duration: Some(3),
            timestep: Some(Duration::from_secs(86_400)),
        };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.general.duration, 3);
        assert_eq!(config.dt_seconds(), 86_400.0);

        let zero = CliOverrides {
            duration: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &zero).is_err());
    }

    #[test]
    fn test_peek_log_level() {
        let temp_file = scenario_file(SCENARIO);
        assert_eq!(peek_log_level(temp_file.path()), Some("debug".to_string()));

        let bare = scenario_file("general:\n  duration: 1\n");
        assert_eq!(peek_log_level(bare.path()), None);
    }
}

//! Reads the process configuration from disk (SPEC_FULL §6.2), with an
//! optional arena text map (SPEC_FULL §6.3) overriding the JSON file's
//! `mapConfig`.
//!
//! Grounded on the teacher's `lobby::reload_config` (read file, parse
//! JSON, surface a string error), generalized from a game-name-to-
//! player-cap map to this process's single [`ServerConfig`].

use protocol::{ConfigError, MapConfig, ServerConfig};
use std::path::Path;

/// Loads and validates the process configuration, optionally replacing
/// its map with one parsed from an arena text file.
pub async fn load(config_path: &Path, arena_path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| ConfigError::Io(e.to_string()))?;
    let mut config: ServerConfig =
        serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if let Some(arena_path) = arena_path {
        config.map_config = load_arena_map(arena_path).await?;
    }

    config.validate()?;
    Ok(config)
}

async fn load_arena_map(arena_path: &Path) -> Result<MapConfig, ConfigError> {
    let text = tokio::fs::read_to_string(arena_path)
        .await
        .map_err(|e| ConfigError::Io(e.to_string()))?;
    Ok(protocol::arena::parse_arena(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("game-server-test-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn loads_and_validates_a_well_formed_config() {
        let path = unique_path("config.json");
        tokio::fs::write(
            &path,
            r#"{
                "port": 9000,
                "mapConfig": {
                    "dimension": {"width": 8, "height": 8},
                    "walls": [],
                    "potentialBaseLocations": [{"x": 0, "y": 0}, {"x": 7, "y": 7}]
                },
                "turnTimeLimitMs": 5000,
                "protocolVersion": 1
            }"#,
        )
        .await
        .unwrap();

        let config = load(&path, None).await.unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.map_config.potential_base_locations.len(), 2);
        // Defaults apply when the file omits optional tunables.
        assert_eq!(config.food_scarcity, 0.9);
        assert_eq!(config.stall_round_limit, 1_000);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn rejects_a_port_outside_the_registered_dynamic_range() {
        let path = unique_path("bad-port.json");
        tokio::fs::write(
            &path,
            r#"{
                "port": 80,
                "mapConfig": {
                    "dimension": {"width": 8, "height": 8},
                    "walls": [],
                    "potentialBaseLocations": [{"x": 0, "y": 0}, {"x": 7, "y": 7}]
                },
                "turnTimeLimitMs": 5000,
                "protocolVersion": 1
            }"#,
        )
        .await
        .unwrap();

        let error = load(&path, None).await.unwrap_err();
        assert!(matches!(error, ConfigError::PortOutOfRange(80)));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn an_arena_file_overrides_the_json_map_config() {
        let config_path = unique_path("config-with-arena.json");
        tokio::fs::write(
            &config_path,
            r#"{
                "port": 9000,
                "mapConfig": {
                    "dimension": {"width": 1, "height": 1},
                    "walls": [],
                    "potentialBaseLocations": [{"x": 0, "y": 0}]
                },
                "turnTimeLimitMs": 5000,
                "protocolVersion": 1
            }"#,
        )
        .await
        .unwrap();
        let arena_path = unique_path("map.arena");
        tokio::fs::write(&arena_path, "b0 . #\n.  .  .\n#  . b1")
            .await
            .unwrap();

        let config = load(&config_path, Some(&arena_path)).await.unwrap();
        assert_eq!(config.map_config.dimension.width, 3);
        assert_eq!(config.map_config.potential_base_locations.len(), 2);

        let _ = tokio::fs::remove_file(&config_path).await;
        let _ = tokio::fs::remove_file(&arena_path).await;
    }
}

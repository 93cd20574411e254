//! TOML scenario files describing a headless run.

use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use glam::Vec2;
use serde::Deserialize;
use skirmish_core::{AgentKind, Faction, FighterStats, Position};
use skirmish_system_brain as brain;
use skirmish_system_combat::AutoAttackConfig;
use skirmish_system_population as population;
use skirmish_world::Area;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario {}", path.display())]
    Read {
        /// Location of the scenario file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scenario file is not valid TOML for a scenario.
    #[error("failed to parse scenario {}", path.display())]
    Parse {
        /// Location of the scenario file.
        path: PathBuf,
        /// Underlying decoding failure.
        #[source]
        source: toml::de::Error,
    },
    /// The tick length was zero.
    #[error("tick length must be positive")]
    ZeroTick,
    /// A squad or spawner names a kind that is not declared.
    #[error("{owner} references undeclared kind `{kind}`")]
    UnknownKind {
        /// Section that referenced the kind.
        owner: String,
        /// Name of the missing kind.
        kind: String,
    },
}

/// Complete description of a run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) seed: u64,
    pub(crate) ticks: u64,
    pub(crate) tick_ms: u64,
    pub(crate) corpse_linger_ms: u64,
    pub(crate) brain: BrainSettings,
    pub(crate) areas: Vec<AreaSettings>,
    pub(crate) kinds: Vec<KindSettings>,
    pub(crate) squads: Vec<SquadSettings>,
    pub(crate) player: Option<PlayerSettings>,
    pub(crate) spawners: Vec<SpawnerSettings>,
}

impl Default for Scenario {
    fn default() -> Self {
        let mut kinds: Vec<KindSettings> = ["Enemy_1001", "Enemy_1002", "Enemy_1003"]
            .into_iter()
            .map(KindSettings::named)
            .collect();
        kinds.push(KindSettings::named("Guard"));

        Self {
            seed: 7,
            ticks: 600,
            tick_ms: 100,
            corpse_linger_ms: 0,
            brain: BrainSettings::default(),
            areas: vec![AreaSettings::default()],
            kinds,
            squads: vec![SquadSettings::default()],
            player: Some(PlayerSettings::default()),
            spawners: vec![SpawnerSettings::default()],
        }
    }
}

impl Scenario {
    /// Reads a scenario file.
    ///
    /// Cross references are not checked here so command-line overrides can
    /// still fix the scenario before [`Scenario::validate`] runs.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Self = toml::from_str(&content).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(scenario)
    }

    /// Checks cross references between sections.
    pub(crate) fn validate(&self) -> Result<(), ScenarioError> {
        if self.tick_ms == 0 {
            return Err(ScenarioError::ZeroTick);
        }

        let declared: BTreeSet<&str> = self.kinds.iter().map(|kind| kind.name.as_str()).collect();
        let unknown = |owner: String, kind: &str| ScenarioError::UnknownKind {
            owner,
            kind: kind.to_owned(),
        };

        for (index, squad) in self.squads.iter().enumerate() {
            if !declared.contains(squad.kind.as_str()) {
                return Err(unknown(format!("squad {index}"), &squad.kind));
            }
        }

        for (index, spawner) in self.spawners.iter().enumerate() {
            if let Some(kind) = spawner
                .kinds
                .iter()
                .find(|kind| !declared.contains(kind.as_str()))
            {
                return Err(unknown(format!("spawner {index}"), kind));
            }
        }

        Ok(())
    }

    pub(crate) fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub(crate) fn corpse_linger(&self) -> Duration {
        Duration::from_millis(self.corpse_linger_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BrainSettings {
    pub(crate) patrol_radius: f32,
    pub(crate) arrive_threshold: f32,
}

impl Default for BrainSettings {
    fn default() -> Self {
        let config = brain::Config::default();
        Self {
            patrol_radius: config.patrol_radius,
            arrive_threshold: config.arrive_threshold,
        }
    }
}

impl BrainSettings {
    pub(crate) fn config(&self) -> brain::Config {
        brain::Config {
            patrol_radius: self.patrol_radius,
            arrive_threshold: self.arrive_threshold,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AreaSettings {
    pub(crate) name: String,
    pub(crate) min: [f32; 2],
    pub(crate) max: [f32; 2],
    pub(crate) elevation: f32,
}

impl Default for AreaSettings {
    fn default() -> Self {
        Self {
            name: String::from("Battle Zone"),
            min: [-40.0, -40.0],
            max: [40.0, 40.0],
            elevation: 0.0,
        }
    }
}

impl AreaSettings {
    pub(crate) fn area(&self) -> Area {
        Area::new(
            self.name.clone(),
            Vec2::from(self.min),
            Vec2::from(self.max),
            self.elevation,
        )
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct KindSettings {
    pub(crate) name: String,
    pub(crate) max_hp: f32,
    pub(crate) view_radius: f32,
    pub(crate) attack_range: f32,
    pub(crate) attack_cooldown_ms: u64,
    pub(crate) damage: f32,
    pub(crate) move_speed: f32,
}

impl Default for KindSettings {
    fn default() -> Self {
        let stats = FighterStats::default();
        Self {
            name: String::new(),
            max_hp: stats.max_hp,
            view_radius: stats.view_radius,
            attack_range: stats.attack_range,
            attack_cooldown_ms: u64::try_from(stats.attack_cooldown.as_millis()).unwrap_or(u64::MAX),
            damage: stats.damage,
            move_speed: stats.move_speed,
        }
    }
}

impl KindSettings {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub(crate) fn kind(&self) -> AgentKind {
        AgentKind::new(self.name.clone())
    }

    pub(crate) fn stats(&self) -> FighterStats {
        FighterStats {
            max_hp: self.max_hp,
            view_radius: self.view_radius,
            attack_range: self.attack_range,
            attack_cooldown: Duration::from_millis(self.attack_cooldown_ms),
            damage: self.damage,
            move_speed: self.move_speed,
        }
    }
}

/// Group of fighters placed on a grid at start-up.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SquadSettings {
    pub(crate) kind: String,
    pub(crate) faction: Faction,
    pub(crate) count: usize,
    pub(crate) anchor: [f32; 3],
    pub(crate) spacing: f32,
}

impl Default for SquadSettings {
    fn default() -> Self {
        Self {
            kind: String::from("Guard"),
            faction: Faction::Friendly,
            count: 6,
            anchor: [0.0, 0.0, 0.0],
            spacing: 3.0,
        }
    }
}

impl SquadSettings {
    /// Position of the `index`-th member, four members per row.
    pub(crate) fn slot(&self, index: usize) -> Position {
        let column = (index % 4) as f32;
        let row = (index / 4) as f32;
        Position::from(self.anchor) + Position::new(column * self.spacing, 0.0, row * self.spacing)
    }
}

/// Externally controlled fighter standing in for the player.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerSettings {
    pub(crate) kind: String,
    pub(crate) position: [f32; 3],
    pub(crate) max_hp: f32,
    pub(crate) auto_attack: AutoAttackSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            kind: String::from("Player"),
            position: [0.0, 0.0, -6.0],
            max_hp: 10_000.0,
            auto_attack: AutoAttackSettings::default(),
        }
    }
}

impl PlayerSettings {
    pub(crate) fn stats(&self) -> FighterStats {
        FighterStats {
            max_hp: self.max_hp,
            ..FighterStats::default()
        }
    }
}

/// Strikes the player lands on its own while standing in the battle zone.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AutoAttackSettings {
    pub(crate) enabled: bool,
    pub(crate) zone: String,
    pub(crate) range: f32,
    pub(crate) cooldown_ms: u64,
    pub(crate) damage: f32,
}

impl Default for AutoAttackSettings {
    fn default() -> Self {
        let config = AutoAttackConfig::default();
        Self {
            enabled: true,
            zone: String::from("Battle Zone"),
            range: config.range,
            cooldown_ms: u64::try_from(config.cooldown.as_millis()).unwrap_or(u64::MAX),
            damage: config.damage,
        }
    }
}

impl AutoAttackSettings {
    pub(crate) fn config(&self) -> Option<AutoAttackConfig> {
        self.enabled.then(|| AutoAttackConfig {
            range: self.range,
            cooldown: Duration::from_millis(self.cooldown_ms),
            damage: self.damage,
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpawnerSettings {
    pub(crate) capacity: usize,
    pub(crate) initial_spawn: usize,
    pub(crate) initial_per_frame: usize,
    pub(crate) interval_ms: u64,
    pub(crate) per_interval: usize,
    pub(crate) per_frame: usize,
    pub(crate) faction: Faction,
    pub(crate) kinds: Vec<String>,
    pub(crate) area_name: String,
    pub(crate) anchor: [f32; 3],
    pub(crate) spawn_radius: f32,
    pub(crate) max_spawn_attempts: usize,
    pub(crate) warmup_frames: u32,
}

impl Default for SpawnerSettings {
    fn default() -> Self {
        let config = population::Config::default();
        Self {
            capacity: config.capacity,
            initial_spawn: config.initial_spawn,
            initial_per_frame: config.initial_per_frame,
            interval_ms: u64::try_from(config.interval.as_millis()).unwrap_or(u64::MAX),
            per_interval: config.per_interval,
            per_frame: config.per_frame,
            faction: config.faction,
            kinds: config
                .kinds
                .iter()
                .map(|kind| kind.name().to_owned())
                .collect(),
            area_name: config.area_name,
            anchor: config.anchor.to_array(),
            spawn_radius: config.spawn_radius,
            max_spawn_attempts: config.max_spawn_attempts,
            warmup_frames: config.warmup_frames,
        }
    }
}

impl SpawnerSettings {
    pub(crate) fn config(&self, seed: u64) -> population::Config {
        population::Config {
            capacity: self.capacity,
            initial_spawn: self.initial_spawn,
            initial_per_frame: self.initial_per_frame,
            interval: Duration::from_millis(self.interval_ms),
            per_interval: self.per_interval,
            per_frame: self.per_frame,
            faction: self.faction,
            kinds: self.kinds.iter().cloned().map(AgentKind::new).collect(),
            area_name: self.area_name.clone(),
            anchor: Position::from(self.anchor),
            spawn_radius: self.spawn_radius,
            max_spawn_attempts: self.max_spawn_attempts,
            warmup_frames: self.warmup_frames,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_is_valid() {
        Scenario::default().validate().expect("defaults validate");
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let scenario: Scenario = toml::from_str(
            r#"
            ticks = 50

            [[spawners]]
            capacity = 8
            kinds = ["Enemy_1002"]
            "#,
        )
        .expect("scenario parses");

        assert_eq!(scenario.ticks, 50);
        assert_eq!(scenario.tick_ms, 100);
        assert_eq!(scenario.spawners.len(), 1);

        let config = scenario.spawners[0].config(3);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.initial_spawn, 16);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.kinds, vec![AgentKind::new("Enemy_1002")]);
        assert_eq!(config.seed, 3);
        scenario.validate().expect("kinds are declared by default");
    }

    #[test]
    fn squads_and_factions_parse() {
        let scenario: Scenario = toml::from_str(
            r#"
            [[kinds]]
            name = "Brute"
            max_hp = 2500.0
            attack_cooldown_ms = 1500

            [[squads]]
            kind = "Brute"
            faction = "Neutral"
            count = 2
            anchor = [5.0, 0.0, 5.0]
            "#,
        )
        .expect("scenario parses");

        let stats = scenario.kinds[0].stats();
        assert_eq!(stats.max_hp, 2_500.0);
        assert_eq!(stats.attack_cooldown, Duration::from_millis(1_500));
        assert_eq!(stats.damage, 100.0);
        assert_eq!(scenario.squads[0].faction, Faction::Neutral);
        assert_eq!(scenario.squads[0].slot(1), Position::new(8.0, 0.0, 5.0));
    }

    #[test]
    fn player_auto_attack_can_be_tuned_or_disabled() {
        let scenario: Scenario = toml::from_str(
            r#"
            [player.auto_attack]
            range = 6.0
            cooldown_ms = 500
            "#,
        )
        .expect("scenario parses");
        let player = scenario.player.expect("player section");
        assert_eq!(
            player.auto_attack.config(),
            Some(AutoAttackConfig {
                range: 6.0,
                cooldown: Duration::from_millis(500),
                damage: 100.0,
            })
        );
        assert_eq!(player.auto_attack.zone, "Battle Zone");

        let scenario: Scenario = toml::from_str(
            r#"
            [player.auto_attack]
            enabled = false
            "#,
        )
        .expect("scenario parses");
        assert_eq!(scenario.player.and_then(|player| player.auto_attack.config()), None);
    }

    #[test]
    fn undeclared_kinds_are_rejected() {
        let scenario = Scenario {
            squads: vec![SquadSettings {
                kind: String::from("Dragon"),
                ..SquadSettings::default()
            }],
            ..Scenario::default()
        };

        match scenario.validate() {
            Err(ScenarioError::UnknownKind { owner, kind }) => {
                assert_eq!(owner, "squad 0");
                assert_eq!(kind, "Dragon");
            }
            other => panic!("unexpected validation result {other:?}"),
        }
    }

    #[test]
    fn loading_defers_validation_to_the_caller() {
        let path = std::env::temp_dir().join(format!(
            "skirmish-scenario-{}-zero-tick.toml",
            std::process::id()
        ));
        std::fs::write(&path, "tick_ms = 0\n").expect("scenario file is writable");

        let loaded = Scenario::load(&path);
        let _ = std::fs::remove_file(&path);

        let mut scenario = loaded.expect("zero ticks still load");
        assert!(matches!(scenario.validate(), Err(ScenarioError::ZeroTick)));
        scenario.tick_ms = 100;
        scenario.validate().expect("override repairs the scenario");
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        let parsed: Result<Scenario, _> = toml::from_str("tick_length = 5");
        assert!(parsed.is_err());
    }
}

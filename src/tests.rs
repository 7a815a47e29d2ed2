//! Shared test fixtures: plugin filename constants and a [`Fixture`] that
//! sets up a temporary game install (an empty `Data` directory plus a
//! starting load order) for tests elsewhere in the crate to copy known
//! test plugins into.

use std::{
    fs::{File, copy, create_dir_all},
    io::Write,
    path::{PathBuf, absolute},
    time::{Duration, SystemTime},
};

use tempfile::TempDir;

use crate::{
    GameType,
    game::GameCache,
    plugin::{LoadScope, Plugin},
};

pub(crate) const BLANK_ESM: &str = "Blank.esm";
pub(crate) const BLANK_DIFFERENT_ESM: &str = "Blank - Different.esm";
pub(crate) const BLANK_MASTER_DEPENDENT_ESM: &str = "Blank - Master Dependent.esm";
pub(crate) const BLANK_ESP: &str = "Blank.esp";
pub(crate) const BLANK_MASTER_DEPENDENT_ESP: &str = "Blank - Master Dependent.esp";
pub(crate) const NON_PLUGIN_FILE: &str = "NotAPlugin.esm";

fn source_plugins_path() -> PathBuf {
    absolute("./testing-plugins/Skyrim/Data").unwrap()
}

fn master_file(game_type: GameType) -> &'static str {
    match game_type {
        GameType::Oblivion => "Oblivion.esm",
        GameType::Skyrim | GameType::SkyrimSE => "Skyrim.esm",
        GameType::Fallout3 => "Fallout3.esm",
        GameType::FalloutNV => "FalloutNV.esm",
        GameType::Fallout4 => "Fallout4.esm",
    }
}

fn is_load_order_timestamp_based(game_type: GameType) -> bool {
    matches!(
        game_type,
        GameType::Oblivion | GameType::Fallout3 | GameType::FalloutNV
    )
}

fn supports_light_plugins(game_type: GameType) -> bool {
    matches!(game_type, GameType::SkyrimSE | GameType::Fallout4)
}

/// A temporary game install with an empty `Data` directory and a starting
/// load order naming just the game's master file and [`BLANK_ESM`], both
/// active. Tests copy in whichever other test plugins they need with
/// [`Fixture::copy_plugin`].
pub(crate) struct Fixture {
    #[expect(dead_code, reason = "keeps the temp directory alive for the fixture's lifetime")]
    temp_dir: TempDir,
    game_type: GameType,
    pub(crate) game_path: PathBuf,
    pub(crate) local_path: PathBuf,
}

impl Fixture {
    pub(crate) fn new(game_type: GameType) -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("modsort-test-")
            .tempdir()
            .unwrap();

        let game_path = temp_dir.path().join("game");
        let local_path = temp_dir.path().join("local");

        create_dir_all(game_path.join("Data")).unwrap();
        create_dir_all(&local_path).unwrap();

        let fixture = Self {
            temp_dir,
            game_type,
            game_path,
            local_path,
        };

        fixture.copy_plugin(BLANK_ESM);
        copy(
            fixture.data_path().join(BLANK_ESM),
            fixture.data_path().join(master_file(game_type)),
        )
        .unwrap();

        fixture.set_load_order(&[(master_file(game_type), true), (BLANK_ESM, true)]);

        std::fs::write(
            fixture.data_path().join(NON_PLUGIN_FILE),
            "This isn't a valid plugin file.",
        )
        .unwrap();

        fixture
    }

    pub(crate) fn data_path(&self) -> PathBuf {
        self.game_path.join("Data")
    }

    /// Copy a known test plugin into this fixture's `Data` directory.
    pub(crate) fn copy_plugin(&self, filename: &str) {
        copy(
            source_plugins_path().join(filename),
            self.data_path().join(filename),
        )
        .unwrap();
    }

    /// Copy a known test plugin in and fully parse it, for tests that need
    /// a loaded [`Plugin`] but don't need a [`Game`](crate::Game) handle.
    pub(crate) fn load_plugin(&self, filename: &str) -> Plugin {
        self.copy_plugin(filename);

        Plugin::new(
            self.game_type,
            &GameCache::default(),
            &self.data_path().join(filename),
            LoadScope::WholePlugin,
        )
        .unwrap()
    }

    fn set_load_order(&self, load_order: &[(&str, bool)]) {
        let mut file = File::create(self.local_path.join("Plugins.txt")).unwrap();
        for (plugin, is_active) in load_order {
            if supports_light_plugins(self.game_type) {
                if *is_active {
                    write!(file, "*").unwrap();
                }
            } else if !is_active {
                continue;
            }

            writeln!(file, "{plugin}").unwrap();
        }
        drop(file);

        if is_load_order_timestamp_based(self.game_type) {
            let mut mod_time = SystemTime::now();
            for (plugin, _) in load_order {
                File::options()
                    .write(true)
                    .open(self.data_path().join(plugin))
                    .unwrap()
                    .set_modified(mod_time)
                    .unwrap();

                mod_time += Duration::from_secs(60);
            }
        } else if self.game_type == GameType::Skyrim {
            let mut file = File::create(self.local_path.join("loadorder.txt")).unwrap();
            for (plugin, _) in load_order {
                writeln!(file, "{plugin}").unwrap();
            }
        }
    }
}

mod unicase {
    #[test]
    fn eq_should_be_case_insensitive() {
        assert!(unicase::eq("i", "I"));
        assert!(!unicase::eq("i", "\u{0130}"));
    }
}

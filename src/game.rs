//! Game handle: plugin loading (C7) and the entry point into sorting (C8).

use std::{
    collections::HashSet,
    fmt::Display,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use loadorder::WritableLoadOrder;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxHashMap as HashMap;

use crate::{
    Database, LogLevel,
    error::{
        GameHandleCreationError, LoadOrderError, LoadOrderStateError, LoadPluginsError,
        LockPoisonError, SortPluginsError,
    },
    escape_ascii,
    logging::{self, format_details, is_log_enabled},
    metadata::{Filename, Message, strip_ghost_suffix},
    plugin::{
        LoadScope, Plugin,
        error::{InvalidFilenameReason, PluginValidationError},
        validate_plugin_path_and_header,
    },
    sorting::plugins::{PluginSortingData, sort_plugins},
};

const GHOST_FILE_EXTENSION: &str = ".ghost";

/// Codes used to create database handles for specific games (spec §6).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum GameType {
    /// The Elder Scrolls IV: Oblivion
    Oblivion,
    /// The Elder Scrolls V: Skyrim
    Skyrim,
    /// The Elder Scrolls V: Skyrim Special Edition
    SkyrimSE,
    /// Fallout 3
    Fallout3,
    /// Fallout: New Vegas
    FalloutNV,
    /// Fallout 4
    Fallout4,
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Oblivion => write!(f, "The Elder Scrolls IV: Oblivion"),
            GameType::Skyrim => write!(f, "The Elder Scrolls V: Skyrim"),
            GameType::SkyrimSE => write!(f, "The Elder Scrolls V: Skyrim Special Edition"),
            GameType::Fallout3 => write!(f, "Fallout 3"),
            GameType::FalloutNV => write!(f, "Fallout: New Vegas"),
            GameType::Fallout4 => write!(f, "Fallout 4"),
        }
    }
}

impl From<GameType> for loadorder::GameId {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion => loadorder::GameId::Oblivion,
            GameType::Skyrim => loadorder::GameId::Skyrim,
            GameType::SkyrimSE => loadorder::GameId::SkyrimSE,
            GameType::Fallout3 => loadorder::GameId::Fallout3,
            GameType::FalloutNV => loadorder::GameId::FalloutNV,
            GameType::Fallout4 => loadorder::GameId::Fallout4,
        }
    }
}

impl From<GameType> for loot_condition_interpreter::GameType {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion => loot_condition_interpreter::GameType::Oblivion,
            GameType::Skyrim => loot_condition_interpreter::GameType::Skyrim,
            GameType::SkyrimSE => loot_condition_interpreter::GameType::SkyrimSE,
            GameType::Fallout3 => loot_condition_interpreter::GameType::Fallout3,
            GameType::FalloutNV => loot_condition_interpreter::GameType::FalloutNV,
            GameType::Fallout4 => loot_condition_interpreter::GameType::Fallout4,
        }
    }
}

impl From<GameType> for esplugin::GameId {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion => esplugin::GameId::Oblivion,
            GameType::Skyrim => esplugin::GameId::Skyrim,
            GameType::SkyrimSE => esplugin::GameId::SkyrimSE,
            GameType::Fallout3 => esplugin::GameId::Fallout3,
            GameType::FalloutNV => esplugin::GameId::FalloutNV,
            GameType::Fallout4 => esplugin::GameId::Fallout4,
        }
    }
}

/// The interface through which game-specific functionality is provided.
#[derive(Debug)]
pub struct Game {
    game_type: GameType,
    game_path: PathBuf,
    load_order: Box<(dyn WritableLoadOrder + Send + Sync + 'static)>,
    // Stored in an Arc<RwLock<_>> to support loading metadata in parallel with
    // loading plugins.
    database: Arc<RwLock<Database>>,
    cache: GameCache,
    // Install-validity messages generated by the most recent sort_plugins()
    // call. RwLock so that sort_plugins() can stay &self.
    messages: RwLock<Vec<Message>>,
}

impl Game {
    /// Initialise a new game handle, which is then used by all game-specific
    /// functions.
    ///
    /// - `game_type` is a value representing which game to create the handle
    ///   for,
    /// - `game_path` is the relative or absolute path to the directory
    ///   containing the game's executable.
    ///
    /// This function will attempt to look up the game's local data path, which
    /// may fail in some situations. [`Game::with_local_path`] can be used to
    /// provide the local path instead.
    pub fn new(game_type: GameType, game_path: &Path) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\"",
            game_type,
            escape_ascii(game_path)
        );

        let resolved_game_path = resolve_path(game_path);
        if !resolved_game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        let load_order =
            loadorder::GameSettings::new(game_type.into(), &resolved_game_path)?.into_load_order();

        let condition_evaluator_state =
            new_condition_evaluator_state(game_type, &resolved_game_path, load_order.as_ref());

        Ok(Game {
            game_type,
            game_path: resolved_game_path,
            load_order,
            database: Arc::new(RwLock::new(Database::new(condition_evaluator_state))),
            cache: GameCache::default(),
            messages: RwLock::new(Vec::new()),
        })
    }

    /// Initialise a new game handle using an explicit local data path, rather
    /// than relying on this crate's platform-specific lookup.
    ///
    /// `game_local_path` is the relative or absolute path to the game's local
    /// data path. This is usually somewhere under `%LOCALAPPDATA%` on
    /// Windows.
    pub fn with_local_path(
        game_type: GameType,
        game_path: &Path,
        game_local_path: &Path,
    ) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\" and game local path \"{}\"",
            game_type,
            escape_ascii(game_path),
            escape_ascii(game_local_path)
        );

        let resolved_game_path = resolve_path(game_path);
        if !resolved_game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        let resolved_game_local_path = resolve_path(game_local_path);
        if resolved_game_local_path.exists() && !resolved_game_local_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(
                game_local_path.into(),
            ));
        }

        let load_order = loadorder::GameSettings::with_local_path(
            game_type.into(),
            &resolved_game_path,
            &resolved_game_local_path,
        )?
        .into_load_order();

        let condition_evaluator_state =
            new_condition_evaluator_state(game_type, &resolved_game_path, load_order.as_ref());

        Ok(Game {
            game_type,
            game_path: resolved_game_path,
            load_order,
            database: Arc::new(RwLock::new(Database::new(condition_evaluator_state))),
            cache: GameCache::default(),
            messages: RwLock::new(Vec::new()),
        })
    }

    /// Get the game's type.
    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Gets the currently-set additional data paths.
    pub fn additional_data_paths(&self) -> &[PathBuf] {
        self.load_order
            .game_settings()
            .additional_plugins_directories()
    }

    /// Set additional data paths.
    ///
    /// The additional data paths are used when interacting with the load
    /// order, evaluating conditions and scanning for archives. They take
    /// precedence over the game's main data path, in the order given.
    ///
    /// Setting additional data paths clears the condition cache in this
    /// game's database object.
    pub fn set_additional_data_paths(
        &mut self,
        additional_data_paths: &[&Path],
    ) -> Result<(), LockPoisonError> {
        let paths: Vec<_> = additional_data_paths
            .iter()
            .map(|p| p.to_path_buf())
            .collect();

        let mut database = self.database.write()?;
        database.clear_condition_cache();

        self.load_order
            .game_settings_mut()
            .set_additional_plugins_directories(paths.clone());

        database
            .condition_evaluator_state_mut()
            .set_additional_data_paths(paths);

        Ok(())
    }

    /// Get the object used for accessing metadata-related functionality.
    pub fn database(&self) -> Arc<RwLock<Database>> {
        Arc::clone(&self.database)
    }

    /// Check if a file is a valid plugin.
    ///
    /// The validity check is not exhaustive: it generally checks that the
    /// file has a valid plugin file extension for the game and that its
    /// header can be parsed.
    ///
    /// `plugin_path` can be absolute or relative: relative paths are resolved
    /// relative to the game's plugins directory, while absolute paths are
    /// used as given.
    pub fn is_valid_plugin(&self, plugin_path: &Path) -> bool {
        let resolved_path = resolve_plugin_path(&data_path(&self.game_path), plugin_path);
        validate_plugin_path_and_header(self.game_type, &resolved_path).is_ok()
    }

    /// Fully parses plugins and loads their data.
    ///
    /// If a given plugin filename (or one that is case-insensitively equal)
    /// has already been loaded, its previously-loaded data is discarded.
    ///
    /// Relative paths in `plugin_paths` are resolved relative to the game's
    /// plugins directory, while absolute paths are used as given. Each
    /// plugin filename must be unique within the slice.
    ///
    /// Loading plugins clears the condition cache in this game's database
    /// object.
    pub fn load_plugins(&mut self, plugin_paths: &[&Path]) -> Result<(), LoadPluginsError> {
        let plugins = self.load_plugins_common(plugin_paths, LoadScope::WholePlugin)?;

        self.store_plugins(plugins)?;

        Ok(())
    }

    /// Parses plugin headers and loads their data.
    ///
    /// If a given plugin filename (or one that is case-insensitively equal)
    /// has already been loaded, its previously-loaded data is discarded.
    ///
    /// Relative paths in `plugin_paths` are resolved relative to the game's
    /// plugins directory, while absolute paths are used as given. Each
    /// plugin filename must be unique within the slice.
    ///
    /// Loading plugins clears the condition cache in this game's database
    /// object.
    pub fn load_plugin_headers(&mut self, plugin_paths: &[&Path]) -> Result<(), LoadPluginsError> {
        let plugins = self.load_plugins_common(plugin_paths, LoadScope::HeaderOnly)?;

        self.store_plugins(plugins)?;

        Ok(())
    }

    fn load_plugins_common(
        &mut self,
        plugin_paths: &[&Path],
        load_scope: LoadScope,
    ) -> Result<Vec<Plugin>, LoadPluginsError> {
        let data_path = data_path(&self.game_path);

        validate_plugin_paths(self.game_type, &data_path, plugin_paths)?;

        let archive_paths =
            find_archives(self.game_type, self.additional_data_paths(), &data_path)?;

        self.cache.set_archive_paths(archive_paths);

        logging::trace!("Starting loading {load_scope}s.");

        let master_file = self.load_order.game_settings().master_file();

        let plugins: Vec<_> = plugin_paths
            .par_iter()
            .map(|path| {
                try_load_plugin(
                    &data_path,
                    path,
                    self.game_type,
                    &self.cache,
                    load_scope,
                    master_file,
                )
            })
            .collect();

        Ok(plugins)
    }

    fn store_plugins(&mut self, plugins: Vec<Plugin>) -> Result<(), LockPoisonError> {
        self.cache.insert_plugins(plugins);

        let mut database = self.database.write()?;
        update_loaded_plugin_state(
            database.condition_evaluator_state_mut(),
            self.cache.plugins_iter(),
        );

        Ok(())
    }

    /// Clears the plugins loaded by previous calls to [`Game::load_plugins`]
    /// or [`Game::load_plugin_headers`].
    pub fn clear_loaded_plugins(&mut self) {
        self.cache.clear_plugins();
    }

    /// Get data for a loaded plugin.
    pub fn plugin(&self, plugin_name: &str) -> Option<Arc<Plugin>> {
        self.cache.plugin(plugin_name).cloned()
    }

    /// Get data for all loaded plugins.
    pub fn loaded_plugins(&self) -> Vec<Arc<Plugin>> {
        self.cache.plugins_iter().cloned().collect()
    }

    /// Calculates a new load order for the given plugins and returns the
    /// sorted sequence of plugin names (spec §4.8).
    ///
    /// This pulls metadata from the masterlist and userlist if they are
    /// loaded, and uses the loaded data of each plugin. No changes are
    /// applied to the load order used by the game, or to anything on disk.
    ///
    /// The order in which plugins are listed in `plugin_names` is used as
    /// their current load order for tie-breaking. All given plugins must
    /// have already been loaded using [`Game::load_plugins`] or
    /// [`Game::load_plugin_headers`].
    pub fn sort_plugins(&self, plugin_names: &[&str]) -> Result<Vec<String>, SortPluginsError> {
        let plugins = plugin_names
            .iter()
            .map(|n| {
                self.cache
                    .plugin(n)
                    .ok_or_else(|| SortPluginsError::PluginNotLoaded((*n).to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let database = self.database.read()?;

        let plugins_sorting_data = plugins
            .into_iter()
            .enumerate()
            .map(|(i, p)| to_plugin_sorting_data(&database, &p, i))
            .collect::<Result<Vec<_>, _>>()?;

        if is_log_enabled(LogLevel::Debug) {
            logging::debug!("Current load order:");
            for plugin_name in plugin_names {
                logging::debug!("\t{plugin_name}");
            }
        }

        let (new_load_order, messages) = sort_plugins(plugins_sorting_data, &|name: &str| {
            self.load_order.is_active(name)
        })?;

        if is_log_enabled(LogLevel::Debug) {
            logging::debug!("Sorted load order:");
            for plugin_name in &new_load_order {
                logging::debug!("\t{plugin_name}");
            }
        }

        match self.messages.write() {
            Ok(mut guard) => *guard = messages,
            Err(e) => {
                logging::error!("The messages lock is poisoned, assigning a new value");
                *e.into_inner() = messages;
            }
        }

        Ok(new_load_order)
    }

    /// Get the install-validity messages generated by the most recent call
    /// to [`Game::sort_plugins`] (spec §4.9), plus a warning for every
    /// currently loaded plugin whose file could not be parsed (spec §4.2).
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = match self.messages.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                logging::error!("The messages lock is poisoned, assigning a new value");
                let messages = e.into_inner().clone();
                *self.messages.write().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    messages.clone();
                messages
            }
        };

        messages.extend(
            self.cache
                .plugins_iter()
                .flat_map(|p| p.status_messages().iter().cloned()),
        );

        messages
    }

    /// Load the current load order state, discarding any previously held
    /// state.
    ///
    /// This function should be called whenever the load order or active
    /// state of plugins "on disk" changes, so that the cached state is
    /// updated to reflect the changes. This only reads from the
    /// environment: it never writes the active-plugins file or any
    /// timestamp-based order.
    ///
    /// Loading the current load order state clears the condition cache in
    /// this game's database object.
    pub fn load_current_load_order_state(&mut self) -> Result<(), LoadOrderStateError> {
        self.load_order.load()?;

        let mut database = self.database.write()?;
        database.clear_condition_cache();
        database
            .condition_evaluator_state_mut()
            .set_active_plugins(&self.load_order.active_plugin_names());
        Ok(())
    }

    /// Check if the load order is ambiguous.
    ///
    /// This checks that all plugins in the current load order state have a
    /// well-defined position in the "on disk" state, and that all data
    /// sources are consistent. If the load order is ambiguous, different
    /// applications may read different load orders from the same source
    /// data.
    pub fn is_load_order_ambiguous(&self) -> Result<bool, LoadOrderError> {
        Ok(self.load_order.is_ambiguous()?)
    }

    /// Gets the path to the file that holds the list of active plugins.
    pub fn active_plugins_file_path(&self) -> &PathBuf {
        self.load_order.game_settings().active_plugins_file()
    }

    /// Check if the given plugin is active.
    pub fn is_plugin_active(&self, plugin_name: &str) -> bool {
        self.load_order.is_active(plugin_name)
    }

    /// Get the current load order, as read from the environment.
    pub fn load_order(&self) -> Vec<&str> {
        self.load_order.plugin_names()
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    if path.is_symlink() {
        path.read_link().unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn data_path(game_path: &Path) -> PathBuf {
    game_path.join("Data")
}

fn new_condition_evaluator_state(
    game_type: GameType,
    game_path: &Path,
    load_order: &(dyn WritableLoadOrder + Send + Sync + 'static),
) -> loot_condition_interpreter::State {
    let data_path = data_path(game_path);

    let mut condition_evaluator_state =
        loot_condition_interpreter::State::new(game_type.into(), data_path);
    condition_evaluator_state.set_additional_data_paths(
        load_order
            .game_settings()
            .additional_plugins_directories()
            .to_vec(),
    );

    condition_evaluator_state
}

fn validate_plugin_paths(
    game_type: GameType,
    data_path: &Path,
    plugin_paths: &[&Path],
) -> Result<(), PluginValidationError> {
    let mut set = HashSet::new();
    for path in plugin_paths {
        let filename = match path.file_name() {
            Some(f) => f.to_string_lossy(),
            None => {
                return Err(PluginValidationError::invalid(
                    (*path).into(),
                    InvalidFilenameReason::Empty,
                ));
            }
        };
        if !set.insert(Filename::new(&filename)) {
            return Err(PluginValidationError::invalid(
                (*path).into(),
                InvalidFilenameReason::NonUnique,
            ));
        }
    }

    plugin_paths
        .par_iter()
        .map(|path| {
            let resolved_path = resolve_plugin_path(data_path, path);
            validate_plugin_path_and_header(game_type, &resolved_path)
        })
        .collect()
}

fn find_archives(
    game_type: GameType,
    additional_data_paths: &[PathBuf],
    data_path: &Path,
) -> std::io::Result<Vec<PathBuf>> {
    let extension = archive_file_extension(game_type);

    let mut archive_paths = Vec::new();
    for path in additional_data_paths {
        let paths = find_archives_in_path(path, extension)?;
        archive_paths.extend(paths);
    }

    let paths = find_archives_in_path(data_path, extension)?;
    archive_paths.extend(paths);

    Ok(archive_paths)
}

fn archive_file_extension(game_type: GameType) -> &'static str {
    match game_type {
        GameType::Fallout4 => ".ba2",
        _ => ".bsa",
    }
}

fn find_archives_in_path(
    parent_path: &Path,
    archive_file_extension: &str,
) -> std::io::Result<Vec<PathBuf>> {
    if !parent_path.exists() {
        return Ok(Vec::new());
    }

    let paths = std::fs::read_dir(parent_path)?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().map(|f| f.is_file()).unwrap_or(false)
                && e.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .ends_with(&archive_file_extension.to_lowercase())
        })
        .map(|e| e.path())
        .collect();

    Ok(paths)
}

fn try_load_plugin(
    data_path: &Path,
    plugin_path: &Path,
    game_type: GameType,
    game_cache: &GameCache,
    load_scope: LoadScope,
    master_file: &str,
) -> Plugin {
    let resolved_path = resolve_plugin_path(data_path, plugin_path);

    // The game's own declared master file is always loaded header-only:
    // its full contents are never needed for sorting, and for some games
    // it is large enough that parsing it fully would be wasteful.
    let effective_scope = if is_master_file(plugin_path, master_file) {
        LoadScope::HeaderOnly
    } else {
        load_scope
    };

    match Plugin::new(game_type, game_cache, &resolved_path, effective_scope) {
        Ok(p) => p,
        Err(e) => {
            let details = format_details(&e);
            logging::error!(
                "Caught error while trying to load \"{}\": {}",
                escape_ascii(plugin_path),
                details
            );
            Plugin::new_load_failure(plugin_path, &details)
        }
    }
}

fn is_master_file(plugin_path: &Path, master_file: &str) -> bool {
    plugin_path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| Filename::new(strip_ghost_suffix(name)) == Filename::new(master_file))
}

fn resolve_plugin_path(data_path: &Path, plugin_path: &Path) -> PathBuf {
    let plugin_path = data_path.join(plugin_path);

    if !plugin_path.exists() {
        if let Some(filename) = plugin_path.file_name() {
            logging::debug!(
                "Could not find plugin at \"{}\", adding {} file extension",
                escape_ascii(&plugin_path),
                GHOST_FILE_EXTENSION
            );
            let mut filename = filename.to_os_string();
            filename.push(GHOST_FILE_EXTENSION);
            plugin_path.with_file_name(filename)
        } else {
            plugin_path
        }
    } else {
        plugin_path
    }
}

fn update_loaded_plugin_state<'a>(
    state: &mut loot_condition_interpreter::State,
    plugins: impl Iterator<Item = &'a Arc<Plugin>>,
) {
    let mut plugin_versions = Vec::new();
    let mut plugin_crcs = Vec::new();

    for plugin in plugins {
        if let Some(version) = plugin.version() {
            plugin_versions.push((plugin.name(), version));
        }

        if let Some(crc) = plugin.crc() {
            plugin_crcs.push((plugin.name(), crc));
        }
    }

    if let Err(e) = state.clear_condition_cache() {
        logging::error!("The condition cache's lock is poisoned, assigning a new cache");
        *e.into_inner() = std::collections::HashMap::new();
    }

    state.set_plugin_versions(&plugin_versions);

    if let Err(e) = state.set_cached_crcs(&plugin_crcs) {
        logging::error!(
            "The condition interpreter's CRC cache's lock is poisoned, clearing the cache and assigning a new value"
        );
        let mut cache = e.into_inner();
        cache.clear();
        *cache = plugin_crcs
            .into_iter()
            .map(|(n, c)| (n.to_lowercase(), c))
            .collect();
    }
}

fn to_plugin_sorting_data<'a>(
    database: &Database,
    plugin: &'a Arc<Plugin>,
    load_order_index: usize,
) -> Result<PluginSortingData<'a>, SortPluginsError> {
    let masterlist_metadata = database.plugin_metadata(plugin.name(), false, true)?;
    let user_metadata = database.plugin_user_metadata(plugin.name(), true)?;

    PluginSortingData::new(
        plugin.as_ref(),
        masterlist_metadata.as_ref(),
        user_metadata.as_ref(),
        load_order_index,
    )
    .map_err(Into::into)
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct GameCache {
    plugins: HashMap<Filename, Arc<Plugin>>,
    archive_paths: HashSet<PathBuf>,
}

impl GameCache {
    pub fn set_archive_paths(&mut self, archive_paths: Vec<PathBuf>) {
        self.archive_paths.clear();
        self.archive_paths.extend(archive_paths);
    }

    fn insert_plugins(&mut self, plugins: Vec<Plugin>) {
        for plugin in plugins {
            self.plugins.insert(Filename::new(plugin.name()), Arc::new(plugin));
        }
    }

    fn clear_plugins(&mut self) {
        self.plugins.clear();
    }

    fn plugins_iter(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins.values()
    }

    fn plugin(&self, plugin_name: &str) -> Option<&Arc<Plugin>> {
        self.plugins.get(&Filename::new(plugin_name))
    }

    pub fn archives_iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.archive_paths.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tests::{BLANK_ESM, Fixture};

    #[test]
    fn new_should_error_if_the_game_path_is_not_a_directory() {
        let fixture = Fixture::new(GameType::Skyrim);
        let not_a_dir = fixture.game_path.join("not-a-real-subdir");

        let result = Game::with_local_path(GameType::Skyrim, &not_a_dir, &fixture.local_path);

        assert!(result.is_err());
    }

    #[test]
    fn new_with_local_path_should_construct_a_game_handle() {
        let fixture = Fixture::new(GameType::Skyrim);

        let game =
            Game::with_local_path(GameType::Skyrim, &fixture.game_path, &fixture.local_path)
                .unwrap();

        assert_eq!(GameType::Skyrim, game.game_type());
    }

    #[test]
    fn load_plugins_should_make_loaded_plugins_available() {
        let fixture = Fixture::new(GameType::Skyrim);
        fixture.copy_plugin(BLANK_ESM);

        let mut game =
            Game::with_local_path(GameType::Skyrim, &fixture.game_path, &fixture.local_path)
                .unwrap();

        game.load_plugins(&[Path::new(BLANK_ESM)]).unwrap();

        assert!(game.plugin(BLANK_ESM).is_some());
    }

    #[test]
    fn clear_loaded_plugins_should_empty_the_cache() {
        let fixture = Fixture::new(GameType::Skyrim);
        fixture.copy_plugin(BLANK_ESM);

        let mut game =
            Game::with_local_path(GameType::Skyrim, &fixture.game_path, &fixture.local_path)
                .unwrap();

        game.load_plugins(&[Path::new(BLANK_ESM)]).unwrap();
        game.clear_loaded_plugins();

        assert!(game.loaded_plugins().is_empty());
    }

    #[test]
    fn sort_plugins_should_error_if_a_plugin_was_not_loaded() {
        let fixture = Fixture::new(GameType::Skyrim);

        let game =
            Game::with_local_path(GameType::Skyrim, &fixture.game_path, &fixture.local_path)
                .unwrap();

        let result = game.sort_plugins(&[BLANK_ESM]);

        assert!(result.is_err());
    }
}

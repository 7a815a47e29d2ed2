pub mod error;

use std::{
    fs::File,
    hash::Hasher,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use esplugin::ParseOptions;
use fancy_regex::Regex;

use crate::{
    GameType, archive::find_associated_archives, game::GameCache, logging,
    metadata::{Message, MessageType, strip_ghost_suffix},
    regex,
};
use error::{
    InvalidFilenameReason, LoadPluginError, PluginDataError, PluginValidationError,
    PluginValidationErrorReason,
};

static VERSION_REGEXES: LazyLock<Box<[Regex]>> = LazyLock::new(|| {
    /* The string below matches the range of version strings supported by
    Pseudosem v1.0.1, excluding space separators, as they make version
    extraction from inside sentences very tricky and have not been
    seen "in the wild". */
    let pseudosem_regex_str = r"(\d+(?:\.\d+)+(?:[-._:]?[A-Za-z0-9]+)*)(?!,)";

    Box::new([
        /* The string below matches timestamps that use forwardslashes for date
        separators. However, Pseudosem v1.0.1 will only compare the first
        two digits as it does not recognise forwardslashes as separators. */
        regex(r"(\d{1,2}/\d{1,2}/\d{1,4} \d{1,2}:\d{1,2}:\d{1,2})")
            .expect("Hardcoded version timestamp regex should be valid"),
        regex(&(String::from(r"version:?\s") + pseudosem_regex_str))
            .expect("Hardcoded version-prefixed pseudosem version regex should be valid"),
        regex(&(String::from(r"(?:^|v|\s)") + pseudosem_regex_str))
            .expect("Hardcoded pseudosem version regex should be valid"),
        /* The string below matches a number containing one or more
        digits found at the start of the search string or preceded by
        'v' or 'version:. */
        regex(r"(?:^|v|version:\s*)(\d+)")
            .expect("Hardcoded prefixed version number regex should be valid"),
    ])
});

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) enum LoadScope {
    HeaderOnly,
    WholePlugin,
}

impl std::fmt::Display for LoadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadScope::HeaderOnly => write!(f, "plugin header"),
            LoadScope::WholePlugin => write!(f, "whole plugin"),
        }
    }
}

/// Represents a plugin file that has been loaded.
///
/// If loading failed, the plugin is kept in the cache with default-valued
/// fields (no masters, no override records, not a master plugin) rather
/// than being dropped, and the failure is recorded in
/// [`status_messages`](Plugin::status_messages) so that the sorter can
/// still run and the caller can still learn what went wrong.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plugin {
    name: String,
    plugin: Option<esplugin::Plugin>,
    crc: Option<u32>,
    version: Option<String>,
    tags: Vec<String>,
    archive_paths: Vec<PathBuf>,
    status_messages: Vec<Message>,
}

impl Plugin {
    pub(crate) fn new(
        game_type: GameType,
        game_cache: &GameCache,
        plugin_path: &Path,
        load_scope: LoadScope,
    ) -> Result<Self, LoadPluginError> {
        let name = name_string(plugin_path)?;

        let (parse_options, crc) = if load_scope == LoadScope::HeaderOnly {
            (ParseOptions::header_only(), None)
        } else {
            let crc = calculate_crc(plugin_path)?;
            (ParseOptions::whole_plugin(), Some(crc))
        };

        let mut plugin = esplugin::Plugin::new(game_type.into(), plugin_path);
        plugin.parse_file(parse_options)?;

        let mut version = None;
        let mut tags = Vec::new();
        if let Some(description) = plugin.description()? {
            tags = extract_bash_tags(&description);
            version = extract_version(&description)?;
        }

        let archive_paths = find_associated_archives(game_type, game_cache, plugin_path);

        Ok(Self {
            name,
            plugin: Some(plugin),
            crc,
            version,
            tags,
            archive_paths,
            status_messages: Vec::new(),
        })
    }

    /// Construct a placeholder for a plugin whose file could not be parsed:
    /// every field other than the name and the recorded failure is left at
    /// its default value, so that the plugin stays in the cache and the
    /// sorter can still place it rather than having the load silently drop
    /// it.
    pub(crate) fn new_load_failure(plugin_path: &Path, error_details: &str) -> Self {
        let name = name_string(plugin_path)
            .unwrap_or_else(|_| strip_ghost_suffix(&plugin_path.to_string_lossy()).to_owned());

        let message = Message::new(
            MessageType::Error,
            format!("\"{name}\" could not be loaded: {error_details}"),
        );

        Self {
            name,
            plugin: None,
            crc: None,
            version: None,
            tags: Vec::new(),
            archive_paths: Vec::new(),
            status_messages: vec![message],
        }
    }

    /// Get any messages describing errors caught while loading this plugin.
    ///
    /// Non-empty only if the plugin's file could not be parsed; the other
    /// fields are then all default-valued.
    pub fn status_messages(&self) -> &[Message] {
        &self.status_messages
    }

    /// Get the plugin's filename.
    ///
    /// If the plugin was ghosted when it was loaded, this filename will be
    /// without the `.ghost` suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the value of the version field in the `HEDR` subrecord of the
    /// plugin's `TES4` record.
    ///
    /// Returns `None` if the `HEDR` subrecord could not be found, or if the
    /// version field's value was `NaN`.
    pub fn header_version(&self) -> Option<f32> {
        self.plugin.as_ref()?.header_version()
    }

    /// Get the plugin's version number from its description field.
    ///
    /// The description field may not contain a version number, or it may not
    /// be possible to detect it: the description field parsing functions
    /// correctly in all known cases but isn't guaranteed to be exhaustive.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the plugin's masters.
    pub fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        match &self.plugin {
            Some(plugin) => Ok(plugin.masters()?),
            None => Ok(Vec::new()),
        }
    }

    /// Get any Bash Tags found in the plugin's description field.
    pub fn bash_tags(&self) -> &[String] {
        &self.tags
    }

    /// Get the plugin's CRC-32 checksum.
    ///
    /// This will be `None` if the plugin is not fully loaded.
    pub fn crc(&self) -> Option<u32> {
        self.crc
    }

    /// Check if the plugin is a master plugin.
    ///
    /// What causes a plugin to be a master plugin varies by game, but is
    /// usually indicated by the plugin having its master flag set and/or by
    /// its file extension.
    ///
    /// The term "master" is potentially confusing: a plugin A may not be a
    /// *master plugin*, but may still be a *master of* another plugin by
    /// being listed as such in that plugin's header record. Master plugins
    /// are sometimes referred to as *master files* or simply *masters*,
    /// while the other meaning is always referenced in relation to another
    /// plugin.
    pub fn is_master(&self) -> bool {
        self.plugin.as_ref().is_some_and(esplugin::Plugin::is_master_file)
    }

    /// Check if the plugin contains any records other than its `TES4`
    /// header.
    pub fn is_empty(&self) -> bool {
        self.plugin
            .as_ref()
            .and_then(|p| p.record_and_group_count().ok())
            .unwrap_or(0)
            == 0
    }

    /// Check if the plugin loads an archive (BSA/BA2 depending on the game).
    pub fn loads_archive(&self) -> bool {
        !self.archive_paths.is_empty()
    }

    /// Check if two plugins contain a record with the same FormID.
    pub fn do_records_overlap(&self, plugin: &Plugin) -> Result<bool, PluginDataError> {
        match (&self.plugin, &plugin.plugin) {
            (Some(a), Some(b)) => Ok(a.overlaps_with(b)?),
            _ => Ok(false),
        }
    }

    pub(crate) fn override_record_count(&self) -> Result<usize, PluginDataError> {
        match &self.plugin {
            Some(plugin) => Ok(plugin.count_override_records()?),
            None => Ok(0),
        }
    }

    pub(crate) fn resolve_record_ids(
        &mut self,
        plugins_metadata: &[esplugin::PluginMetadata],
    ) -> Result<(), PluginDataError> {
        if let Some(plugin) = &mut self.plugin {
            plugin.resolve_record_ids(plugins_metadata)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_plugin_path_and_header(
    game_type: GameType,
    plugin_path: &Path,
) -> Result<(), PluginValidationError> {
    if !has_plugin_file_extension(plugin_path) {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::invalid(
            plugin_path.into(),
            InvalidFilenameReason::UnsupportedFileExtension,
        ))
    } else if esplugin::Plugin::is_valid(game_type.into(), plugin_path, ParseOptions::header_only())
    {
        Ok(())
    } else {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::new(
            plugin_path.into(),
            PluginValidationErrorReason::InvalidPluginHeader,
        ))
    }
}

fn has_plugin_file_extension(plugin_path: &Path) -> bool {
    let extension = if has_ascii_extension(plugin_path, "ghost") {
        plugin_path
            .file_stem()
            .and_then(|s| Path::new(s).extension())
    } else {
        plugin_path.extension()
    };

    extension
        .map(|e| e.eq_ignore_ascii_case("esp") || e.eq_ignore_ascii_case("esm"))
        .unwrap_or(false)
}

pub(crate) fn has_ascii_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

pub(crate) fn plugins_metadata(
    plugins: &[Plugin],
) -> Result<Vec<esplugin::PluginMetadata>, PluginDataError> {
    let esplugins: Vec<_> = plugins.iter().filter_map(|p| p.plugin.as_ref()).collect();
    Ok(esplugin::plugins_metadata(&esplugins)?)
}

fn name_string(path: &Path) -> Result<String, LoadPluginError> {
    match path.file_name() {
        Some(f) => match f.to_str() {
            Some(f) => Ok(strip_ghost_suffix(f).to_string()),
            None => Err(LoadPluginError::InvalidFilename(
                InvalidFilenameReason::NonUnicode,
            )),
        },
        None => Err(LoadPluginError::InvalidFilename(
            InvalidFilenameReason::Empty,
        )),
    }
}

fn calculate_crc(path: &Path) -> std::io::Result<u32> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = crc32fast::Hasher::new();

    let mut buffer = reader.fill_buf()?;
    while !buffer.is_empty() {
        hasher.write(buffer);
        let length = buffer.len();
        reader.consume(length);

        buffer = reader.fill_buf()?;
    }

    Ok(hasher.finalize())
}

fn extract_bash_tags(description: &str) -> Vec<String> {
    let bash_tags_opener = "{{BASH:";

    if let Some(mut start_pos) = description.find(bash_tags_opener) {
        start_pos += bash_tags_opener.len();

        if let Some(end_pos) = description[start_pos..].find("}}") {
            return description[start_pos..start_pos + end_pos]
                .split(",")
                .map(|s| s.trim().to_string())
                .collect();
        }
    }
    Vec::new()
}

fn extract_version(description: &str) -> Result<Option<String>, Box<fancy_regex::Error>> {
    for regex in &*VERSION_REGEXES {
        let version = regex
            .captures(description)?
            .iter()
            .flat_map(|captures| captures.iter())
            .flatten()
            .skip(1) // Skip the first capture as that's the whole regex.
            .map(|m| m.as_str().trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string());

        if version.is_some() {
            return Ok(version);
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bash_tags_should_return_tags_listed_in_the_bash_tags_block() {
        let description = "Some text {{BASH: Delev, Relev }} more text";
        assert_eq!(vec!["Delev", "Relev"], extract_bash_tags(description));
    }

    #[test]
    fn extract_bash_tags_should_return_empty_vec_if_no_block_is_present() {
        assert_eq!(Vec::<String>::new(), extract_bash_tags("no tags here"));
    }

    #[test]
    fn extract_version_should_find_a_pseudosem_version_after_a_version_prefix() {
        let version = extract_version("Version: 1.2.3").unwrap();
        assert_eq!(Some("1.2.3".to_string()), version);
    }

    #[test]
    fn extract_version_should_find_none_if_there_is_no_version_string() {
        let version = extract_version("no version here").unwrap();
        assert_eq!(None, version);
    }
}

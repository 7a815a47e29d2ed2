//! The database (C4, spec §4.4): loads masterlist/userlist metadata
//! documents, merges and evaluates a plugin's metadata, and evaluates
//! standalone condition strings.

mod conditions;
mod error;

use std::path::Path;

use conditions::evaluate_condition;

use crate::{
    logging,
    metadata::{
        MetadataDocument, PluginMetadata,
        error::{LoadMetadataError, WriteMetadataError, WriteMetadataErrorReason},
    },
};

pub use conditions::evaluate_all_conditions;
pub use error::{ConditionEvaluationError, MetadataRetrievalError};

/// Control behaviour when writing to files.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WriteMode {
    /// Create the file if it does not exist, otherwise error.
    Create,
    /// Create the file if it does not exist, otherwise replace its contents.
    CreateOrTruncate,
}

/// The interface through which metadata can be accessed.
#[derive(Debug)]
pub struct Database {
    masterlist: MetadataDocument,
    userlist: MetadataDocument,
    condition_evaluator_state: loot_condition_interpreter::State,
}

impl Database {
    #[must_use]
    pub(crate) fn new(condition_evaluator_state: loot_condition_interpreter::State) -> Self {
        Self {
            masterlist: MetadataDocument::new(),
            userlist: MetadataDocument::new(),
            condition_evaluator_state,
        }
    }

    pub(crate) fn condition_evaluator_state_mut(
        &mut self,
    ) -> &mut loot_condition_interpreter::State {
        &mut self.condition_evaluator_state
    }

    pub(crate) fn clear_condition_cache(&mut self) {
        if let Err(e) = self.condition_evaluator_state.clear_condition_cache() {
            logging::error!("The condition cache's lock is poisoned, assigning a new cache");
            *e.into_inner() = std::collections::HashMap::new();
        }
    }

    /// Loads the masterlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a
    /// masterlist.
    pub fn load_masterlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.masterlist = MetadataDocument::load_from_path(path)?;
        Ok(())
    }

    /// Loads the userlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a
    /// userlist.
    pub fn load_userlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.userlist = MetadataDocument::load_from_path(path)?;
        Ok(())
    }

    /// Writes a metadata file containing all loaded user-added metadata.
    ///
    /// If `output_path` already exists, it will be written if `mode` is
    /// [`WriteMode::CreateOrTruncate`], otherwise no data will be written.
    pub fn write_user_metadata(
        &self,
        output_path: &Path,
        mode: WriteMode,
    ) -> Result<(), WriteMetadataError> {
        validate_write_path(output_path, mode)?;

        self.userlist.write_to_path(output_path, true)
    }

    /// Writes a metadata file that only contains plugin Bash Tag suggestions
    /// and dirty info.
    ///
    /// If `output_path` already exists, it will be written if `mode` is
    /// [`WriteMode::CreateOrTruncate`], otherwise no data will be written.
    pub fn write_minimal_list(
        &self,
        output_path: &Path,
        mode: WriteMode,
    ) -> Result<(), WriteMetadataError> {
        validate_write_path(output_path, mode)?;

        let mut doc = MetadataDocument::new();

        for plugin in self.masterlist.plugins() {
            let Ok(mut minimal_plugin) = PluginMetadata::new(plugin.name()) else {
                logging::error!(
                    "Unexpectedly encountered a regex error trying to create a PluginMetadata object with the name {}",
                    plugin.name()
                );
                continue;
            };
            minimal_plugin.set_tags(plugin.tags().to_vec());
            minimal_plugin.set_dirty_info(plugin.dirty_info().to_vec());

            doc.set_plugin(minimal_plugin);
        }

        doc.write_to_path(output_path, true)
    }

    /// Evaluate the given condition string.
    pub fn evaluate(&self, condition: &str) -> Result<bool, ConditionEvaluationError> {
        evaluate_condition(Some(condition), &self.condition_evaluator_state).map_err(Into::into)
    }

    /// Get all of a plugin's loaded metadata.
    ///
    /// If `include_user_metadata` is `true`, any user metadata the plugin has
    /// is merged into the returned metadata, otherwise the metadata returned
    /// only includes metadata from the masterlist.
    ///
    /// If `evaluate_conditions` is `true`, any metadata conditions are
    /// evaluated before the metadata is returned, otherwise unevaluated
    /// metadata is returned. Evaluating plugin metadata conditions does
    /// **not** clear the condition cache.
    pub fn plugin_metadata(
        &self,
        plugin_name: &str,
        include_user_metadata: bool,
        evaluate_conditions: bool,
    ) -> Result<Option<PluginMetadata>, MetadataRetrievalError> {
        let mut metadata = self.masterlist.find_plugin(plugin_name).cloned();

        if include_user_metadata
            && let Some(mut user_metadata) = self.userlist.find_plugin(plugin_name).cloned()
        {
            if let Some(metadata) = &metadata {
                user_metadata.merge(metadata);
            }
            metadata = Some(user_metadata);
        }

        if evaluate_conditions
            && let Some(metadata) = metadata
        {
            return evaluate_all_conditions(metadata, &self.condition_evaluator_state)
                .map_err(Into::into);
        }

        Ok(metadata)
    }

    /// Get a plugin's metadata loaded from the given userlist.
    ///
    /// If `evaluate_conditions` is `true`, any metadata conditions are
    /// evaluated before the metadata is returned, otherwise unevaluated
    /// metadata is returned. Evaluating plugin metadata conditions does
    /// **not** clear the condition cache.
    pub fn plugin_user_metadata(
        &self,
        plugin_name: &str,
        evaluate_conditions: bool,
    ) -> Result<Option<PluginMetadata>, MetadataRetrievalError> {
        let metadata = self.userlist.find_plugin(plugin_name).cloned();

        if evaluate_conditions
            && let Some(metadata) = metadata
        {
            return evaluate_all_conditions(metadata, &self.condition_evaluator_state)
                .map_err(Into::into);
        }

        Ok(metadata)
    }

    /// Sets a plugin's user metadata, replacing any loaded user metadata for
    /// that plugin.
    pub fn set_plugin_user_metadata(&mut self, plugin_metadata: PluginMetadata) {
        self.userlist.set_plugin(plugin_metadata);
    }

    /// Discards all loaded user metadata for the plugin with the given
    /// filename.
    pub fn discard_plugin_user_metadata(&mut self, plugin: &str) {
        self.userlist.remove_plugin(plugin);
    }

    /// Discards all loaded user metadata for all plugins.
    pub fn discard_all_user_metadata(&mut self) {
        self.userlist.clear();
    }
}

fn validate_write_path(output_path: &Path, mode: WriteMode) -> Result<(), WriteMetadataError> {
    if !output_path.parent().is_some_and(Path::exists) {
        Err(WriteMetadataError::new(
            output_path.into(),
            WriteMetadataErrorReason::ParentDirectoryNotFound,
        ))
    } else if mode == WriteMode::Create && output_path.exists() {
        Err(WriteMetadataError::new(
            output_path.into(),
            WriteMetadataErrorReason::PathAlreadyExists,
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::metadata::File;

    fn state() -> loot_condition_interpreter::State {
        loot_condition_interpreter::State::new(
            loot_condition_interpreter::GameType::Skyrim,
            std::env::temp_dir(),
        )
    }

    #[test]
    fn evaluate_should_return_true_for_an_empty_condition() {
        let database = Database::new(state());

        assert!(database.evaluate("").unwrap());
    }

    #[test]
    fn plugin_metadata_should_merge_masterlist_and_userlist_entries() {
        let mut database = Database::new(state());

        let mut masterlist_metadata = PluginMetadata::new("test.esp").unwrap();
        masterlist_metadata.set_requirements(vec![File::new("master-req.esp".into())]);
        database.masterlist.set_plugin(masterlist_metadata);

        let mut user_metadata = PluginMetadata::new("test.esp").unwrap();
        user_metadata.set_load_after_files(vec![File::new("user-after.esp".into())]);
        database.set_plugin_user_metadata(user_metadata);

        let merged = database
            .plugin_metadata("test.esp", true, false)
            .unwrap()
            .unwrap();

        assert_eq!(1, merged.requirements().len());
        assert_eq!(1, merged.load_after_files().len());
    }

    #[test]
    fn plugin_metadata_should_only_use_masterlist_data_if_user_metadata_excluded() {
        let mut database = Database::new(state());

        let mut masterlist_metadata = PluginMetadata::new("test.esp").unwrap();
        masterlist_metadata.set_requirements(vec![File::new("master-req.esp".into())]);
        database.masterlist.set_plugin(masterlist_metadata);

        let mut user_metadata = PluginMetadata::new("test.esp").unwrap();
        user_metadata.set_load_after_files(vec![File::new("user-after.esp".into())]);
        database.set_plugin_user_metadata(user_metadata);

        let metadata = database
            .plugin_metadata("test.esp", false, false)
            .unwrap()
            .unwrap();

        assert_eq!(1, metadata.requirements().len());
        assert!(metadata.load_after_files().is_empty());
    }

    #[test]
    fn discard_plugin_user_metadata_should_remove_only_that_plugin() {
        let mut database = Database::new(state());

        database.set_plugin_user_metadata(PluginMetadata::new("test1.esp").unwrap());
        database.set_plugin_user_metadata(PluginMetadata::new("test2.esp").unwrap());

        database.discard_plugin_user_metadata("test1.esp");

        assert!(database.plugin_user_metadata("test1.esp", false).unwrap().is_none());
        assert!(database.plugin_user_metadata("test2.esp", false).unwrap().is_some());
    }

    #[test]
    fn discard_all_user_metadata_should_clear_the_userlist() {
        let mut database = Database::new(state());

        database.set_plugin_user_metadata(PluginMetadata::new("test1.esp").unwrap());
        database.discard_all_user_metadata();

        assert!(database.plugin_user_metadata("test1.esp", false).unwrap().is_none());
    }

    #[test]
    fn write_user_metadata_should_error_if_the_path_already_exists_and_mode_is_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userlist.yaml");
        std::fs::write(&path, "plugins: []").unwrap();

        let database = Database::new(state());

        let result = database.write_user_metadata(&path, WriteMode::Create);

        assert!(result.is_err());
    }

    #[test]
    fn write_user_metadata_should_overwrite_an_existing_file_if_mode_is_create_or_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userlist.yaml");
        std::fs::write(&path, "plugins: []").unwrap();

        let mut database = Database::new(state());
        database.set_plugin_user_metadata(PluginMetadata::new("test.esp").unwrap());

        database
            .write_user_metadata(&path, WriteMode::CreateOrTruncate)
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("test.esp"));
    }
}

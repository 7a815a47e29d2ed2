//! A parsed masterlist or userlist: an ordered collection of
//! [`PluginMetadata`] entries with literal-then-regex lookup (spec §4.6).

use std::path::Path;

use saphyr::MarkedYaml;

use super::{
    error::{LoadMetadataError, MetadataDocumentParsingError, ParseMetadataError, WriteMetadataError},
    plugin_metadata::PluginMetadata,
    yaml::{EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_as_slice, get_as_hash},
};

/// A sequence of [`PluginMetadata`] entries, as loaded from a masterlist or
/// userlist file (spec §6, "Metadata file contract").
#[derive(Clone, Debug, Default)]
pub struct MetadataDocument {
    plugins: Vec<PluginMetadata>,
}

impl MetadataDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugins(&self) -> &[PluginMetadata] {
        &self.plugins
    }

    /// Find the entry that applies to `plugin_name`: the first literal
    /// match, else the first regex match, else `None` (spec §4.6).
    pub fn find_plugin(&self, plugin_name: &str) -> Option<&PluginMetadata> {
        self.plugins
            .iter()
            .find(|p| !p.is_regex_plugin() && p.name_matches(plugin_name))
            .or_else(|| {
                self.plugins
                    .iter()
                    .find(|p| p.is_regex_plugin() && p.name_matches(plugin_name))
            })
    }

    /// Replace any existing entry with the same name identity, preserving
    /// its position, or append a new one otherwise. Used by callers that
    /// edit the userlist in place.
    pub fn set_plugin(&mut self, plugin: PluginMetadata) {
        if let Some(existing) = self.plugins.iter_mut().find(|p| **p == plugin) {
            *existing = plugin;
        } else {
            self.plugins.push(plugin);
        }
    }

    pub fn remove_plugin(&mut self, plugin_name: &str) {
        self.plugins.retain(|p| !p.name_matches(plugin_name));
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    /// Parse a document from YAML text. The document must contain exactly
    /// one YAML document, itself either a bare sequence of plugin entries
    /// or a map with a `plugins` key holding that sequence.
    pub fn load_from_str(yaml: &str) -> Result<Self, ParseMetadataError> {
        let docs = MarkedYaml::load_from_str(yaml)?;

        let doc = match docs.as_slice() {
            [] => return Ok(Self::default()),
            [doc] => doc,
            _ => {
                return Err(ParseMetadataError::unexpected_type(
                    saphyr_parser::Marker::default(),
                    YamlObjectType::MetadataDocument,
                    super::error::ExpectedType::Map,
                ));
            }
        };

        let plugins_slice = match &doc.data {
            saphyr::YamlData::Sequence(_) => get_as_slice_bare(doc)?,
            saphyr::YamlData::Mapping(_) => {
                let h = get_as_hash(doc, YamlObjectType::MetadataDocument)?;
                get_as_slice(h, "plugins", YamlObjectType::MetadataDocument)?
            }
            _ => {
                return Err(ParseMetadataError::unexpected_type(
                    doc.span.start,
                    YamlObjectType::MetadataDocument,
                    super::error::ExpectedType::Map,
                ));
            }
        };

        let plugins = plugins_slice
            .iter()
            .map(PluginMetadata::try_from_yaml)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { plugins })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, LoadMetadataError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| LoadMetadataError::from_io_error(path.to_path_buf(), e))?;

        Self::load_from_str(&yaml).map_err(|e| {
            LoadMetadataError::new(path.to_path_buf(), MetadataDocumentParsingError::from(e))
        })
    }

    pub fn as_yaml(&self) -> String {
        let mut emitter = YamlEmitter::new();
        emitter.map_key("plugins");
        self.plugins.emit_yaml(&mut emitter);
        emitter.into_string()
    }

    /// Write this document to `path`, per the `mode` (create-only or
    /// create-or-truncate) supplied by the caller (spec SPEC_FULL §B).
    pub fn write_to_path(
        &self,
        path: &Path,
        create_or_truncate: bool,
    ) -> Result<(), WriteMetadataError> {
        use super::error::WriteMetadataErrorReason;

        if !create_or_truncate && path.exists() {
            return Err(WriteMetadataError::new(
                path.to_path_buf(),
                WriteMetadataErrorReason::PathAlreadyExists,
            ));
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            return Err(WriteMetadataError::new(
                path.to_path_buf(),
                WriteMetadataErrorReason::ParentDirectoryNotFound,
            ));
        }

        std::fs::write(path, self.as_yaml())
            .map_err(|e| WriteMetadataError::new(path.to_path_buf(), e.into()))
    }
}

fn get_as_slice_bare(value: &MarkedYaml) -> Result<&[MarkedYaml], ParseMetadataError> {
    match &value.data {
        saphyr::YamlData::Sequence(s) => Ok(s.as_slice()),
        _ => Err(ParseMetadataError::unexpected_type(
            value.span.start,
            YamlObjectType::MetadataDocument,
            super::error::ExpectedType::Array,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str) -> PluginMetadata {
        PluginMetadata::new(name).unwrap()
    }

    #[test]
    fn find_plugin_should_prefer_a_literal_match_over_a_regex_match() {
        let mut doc = MetadataDocument::new();
        doc.set_plugin(metadata("Blank.*\\.esp"));
        doc.set_plugin(metadata("Blank.esp"));

        let found = doc.find_plugin("Blank.esp").unwrap();

        assert!(!found.is_regex_plugin());
    }

    #[test]
    fn find_plugin_should_fall_back_to_a_regex_match() {
        let mut doc = MetadataDocument::new();
        doc.set_plugin(metadata("Blank.*\\.esp"));

        let found = doc.find_plugin("Blank - Different.esp").unwrap();

        assert!(found.is_regex_plugin());
    }

    #[test]
    fn find_plugin_should_return_none_if_nothing_matches() {
        let doc = MetadataDocument::new();

        assert!(doc.find_plugin("Blank.esp").is_none());
    }

    #[test]
    fn load_from_str_should_parse_a_bare_sequence() {
        let yaml = "- name: Blank.esp\n  priority: 5\n";

        let doc = MetadataDocument::load_from_str(yaml).unwrap();

        assert_eq!(1, doc.plugins().len());
        assert_eq!("Blank.esp", doc.plugins()[0].name());
    }

    #[test]
    fn load_from_str_should_parse_a_map_with_a_plugins_key() {
        let yaml = "plugins:\n  - name: Blank.esp\n";

        let doc = MetadataDocument::load_from_str(yaml).unwrap();

        assert_eq!(1, doc.plugins().len());
    }

    #[test]
    fn load_from_str_should_return_an_empty_document_for_empty_input() {
        let doc = MetadataDocument::load_from_str("").unwrap();

        assert!(doc.plugins().is_empty());
    }
}

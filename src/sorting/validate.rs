//! Per-plugin install-validity diagnostics (C9, spec §4.9).
//!
//! These run once per vertex while the sorting graph is built, using only
//! the plugin set passed into that sort: a requirement or incompatibility
//! naming a plugin that isn't part of the sort is treated as absent, even
//! if a file with that name happens to exist on disk but wasn't loaded.

use crate::metadata::{Message, MessageType, PluginMetadata};

const FILTER_TAG: &str = "Filter";

/// Build the messages describing whether a plugin's requirements and
/// incompatibilities are satisfied, and whether `plugin_crc` matches a
/// known-dirty build recorded in its metadata.
///
/// `is_present` reports whether a plugin with the given name is among the
/// plugins being sorted; `is_active` reports whether it's active in the
/// current load order.
pub(crate) fn check_install_validity(
    metadata: &PluginMetadata,
    plugin_crc: Option<u32>,
    plugin_is_active: bool,
    is_present: impl Fn(&str) -> bool,
    is_active: impl Fn(&str) -> bool,
) -> Vec<Message> {
    let mut messages = Vec::new();

    let has_filter_tag = metadata
        .tags()
        .iter()
        .any(|tag| tag.is_addition() && tag.name().eq_ignore_ascii_case(FILTER_TAG));

    for requirement in metadata.requirements() {
        if !is_present(requirement.name()) {
            messages.push(Message::new(
                MessageType::Error,
                format!(
                    "This plugin requires \"{}\" to be installed, but it is missing.",
                    requirement.display_name()
                ),
            ));
        } else if plugin_is_active && !has_filter_tag && !is_active(requirement.name()) {
            messages.push(Message::new(
                MessageType::Error,
                format!(
                    "This plugin requires \"{}\" to be active, but it is inactive.",
                    requirement.display_name()
                ),
            ));
        }
    }

    for incompatibility in metadata.incompatibilities() {
        if is_present(incompatibility.name()) && is_active(incompatibility.name()) {
            messages.push(Message::new(
                MessageType::Error,
                format!(
                    "This plugin is incompatible with \"{}\", which is also active.",
                    incompatibility.display_name()
                ),
            ));
        }
    }

    for dirty in metadata.dirty_info() {
        if plugin_crc == Some(dirty.crc()) {
            messages.push(dirty.as_message());
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{File, PluginCleaningData, Tag};

    #[test]
    fn check_install_validity_should_warn_about_a_missing_requirement() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_requirements(vec![File::new("Other.esp".into())]);

        let messages = check_install_validity(&metadata, None, false, |_| false, |_| false);

        assert_eq!(1, messages.len());
        assert_eq!(MessageType::Error, messages[0].message_type());
    }

    #[test]
    fn check_install_validity_should_not_warn_if_the_requirement_is_present() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_requirements(vec![File::new("Other.esp".into())]);

        let messages = check_install_validity(&metadata, None, false, |_| true, |_| true);

        assert!(messages.is_empty());
    }

    #[test]
    fn check_install_validity_should_warn_about_an_inactive_requirement_if_the_plugin_is_active() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_requirements(vec![File::new("Other.esp".into())]);

        let messages = check_install_validity(&metadata, None, true, |_| true, |_| false);

        assert_eq!(1, messages.len());
    }

    #[test]
    fn check_install_validity_should_not_warn_about_an_inactive_requirement_with_the_filter_tag() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_requirements(vec![File::new("Other.esp".into())]);
        metadata.set_tags(vec![Tag::new("Filter".to_owned(), true)]);

        let messages = check_install_validity(&metadata, None, true, |_| true, |_| false);

        assert!(messages.is_empty());
    }

    #[test]
    fn check_install_validity_should_warn_about_an_active_incompatibility() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_incompatibilities(vec![File::new("Other.esp".into())]);

        let messages = check_install_validity(&metadata, None, false, |_| true, |_| true);

        assert_eq!(1, messages.len());
    }

    #[test]
    fn check_install_validity_should_not_warn_about_an_inactive_incompatibility() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_incompatibilities(vec![File::new("Other.esp".into())]);

        let messages = check_install_validity(&metadata, None, false, |_| true, |_| false);

        assert!(messages.is_empty());
    }

    #[test]
    fn check_install_validity_should_warn_about_matching_dirty_info() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_dirty_info(vec![PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".to_owned())]);

        let messages = check_install_validity(&metadata, Some(0xDEAD_BEEF), false, |_| true, |_| true);

        assert_eq!(1, messages.len());
        assert_eq!(MessageType::Warn, messages[0].message_type());
    }

    #[test]
    fn check_install_validity_should_not_warn_about_non_matching_dirty_info() {
        let mut metadata = PluginMetadata::new("Blank.esp").unwrap();
        metadata.set_dirty_info(vec![PluginCleaningData::new(0xDEAD_BEEF, "TES4Edit".to_owned())]);

        let messages = check_install_validity(&metadata, Some(0x1234_5678), false, |_| true, |_| true);

        assert!(messages.is_empty());
    }
}

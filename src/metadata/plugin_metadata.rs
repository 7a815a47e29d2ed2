//! The per-plugin metadata aggregate and its merge/diff algebra.

use regress::Regex;
use saphyr::MarkedYaml;

use crate::logging;

use super::{
    error::ParseMetadataError,
    file::{File, strip_ghost_suffix},
    location::Location,
    message::Message,
    plugin_cleaning_data::PluginCleaningData,
    tag::Tag,
    yaml::{EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_as_hash, get_as_slice, get_i16_value},
};

/// A signed priority value, bounded to keep propagation arithmetic from
/// overflowing, paired with a flag recording whether it was explicitly set
/// (as opposed to being the default, which acts as identity in merges).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Priority {
    value: i16,
    is_explicit: bool,
}

impl Priority {
    pub const MIN_VALUE: i16 = -127;
    pub const MAX_VALUE: i16 = 127;

    #[must_use]
    pub fn new(value: i16) -> Self {
        Priority {
            value: value.clamp(Self::MIN_VALUE, Self::MAX_VALUE),
            is_explicit: true,
        }
    }

    pub fn value(&self) -> i16 {
        self.value
    }

    pub fn is_explicit(&self) -> bool {
        self.is_explicit
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority {
            value: 0,
            is_explicit: false,
        }
    }
}

/// A plugin name pattern: either a literal normalized name, or (if it
/// contains any of `:\*?|`, per spec §3) a case-insensitive regex matched
/// against literal plugin names.
#[derive(Clone, Debug, Default)]
struct PluginNamePattern {
    string: String,
    regex: Option<Regex>,
}

impl PluginNamePattern {
    fn new(name: &str) -> Result<Self, regress::Error> {
        let name = strip_ghost_suffix(name).to_string();

        if is_regex_name(&name) {
            let regex = Regex::with_flags(&format!("^{name}$"), "iu")?;
            Ok(Self {
                string: name,
                regex: Some(regex),
            })
        } else {
            Ok(Self {
                string: name,
                regex: None,
            })
        }
    }
}

impl PartialEq for PluginNamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.string == other.string
    }
}

impl Eq for PluginNamePattern {}

/// A name contains `:\*?|` iff it is meant to be interpreted as a regex
/// (spec §3, "Pattern matching").
fn is_regex_name(name: &str) -> bool {
    name.contains([':', '\\', '*', '?', '|'])
}

/// The aggregate of everything known about one plugin (or plugin-matching
/// pattern): enable/priority decisions, relations to other plugins,
/// messages, tags, cleaning data and download locations.
#[derive(Clone, Debug, Default)]
pub struct PluginMetadata {
    name: PluginNamePattern,
    enabled: bool,
    local_priority: Priority,
    global_priority: Priority,
    load_after: Vec<File>,
    requirements: Vec<File>,
    incompatibilities: Vec<File>,
    messages: Vec<Message>,
    tags: Vec<Tag>,
    dirty_info: Vec<PluginCleaningData>,
    clean_info: Vec<PluginCleaningData>,
    locations: Vec<Location>,
}

impl PartialEq for PluginMetadata {
    fn eq(&self, other: &Self) -> bool {
        match (&self.name.regex, &other.name.regex) {
            (None, None) => unicase::eq(self.name.string.as_str(), other.name.string.as_str()),
            (Some(regex), None) => regex_matches(regex, &other.name.string),
            (None, Some(regex)) => regex_matches(regex, &self.name.string),
            (Some(_), Some(_)) => self.name.string == other.name.string,
        }
    }
}

fn regex_matches(regex: &Regex, literal: &str) -> bool {
    regex.find(literal).is_some()
}

impl PluginMetadata {
    /// Construct a name-only [`PluginMetadata`] for the given plugin name or
    /// regex pattern.
    pub fn new(name: &str) -> Result<Self, regress::Error> {
        Ok(Self {
            name: PluginNamePattern::new(name)?,
            enabled: true,
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name.string
    }

    /// A name contains any of `:\*?|` iff it is a regex pattern (spec §3).
    pub fn is_regex_plugin(&self) -> bool {
        self.name.regex.is_some()
    }

    /// Check whether a literal plugin name matches this entry's name
    /// pattern (literal equality, or a regex match if this entry's name is
    /// a regex).
    pub fn name_matches(&self, other_name: &str) -> bool {
        if let Some(regex) = &self.name.regex {
            regex_matches(regex, other_name)
        } else {
            unicase::eq(self.name.string.as_str(), other_name)
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn local_priority(&self) -> Priority {
        self.local_priority
    }

    pub fn set_local_priority(&mut self, priority: Priority) {
        self.local_priority = priority;
    }

    pub fn global_priority(&self) -> Priority {
        self.global_priority
    }

    pub fn set_global_priority(&mut self, priority: Priority) {
        self.global_priority = priority;
    }

    pub fn load_after_files(&self) -> &[File] {
        &self.load_after
    }

    pub fn set_load_after_files(&mut self, files: Vec<File>) {
        self.load_after = files;
    }

    pub fn requirements(&self) -> &[File] {
        &self.requirements
    }

    pub fn set_requirements(&mut self, files: Vec<File>) {
        self.requirements = files;
    }

    pub fn incompatibilities(&self) -> &[File] {
        &self.incompatibilities
    }

    pub fn set_incompatibilities(&mut self, files: Vec<File>) {
        self.incompatibilities = files;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
    }

    pub fn dirty_info(&self) -> &[PluginCleaningData] {
        &self.dirty_info
    }

    pub fn set_dirty_info(&mut self, dirty_info: Vec<PluginCleaningData>) {
        self.dirty_info = dirty_info;
    }

    pub fn clean_info(&self) -> &[PluginCleaningData] {
        &self.clean_info
    }

    pub fn set_clean_info(&mut self, clean_info: Vec<PluginCleaningData>) {
        self.clean_info = clean_info;
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn set_locations(&mut self, locations: Vec<Location>) {
        self.locations = locations;
    }

    /// A record is name-only iff every field but the name pattern is at its
    /// default (spec §3).
    pub fn has_name_only(&self) -> bool {
        self.enabled
            && !self.local_priority.is_explicit
            && !self.global_priority.is_explicit
            && self.load_after.is_empty()
            && self.requirements.is_empty()
            && self.incompatibilities.is_empty()
            && self.messages.is_empty()
            && self.tags.is_empty()
            && self.dirty_info.is_empty()
            && self.clean_info.is_empty()
            && self.locations.is_empty()
    }

    /// `merge(self, src)`: fold `src`'s metadata into `self` (spec §4.5).
    ///
    /// The user list overlays onto the masterlist this way: it can override
    /// the enabled flag and priorities, and it can add files/tags/messages,
    /// but it can never make the masterlist's own entries disappear.
    pub fn merge(&mut self, src: &PluginMetadata) {
        if src.has_name_only() {
            return;
        }

        self.enabled = src.enabled;

        if src.local_priority.is_explicit {
            self.local_priority = src.local_priority;
        }
        if src.global_priority.is_explicit {
            self.global_priority = src.global_priority;
        }

        merge_unique(&mut self.load_after, &src.load_after);
        merge_unique(&mut self.requirements, &src.requirements);
        merge_unique(&mut self.incompatibilities, &src.incompatibilities);
        merge_unique(&mut self.tags, &src.tags);
        merge_unique(&mut self.dirty_info, &src.dirty_info);
        merge_unique(&mut self.clean_info, &src.clean_info);
        merge_unique(&mut self.locations, &src.locations);

        self.messages.extend(src.messages.iter().cloned());
    }

    /// `diff(self, other)`: the metadata present in `self` but not in
    /// `other` (spec §4.5).
    #[must_use]
    pub fn diff(&self, other: &PluginMetadata) -> PluginMetadata {
        let local_priority = priority_diff(self.local_priority, other.local_priority);
        let global_priority = priority_diff(self.global_priority, other.global_priority);

        PluginMetadata {
            name: self.name.clone(),
            enabled: self.enabled,
            local_priority,
            global_priority,
            load_after: set_diff(&self.load_after, &other.load_after),
            requirements: set_diff(&self.requirements, &other.requirements),
            incompatibilities: set_diff(&self.incompatibilities, &other.incompatibilities),
            messages: list_diff_sorted(&self.messages, &other.messages),
            tags: set_diff(&self.tags, &other.tags),
            dirty_info: set_diff(&self.dirty_info, &other.dirty_info),
            clean_info: set_diff(&self.clean_info, &other.clean_info),
            locations: set_diff(&self.locations, &other.locations),
        }
    }

    /// `new_metadata(self, other)`: like [`diff`](Self::diff), but messages
    /// are compared by full equality rather than by identity, and
    /// priorities are only carried over if they actually differ.
    #[must_use]
    pub fn new_metadata(&self, other: &PluginMetadata) -> PluginMetadata {
        let local_priority = if self.local_priority == other.local_priority {
            Priority::default()
        } else {
            self.local_priority
        };
        let global_priority = if self.global_priority == other.global_priority {
            Priority::default()
        } else {
            self.global_priority
        };

        PluginMetadata {
            name: self.name.clone(),
            enabled: self.enabled,
            local_priority,
            global_priority,
            load_after: set_diff(&self.load_after, &other.load_after),
            requirements: set_diff(&self.requirements, &other.requirements),
            incompatibilities: set_diff(&self.incompatibilities, &other.incompatibilities),
            messages: self
                .messages
                .iter()
                .filter(|m| !other.messages.contains(m))
                .cloned()
                .collect(),
            tags: set_diff(&self.tags, &other.tags),
            dirty_info: set_diff(&self.dirty_info, &other.dirty_info),
            clean_info: set_diff(&self.clean_info, &other.clean_info),
            locations: set_diff(&self.locations, &other.locations),
        }
    }

    pub fn as_yaml(&self) -> String {
        let mut emitter = YamlEmitter::new();
        self.emit_yaml(&mut emitter);
        emitter.into_string()
    }
}

fn priority_diff(a: Priority, b: Priority) -> Priority {
    if a == b { Priority::default() } else { a }
}

fn merge_unique<T: PartialEq + Clone>(dst: &mut Vec<T>, src: &[T]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

fn set_diff<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().filter(|item| !b.contains(item)).cloned().collect()
}

fn list_diff_sorted(a: &[Message], b: &[Message]) -> Vec<Message> {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a.into_iter().filter(|m| !b.contains(m)).collect()
}

impl TryFromYaml for PluginMetadata {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let h = get_as_hash(value, YamlObjectType::PluginMetadata)?;

        let name = super::yaml::get_required_string_value(
            value.span.start,
            h,
            "name",
            YamlObjectType::PluginMetadata,
        )?;

        let mut metadata = PluginMetadata::new(name).map_err(|_| {
            ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::PluginMetadata,
                super::error::ExpectedType::String,
            )
        })?;

        if let Some((_, enabled)) = enabled_value(h)? {
            metadata.set_enabled(enabled);
        }

        if let Some(priority) = get_i16_value(h, "priority", YamlObjectType::PluginMetadata)? {
            metadata.set_local_priority(Priority::new(priority));
        }
        if let Some(priority) = get_i16_value(h, "global_priority", YamlObjectType::PluginMetadata)? {
            metadata.set_global_priority(Priority::new(priority));
        }

        metadata.set_load_after_files(parse_list(h, "after", YamlObjectType::PluginMetadata)?);
        metadata.set_requirements(parse_list(h, "req", YamlObjectType::PluginMetadata)?);
        metadata.set_incompatibilities(parse_list(h, "inc", YamlObjectType::PluginMetadata)?);
        metadata.set_messages(parse_list(h, "msg", YamlObjectType::PluginMetadata)?);
        metadata.set_tags(parse_list(h, "tag", YamlObjectType::PluginMetadata)?);
        metadata.set_dirty_info(parse_list(h, "dirty", YamlObjectType::PluginMetadata)?);
        metadata.set_clean_info(parse_list(h, "clean", YamlObjectType::PluginMetadata)?);
        metadata.set_locations(parse_list(h, "url", YamlObjectType::PluginMetadata)?);

        Ok(metadata)
    }
}

fn enabled_value(
    h: &saphyr::AnnotatedHash<MarkedYaml>,
) -> Result<Option<(saphyr::Marker, bool)>, ParseMetadataError> {
    match h.get(&super::yaml::as_string_node("enabled")) {
        Some(n) => match &n.data {
            saphyr::YamlData::Value(saphyr::Scalar::Boolean(b)) => Ok(Some((n.span.start, *b))),
            _ => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                "enabled",
                YamlObjectType::PluginMetadata,
                super::error::ExpectedType::String,
            )),
        },
        None => Ok(None),
    }
}

fn parse_list<T: TryFromYaml>(
    h: &saphyr::AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Vec<T>, ParseMetadataError> {
    get_as_slice(h, key, yaml_type)?
        .iter()
        .map(T::try_from_yaml)
        .collect()
}

impl EmitYaml for PluginMetadata {
    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        emitter.begin_map();

        emitter.map_key("name");
        emitter.single_quoted_str(&self.name.string);

        if !self.enabled {
            emitter.map_key("enabled");
            emitter.unquoted_str("false");
        }

        if self.local_priority.is_explicit {
            emitter.map_key("priority");
            emitter.unquoted_str(&self.local_priority.value.to_string());
        }
        if self.global_priority.is_explicit {
            emitter.map_key("global_priority");
            emitter.unquoted_str(&self.global_priority.value.to_string());
        }

        if !self.load_after.is_empty() {
            emitter.map_key("after");
            self.load_after.emit_yaml(emitter);
        }
        if !self.requirements.is_empty() {
            emitter.map_key("req");
            self.requirements.emit_yaml(emitter);
        }
        if !self.incompatibilities.is_empty() {
            emitter.map_key("inc");
            self.incompatibilities.emit_yaml(emitter);
        }
        if !self.messages.is_empty() {
            emitter.map_key("msg");
            self.messages.emit_yaml(emitter);
        }
        if !self.tags.is_empty() {
            emitter.map_key("tag");
            self.tags.emit_yaml(emitter);
        }
        if !self.dirty_info.is_empty() {
            emitter.map_key("dirty");
            self.dirty_info.emit_yaml(emitter);
        }
        if !self.clean_info.is_empty() {
            emitter.map_key("clean");
            self.clean_info.emit_yaml(emitter);
        }
        if !self.locations.is_empty() {
            emitter.map_key("url");
            self.locations.emit_yaml(emitter);
        }

        emitter.end_map();
    }
}

impl std::fmt::Display for PluginMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name.string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> PluginMetadata {
        PluginMetadata::new(name).unwrap()
    }

    #[test]
    fn name_only_is_true_for_a_freshly_constructed_entry() {
        assert!(named("Blank.esp").has_name_only());
    }

    #[test]
    fn is_regex_plugin_should_detect_the_spec_listed_characters() {
        assert!(named("Blank.*\\.esp").is_regex_plugin());
        assert!(!named("Blank.esp").is_regex_plugin());
    }

    #[test]
    fn name_matches_should_match_a_regex_pattern_against_a_literal_name() {
        let pattern = named("Blank.*\\.esp");

        assert!(pattern.name_matches("Blank - Test.esp"));
        assert!(!pattern.name_matches("Blank - Test.esm"));
    }

    #[test]
    fn regex_containment_equality_matches_spec_8() {
        let literal = named("Blank.esp");
        let regex = named("Blank\\.esp");

        assert_eq!(literal, regex);
    }

    mod merge {
        use super::*;

        #[test]
        fn merge_identity_should_hold_for_a_name_only_source() {
            let mut dst = named("Blank.esp");
            dst.set_messages(vec![Message::new(
                crate::metadata::message::MessageType::Warn,
                "hi".into(),
            )]);
            let before = dst.clone_for_test();

            dst.merge(&named("Blank.esp"));

            assert_eq!(before.messages(), dst.messages());
        }

        #[test]
        fn merge_should_union_load_after_files_without_duplicating() {
            let mut dst = named("Blank.esp");
            dst.set_load_after_files(vec![File::new("A.esp".into())]);

            let mut src = named("Blank.esp");
            src.set_load_after_files(vec![File::new("A.esp".into()), File::new("B.esp".into())]);

            dst.merge(&src);

            assert_eq!(2, dst.load_after_files().len());
        }

        #[test]
        fn merge_should_let_the_user_list_override_enabled_and_priority() {
            let mut dst = named("Blank.esp");
            let mut src = named("Blank.esp");
            src.set_enabled(false);
            src.set_local_priority(Priority::new(5));

            dst.merge(&src);

            assert!(!dst.enabled());
            assert_eq!(5, dst.local_priority().value());
        }

        #[test]
        fn merge_should_not_remove_existing_entries() {
            let mut dst = named("Blank.esp");
            dst.set_load_after_files(vec![File::new("A.esp".into())]);

            dst.merge(&named("Blank.esp"));

            assert_eq!(1, dst.load_after_files().len());
        }
    }

    mod diff {
        use super::*;

        #[test]
        fn diff_of_merge_should_round_trip_for_disjoint_inputs() {
            let mut a = named("Blank.esp");
            a.set_load_after_files(vec![File::new("A.esp".into())]);

            let mut b = named("Blank.esp");
            b.set_requirements(vec![File::new("B.esp".into())]);

            let mut merged = a.clone();
            merged.merge(&b);

            let diffed = merged.diff(&b);

            assert_eq!(a.load_after_files(), diffed.load_after_files());
            assert_eq!(a.requirements(), diffed.requirements());
        }

        #[test]
        fn diff_should_zero_out_equal_priorities() {
            let mut a = named("Blank.esp");
            a.set_local_priority(Priority::new(3));
            let mut b = named("Blank.esp");
            b.set_local_priority(Priority::new(3));

            let diffed = a.diff(&b);

            assert!(!diffed.local_priority().is_explicit());
        }
    }

    mod new_metadata {
        use super::*;

        #[test]
        fn should_omit_priorities_that_do_not_differ() {
            let mut a = named("Blank.esp");
            a.set_local_priority(Priority::new(3));
            let mut b = named("Blank.esp");
            b.set_local_priority(Priority::new(3));

            let delta = a.new_metadata(&b);

            assert!(!delta.local_priority().is_explicit());
        }

        #[test]
        fn should_keep_priorities_that_differ() {
            let mut a = named("Blank.esp");
            a.set_local_priority(Priority::new(3));
            let b = named("Blank.esp");

            let delta = a.new_metadata(&b);

            assert_eq!(3, delta.local_priority().value());
        }
    }

    impl PluginMetadata {
        fn clone_for_test(&self) -> Self {
            self.clone()
        }
    }
}

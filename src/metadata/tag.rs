//! Bash Tag suggestions.

use saphyr::{MarkedYaml, Scalar, YamlData};

use super::{
    error::{ExpectedType, ParseMetadataError},
    yaml::{EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_required_string_value, parse_condition},
};

/// A compatibility-patcher hint suggesting a Bash Tag be added to, or
/// removed from, a plugin.
///
/// A removal tag and an addition tag with the same name are distinct
/// entries: `-Relev` does not collide with `Relev`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tag {
    name: String,
    is_addition: bool,
    condition: Option<String>,
}

impl Tag {
    #[must_use]
    pub fn new(name: String, is_addition: bool) -> Self {
        Self {
            name,
            is_addition,
            condition: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_addition(&self) -> bool {
        self.is_addition
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl TryFromYaml for Tag {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) => {
                let (name, is_addition) = name_and_suggestion(s);
                Ok(Tag::new(name, is_addition))
            }
            YamlData::Mapping(h) => {
                let name =
                    get_required_string_value(value.span.start, h, "name", YamlObjectType::Tag)?;
                let condition = parse_condition(h, YamlObjectType::Tag)?;

                let (name, is_addition) = name_and_suggestion(name);
                let mut tag = Tag::new(name, is_addition);
                if let Some(condition) = condition {
                    tag = tag.with_condition(condition);
                }
                Ok(tag)
            }
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::Tag,
                ExpectedType::MapOrString,
            )),
        }
    }
}

impl EmitYaml for Tag {
    fn is_scalar(&self) -> bool {
        self.condition.is_none()
    }

    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        let display_name = if self.is_addition {
            self.name.clone()
        } else {
            format!("-{}", self.name)
        };

        if self.is_scalar() {
            emitter.unquoted_str(&display_name);
            return;
        }

        emitter.begin_map();

        emitter.map_key("name");
        emitter.unquoted_str(&display_name);

        if let Some(condition) = &self.condition {
            emitter.map_key("condition");
            emitter.single_quoted_str(condition);
        }

        emitter.end_map();
    }
}

fn name_and_suggestion(value: &str) -> (String, bool) {
    match value.strip_prefix('-') {
        Some(name) => (name.to_string(), false),
        None => (value.to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::yaml::parse;

    #[test]
    fn a_leading_hyphen_should_mark_the_tag_as_a_removal() {
        let yaml = parse("-Relev");

        let tag = Tag::try_from_yaml(&yaml).unwrap();

        assert_eq!("Relev", tag.name());
        assert!(!tag.is_addition());
    }

    #[test]
    fn addition_and_removal_tags_with_the_same_name_should_be_distinct() {
        let addition = Tag::new("Relev".into(), true);
        let removal = Tag::new("Relev".into(), false);

        assert_ne!(addition, removal);
    }

    #[test]
    fn should_read_a_condition_from_a_map() {
        let yaml = parse("{name: Relev, condition: 'file(\"Blank.esp\")'}");

        let tag = Tag::try_from_yaml(&yaml).unwrap();

        assert_eq!(Some("file(\"Blank.esp\")"), tag.condition());
    }
}

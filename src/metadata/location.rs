//! A URL at which a plugin can be found.

use saphyr::{MarkedYaml, Scalar, YamlData};

use super::{
    error::{ExpectedType, ParseMetadataError},
    yaml::{EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_required_string_value},
};

/// A URL pointing at a download or info page for a plugin. Identity is by
/// URL alone.
#[derive(Clone, Debug, Default, Eq)]
pub struct Location {
    url: Box<str>,
    name: Option<Box<str>>,
}

impl Location {
    #[must_use]
    pub fn new(url: String) -> Self {
        Location {
            url: url.into_boxed_str(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name.into_boxed_str());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.url.eq_ignore_ascii_case(&other.url)
    }
}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.to_ascii_lowercase().hash(state);
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.url.to_ascii_lowercase().cmp(&other.url.to_ascii_lowercase())
    }
}

impl TryFromYaml for Location {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) => Ok(Location::new(s.to_string())),
            YamlData::Mapping(h) => {
                let link = get_required_string_value(value.span.start, h, "link", YamlObjectType::Location)?;
                let mut location = Location::new(link.to_string());

                if let Some((_, name)) =
                    super::yaml::get_string_value(h, "name", YamlObjectType::Location)?
                {
                    location = location.with_name(name.to_string());
                }

                Ok(location)
            }
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::Location,
                ExpectedType::MapOrString,
            )),
        }
    }
}

impl EmitYaml for Location {
    fn is_scalar(&self) -> bool {
        self.name.is_none()
    }

    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        if let Some(name) = &self.name {
            emitter.begin_map();

            emitter.map_key("link");
            emitter.single_quoted_str(&self.url);

            emitter.map_key("name");
            emitter.single_quoted_str(name);

            emitter.end_map();
        } else {
            emitter.single_quoted_str(&self.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::yaml::parse;

    #[test]
    fn equality_should_ignore_name_and_be_case_insensitive_on_url() {
        let a = Location::new("https://example.com/A".into());
        let b = Location::new("https://EXAMPLE.com/A".into()).with_name("different".into());

        assert_eq!(a, b);
    }

    #[test]
    fn should_only_set_name_if_decoding_from_a_scalar() {
        let yaml = parse("https://www.example.com");

        let location = Location::try_from_yaml(&yaml).unwrap();

        assert_eq!("https://www.example.com", location.url());
        assert!(location.name().is_none());
    }

    #[test]
    fn should_error_if_link_is_missing() {
        let yaml = parse("{name: example}");

        assert!(Location::try_from_yaml(&yaml).is_err());
    }
}

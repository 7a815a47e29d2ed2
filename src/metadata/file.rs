//! A reference to another plugin file, used for masters, requirements,
//! incompatibilities and load-after relations.

use saphyr::{MarkedYaml, Scalar, YamlData};
use unicase::UniCase;

use super::{
    error::{ExpectedType, ParseMetadataError},
    yaml::{EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_required_string_value},
};

/// A plugin name, compared and hashed case-insensitively with the trailing
/// `.ghost` suffix (if any) stripped.
#[derive(Clone, Debug, Default, Eq)]
pub struct Filename(UniCase<Box<str>>);

impl Filename {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Filename(UniCase::new(strip_ghost_suffix(name).into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl std::fmt::Display for Filename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_ref())
    }
}

impl PartialEq for Filename {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::hash::Hash for Filename {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for Filename {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Filename {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<&str> for Filename {
    fn from(value: &str) -> Self {
        Filename::new(value)
    }
}

/// Strip a single trailing `.ghost` suffix, case-insensitively, as ghosted
/// and unghosted names identify the same plugin.
pub fn strip_ghost_suffix(name: &str) -> &str {
    const SUFFIX_LEN: usize = ".ghost".len();

    if name.len() > SUFFIX_LEN && name[name.len() - SUFFIX_LEN..].eq_ignore_ascii_case(".ghost") {
        &name[..name.len() - SUFFIX_LEN]
    } else {
        name
    }
}

/// A reference to another plugin, e.g. as a requirement or incompatibility.
///
/// Identity is by [`name()`](File::name) alone: `display` and `condition`
/// are decoration that does not participate in equality, ordering or
/// hashing, so that a set of `File`s behaves as a set keyed on plugin name.
#[derive(Clone, Debug, Default, Eq)]
pub struct File {
    name: Filename,
    display: Option<Box<str>>,
    condition: Option<String>,
}

impl File {
    #[must_use]
    pub fn new(name: String) -> Self {
        File {
            name: Filename::new(&name),
            display: None,
            condition: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display: String) -> Self {
        self.display = Some(display.into_boxed_str());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The normalized plugin name this reference identifies.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The display text to show to a user, falling back to `name()`.
    pub fn display_name(&self) -> &str {
        self.display.as_deref().unwrap_or(self.name.as_str())
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::hash::Hash for File {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for File {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for File {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl TryFromYaml for File {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) => Ok(File::new(s.to_string())),
            YamlData::Mapping(h) => {
                let name =
                    get_required_string_value(value.span.start, h, "name", YamlObjectType::File)?;

                let mut file = File::new(name.to_string());

                if let Some((_, display)) = super::yaml::get_string_value(h, "display", YamlObjectType::File)? {
                    file = file.with_display_name(display.to_string());
                }

                if let Some(condition) = super::yaml::parse_condition(h, YamlObjectType::File)? {
                    file = file.with_condition(condition);
                }

                Ok(file)
            }
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::File,
                ExpectedType::MapOrString,
            )),
        }
    }
}

impl EmitYaml for File {
    fn is_scalar(&self) -> bool {
        self.display.is_none() && self.condition.is_none()
    }

    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        if self.is_scalar() {
            emitter.single_quoted_str(self.name.as_str());
            return;
        }

        emitter.begin_map();

        emitter.map_key("name");
        emitter.single_quoted_str(self.name.as_str());

        if let Some(display) = &self.display {
            emitter.map_key("display");
            emitter.single_quoted_str(display);
        }

        if let Some(condition) = &self.condition {
            emitter.map_key("condition");
            emitter.single_quoted_str(condition);
        }

        emitter.end_map();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod filename {
        use super::*;

        #[test]
        fn should_strip_a_trailing_ghost_suffix() {
            assert_eq!(Filename::new("Blank.esp"), Filename::new("Blank.esp.ghost"));
        }

        #[test]
        fn should_compare_case_insensitively() {
            assert_eq!(Filename::new("blank.esp"), Filename::new("BLANK.ESP"));
        }
    }

    mod file {
        use super::*;

        #[test]
        fn equality_should_ignore_display_and_condition() {
            let a = File::new("Blank.esp".into()).with_display_name("A".into());
            let b = File::new("blank.esp".into()).with_condition("active(\"x\")".into());

            assert_eq!(a, b);
        }

        #[test]
        fn display_name_should_fall_back_to_name() {
            let file = File::new("Blank.esp".into());

            assert_eq!("Blank.esp", file.display_name());
        }

        mod try_from_yaml {
            use crate::metadata::yaml::parse;

            use super::*;

            #[test]
            fn should_read_a_bare_scalar_as_the_name() {
                let yaml = parse("Blank.esp");

                let file = File::try_from_yaml(&yaml).unwrap();

                assert_eq!("Blank.esp", file.name());
                assert!(file.display.is_none());
            }

            #[test]
            fn should_read_all_fields_from_a_map() {
                let yaml = parse("{name: Blank.esp, display: 'a [patch]', condition: 'active(\"Blank.esp\")'}");

                let file = File::try_from_yaml(&yaml).unwrap();

                assert_eq!("Blank.esp", file.name());
                assert_eq!("a [patch]", file.display_name());
                assert_eq!(Some("active(\"Blank.esp\")"), file.condition());
            }

            #[test]
            fn should_error_if_name_is_missing() {
                let yaml = parse("{display: 'a [patch]'}");

                assert!(File::try_from_yaml(&yaml).is_err());
            }
        }
    }
}

//! Localized diagnostic messages attached to plugins.

use saphyr::{MarkedYaml, Scalar, YamlData};
use unicase::UniCase;

use super::{
    error::{ExpectedType, MultilingualMessageContentsError, ParseMetadataError},
    yaml::{
        EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_as_slice, get_required_string_value,
        get_string_value, parse_condition,
    },
};

/// The severity of a [`Message`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MessageType {
    Say,
    #[default]
    Warn,
    Error,
}

impl TryFromYaml for MessageType {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        match &value.data {
            YamlData::Value(Scalar::String(s)) if s.as_ref() == "say" => Ok(MessageType::Say),
            YamlData::Value(Scalar::String(s)) if s.as_ref() == "warn" => Ok(MessageType::Warn),
            YamlData::Value(Scalar::String(s)) if s.as_ref() == "error" => Ok(MessageType::Error),
            _ => Err(ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::Message,
                ExpectedType::String,
            )),
        }
    }
}

impl EmitYaml for MessageType {
    fn is_scalar(&self) -> bool {
        true
    }

    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        match self {
            MessageType::Say => emitter.unquoted_str("say"),
            MessageType::Warn => emitter.unquoted_str("warn"),
            MessageType::Error => emitter.unquoted_str("error"),
        }
    }
}

/// One localized variant of a [`Message`]'s text.
///
/// Identity is by `text` alone (case-insensitively): two contents with the
/// same text but different language codes are considered equal, matching
/// the masterlist's use of this type as a lookup key during diffing.
#[derive(Clone, Debug, Default, Eq)]
pub struct MessageContent {
    text: String,
    language: String,
}

impl MessageContent {
    pub const DEFAULT_LANGUAGE: &str = "en";

    #[must_use]
    pub fn new(text: String) -> Self {
        MessageContent {
            text,
            language: Self::DEFAULT_LANGUAGE.to_string(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: String) -> Self {
        self.language = language;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Every message with more than one content variant must include an
    /// English ([`DEFAULT_LANGUAGE`](Self::DEFAULT_LANGUAGE)) variant.
    pub(super) fn validate(contents: &[MessageContent]) -> Result<(), MultilingualMessageContentsError> {
        if contents.len() > 1 && !contents.iter().any(|c| c.language == Self::DEFAULT_LANGUAGE) {
            Err(MultilingualMessageContentsError)
        } else {
            Ok(())
        }
    }

    /// Select the variant matching `language`, falling back to the single
    /// variant (if there is only one) or to English.
    #[must_use]
    pub fn select<'a>(contents: &'a [MessageContent], language: &str) -> Option<&'a MessageContent> {
        match contents {
            [] => None,
            [only] => Some(only),
            many => many
                .iter()
                .find(|c| c.language == language)
                .or_else(|| many.iter().find(|c| c.language == Self::DEFAULT_LANGUAGE)),
        }
    }
}

impl PartialEq for MessageContent {
    fn eq(&self, other: &Self) -> bool {
        UniCase::new(self.text.as_str()) == UniCase::new(other.text.as_str())
    }
}

impl std::hash::Hash for MessageContent {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        UniCase::new(self.text.as_str()).hash(state);
    }
}

impl PartialOrd for MessageContent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MessageContent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        UniCase::new(self.text.as_str()).cmp(&UniCase::new(other.text.as_str()))
    }
}

impl TryFromYaml for MessageContent {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let h = super::yaml::get_as_hash(value, YamlObjectType::MessageContent)?;

        let text = get_required_string_value(value.span.start, h, "text", YamlObjectType::MessageContent)?;
        let mut content = MessageContent::new(text.to_string());

        if let Some((_, lang)) = get_string_value(h, "lang", YamlObjectType::MessageContent)? {
            content = content.with_language(lang.to_string());
        }

        Ok(content)
    }
}

impl EmitYaml for MessageContent {
    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        emitter.begin_map();

        emitter.map_key("lang");
        emitter.unquoted_str(&self.language);

        emitter.map_key("text");
        emitter.single_quoted_str(&self.text);

        emitter.end_map();
    }
}

/// A diagnostic message, possibly translated into more than one language and
/// gated by a condition.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    message_type: MessageType,
    content: Vec<MessageContent>,
    condition: Option<String>,
}

impl Message {
    /// Construct a message with a single, English content string.
    #[must_use]
    pub fn new(message_type: MessageType, text: String) -> Self {
        Message {
            message_type,
            content: vec![MessageContent::new(text)],
            condition: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: String) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Construct a message from a set of content variants already selected
    /// by the caller, e.g. the counts-plus-info text built for a dirty
    /// plugin warning.
    #[must_use]
    pub(crate) fn from_contents(message_type: MessageType, content: Vec<MessageContent>) -> Self {
        Message {
            message_type,
            content,
            condition: None,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn content(&self) -> &[MessageContent] {
        &self.content
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// Select this message's text in the given language, per §4.3's
    /// selection rule.
    #[must_use]
    pub fn text_for_language(&self, language: &str) -> Option<&str> {
        MessageContent::select(&self.content, language).map(MessageContent::text)
    }
}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Message {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.content.first(), other.content.first()) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        }
    }
}

impl TryFromYaml for Message {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let h = super::yaml::get_as_hash(value, YamlObjectType::Message)?;

        let type_node = h
            .get(&super::yaml::as_string_node("type"))
            .ok_or_else(|| ParseMetadataError::missing_key(value.span.start, "type", YamlObjectType::Message))?;
        let message_type = MessageType::try_from_yaml(type_node)?;

        let content_nodes = get_as_slice(h, "content", YamlObjectType::Message)?;
        let content = if content_nodes.is_empty() {
            let text =
                get_required_string_value(value.span.start, h, "content", YamlObjectType::Message)?;
            vec![MessageContent::new(text.to_string())]
        } else {
            content_nodes
                .iter()
                .map(MessageContent::try_from_yaml)
                .collect::<Result<Vec<_>, _>>()?
        };

        if content.is_empty() {
            return Err(ParseMetadataError::missing_key(
                value.span.start,
                "content",
                YamlObjectType::Message,
            ));
        }

        MessageContent::validate(&content).map_err(|_| {
            ParseMetadataError::unexpected_type(
                value.span.start,
                YamlObjectType::Message,
                ExpectedType::MapOrString,
            )
        })?;

        let condition = parse_condition(h, YamlObjectType::Message)?;

        Ok(Message {
            message_type,
            content,
            condition,
        })
    }
}

impl EmitYaml for Message {
    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        emitter.begin_map();

        emitter.map_key("type");
        self.message_type.emit_yaml(emitter);

        emitter.map_key("content");
        if let [only] = self.content.as_slice() {
            emitter.single_quoted_str(&only.text);
        } else {
            self.content.emit_yaml(emitter);
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

    mod message_content {
        use super::*;

        #[test]
        fn equality_should_be_case_insensitive_and_ignore_language() {
            let a = MessageContent::new("Hello".into()).with_language("en".into());
            let b = MessageContent::new("hello".into()).with_language("fr".into());

            assert_eq!(a, b);
        }

        #[test]
        fn validate_should_accept_a_single_content() {
            let contents = vec![MessageContent::new("x".into()).with_language("fr".into())];

            assert!(MessageContent::validate(&contents).is_ok());
        }

        #[test]
        fn validate_should_reject_multiple_contents_without_english() {
            let contents = vec![
                MessageContent::new("x".into()).with_language("fr".into()),
                MessageContent::new("y".into()).with_language("de".into()),
            ];

            assert!(MessageContent::validate(&contents).is_err());
        }

        #[test]
        fn select_should_return_the_only_content_regardless_of_language() {
            let contents = vec![MessageContent::new("x".into()).with_language("fr".into())];

            let selected = MessageContent::select(&contents, "en").unwrap();

            assert_eq!("x", selected.text());
        }

        #[test]
        fn select_should_fall_back_to_english() {
            let contents = vec![
                MessageContent::new("english".into()),
                MessageContent::new("french".into()).with_language("fr".into()),
            ];

            let selected = MessageContent::select(&contents, "de").unwrap();

            assert_eq!("english", selected.text());
        }

        #[test]
        fn select_should_prefer_the_matching_language() {
            let contents = vec![
                MessageContent::new("english".into()),
                MessageContent::new("french".into()).with_language("fr".into()),
            ];

            let selected = MessageContent::select(&contents, "fr").unwrap();

            assert_eq!("french", selected.text());
        }
    }

    mod message {
        use super::*;

        #[test]
        fn text_for_language_should_use_message_content_selection() {
            let message = Message {
                message_type: MessageType::Warn,
                content: vec![
                    MessageContent::new("english".into()),
                    MessageContent::new("french".into()).with_language("fr".into()),
                ],
                condition: None,
            };

            assert_eq!(Some("french"), message.text_for_language("fr"));
            assert_eq!(Some("english"), message.text_for_language("de"));
        }

        mod try_from_yaml {
            use crate::metadata::yaml::parse;

            use super::*;

            #[test]
            fn should_read_a_single_content_string() {
                let yaml = parse("{type: warn, content: 'a warning'}");

                let message = Message::try_from_yaml(&yaml).unwrap();

                assert_eq!(MessageType::Warn, message.message_type());
                assert_eq!(1, message.content().len());
                assert_eq!("a warning", message.content()[0].text());
            }

            #[test]
            fn should_read_a_list_of_contents() {
                let yaml = parse(
                    "{type: say, content: [{lang: en, text: hi}, {lang: fr, text: salut}]}",
                );

                let message = Message::try_from_yaml(&yaml).unwrap();

                assert_eq!(2, message.content().len());
            }

            #[test]
            fn should_error_if_multilingual_content_has_no_english_variant() {
                let yaml =
                    parse("{type: say, content: [{lang: fr, text: salut}, {lang: de, text: hallo}]}");

                assert!(Message::try_from_yaml(&yaml).is_err());
            }
        }
    }
}

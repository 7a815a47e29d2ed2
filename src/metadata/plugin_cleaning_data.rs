//! Records describing a known-dirty or known-clean build of a plugin.

use saphyr::MarkedYaml;

use super::{
    Message, MessageContent,
    error::ParseMetadataError,
    message::MessageType,
    yaml::{
        EmitYaml, TryFromYaml, YamlEmitter, YamlObjectType, get_as_slice, get_as_hash,
        get_required_string_value, get_u32_value,
    },
};

/// Counts of problems found (or fixed) in one specific build of a plugin,
/// identified by the CRC of that build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PluginCleaningData {
    crc: u32,
    itm_count: u32,
    deleted_reference_count: u32,
    deleted_navmesh_count: u32,
    cleaning_utility: String,
    info: Vec<MessageContent>,
}

impl PluginCleaningData {
    #[must_use]
    pub fn new(crc: u32, cleaning_utility: String) -> Self {
        PluginCleaningData {
            crc,
            itm_count: 0,
            deleted_reference_count: 0,
            deleted_navmesh_count: 0,
            cleaning_utility,
            info: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_itm_count(mut self, count: u32) -> Self {
        self.itm_count = count;
        self
    }

    #[must_use]
    pub fn with_deleted_reference_count(mut self, count: u32) -> Self {
        self.deleted_reference_count = count;
        self
    }

    #[must_use]
    pub fn with_deleted_navmesh_count(mut self, count: u32) -> Self {
        self.deleted_navmesh_count = count;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: Vec<MessageContent>) -> Self {
        self.info = info;
        self
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn itm_count(&self) -> u32 {
        self.itm_count
    }

    pub fn deleted_reference_count(&self) -> u32 {
        self.deleted_reference_count
    }

    pub fn deleted_navmesh_count(&self) -> u32 {
        self.deleted_navmesh_count
    }

    pub fn cleaning_utility(&self) -> &str {
        &self.cleaning_utility
    }

    pub fn info(&self) -> &[MessageContent] {
        &self.info
    }

    /// Render this record as a warn-typed [`Message`], per the dirty-plugin
    /// cleaning-data derivation: name whichever of the ITM/deleted-reference/
    /// deleted-navmesh counts are non-zero, name the cleaning utility, and
    /// prefix the result to each `info` variant if there are any.
    #[must_use]
    pub fn as_message(&self) -> Message {
        let summary = self.summary();

        if self.info.is_empty() {
            return Message::new(MessageType::Warn, summary);
        }

        let content = self
            .info
            .iter()
            .map(|c| MessageContent::new(format!("{summary} {}", c.text())).with_language(c.language().to_owned()))
            .collect();

        Message::from_contents(MessageType::Warn, content)
    }

    fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.itm_count > 0 {
            parts.push(format!("{} ITM record{}", self.itm_count, plural_suffix(self.itm_count)));
        }
        if self.deleted_reference_count > 0 {
            parts.push(format!(
                "{} deleted reference{}",
                self.deleted_reference_count,
                plural_suffix(self.deleted_reference_count)
            ));
        }
        if self.deleted_navmesh_count > 0 {
            parts.push(format!(
                "{} deleted navmesh{}",
                self.deleted_navmesh_count,
                if self.deleted_navmesh_count == 1 { "" } else { "es" }
            ));
        }

        format!(
            "Contains {}. Clean with {}.",
            join_with_and(&parts),
            self.cleaning_utility
        )
    }
}

fn plural_suffix(count: u32) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn join_with_and(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

impl PartialOrd for PluginCleaningData {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginCleaningData {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.crc.cmp(&other.crc)
    }
}

impl std::hash::Hash for PluginCleaningData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.crc.hash(state);
    }
}

impl TryFromYaml for PluginCleaningData {
    fn try_from_yaml(value: &MarkedYaml) -> Result<Self, ParseMetadataError> {
        let h = get_as_hash(value, YamlObjectType::PluginCleaningData)?;

        let crc_str =
            get_required_string_value(value.span.start, h, "crc", YamlObjectType::PluginCleaningData)?;
        let crc = u32::from_str_radix(crc_str.trim_start_matches("0x"), 16).unwrap_or(0);

        let utility = get_required_string_value(
            value.span.start,
            h,
            "util",
            YamlObjectType::PluginCleaningData,
        )?;

        let mut data = PluginCleaningData::new(crc, utility.to_string());

        if let Some(itm) = get_u32_value(h, "itm", YamlObjectType::PluginCleaningData)? {
            data = data.with_itm_count(itm);
        }
        if let Some(udr) = get_u32_value(h, "udr", YamlObjectType::PluginCleaningData)? {
            data = data.with_deleted_reference_count(udr);
        }
        if let Some(nav) = get_u32_value(h, "nav", YamlObjectType::PluginCleaningData)? {
            data = data.with_deleted_navmesh_count(nav);
        }

        let info_nodes = get_as_slice(h, "info", YamlObjectType::PluginCleaningData)?;
        let info = info_nodes
            .iter()
            .map(MessageContent::try_from_yaml)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(data.with_info(info))
    }
}

impl EmitYaml for PluginCleaningData {
    fn emit_yaml(&self, emitter: &mut YamlEmitter) {
        emitter.begin_map();

        emitter.map_key("crc");
        emitter.unquoted_str(&format!("0x{:08X}", self.crc));

        emitter.map_key("util");
        emitter.single_quoted_str(&self.cleaning_utility);

        if self.itm_count > 0 {
            emitter.map_key("itm");
            emitter.u32(self.itm_count);
        }
        if self.deleted_reference_count > 0 {
            emitter.map_key("udr");
            emitter.u32(self.deleted_reference_count);
        }
        if self.deleted_navmesh_count > 0 {
            emitter.map_key("nav");
            emitter.u32(self.deleted_navmesh_count);
        }
        if !self.info.is_empty() {
            emitter.map_key("info");
            self.info.emit_yaml(emitter);
        }

        emitter.end_map();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::yaml::parse;

    #[test]
    fn identity_and_ordering_are_by_crc() {
        let a = PluginCleaningData::new(1, "TES5Edit".into());
        let b = PluginCleaningData::new(1, "xEdit".into());
        let c = PluginCleaningData::new(2, "TES5Edit".into());

        assert_eq!(a, b);
        assert!(a < c);
    }

    #[test]
    fn should_parse_a_minimal_entry() {
        let yaml = parse("{crc: 0x24F0E2A1, util: TES5Edit}");

        let data = PluginCleaningData::try_from_yaml(&yaml).unwrap();

        assert_eq!(0x24F0_E2A1, data.crc());
        assert_eq!("TES5Edit", data.cleaning_utility());
        assert_eq!(0, data.itm_count());
    }

    #[test]
    fn should_parse_all_count_fields() {
        let yaml = parse("{crc: 0x24F0E2A1, util: TES5Edit, itm: 1, udr: 2, nav: 3}");

        let data = PluginCleaningData::try_from_yaml(&yaml).unwrap();

        assert_eq!(1, data.itm_count());
        assert_eq!(2, data.deleted_reference_count());
        assert_eq!(3, data.deleted_navmesh_count());
    }

    mod as_message {
        use super::*;

        #[test]
        fn should_name_the_non_zero_counts_and_the_utility() {
            let data = PluginCleaningData::new(0x187B_E342, "utility1".into())
                .with_itm_count(1)
                .with_deleted_reference_count(2);

            let message = data.as_message();

            assert_eq!(MessageType::Warn, message.message_type());
            let text = message.content()[0].text();
            assert!(text.contains("1 ITM record"));
            assert!(text.contains("2 deleted references"));
            assert!(text.contains("utility1"));
        }

        #[test]
        fn should_prefix_the_summary_to_each_info_variant() {
            let data = PluginCleaningData::new(0xDEAD_BEEF, "utility2".into())
                .with_itm_count(5)
                .with_info(vec![MessageContent::new("see the forum thread".into())]);

            let message = data.as_message();

            assert_eq!(1, message.content().len());
            assert!(message.content()[0].text().ends_with("see the forum thread"));
            assert!(message.content()[0].text().contains("5 ITM records"));
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};

// --- Top Level ---

/// Root `<Dictionary>` element of a Lexin export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    #[serde(rename = "@BaseLang", default)]
    pub base_lang: String,
    #[serde(rename = "@TargetLang", default)]
    pub target_lang: String,
    #[serde(rename = "@Version", default)]
    pub version: String,
    #[serde(rename = "Word", default)]
    pub words: Vec<Word>,
}

// --- Word ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "@Value", default)]
    pub value: String,
    #[serde(rename = "@Variant", default)]
    pub variant: String,
    #[serde(rename = "@Type", default)]
    pub word_type: String,
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "@VariantID", default)]
    pub variant_id: String,
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "BaseLang", default)]
    pub base_senses: Vec<BaseSense>,
    #[serde(rename = "TargetLang", default)]
    pub target_senses: Vec<TargetSense>,
}

// --- Base language sense ---

/// A `<BaseLang>` block: the word described in the dictionary's source language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseSense {
    #[serde(rename = "Meaning", default, deserialize_with = "last_wins")]
    pub meaning: Meaning,
    #[serde(rename = "Reference", default)]
    pub references: Vec<Reference>,
    #[serde(rename = "Comment", default)]
    pub comments: Vec<Comment>,
    #[serde(rename = "Explanation", default)]
    pub explanations: Vec<Explanation>,
    #[serde(rename = "Alternate", default)]
    pub alternates: Vec<Alternate>,
    #[serde(rename = "Antonym", default)]
    pub antonyms: Vec<Antonym>,
    #[serde(rename = "Usage", default)]
    pub usages: Vec<Usage>,
    #[serde(rename = "Phonetic", default, deserialize_with = "last_wins")]
    pub phonetic: Phonetic,
    #[serde(rename = "Illustration", default)]
    pub illustrations: Vec<Illustration>,
    #[serde(rename = "Inflection", default)]
    pub inflections: Vec<Inflection>,
    #[serde(rename = "Graminfo", default, deserialize_with = "last_wins")]
    pub graminfo: String,
    #[serde(rename = "Example", default)]
    pub examples: Vec<Example>,
    #[serde(rename = "Idiom", default)]
    pub idioms: Vec<Idiom>,
    #[serde(rename = "Compound", default)]
    pub compounds: Vec<Compound>,
    #[serde(rename = "Derivation", default)]
    pub derivations: Vec<Derivation>,
    #[serde(rename = "Index", default)]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

/// A cross reference. `kind` is one of animation, compare, phonetic or see;
/// the store rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@TYPE", default)]
    pub kind: String,
    #[serde(rename = "@VALUE", default)]
    pub value: String,
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternate {
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antonym {
    #[serde(rename = "@Value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phonetic {
    #[serde(rename = "@File", default)]
    pub file: String, // Audio file name
    #[serde(rename = "$text", default)]
    pub content: String,
}

impl Phonetic {
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.file.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illustration {
    #[serde(rename = "@TYPE", default)]
    pub kind: String,
    #[serde(rename = "@VALUE", default)]
    pub value: String,
    #[serde(rename = "@Norlexin", default)]
    pub norlexin: String,
}

/// An inflected form. Text interrupted by `<Variant>` children is joined into
/// `content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InflectionXml")]
pub struct Inflection {
    #[serde(rename = "$text", default)]
    pub content: String,
    #[serde(rename = "Variant", default)]
    pub variants: Vec<InflectionVariant>,
}

#[derive(Deserialize)]
struct InflectionXml {
    #[serde(rename = "$value", default)]
    parts: Vec<InflectionPart>,
}

#[derive(Deserialize)]
enum InflectionPart {
    #[serde(rename = "$text")]
    Text(String),
    Variant(InflectionVariant),
    #[serde(other)]
    Other,
}

impl From<InflectionXml> for Inflection {
    fn from(raw: InflectionXml) -> Self {
        let mut inflection = Inflection::default();
        for part in raw.parts {
            match part {
                InflectionPart::Text(text) => inflection.content.push_str(&text),
                InflectionPart::Variant(variant) => inflection.variants.push(variant),
                InflectionPart::Other => {}
            }
        }
        inflection
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflectionVariant {
    #[serde(rename = "@Description", default)]
    pub description: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idiom {
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
}

/// A compound built on the headword, with an optional inflection suffix.
///
/// Text on either side of the `<Inflection>` child is joined, so
/// `hus<Inflection>-et</Inflection>bygge` reads as "husbygge".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InflectedXml")]
pub struct Compound {
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "@Description", default)]
    pub description: String,
    #[serde(rename = "@MatchingID", default)]
    pub matching_id: String,
    #[serde(rename = "$text", default)]
    pub content: String,
    #[serde(rename = "Inflection", default)]
    pub inflection: String,
}

/// A derived word. Read the same way as [`Compound`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InflectedXml")]
pub struct Derivation {
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "@Description", default)]
    pub description: String,
    #[serde(rename = "$text", default)]
    pub content: String,
    #[serde(rename = "Inflection", default)]
    pub inflection: String,
}

/// Wire shape shared by `<Compound>` and `<Derivation>`: attributes plus
/// mixed text and `<Inflection>` content in document order.
#[derive(Deserialize)]
struct InflectedXml {
    #[serde(rename = "@ID", default)]
    id: String,
    #[serde(rename = "@Description", default)]
    description: String,
    #[serde(rename = "@MatchingID", default)]
    matching_id: String,
    #[serde(rename = "$value", default)]
    parts: Vec<InflectedPart>,
}

#[derive(Deserialize)]
enum InflectedPart {
    #[serde(rename = "$text")]
    Text(String),
    Inflection(String),
    #[serde(other)]
    Other,
}

/// Joined text and the last `<Inflection>`, if any.
fn join_inflected(parts: Vec<InflectedPart>) -> (String, String) {
    let mut content = String::new();
    let mut inflection = String::new();
    for part in parts {
        match part {
            InflectedPart::Text(text) => content.push_str(&text),
            InflectedPart::Inflection(value) => inflection = value,
            InflectedPart::Other => {}
        }
    }
    (content, inflection)
}

impl From<InflectedXml> for Compound {
    fn from(raw: InflectedXml) -> Self {
        let (content, inflection) = join_inflected(raw.parts);
        Compound {
            id: raw.id,
            description: raw.description,
            matching_id: raw.matching_id,
            content,
            inflection,
        }
    }
}

impl From<InflectedXml> for Derivation {
    fn from(raw: InflectedXml) -> Self {
        let (content, inflection) = join_inflected(raw.parts);
        Derivation {
            id: raw.id,
            description: raw.description,
            content,
            inflection,
        }
    }
}

/// Prefix/suffix index entry. `kind` is "prefix", "suffix" or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(rename = "@Value", default)]
    pub value: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
}

// --- Target language sense ---

/// A `<TargetLang>` block: the word rendered in the destination language.
///
/// The `Comment` attribute and the `<Comment>` element are distinct fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSense {
    #[serde(rename = "@Comment", default)]
    pub comment_attr: String,
    #[serde(rename = "Translation", default, deserialize_with = "last_wins")]
    pub translation: String,
    #[serde(rename = "Synonym", default, deserialize_with = "last_wins")]
    pub synonym: String,
    #[serde(rename = "Comment", default, deserialize_with = "last_wins")]
    pub comment: String,
    #[serde(rename = "Explanation", default, deserialize_with = "last_wins")]
    pub explanation: String,
    #[serde(rename = "Antonym", default)]
    pub antonyms: Vec<Antonym>,
    #[serde(rename = "Example", default)]
    pub examples: Vec<Example>,
    #[serde(rename = "Idiom", default)]
    pub idioms: Vec<Idiom>,
    #[serde(rename = "Compound", default)]
    pub compounds: Vec<Compound>,
    #[serde(rename = "Derivation", default)]
    pub derivations: Vec<Derivation>,
}

/// Keeps the last of a repeated single-valued element, the way a field
/// assignment would. An element that never appears yields `T::default()`.
fn last_wins<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let values: Vec<T> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().last().unwrap_or_default())
}

// --- Ownership of shared child rows ---

/// The sense a shared child row (antonym, example, idiom, compound,
/// derivation) hangs off. Holds the generated row id of that sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenseOwner {
    Base(i64),
    Target(i64),
}

impl SenseOwner {
    /// Splits the owner into `(base_lang_id, target_lang_id)` columns.
    /// Exactly one side is `Some`.
    pub fn columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            SenseOwner::Base(id) => (Some(id), None),
            SenseOwner::Target(id) => (None, Some(id)),
        }
    }
}

impl std::fmt::Display for SenseOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenseOwner::Base(id) => write!(f, "base sense {}", id),
            SenseOwner::Target(id) => write!(f, "target sense {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_columns_are_exclusive() {
        assert_eq!(SenseOwner::Base(7).columns(), (Some(7), None));
        assert_eq!(SenseOwner::Target(3).columns(), (None, Some(3)));
    }

    #[test]
    fn test_phonetic_blank() {
        assert!(Phonetic::default().is_blank());
        let audio_only = Phonetic {
            file: "hus.mp3".to_string(),
            content: String::new(),
        };
        assert!(!audio_only.is_blank());
    }
}

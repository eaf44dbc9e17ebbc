use crate::error::{LexinError, Result};
use crate::models::Dictionary;
use flate2::read::GzDecoder;
use log::debug;
use quick_xml::events::Event;
use quick_xml::{DeError, Reader, Writer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parses a Lexin XML document from any buffered reader.
///
/// Text content is kept exactly as written, including leading and trailing
/// whitespace.
pub fn parse_dictionary<R: BufRead>(reader: R) -> Result<Dictionary> {
    debug!("Starting Lexin XML parsing...");
    let document = protect_edge_whitespace(reader)?;
    let dictionary: Dictionary = quick_xml::de::from_reader(document.as_slice())?;
    debug!(
        "Parsed dictionary {} -> {} with {} words.",
        dictionary.base_lang,
        dictionary.target_lang,
        dictionary.words.len()
    );
    Ok(dictionary)
}

/// Parses a Lexin XML document held in memory.
pub fn parse_dictionary_str(xml: &str) -> Result<Dictionary> {
    parse_dictionary(xml.as_bytes())
}

/// Opens and parses a Lexin XML file. Files ending in `.gz` are decompressed on the fly.
pub fn parse_dictionary_file(path: &Path) -> Result<Dictionary> {
    let file = File::open(path).map_err(|source| LexinError::SourceOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if is_gzip_path(path) {
        debug!("Reading gzip-compressed source: {:?}", path);
        parse_dictionary(BufReader::new(GzDecoder::new(file)))
    } else {
        parse_dictionary(BufReader::new(file))
    }
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn is_xml_whitespace(b: &u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Appends whitespace bytes as character references.
fn push_escaped_whitespace(out: &mut Vec<u8>, blank: &[u8]) {
    for b in blank {
        let reference: &[u8] = match b {
            b'\t' => b"&#9;",
            b'\n' => b"&#10;",
            b'\r' => b"&#13;",
            _ => b"&#32;",
        };
        out.extend_from_slice(reference);
    }
}

/// Rewrites the document so the serde deserializer keeps text byte for byte.
///
/// The deserializer trims raw text nodes before unescaping them. Whitespace at
/// the edges of a text node is re-encoded as character references, which
/// survive the trim and decode back to the original bytes. Whitespace-only
/// nodes are indentation and pass through untouched, unless they are the
/// entire content of an element.
fn protect_edge_whitespace<R: BufRead>(source: R) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(source);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    // Whitespace-only text right after a start tag, held until the next
    // event shows whether the element ends there.
    let mut held_blank: Option<Vec<u8>> = None;
    let mut after_start = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| LexinError::XmlParse(DeError::from(e)))?;

        if let Some(blank) = held_blank.take() {
            if matches!(event, Event::End(_)) {
                push_escaped_whitespace(writer.get_mut(), &blank);
            } else {
                writer.get_mut().extend_from_slice(&blank);
            }
        }

        match event {
            Event::Eof => break,
            Event::Text(text) => {
                let raw: &[u8] = &text;
                match raw.iter().position(|b| !is_xml_whitespace(b)) {
                    None if after_start => held_blank = Some(raw.to_vec()),
                    None => writer.get_mut().extend_from_slice(raw),
                    Some(first) => {
                        let last = raw.iter().rposition(|b| !is_xml_whitespace(b)).unwrap_or(first);
                        let out = writer.get_mut();
                        push_escaped_whitespace(out, &raw[..first]);
                        out.extend_from_slice(&raw[first..=last]);
                        push_escaped_whitespace(out, &raw[last + 1..]);
                    }
                }
                after_start = false;
            }
            Event::Start(_) => {
                writer.write_event(event)?;
                after_start = true;
            }
            other => {
                writer.write_event(other)?;
                after_start = false;
            }
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::tempdir;

    const MINIMAL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dictionary BaseLang="sv" TargetLang="en" Version="1.0">
  <Word Value="hus" Type="noun" ID="1" VariantID="1">
    <BaseLang>
      <Meaning>house (building)</Meaning>
    </BaseLang>
    <TargetLang>
      <Translation>house</Translation>
    </TargetLang>
  </Word>
</Dictionary>
"#;

    #[test]
    fn test_parse_minimal_dictionary() {
        let result = parse_dictionary_str(MINIMAL_XML);
        assert!(result.is_ok(), "Parsing failed: {:?}", result.err());
        let dict = result.unwrap();
        assert_eq!(dict.base_lang, "sv");
        assert_eq!(dict.target_lang, "en");
        assert_eq!(dict.version, "1.0");
        assert_eq!(dict.words.len(), 1);

        let word = &dict.words[0];
        assert_eq!(word.value, "hus");
        assert_eq!(word.word_type, "noun");
        assert_eq!(word.id, "1");
        assert_eq!(word.variant_id, "1");
        assert_eq!(word.variant, "");
        assert_eq!(word.matching_id, "");
        assert_eq!(word.base_senses.len(), 1);
        assert_eq!(word.base_senses[0].meaning.content, "house (building)");
        assert!(word.base_senses[0].alternates.is_empty());
        assert!(word.base_senses[0].phonetic.is_blank());
        assert_eq!(word.target_senses.len(), 1);
        assert_eq!(word.target_senses[0].translation, "house");
        assert_eq!(word.target_senses[0].synonym, "");
    }

    const FULL_BASE_XML: &str = r#"<Dictionary BaseLang="sv" TargetLang="en" Version="2">
  <Word Value="bil" Variant="automobil" Type="subst." ID="42" VariantID="7" MatchingID="m1">
    <BaseLang>
      <Meaning MatchingID="m2">motorfordon</Meaning>
      <Reference TYPE="see" VALUE="lastbil" MatchingID="r1"/>
      <Reference TYPE="animation" VALUE="bil.swf"/>
      <Comment MatchingID="c1">vardagligt</Comment>
      <Explanation>fordon med fyra hjul</Explanation>
      <Alternate>Bil</Alternate>
      <Antonym Value="cykel"/>
      <Usage MatchingID="u1">om fordon</Usage>
      <Phonetic File="bil.mp3">bi:l</Phonetic>
      <Illustration TYPE="picture" VALUE="bil.jpg" Norlexin="n1"/>
      <Inflection>bilen<Variant Description="plural">bilar</Variant><Variant>bilarna</Variant></Inflection>
      <Graminfo>en</Graminfo>
      <Example ID="e1" MatchingID="x1">köra bil</Example>
      <Idiom ID="i1">sitta i samma bil</Idiom>
      <Compound ID="k1" Description="sammansättning">bil|nyckel<Inflection>-n</Inflection></Compound>
      <Derivation ID="d1">bilist<Inflection>-en</Inflection></Derivation>
      <Index Value="bil-" type="prefix"/>
    </BaseLang>
  </Word>
</Dictionary>"#;

    #[test]
    fn test_parse_full_base_sense() {
        let dict = parse_dictionary_str(FULL_BASE_XML).expect("parse failed");
        let word = &dict.words[0];
        assert_eq!(word.variant, "automobil");
        assert_eq!(word.matching_id, "m1");
        let base = &word.base_senses[0];

        assert_eq!(base.meaning.content, "motorfordon");
        assert_eq!(base.meaning.matching_id, "m2");
        assert_eq!(base.references.len(), 2);
        assert_eq!(base.references[0].kind, "see");
        assert_eq!(base.references[0].value, "lastbil");
        assert_eq!(base.references[0].matching_id, "r1");
        assert_eq!(base.references[1].matching_id, "");
        assert_eq!(base.comments[0].content, "vardagligt");
        assert_eq!(base.comments[0].matching_id, "c1");
        assert_eq!(base.explanations[0].content, "fordon med fyra hjul");
        assert_eq!(base.alternates[0].content, "Bil");
        assert_eq!(base.antonyms[0].value, "cykel");
        assert_eq!(base.usages[0].content, "om fordon");
        assert_eq!(base.phonetic.content, "bi:l");
        assert_eq!(base.phonetic.file, "bil.mp3");
        assert_eq!(base.illustrations[0].kind, "picture");
        assert_eq!(base.illustrations[0].norlexin, "n1");

        assert_eq!(base.inflections.len(), 1);
        assert_eq!(base.inflections[0].content, "bilen");
        assert_eq!(base.inflections[0].variants.len(), 2);
        assert_eq!(base.inflections[0].variants[0].description, "plural");
        assert_eq!(base.inflections[0].variants[0].content, "bilar");
        assert_eq!(base.inflections[0].variants[1].description, "");

        assert_eq!(base.graminfo, "en");
        assert_eq!(base.examples[0].id, "e1");
        assert_eq!(base.examples[0].content, "köra bil");
        assert_eq!(base.idioms[0].content, "sitta i samma bil");
        assert_eq!(base.compounds[0].content, "bil|nyckel");
        assert_eq!(base.compounds[0].inflection, "-n");
        assert_eq!(base.compounds[0].description, "sammansättning");
        assert_eq!(base.derivations[0].content, "bilist");
        assert_eq!(base.derivations[0].inflection, "-en");
        assert_eq!(base.indexes[0].value, "bil-");
        assert_eq!(base.indexes[0].kind, "prefix");
    }

    #[test]
    fn test_parse_target_comment_attribute_and_element() {
        let xml = r#"<Dictionary BaseLang="sv" TargetLang="en">
  <Word Value="bil" Type="subst." ID="1" VariantID="1">
    <TargetLang Comment="informal">
      <Translation>car</Translation>
      <Synonym>automobile</Synonym>
      <Comment>chiefly British</Comment>
      <Explanation>motor vehicle</Explanation>
      <Antonym Value="bicycle"/>
      <Compound ID="k1">car key</Compound>
    </TargetLang>
  </Word>
</Dictionary>"#;
        let dict = parse_dictionary_str(xml).expect("parse failed");
        let target = &dict.words[0].target_senses[0];
        assert_eq!(target.comment_attr, "informal");
        assert_eq!(target.comment, "chiefly British");
        assert_eq!(target.translation, "car");
        assert_eq!(target.synonym, "automobile");
        assert_eq!(target.explanation, "motor vehicle");
        assert_eq!(target.antonyms[0].value, "bicycle");
        assert_eq!(target.compounds[0].content, "car key");
        assert_eq!(target.compounds[0].inflection, "");
        assert_eq!(dict.version, "");
    }

    #[test]
    fn test_unknown_elements_are_ignored() {
        let xml = r#"<Dictionary BaseLang="sv" TargetLang="en" Extra="x">
  <Header>ignored</Header>
  <Word Value="hus" Type="noun" ID="1" VariantID="1" Future="y">
    <Mystery><Deep>ignored</Deep></Mystery>
    <BaseLang><Meaning>house</Meaning><Novelty/></BaseLang>
  </Word>
</Dictionary>"#;
        let dict = parse_dictionary_str(xml).expect("parse failed");
        assert_eq!(dict.words.len(), 1);
        assert_eq!(dict.words[0].base_senses[0].meaning.content, "house");
    }

    #[test]
    fn test_interleaved_senses_are_collected() {
        let xml = r#"<Dictionary BaseLang="sv" TargetLang="en">
  <Word Value="hus" Type="noun" ID="1" VariantID="1">
    <BaseLang><Meaning>first</Meaning></BaseLang>
    <TargetLang><Translation>one</Translation></TargetLang>
    <BaseLang><Meaning>second</Meaning></BaseLang>
    <TargetLang><Translation>two</Translation></TargetLang>
  </Word>
</Dictionary>"#;
        let dict = parse_dictionary_str(xml).expect("parse failed");
        let word = &dict.words[0];
        assert_eq!(word.base_senses.len(), 2);
        assert_eq!(word.base_senses[1].meaning.content, "second");
        assert_eq!(word.target_senses.len(), 2);
        assert_eq!(word.target_senses[1].translation, "two");
    }

    #[test]
    fn test_text_whitespace_is_preserved() {
        let xml = "<Dictionary BaseLang=\"sv\" TargetLang=\"en\">
  <Word Value=\"hus\" Type=\"noun\" ID=\"1\" VariantID=\"1\">
    <BaseLang>
      <Meaning>\thouse\n</Meaning>
      <Alternate>  two  spaces </Alternate>
      <Alternate>   </Alternate>
      <Example ID=\"e1\"> &amp; co </Example>
    </BaseLang>
    <TargetLang>
      <Translation> a house </Translation>
    </TargetLang>
  </Word>
</Dictionary>";
        let dict = parse_dictionary_str(xml).expect("parse failed");
        let base = &dict.words[0].base_senses[0];
        assert_eq!(base.meaning.content, "\thouse\n");
        assert_eq!(base.alternates.len(), 2);
        assert_eq!(base.alternates[0].content, "  two  spaces ");
        assert_eq!(base.alternates[1].content, "   ");
        assert_eq!(base.examples[0].content, " & co ");
        assert_eq!(dict.words[0].target_senses[0].translation, " a house ");
    }

    #[test]
    fn test_repeated_single_valued_elements_keep_last() {
        let xml = r#"<Dictionary BaseLang="sv" TargetLang="en">
  <Word Value="hus" Type="noun" ID="1" VariantID="1">
    <BaseLang>
      <Meaning>first</Meaning>
      <Graminfo>ett</Graminfo>
      <Phonetic File="a.mp3">a</Phonetic>
      <Graminfo>en</Graminfo>
      <Meaning MatchingID="m2">second</Meaning>
      <Phonetic File="b.mp3">b</Phonetic>
    </BaseLang>
    <TargetLang>
      <Translation>house</Translation>
      <Synonym>home</Synonym>
      <Translation>building</Translation>
      <Comment>old</Comment>
      <Comment>new</Comment>
      <Explanation>one</Explanation>
      <Explanation>two</Explanation>
    </TargetLang>
  </Word>
</Dictionary>"#;
        let dict = parse_dictionary_str(xml).expect("repeated elements must not fail the parse");
        let base = &dict.words[0].base_senses[0];
        assert_eq!(base.meaning.content, "second");
        assert_eq!(base.meaning.matching_id, "m2");
        assert_eq!(base.graminfo, "en");
        assert_eq!(base.phonetic.file, "b.mp3");
        assert_eq!(base.phonetic.content, "b");

        let target = &dict.words[0].target_senses[0];
        assert_eq!(target.translation, "building");
        assert_eq!(target.synonym, "home");
        assert_eq!(target.comment, "new");
        assert_eq!(target.explanation, "two");
    }

    #[test]
    fn test_text_split_by_child_elements_is_joined() {
        let xml = r#"<Dictionary BaseLang="sv" TargetLang="en">
  <Word Value="hus" Type="noun" ID="1" VariantID="1">
    <BaseLang>
      <Inflection>hus<Variant>husen</Variant>et</Inflection>
      <Compound ID="k">hus<Inflection>-et</Inflection>bygge</Compound>
      <Derivation ID="d">hus<Inflection>-a</Inflection>lig<Inflection>-t</Inflection></Derivation>
    </BaseLang>
    <TargetLang>
      <Compound ID="k2">house <Inflection>-s</Inflection>key</Compound>
    </TargetLang>
  </Word>
</Dictionary>"#;
        let dict = parse_dictionary_str(xml).expect("mixed content must parse");
        let base = &dict.words[0].base_senses[0];
        assert_eq!(base.inflections[0].content, "huset");
        assert_eq!(base.inflections[0].variants.len(), 1);
        assert_eq!(base.inflections[0].variants[0].content, "husen");
        assert_eq!(base.compounds[0].content, "husbygge");
        assert_eq!(base.compounds[0].inflection, "-et");
        assert_eq!(base.compounds[0].id, "k");
        assert_eq!(base.derivations[0].content, "huslig");
        assert_eq!(base.derivations[0].inflection, "-t");

        let target = &dict.words[0].target_senses[0];
        assert_eq!(target.compounds[0].content, "house key");
        assert_eq!(target.compounds[0].inflection, "-s");
    }

    #[test]
    fn test_malformed_document_fails() {
        let result = parse_dictionary_str("<Dictionary BaseLang=\"sv\"><Word></Dictionary>");
        assert!(matches!(result, Err(LexinError::XmlParse(_))));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("missing.xml");
        match parse_dictionary_file(&path) {
            Err(LexinError::SourceOpen { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected SourceOpen error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_and_gzip_files() {
        let dir = tempdir().expect("Failed to create temp dir");

        let plain_path = dir.path().join("swe_eng.xml");
        std::fs::write(&plain_path, MINIMAL_XML).expect("Failed to write XML");

        let gz_path = dir.path().join("swe_eng.xml.gz");
        let mut encoder = GzEncoder::new(
            File::create(&gz_path).expect("Failed to create gz"),
            Compression::default(),
        );
        encoder.write_all(MINIMAL_XML.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let plain = parse_dictionary_file(&plain_path).expect("plain parse failed");
        let gzipped = parse_dictionary_file(&gz_path).expect("gzip parse failed");
        assert_eq!(plain, gzipped);
        assert_eq!(gzipped.words[0].value, "hus");
    }
}

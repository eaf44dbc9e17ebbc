//! Writes a parsed [`Dictionary`] into the normalized schema.
//!
//! Everything happens inside one immediate transaction: parents are inserted
//! first so their generated ids can be handed down to children, and any
//! failure rolls the whole import back.

use crate::db;
use crate::error::{LexinError, Result, ResultExt};
use crate::models::{
    Antonym, BaseSense, Compound, Derivation, Dictionary, Example, Idiom, SenseOwner, TargetSense,
    Word,
};
use crate::progress::{ProgressCallback, ProgressUpdate};
use log::{debug, info, warn};
use rusqlite::{Connection, Statement, TransactionBehavior, params};
use std::time::Instant;

const STAGE_DESCRIPTION: &str = "Storing words";
/// How often (in words) a progress line is logged.
const LOG_INTERVAL: usize = 1000;
/// Every word cycles through one INSERT per table; the cache has to hold all
/// of them or each lookup evicts the statement needed next.
const STATEMENT_CACHE_CAPACITY: usize = 32;

/// What a successful [`store_dictionary`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOutcome {
    pub dictionary_id: i64,
    /// `false` when the words were appended to an existing dictionary.
    pub created: bool,
    pub words_stored: usize,
}

/// Stores a dictionary and all of its words in a single transaction.
///
/// An existing dictionary with the same language pair is reused and the words
/// are appended to it; words already present are not deduplicated.
/// Returning `false` from `reporter` cancels the import between words and
/// rolls back everything written so far.
pub fn store_dictionary(
    conn: &mut Connection,
    dict: &Dictionary,
    mut reporter: Option<&mut ProgressCallback>,
) -> Result<StoreOutcome> {
    info!(
        "Storing dictionary {} -> {} ({} words)...",
        dict.base_lang,
        dict.target_lang,
        dict.words.len()
    );
    let start_time = Instant::now();
    let total_words = dict.words.len() as u64;

    if !report(
        &mut reporter,
        ProgressUpdate::new_stage(STAGE_DESCRIPTION.to_string(), Some(total_words)),
    ) {
        info!("Import cancelled before it started.");
        return Err(LexinError::Cancelled);
    }

    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let (dictionary_id, created) = resolve_dictionary(&tx, dict).with_context(|| {
        format!(
            "failed to resolve dictionary {} -> {}",
            dict.base_lang, dict.target_lang
        )
    })?;

    for (index, word) in dict.words.iter().enumerate() {
        if index > 0 && index % LOG_INTERVAL == 0 {
            info!("Processed {} words...", index);
        }

        store_word(&tx, dictionary_id, word)
            .with_context(|| format!("failed to store word '{}' (id {})", word.value, word.id))?;

        let keep_going = report(
            &mut reporter,
            ProgressUpdate {
                stage_description: STAGE_DESCRIPTION.to_string(),
                current_item: index as u64 + 1,
                total_items: Some(total_words),
                message: Some(format!("Word: {}", word.value)),
            },
        );
        if !keep_going {
            warn!(
                "Import cancelled after {} of {} words, rolling back.",
                index + 1,
                total_words
            );
            // Dropping the transaction rolls it back
            return Err(LexinError::Cancelled);
        }
    }

    tx.commit()?;

    info!(
        "Stored {} words in dictionary {}. Took {:.2?}",
        dict.words.len(),
        dictionary_id,
        start_time.elapsed()
    );
    Ok(StoreOutcome {
        dictionary_id,
        created,
        words_stored: dict.words.len(),
    })
}

fn report(reporter: &mut Option<&mut ProgressCallback>, update: ProgressUpdate) -> bool {
    match reporter.as_deref_mut() {
        Some(cb) => cb(update),
        None => true,
    }
}

/// Finds the dictionary row for the language pair, creating it if needed.
fn resolve_dictionary(conn: &Connection, dict: &Dictionary) -> Result<(i64, bool)> {
    match db::find_dictionary(conn, &dict.base_lang, &dict.target_lang)? {
        Some(existing) => {
            info!(
                "Dictionary {} to {} already exists (id {}), adding entries",
                dict.base_lang, dict.target_lang, existing.id
            );
            if existing.version != dict.version {
                warn!(
                    "Stored dictionary has version '{}', document has version '{}'",
                    existing.version, dict.version
                );
            }
            Ok((existing.id, false))
        }
        None => {
            let id = conn
                .prepare_cached(
                    "INSERT INTO dictionaries (base_lang, target_lang, version) VALUES (?1, ?2, ?3)",
                )?
                .insert(params![dict.base_lang, dict.target_lang, dict.version])?;
            debug!("Created dictionary {} -> {} with id {}", dict.base_lang, dict.target_lang, id);
            Ok((id, true))
        }
    }
}

fn store_word(conn: &Connection, dictionary_id: i64, word: &Word) -> Result<i64> {
    let word_id = conn
        .prepare_cached(
            "INSERT INTO words (dictionary_id, value, variant, type, original_id, variant_id, matching_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .insert(params![
            dictionary_id,
            word.value,
            non_empty(&word.variant),
            word.word_type,
            word.id,
            word.variant_id,
            non_empty(&word.matching_id),
        ])?;

    for (n, sense) in word.base_senses.iter().enumerate() {
        store_base_sense(conn, word_id, sense).with_context(|| format!("base sense #{}", n + 1))?;
    }
    for (n, sense) in word.target_senses.iter().enumerate() {
        store_target_sense(conn, word_id, sense)
            .with_context(|| format!("target sense #{}", n + 1))?;
    }
    Ok(word_id)
}

fn store_base_sense(conn: &Connection, word_id: i64, sense: &BaseSense) -> Result<i64> {
    let base_id = conn
        .prepare_cached("INSERT INTO base_langs (word_id, meaning, matching_id) VALUES (?1, ?2, ?3)")?
        .insert(params![
            word_id,
            non_empty(&sense.meaning.content),
            non_empty(&sense.meaning.matching_id),
        ])?;
    let owner = SenseOwner::Base(base_id);

    insert_each(
        conn,
        r#"INSERT INTO "references" (base_lang_id, type, value, matching_id) VALUES (?1, ?2, ?3, ?4)"#,
        &sense.references,
        |stmt, reference| {
            stmt.execute(params![
                base_id,
                reference.kind,
                reference.value,
                non_empty(&reference.matching_id),
            ])
        },
    )?;
    insert_each(
        conn,
        "INSERT INTO comments (base_lang_id, content, matching_id) VALUES (?1, ?2, ?3)",
        &sense.comments,
        |stmt, comment| {
            stmt.execute(params![base_id, comment.content, non_empty(&comment.matching_id)])
        },
    )?;
    insert_each(
        conn,
        "INSERT INTO explanations (base_lang_id, content, matching_id) VALUES (?1, ?2, ?3)",
        &sense.explanations,
        |stmt, explanation| {
            stmt.execute(params![
                base_id,
                explanation.content,
                non_empty(&explanation.matching_id),
            ])
        },
    )?;
    insert_each(
        conn,
        "INSERT INTO alternates (base_lang_id, content) VALUES (?1, ?2)",
        &sense.alternates,
        |stmt, alternate| stmt.execute(params![base_id, alternate.content]),
    )?;
    insert_antonyms(conn, owner, &sense.antonyms)?;
    insert_each(
        conn,
        "INSERT INTO usages (base_lang_id, content, matching_id) VALUES (?1, ?2, ?3)",
        &sense.usages,
        |stmt, usage| stmt.execute(params![base_id, usage.content, non_empty(&usage.matching_id)]),
    )?;

    if !sense.phonetic.is_blank() {
        conn.prepare_cached("INSERT INTO phonetics (base_lang_id, content, file) VALUES (?1, ?2, ?3)")?
            .execute(params![
                base_id,
                non_empty(&sense.phonetic.content),
                non_empty(&sense.phonetic.file),
            ])?;
    }

    insert_each(
        conn,
        "INSERT INTO illustrations (base_lang_id, type, value, norlexin) VALUES (?1, ?2, ?3, ?4)",
        &sense.illustrations,
        |stmt, illustration| {
            stmt.execute(params![
                base_id,
                illustration.kind,
                illustration.value,
                non_empty(&illustration.norlexin),
            ])
        },
    )?;

    if !sense.inflections.is_empty() {
        let mut inflection_stmt =
            conn.prepare_cached("INSERT INTO inflections (base_lang_id, content) VALUES (?1, ?2)")?;
        let mut variant_stmt = conn.prepare_cached(
            "INSERT INTO inflection_variants (inflection_id, content, description) VALUES (?1, ?2, ?3)",
        )?;
        for inflection in &sense.inflections {
            let inflection_id =
                inflection_stmt.insert(params![base_id, non_empty(&inflection.content)])?;
            for variant in &inflection.variants {
                variant_stmt.execute(params![
                    inflection_id,
                    variant.content,
                    non_empty(&variant.description),
                ])?;
            }
        }
    }

    insert_text(
        conn,
        "INSERT INTO graminfos (base_lang_id, content) VALUES (?1, ?2)",
        base_id,
        &sense.graminfo,
    )?;

    insert_phrases(conn, owner, &sense.examples, &sense.idioms)?;
    insert_compounds(conn, owner, &sense.compounds)?;
    insert_derivations(conn, owner, &sense.derivations)?;

    insert_each(
        conn,
        "INSERT INTO indexes (base_lang_id, value, type) VALUES (?1, ?2, ?3)",
        &sense.indexes,
        |stmt, index| stmt.execute(params![base_id, index.value, non_empty(&index.kind)]),
    )?;

    Ok(base_id)
}

fn store_target_sense(conn: &Connection, word_id: i64, sense: &TargetSense) -> Result<i64> {
    let target_id = conn
        .prepare_cached("INSERT INTO target_langs (word_id, comment) VALUES (?1, ?2)")?
        .insert(params![word_id, non_empty(&sense.comment_attr)])?;
    let owner = SenseOwner::Target(target_id);

    // Single-valued texts: at most one row each
    insert_text(
        conn,
        "INSERT INTO translations (target_lang_id, content) VALUES (?1, ?2)",
        target_id,
        &sense.translation,
    )?;
    insert_text(
        conn,
        "INSERT INTO synonyms (target_lang_id, content) VALUES (?1, ?2)",
        target_id,
        &sense.synonym,
    )?;
    insert_text(
        conn,
        "INSERT INTO target_comments (target_lang_id, content) VALUES (?1, ?2)",
        target_id,
        &sense.comment,
    )?;
    insert_text(
        conn,
        "INSERT INTO target_explanations (target_lang_id, content) VALUES (?1, ?2)",
        target_id,
        &sense.explanation,
    )?;

    insert_antonyms(conn, owner, &sense.antonyms)?;
    insert_phrases(conn, owner, &sense.examples, &sense.idioms)?;
    insert_compounds(conn, owner, &sense.compounds)?;
    insert_derivations(conn, owner, &sense.derivations)?;

    Ok(target_id)
}

// --- Rows shared between base and target senses ---

fn insert_antonyms(conn: &Connection, owner: SenseOwner, antonyms: &[Antonym]) -> Result<()> {
    let (base_id, target_id) = owner.columns();
    insert_each(
        conn,
        "INSERT INTO antonyms (base_lang_id, target_lang_id, value) VALUES (?1, ?2, ?3)",
        antonyms,
        |stmt, antonym| stmt.execute(params![base_id, target_id, antonym.value]),
    )
}

fn insert_phrases(
    conn: &Connection,
    owner: SenseOwner,
    examples: &[Example],
    idioms: &[Idiom],
) -> Result<()> {
    let (base_id, target_id) = owner.columns();
    insert_each(
        conn,
        "INSERT INTO examples (base_lang_id, target_lang_id, content, original_id, matching_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        examples,
        |stmt, example| {
            stmt.execute(params![
                base_id,
                target_id,
                example.content,
                example.id,
                non_empty(&example.matching_id),
            ])
        },
    )?;
    insert_each(
        conn,
        "INSERT INTO idioms (base_lang_id, target_lang_id, content, original_id, matching_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        idioms,
        |stmt, idiom| {
            stmt.execute(params![
                base_id,
                target_id,
                idiom.content,
                idiom.id,
                non_empty(&idiom.matching_id),
            ])
        },
    )
}

fn insert_compounds(conn: &Connection, owner: SenseOwner, compounds: &[Compound]) -> Result<()> {
    if compounds.is_empty() {
        return Ok(());
    }
    let (base_id, target_id) = owner.columns();
    let mut compound_stmt = conn.prepare_cached(
        "INSERT INTO compounds (base_lang_id, target_lang_id, content, original_id, description, matching_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut inflection_stmt = conn
        .prepare_cached("INSERT INTO compound_inflections (compound_id, content) VALUES (?1, ?2)")?;

    for compound in compounds {
        let compound_id = compound_stmt.insert(params![
            base_id,
            target_id,
            non_empty(&compound.content),
            compound.id,
            non_empty(&compound.description),
            non_empty(&compound.matching_id),
        ])?;
        if !compound.inflection.is_empty() {
            inflection_stmt.execute(params![compound_id, compound.inflection])?;
        }
    }
    Ok(())
}

fn insert_derivations(conn: &Connection, owner: SenseOwner, derivations: &[Derivation]) -> Result<()> {
    if derivations.is_empty() {
        return Ok(());
    }
    let (base_id, target_id) = owner.columns();
    let mut derivation_stmt = conn.prepare_cached(
        "INSERT INTO derivations (base_lang_id, target_lang_id, content, original_id, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut inflection_stmt = conn.prepare_cached(
        "INSERT INTO derivation_inflections (derivation_id, content) VALUES (?1, ?2)",
    )?;

    for derivation in derivations {
        let derivation_id = derivation_stmt.insert(params![
            base_id,
            target_id,
            non_empty(&derivation.content),
            derivation.id,
            non_empty(&derivation.description),
        ])?;
        if !derivation.inflection.is_empty() {
            inflection_stmt.execute(params![derivation_id, derivation.inflection])?;
        }
    }
    Ok(())
}

// --- Helpers ---

/// Runs `bind` for every item with one cached statement. Does nothing for an empty list.
fn insert_each<T, F>(conn: &Connection, sql: &str, items: &[T], mut bind: F) -> Result<()>
where
    F: FnMut(&mut Statement<'_>, &T) -> rusqlite::Result<usize>,
{
    if items.is_empty() {
        return Ok(());
    }
    let mut stmt = conn.prepare_cached(sql)?;
    for item in items {
        bind(&mut *stmt, item)?;
    }
    Ok(())
}

/// Inserts `(parent_id, text)` unless the text is empty.
fn insert_text(conn: &Connection, sql: &str, parent_id: i64, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    conn.prepare_cached(sql)?.execute(params![parent_id, text])?;
    Ok(())
}

/// Empty source strings are stored as NULL in nullable columns.
fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

//! Tantivy-backed name index.
//!
//! Each company is one document: the registration code (raw, stored) plus the
//! name indexed twice, once word-tokenized and once as lowercase trigrams.
//!
//! - Prefix mode: every query word must prefix-match a name word.
//! - Fuzzy mode: exact words score highest, then word prefixes within one
//!   edit ("did you mean"), then shared trigrams for substring hits.

use std::collections::BTreeSet;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, NgramTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{error, warn};

use super::IndexError;

/// Custom tokenizer name for trigram substring search
const NGRAM_TOKENIZER: &str = "name_ngram3";

/// Writer heap; a single indexing thread keeps doc order deterministic.
const WRITER_HEAP_BYTES: usize = 64 * 1024 * 1024;

/// Query words shorter than this are matched as plain prefixes, without typo tolerance.
const FUZZY_MIN_CHARS: usize = 4;

/// Result cap when the caller does not choose one.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

const EXACT_WORD_BOOST: f32 = 3.0;
const WORD_PREFIX_BOOST: f32 = 1.5;

/// Matching mode for search queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Substring and typo-tolerant matching with relevance ranking
    #[default]
    Fuzzy,
    /// All query words must be prefixes of name words
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of hits returned
    pub limit: usize,
    pub mode: MatchMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            mode: MatchMode::Fuzzy,
        }
    }
}

/// A ranked match: registration code and relevance score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub code: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
struct NameFields {
    code: Field,
    words: Field,
    grams: Field,
}

fn create_index() -> Result<(Index, NameFields), IndexError> {
    let mut schema_builder = Schema::builder();

    // Registration code: stored as-is, indexed untokenized so it can be deleted by term
    let code = schema_builder.add_text_field("code", STRING | STORED);

    let word_indexing = TextFieldIndexing::default()
        .set_tokenizer("default")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let words = schema_builder.add_text_field(
        "name",
        TextOptions::default().set_indexing_options(word_indexing),
    );

    let gram_indexing = TextFieldIndexing::default()
        .set_tokenizer(NGRAM_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqs);
    let grams = schema_builder.add_text_field(
        "name_ngram",
        TextOptions::default().set_indexing_options(gram_indexing),
    );

    let index = Index::create_in_ram(schema_builder.build());
    let ngram = NgramTokenizer::new(3, 3, false).map_err(IndexError::build)?;
    index.tokenizers().register(
        NGRAM_TOKENIZER,
        TextAnalyzer::builder(ngram).filter(LowerCaser).build(),
    );

    Ok((index, NameFields { code, words, grams }))
}

/// Append-only builder for one `NameIndex`.
pub struct NameIndexWriter {
    index: Index,
    writer: IndexWriter,
    fields: NameFields,
}

impl NameIndexWriter {
    pub fn new() -> Result<Self, IndexError> {
        let (index, fields) = create_index()?;
        let writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(IndexError::build)?;
        Ok(Self {
            index,
            writer,
            fields,
        })
    }

    /// Index `name` under `code`. A code added earlier is replaced.
    pub fn add(&mut self, code: &str, name: &str) -> Result<(), IndexError> {
        self.writer
            .delete_term(Term::from_field_text(self.fields.code, code));

        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.code, code);
        doc.add_text(self.fields.words, name);
        doc.add_text(self.fields.grams, name);
        self.writer.add_document(doc).map_err(IndexError::build)?;
        Ok(())
    }

    /// Commit everything added so far and open a searchable index.
    pub fn finish(self) -> Result<NameIndex, IndexError> {
        let NameIndexWriter {
            index,
            mut writer,
            fields,
        } = self;
        writer.commit().map_err(IndexError::build)?;
        drop(writer);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::ReaderFailed(e.to_string()))?;

        Ok(NameIndex {
            index,
            reader,
            fields,
        })
    }
}

/// Immutable, searchable name index.
pub struct NameIndex {
    index: Index,
    reader: IndexReader,
    fields: NameFields,
}

impl NameIndex {
    /// Number of live (searchable) documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Codes matching `text`, most relevant first, at most `options.limit`.
    pub fn search(&self, text: &str, options: &SearchOptions) -> Vec<SearchHit> {
        if options.limit == 0 {
            return vec![];
        }
        let query = match self.build_query(text, options.mode) {
            Some(q) => q,
            None => return vec![],
        };

        let searcher = self.reader.searcher();
        let top_docs = match searcher.search(&query, &TopDocs::with_limit(options.limit)) {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "Search failed");
                return vec![];
            }
        };

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_addr) in top_docs {
            match searcher.doc::<TantivyDocument>(doc_addr) {
                Ok(doc) => {
                    if let Some(code) = doc.get_first(self.fields.code).and_then(|v| v.as_str()) {
                        hits.push(SearchHit {
                            code: code.to_string(),
                            score,
                        });
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to retrieve document");
                }
            }
        }
        hits
    }

    fn build_query(&self, text: &str, mode: MatchMode) -> Option<Box<dyn Query>> {
        let words = self.analyze(self.fields.words, text);
        if words.is_empty() {
            return None;
        }

        let query: Box<dyn Query> = match mode {
            MatchMode::Prefix => {
                let clauses = words
                    .iter()
                    .map(|w| (Occur::Must, self.word_prefix(w, 0)))
                    .collect();
                Box::new(BooleanQuery::new(clauses))
            }
            MatchMode::Fuzzy => {
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
                for word in &words {
                    let exact = TermQuery::new(
                        Term::from_field_text(self.fields.words, word),
                        IndexRecordOption::WithFreqs,
                    );
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(Box::new(exact), EXACT_WORD_BOOST)),
                    ));

                    let distance = if word.chars().count() >= FUZZY_MIN_CHARS { 1 } else { 0 };
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(
                            self.word_prefix(word, distance),
                            WORD_PREFIX_BOOST,
                        )),
                    ));
                }

                let grams: BTreeSet<String> =
                    self.analyze(self.fields.grams, text).into_iter().collect();
                for gram in grams {
                    clauses.push((
                        Occur::Should,
                        Box::new(TermQuery::new(
                            Term::from_field_text(self.fields.grams, &gram),
                            IndexRecordOption::WithFreqs,
                        )),
                    ));
                }
                Box::new(BooleanQuery::new(clauses))
            }
        };
        Some(query)
    }

    fn word_prefix(&self, word: &str, distance: u8) -> Box<dyn Query> {
        let term = Term::from_field_text(self.fields.words, word);
        Box::new(FuzzyTermQuery::new_prefix(term, distance, true))
    }

    /// Run `text` through the analyzer registered for `field`.
    fn analyze(&self, field: Field, text: &str) -> Vec<String> {
        let mut analyzer = match self.index.tokenizer_for_field(field) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "No tokenizer for field");
                return vec![];
            }
        };
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}

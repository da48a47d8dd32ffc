use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use super::search::{NameIndex, NameIndexWriter, SearchOptions};
use super::IndexError;
use crate::company::Company;

/// One immutable dataset: the name index and the company table built in the
/// same ingestion run. The two are only ever handed out together.
pub struct Generation {
    id: u64,
    built_at: DateTime<Utc>,
    names: NameIndex,
    companies: HashMap<String, Arc<Company>>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn lookup(&self, code: &str) -> Option<Arc<Company>> {
        self.companies.get(code).cloned()
    }

    /// Search names and resolve hits against this generation's table.
    ///
    /// Relevance order is preserved; a hit whose code is not in the table is dropped.
    pub fn search(&self, text: &str, options: &SearchOptions) -> Vec<Arc<Company>> {
        self.names
            .search(text, options)
            .into_iter()
            .filter_map(|hit| self.companies.get(&hit.code).cloned())
            .collect()
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("built_at", &self.built_at)
            .field("companies", &self.companies.len())
            .finish()
    }
}

/// Accumulates one generation during a refresh. Append-only; a repeated
/// registration code overwrites the earlier entry and re-indexes its name.
pub struct GenerationBuilder {
    id: u64,
    names: NameIndexWriter,
    companies: HashMap<String, Arc<Company>>,
    duplicates: u64,
}

impl GenerationBuilder {
    pub fn new(id: u64) -> Result<Self, IndexError> {
        Ok(Self {
            id,
            names: NameIndexWriter::new()?,
            companies: HashMap::new(),
            duplicates: 0,
        })
    }

    /// Index `name` as searchable text for `code`.
    pub fn add(&mut self, code: &str, name: &str) -> Result<(), IndexError> {
        self.names.add(code, name)
    }

    /// Store `company` under `code`. Returns true when an earlier entry was replaced.
    pub fn put(&mut self, code: String, company: Company) -> bool {
        let replaced = self.companies.insert(code, Arc::new(company)).is_some();
        if replaced {
            self.duplicates += 1;
        }
        replaced
    }

    /// `add` followed by `put`, keyed by the company's own registration code.
    pub fn insert(&mut self, company: Company) -> Result<bool, IndexError> {
        self.add(&company.registration_code, &company.name)?;
        let code = company.registration_code.clone();
        Ok(self.put(code, company))
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Codes seen more than once so far.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn finish(self) -> Result<Generation, IndexError> {
        Ok(Generation {
            id: self.id,
            built_at: Utc::now(),
            names: self.names.finish()?,
            companies: self.companies,
        })
    }
}

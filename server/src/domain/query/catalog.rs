//! Record catalog and alias generation
//!
//! Maps logical record-type names to physical tables. Built once at startup
//! and shared read-only behind an `Arc`.
//!
//! Aliases use the first letter of the key, or its first three characters
//! when that letter starts more than one key. Keys that still end up with
//! the same alias (`account`/`accountingperiod`) are ordered by length then
//! name; the first keeps the alias and later ones get a numeric suffix
//! (`acc`, `acc2`). Header aliases and short SQL keywords are never handed
//! out, so `note` becomes `not2` rather than `not`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::QueryError;
use super::types::is_safe_identifier;

/// Primary key column shared by all tables
pub const PRIMARY_KEY: &str = "id";

/// Alias used when a key cannot produce one
pub const FALLBACK_ALIAS: &str = "t";

const RESERVED_ALIASES: &[&str] = &[
    "add", "all", "and", "any", "as", "asc", "at", "by", "day", "do", "end", "for", "if", "in",
    "is", "key", "new", "no", "not", "of", "off", "old", "on", "or", "row", "set", "to", "top",
    "use",
];

/// Header table a line table belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    pub header_table: String,
    pub header_alias: String,
    pub foreign_key: String,
    /// Lower-cased field names evaluated against the header table
    pub header_only_fields: BTreeSet<String>,
}

impl LineSpec {
    pub fn new(
        header_table: &str,
        header_alias: &str,
        foreign_key: &str,
        header_only_fields: &[&str],
    ) -> Self {
        Self {
            header_table: header_table.to_string(),
            header_alias: header_alias.to_string(),
            foreign_key: foreign_key.to_string(),
            header_only_fields: header_only_fields
                .iter()
                .map(|f| f.to_lowercase())
                .collect(),
        }
    }
}

/// Equality filter added to every query for a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitFilter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub base_table: String,
    pub line: Option<LineSpec>,
    pub implicit_filters: Vec<ImplicitFilter>,
}

impl CatalogEntry {
    pub fn table(base_table: &str) -> Self {
        Self {
            base_table: base_table.to_string(),
            line: None,
            implicit_filters: Vec::new(),
        }
    }

    pub fn line(base_table: &str, spec: LineSpec) -> Self {
        Self {
            line: Some(spec),
            ..Self::table(base_table)
        }
    }

    pub fn with_implicit_filter(mut self, field: &str, value: &str) -> Self {
        self.implicit_filters.push(ImplicitFilter {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn is_line_record(&self) -> bool {
        self.line.is_some()
    }

    pub fn is_header_only(&self, field: &str) -> bool {
        self.line
            .as_ref()
            .is_some_and(|l| l.header_only_fields.contains(&field.to_lowercase()))
    }

    fn identifiers(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![("base table", self.base_table.as_str())];
        if let Some(line) = &self.line {
            out.push(("header table", &line.header_table));
            out.push(("header alias", &line.header_alias));
            out.push(("foreign key", &line.foreign_key));
            out.extend(line.header_only_fields.iter().map(|f| ("header field", f.as_str())));
        }
        out.extend(self.implicit_filters.iter().map(|f| ("implicit filter field", f.field.as_str())));
        out
    }
}

/// A catalog lookup result
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRecord<'a> {
    pub key: &'a str,
    pub alias: &'a str,
    pub entry: &'a CatalogEntry,
}

#[derive(Debug, Clone)]
pub struct RecordCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    conflict_letters: BTreeSet<char>,
    aliases: HashMap<String, String>,
}

impl RecordCatalog {
    /// Build a catalog from caller-supplied entries, validating every name
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, CatalogEntry)>,
    ) -> Result<Self, QueryError> {
        let mut map = BTreeMap::new();
        for (key, entry) in entries {
            if !is_safe_identifier(&key) {
                return Err(QueryError::UnsafeIdentifier {
                    kind: "record type",
                    name: key,
                });
            }
            for (kind, name) in entry.identifiers() {
                if !is_safe_identifier(name) {
                    return Err(QueryError::UnsafeIdentifier {
                        kind,
                        name: name.to_string(),
                    });
                }
            }
            map.insert(key.to_lowercase(), entry);
        }
        Ok(Self::build(map))
    }

    /// Add or replace entries on top of this catalog
    pub fn extend(
        self,
        extra: impl IntoIterator<Item = (String, CatalogEntry)>,
    ) -> Result<Self, QueryError> {
        Self::from_entries(self.entries.into_iter().chain(extra))
    }

    fn build(entries: BTreeMap<String, CatalogEntry>) -> Self {
        let mut first_letters: HashMap<char, usize> = HashMap::new();
        for key in entries.keys() {
            if let Some(c) = key.chars().next() {
                *first_letters.entry(c).or_default() += 1;
            }
        }
        let conflict_letters: BTreeSet<char> = first_letters
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(c, _)| c)
            .collect();

        let mut taken: BTreeSet<String> = RESERVED_ALIASES.iter().map(|s| s.to_string()).collect();
        taken.extend(
            entries
                .values()
                .filter_map(|e| e.line.as_ref().map(|l| l.header_alias.to_lowercase())),
        );

        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let mut aliases = HashMap::with_capacity(keys.len());
        for key in keys {
            let candidate = candidate_alias(key, &conflict_letters);
            let alias = if taken.contains(&candidate) {
                (2..)
                    .map(|n| format!("{}{}", candidate, n))
                    .find(|a| !taken.contains(a))
                    .unwrap_or_else(|| candidate.clone())
            } else {
                candidate
            };
            taken.insert(alias.clone());
            aliases.insert(key.clone(), alias);
        }

        Self {
            entries,
            conflict_letters,
            aliases,
        }
    }

    /// Case-insensitive exact lookup
    pub fn resolve(&self, record_type: &str) -> Result<ResolvedRecord<'_>, QueryError> {
        let key = record_type.trim().to_lowercase();
        let (key, entry) = self
            .entries
            .get_key_value(&key)
            .ok_or_else(|| QueryError::UnsupportedRecordType(record_type.to_string()))?;
        let alias = self
            .aliases
            .get(key)
            .map(String::as_str)
            .unwrap_or(FALLBACK_ALIAS);
        Ok(ResolvedRecord { key, alias, entry })
    }

    /// Alias for a record type; unknown keys get the unresolved prefix rule
    pub fn alias(&self, record_type: &str) -> String {
        let key = record_type.trim().to_lowercase();
        match self.aliases.get(&key) {
            Some(alias) => alias.clone(),
            None => candidate_alias(&key, &self.conflict_letters),
        }
    }

    /// Leading letters shared by two or more record types
    pub fn conflict_letters(&self) -> &BTreeSet<char> {
        &self.conflict_letters
    }

    pub fn record_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in record types
    pub fn builtin() -> Self {
        let transaction_line = LineSpec::new(
            "transaction",
            "th",
            "transaction",
            &[
                "type",
                "trandate",
                "tranid",
                "entity",
                "postingperiod",
                "subsidiary",
                "currency",
            ],
        );
        let planned_revenue = LineSpec::new(
            "revenueplan",
            "rp",
            "revenueplan",
            &[
                "recordnumber",
                "createdfrom",
                "revrecstartdate",
                "revrecenddate",
                "revenueplancurrency",
                "amount",
                "exchangerate",
                "revenueplantype",
                "lastmodifieddate",
                "entity",
                "subsidiary",
                "currency",
            ],
        );

        let mut entries: Vec<(String, CatalogEntry)> = vec![
            (
                "transactionline".into(),
                CatalogEntry::line("transactionline", transaction_line),
            ),
            (
                "revenueplanplannedrevenue".into(),
                CatalogEntry::line("revenueplanplannedrevenue", planned_revenue),
            ),
            (
                "lead".into(),
                CatalogEntry::table("customer").with_implicit_filter("stage", "LEAD"),
            ),
            (
                "prospect".into(),
                CatalogEntry::table("customer").with_implicit_filter("stage", "PROSPECT"),
            ),
        ];

        const SELF_NAMED: &[&str] = &[
            "transaction",
            "revenuearrangement",
            "revenueelement",
            "revenueplanstatus",
            "revenueplan",
            "customer",
            "vendor",
            "employee",
            "contact",
            "partner",
            "job",
            "entitygroup",
            "competitor",
            "item",
            "account",
            "accountingperiod",
            "bin",
            "location",
            "department",
            "classification",
            "currency",
            "subsidiary",
            "customlist",
            "budget",
            "campaign",
            "file",
            "folder",
            "calendarevent",
            "task",
            "phonecall",
            "message",
            "note",
            "supportcase",
            "issue",
            "solution",
            "topic",
            "campaignresponse",
        ];
        const ITEM_SUBTYPES: &[&str] = &[
            "inventoryitem",
            "noninventoryitem",
            "serviceitem",
            "assemblyitem",
            "kititem",
            "downloaditem",
            "giftcertificateitem",
            "discountitem",
            "markupitem",
            "paymentitem",
            "subtotalitem",
            "expenseitem",
            "descriptionitem",
            "otherchargeitem",
        ];

        entries.extend(
            SELF_NAMED
                .iter()
                .map(|name| (name.to_string(), CatalogEntry::table(name))),
        );
        entries.extend(
            ITEM_SUBTYPES
                .iter()
                .map(|name| (name.to_string(), CatalogEntry::table("item"))),
        );

        Self::build(entries.into_iter().collect())
    }
}

fn candidate_alias(key: &str, conflict_letters: &BTreeSet<char>) -> String {
    let key = key.to_lowercase();
    match key.chars().next() {
        None => FALLBACK_ALIAS.to_string(),
        Some(first) if conflict_letters.contains(&first) => key.chars().take(3).collect(),
        Some(first) => first.to_string(),
    }
}

//! Typed view of the structured record the model extracts from one page.
//!
//! The prompt in [`crate::prompts`] asks the model for a fixed set of
//! enumerated values (document type, calendar type, signature type, …).
//! Those fields are closed enums here: a value outside the allow-list
//! deserialises to the enum's `Other`/`Unknown` variant instead of being
//! carried through as free text.
//!
//! Models are loose about scalar types, so leaves are read leniently:
//!
//! - free-text fields accept numbers and booleans (`4512` reads as `"4512"`);
//!   an array or object in a text slot is kept as its compact JSON text
//! - flags accept `"true"`/`"yes"`/`"false"`/`"no"` and `0`/`1`
//! - an enum value that is not a string becomes the `Other`/`Unknown` variant
//! - `null` reads as absent, and a `null` list as empty
//!
//! Only a section with the wrong shape (a number where an object belongs)
//! fails the parse. Keys this module does not model are kept verbatim in the
//! `extra` map of the struct they appear in, at every level. Absent sections
//! and empty lists are skipped on output, so apart from the scalar
//! normalisation above a record survives a parse/serialise cycle unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Read `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

/// Any JSON value as text; `null` is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

/// A list of texts. A lone scalar is a one-element list; `null` items drop out.
fn lenient_text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_text).collect(),
        other => value_to_text(other).into_iter().collect(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Some(flag),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// A closed enum read from any scalar. Enums here all carry a
/// `#[serde(other)]` variant, so every string maps to something.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(value_to_text(Value::deserialize(deserializer)?)
        .and_then(|text| serde_json::from_value(Value::String(text)).ok()))
}

/// One page's extraction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_classification: Option<DocumentClassification>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures_authorization: Option<SignaturesAuthorization>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_quality: Option<ConfidenceQuality>,

    /// Every other top-level key, unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractionRecord {
    /// The classified document type, if the model reported one.
    pub fn document_type(&self) -> Option<DocumentType> {
        self.document_classification
            .as_ref()
            .and_then(|c| c.doc_type)
    }

    /// `true` when the model flagged this page for manual review.
    pub fn requires_manual_review(&self) -> bool {
        self.confidence_quality
            .as_ref()
            .and_then(|c| c.requires_manual_review)
            .unwrap_or(false)
    }
}

// ── Classification ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentClassification {
    #[serde(rename = "type", default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocumentType>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub category: Option<DocumentCategory>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<Language>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub secondary_languages: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    OfficialLetter,
    Decree,
    Regulation,
    StatisticalReport,
    TableOfContents,
    AdministrativeDecision,
    LegalAmendment,
    Memo,
    Certificate,
    Form,
    Invoice,
    Contract,
    CourtRuling,
    Minutes,
    Circular,
    Announcement,
    Report,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Legal,
    Administrative,
    Financial,
    Statistical,
    Correspondence,
    Technical,
    Hr,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Arabic,
    English,
    French,
    Mixed,
    #[serde(other)]
    Other,
}

// ── Source ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub issuing_authority: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub related_references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<DocumentDates>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_date: Option<DateEntry>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub additional_dates: Vec<DateEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A date exactly as written, with its calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateEntry {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub date_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub calendar_type: Option<CalendarType>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub date_type: Option<DateType>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub indicators: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub location_in_document: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarType {
    Hijri,
    Gregorian,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    IssueDate,
    EffectiveDate,
    ReceivedDate,
    ReferenceDate,
    Deadline,
    ExpiryDate,
    #[serde(other)]
    Other,
}

// ── Signatures ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignaturesAuthorization {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub signatories: Vec<Signatory>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub approval_chain: Vec<ApprovalStep>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signatory {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name_transliteration: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<SignatureType>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub role: Option<SignatoryRole>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Handwritten,
    Digital,
    Stamp,
    PrintedName,
    NotPresent,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatoryRole {
    PrimarySignatory,
    CoSignatory,
    Witness,
    Approver,
    Preparer,
    Reviewer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Step number as reported (`1` or `"1"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Content ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub subject_translation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub has_tables: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub has_charts: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<Chart>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub legal_articles: Vec<LegalArticle>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub financial_data: Vec<FinancialEntry>,
    /// Lists and any other content keys, unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
    /// Rows as the model reported them: usually arrays of string or
    /// numeric cells, sometimes objects keyed by header.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "type", default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ChartPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_info: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Area,
    Scatter,
    Table,
    Mixed,
    #[serde(other)]
    Other,
}

/// One labelled value; `value` is a number or the string exactly as shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegalArticle {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub article_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialEntry {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kept as written (`"1,250.00"`), or a bare number.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub amount: Value,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Confidence ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceQuality {
    #[serde(default, deserialize_with = "lenient_enum", skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<Confidence>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub uncertain_elements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_flag", skip_serializing_if = "Option::is_none")]
    pub requires_manual_review: Option<bool>,
    #[serde(default, deserialize_with = "lenient_text_list", skip_serializing_if = "Vec::is_empty")]
    pub review_reasons: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unknown,
}

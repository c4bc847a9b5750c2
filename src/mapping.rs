//! Column role detection for number-registration spreadsheets.
//!
//! A sheet is expected to carry three semantic columns: the phone/DID number,
//! the tax id (CPF/CNPJ) and, optionally, the action to apply. Their headers
//! vary between customers ("Telefone", "CPF/CNPJ", "Ação", "msisdn", ...), so
//! this module normalizes each header and matches it against a synonym list
//! per role.
//!
//! Matching is first-match-wins per role, scanning left to right. Roles are
//! resolved independently, so a single header may fill more than one role if
//! it appears in more than one synonym list.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub const NUMBER_SYNONYMS: &[&str] = &[
    "numero", "num", "did", "id", "numeroid", "msisdn", "telefone", "tel", "phone", "celular",
    "mobile",
];

pub const TAX_ID_SYNONYMS: &[&str] = &["cnpj", "cpfcnpj", "cpf", "taxid", "taxidnumber", "documento"];

pub const ACTION_SYNONYMS: &[&str] = &["acao", "action", "operacao"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Number,
    TaxId,
    Action,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 3] = [ColumnRole::Number, ColumnRole::TaxId, ColumnRole::Action];

    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            ColumnRole::Number => NUMBER_SYNONYMS,
            ColumnRole::TaxId => TAX_ID_SYNONYMS,
            ColumnRole::Action => ACTION_SYNONYMS,
        }
    }

    /// Field name used by the processing server for this role.
    pub fn field_name(self) -> &'static str {
        match self {
            ColumnRole::Number => "numero",
            ColumnRole::TaxId => "cnpj",
            ColumnRole::Action => "acao",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnRole::Number => "number/phone",
            ColumnRole::TaxId => "CPF/CNPJ",
            ColumnRole::Action => "action (optional)",
        }
    }

    pub fn matches(self, normalized: &str) -> bool {
        self.synonyms().contains(&normalized)
    }
}

/// Inferred association between roles and original header strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub acao: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::Number => self.numero.as_deref(),
            ColumnRole::TaxId => self.cnpj.as_deref(),
            ColumnRole::Action => self.acao.as_deref(),
        }
    }

    fn slot_mut(&mut self, role: ColumnRole) -> &mut Option<String> {
        match role {
            ColumnRole::Number => &mut self.numero,
            ColumnRole::TaxId => &mut self.cnpj,
            ColumnRole::Action => &mut self.acao,
        }
    }

    pub fn set(&mut self, role: ColumnRole, header: Option<String>) {
        *self.slot_mut(role) = header;
    }

    pub fn is_empty(&self) -> bool {
        self.numero.is_none() && self.cnpj.is_none() && self.acao.is_none()
    }

    /// Takes every role set in `overrides`, keeping `self` for the rest.
    pub fn overlay(&self, overrides: &ColumnMapping) -> ColumnMapping {
        let mut merged = self.clone();
        for role in ColumnRole::ALL {
            if let Some(header) = overrides.get(role) {
                merged.set(role, Some(header.to_string()));
            }
        }
        merged
    }
}

/// Lower-cases, strips diacritics and drops everything outside `[a-z0-9]`.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .nfd()
        .filter(|ch| !unicode_normalization::char::is_combining_mark(*ch))
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        .collect()
}

pub fn detect_mapping<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for header in headers {
        let original = header.as_ref();
        let normalized = normalize_header(original);
        for role in ColumnRole::ALL {
            let slot = mapping.slot_mut(role);
            if slot.is_none() && role.matches(&normalized) {
                *slot = Some(original.to_string());
            }
        }
    }
    mapping
}

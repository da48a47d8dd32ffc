// src/process/translate.rs
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::company::{Company, CompanyField};
use crate::process::records::RawRecord;

/// Source column (as exported by the registry) → output field.
pub static TRANSLATIONS: &[(&str, CompanyField)] = &[
    ("nimi", CompanyField::Name),
    ("ariregistri_kood", CompanyField::RegistrationCode),
    ("ettevotja_oiguslik_vorm", CompanyField::LegalFormOfEntrepreneur),
    ("ettevotja_oigusliku_vormi_alaliik", CompanyField::SubtypeOfLegalForm),
    ("kmkr_nr", CompanyField::VatNumber),
    ("ettevotja_staatus", CompanyField::EntrepreneurStatus),
    ("ettevotja_staatus_tekstina", CompanyField::EntrepreneurStatusAsText),
    ("ettevotja_esmakande_kpv", CompanyField::FirstRegistrationDate),
    ("ettevotja_aadress", CompanyField::EntrepreneurAddress),
    ("asukoht_ettevotja_aadressis", CompanyField::LocationOfEntrepreneurAddress),
    ("asukoha_ehak_kood", CompanyField::LocationEhakCode),
    ("asukoha_ehak_tekstina", CompanyField::LocationEhakText),
    ("indeks_ettevotja_aadressis", CompanyField::AddressIndex),
    ("ads_adr_id", CompanyField::AdsAddressId),
    ("ads_ads_oid", CompanyField::AdsAddressOid),
    ("ads_normaliseeritud_taisaadress", CompanyField::AdsNormalizedFullAddress),
    ("teabesysteemi_link", CompanyField::InformationSystemLink),
];

static LOOKUP: Lazy<HashMap<&'static str, CompanyField>> =
    Lazy::new(|| TRANSLATIONS.iter().copied().collect());

/// Output field for a source column, if the column is recognized.
///
/// Surrounding whitespace in the column name is ignored.
pub fn translate_column(column: &str) -> Option<CompanyField> {
    LOOKUP.get(column.trim()).copied()
}

/// Map a raw row onto the stable schema, keeping the row itself as `original_data`.
///
/// Unrecognized columns are dropped; absent ones stay unset.
pub fn translate(raw: RawRecord) -> Company {
    let mut company = Company::default();
    for (column, value) in raw.iter() {
        if let Some(field) = translate_column(column) {
            company.set(field, value.to_string());
        }
    }
    company.original_data = raw;
    company
}

use serde::Serialize;

use crate::process::records::RawRecord;

/// Stable, translated output fields of a registry row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompanyField {
    Name,
    RegistrationCode,
    LegalFormOfEntrepreneur,
    SubtypeOfLegalForm,
    VatNumber,
    EntrepreneurStatus,
    EntrepreneurStatusAsText,
    FirstRegistrationDate,
    EntrepreneurAddress,
    LocationOfEntrepreneurAddress,
    LocationEhakCode,
    LocationEhakText,
    AddressIndex,
    AdsAddressId,
    AdsAddressOid,
    AdsNormalizedFullAddress,
    InformationSystemLink,
}

impl CompanyField {
    pub const ALL: [CompanyField; 17] = [
        CompanyField::Name,
        CompanyField::RegistrationCode,
        CompanyField::LegalFormOfEntrepreneur,
        CompanyField::SubtypeOfLegalForm,
        CompanyField::VatNumber,
        CompanyField::EntrepreneurStatus,
        CompanyField::EntrepreneurStatusAsText,
        CompanyField::FirstRegistrationDate,
        CompanyField::EntrepreneurAddress,
        CompanyField::LocationOfEntrepreneurAddress,
        CompanyField::LocationEhakCode,
        CompanyField::LocationEhakText,
        CompanyField::AddressIndex,
        CompanyField::AdsAddressId,
        CompanyField::AdsAddressOid,
        CompanyField::AdsNormalizedFullAddress,
        CompanyField::InformationSystemLink,
    ];

    /// Output (serialized) name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyField::Name => "name",
            CompanyField::RegistrationCode => "registration_code",
            CompanyField::LegalFormOfEntrepreneur => "legal_form_of_entrepreneur",
            CompanyField::SubtypeOfLegalForm => "subtype_of_legal_form",
            CompanyField::VatNumber => "vat_number",
            CompanyField::EntrepreneurStatus => "entrepreneur_status",
            CompanyField::EntrepreneurStatusAsText => "entrepreneur_status_as_text",
            CompanyField::FirstRegistrationDate => "first_registration_date",
            CompanyField::EntrepreneurAddress => "entrepreneur_address",
            CompanyField::LocationOfEntrepreneurAddress => "location_of_entrepreneur_address",
            CompanyField::LocationEhakCode => "location_ehak_code",
            CompanyField::LocationEhakText => "location_ehak_text",
            CompanyField::AddressIndex => "address_index",
            CompanyField::AdsAddressId => "ads_address_id",
            CompanyField::AdsAddressOid => "ads_address_oid",
            CompanyField::AdsNormalizedFullAddress => "ads_normalized_full_address",
            CompanyField::InformationSystemLink => "information_system_link",
        }
    }
}

/// A company as served by the query API.
///
/// `name` and `registration_code` are empty strings when the source row lacks
/// them; every other translated field is `None` when its column is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Company {
    pub name: String,
    pub registration_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form_of_entrepreneur: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype_of_legal_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrepreneur_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrepreneur_status_as_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_registration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrepreneur_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_of_entrepreneur_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_ehak_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_ehak_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads_address_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads_address_oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads_normalized_full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_system_link: Option<String>,
    /// The untranslated source row.
    pub original_data: RawRecord,
}

impl Company {
    pub fn get(&self, field: CompanyField) -> Option<&str> {
        match field {
            CompanyField::Name => Some(self.name.as_str()),
            CompanyField::RegistrationCode => Some(self.registration_code.as_str()),
            other => self.optional_slot(other).and_then(|slot| slot.as_deref()),
        }
    }

    pub fn set(&mut self, field: CompanyField, value: String) {
        match field {
            CompanyField::Name => self.name = value,
            CompanyField::RegistrationCode => self.registration_code = value,
            other => {
                if let Some(slot) = self.optional_slot_mut(other) {
                    *slot = Some(value);
                }
            }
        }
    }

    /// True when the row carries a usable registration code.
    pub fn has_code(&self) -> bool {
        !self.registration_code.trim().is_empty()
    }

    fn optional_slot(&self, field: CompanyField) -> Option<&Option<String>> {
        let slot = match field {
            CompanyField::Name | CompanyField::RegistrationCode => return None,
            CompanyField::LegalFormOfEntrepreneur => &self.legal_form_of_entrepreneur,
            CompanyField::SubtypeOfLegalForm => &self.subtype_of_legal_form,
            CompanyField::VatNumber => &self.vat_number,
            CompanyField::EntrepreneurStatus => &self.entrepreneur_status,
            CompanyField::EntrepreneurStatusAsText => &self.entrepreneur_status_as_text,
            CompanyField::FirstRegistrationDate => &self.first_registration_date,
            CompanyField::EntrepreneurAddress => &self.entrepreneur_address,
            CompanyField::LocationOfEntrepreneurAddress => &self.location_of_entrepreneur_address,
            CompanyField::LocationEhakCode => &self.location_ehak_code,
            CompanyField::LocationEhakText => &self.location_ehak_text,
            CompanyField::AddressIndex => &self.address_index,
            CompanyField::AdsAddressId => &self.ads_address_id,
            CompanyField::AdsAddressOid => &self.ads_address_oid,
            CompanyField::AdsNormalizedFullAddress => &self.ads_normalized_full_address,
            CompanyField::InformationSystemLink => &self.information_system_link,
        };
        Some(slot)
    }

    fn optional_slot_mut(&mut self, field: CompanyField) -> Option<&mut Option<String>> {
        let slot = match field {
            CompanyField::Name | CompanyField::RegistrationCode => return None,
            CompanyField::LegalFormOfEntrepreneur => &mut self.legal_form_of_entrepreneur,
            CompanyField::SubtypeOfLegalForm => &mut self.subtype_of_legal_form,
            CompanyField::VatNumber => &mut self.vat_number,
            CompanyField::EntrepreneurStatus => &mut self.entrepreneur_status,
            CompanyField::EntrepreneurStatusAsText => &mut self.entrepreneur_status_as_text,
            CompanyField::FirstRegistrationDate => &mut self.first_registration_date,
            CompanyField::EntrepreneurAddress => &mut self.entrepreneur_address,
            CompanyField::LocationOfEntrepreneurAddress => {
                &mut self.location_of_entrepreneur_address
            }
            CompanyField::LocationEhakCode => &mut self.location_ehak_code,
            CompanyField::LocationEhakText => &mut self.location_ehak_text,
            CompanyField::AddressIndex => &mut self.address_index,
            CompanyField::AdsAddressId => &mut self.ads_address_id,
            CompanyField::AdsAddressOid => &mut self.ads_address_oid,
            CompanyField::AdsNormalizedFullAddress => &mut self.ads_normalized_full_address,
            CompanyField::InformationSystemLink => &mut self.information_system_link,
        };
        Some(slot)
    }
}

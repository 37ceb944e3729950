use ayush_terminology::{
    models::{Icd11Module, TerminologyCode, TraditionalSystem},
    AppState,
};

pub mod constants {
    pub const NAMASTE_SYSTEM: &str = "http://terminology.ayush.gov.in/CodeSystem/namaste";
    pub const TM2_SYSTEM: &str = "http://id.who.int/icd11/tm2";
    pub const BIOMEDICINE_SYSTEM: &str = "http://id.who.int/icd11/mms";
}

/// Two Ayurveda codes, one Siddha code and one Unani code. AY001 and SD001
/// cross-reference TM2; AY001 also cross-references Biomedicine.
pub fn namaste_codes() -> Vec<TerminologyCode> {
    vec![
        TerminologyCode::namaste("AY001", "Vataja Jwara", TraditionalSystem::Ayurveda)
            .with_definition("Fever due to vitiated Vata")
            .with_category("Jwara")
            .with_who_terminology_code("ITA-2.1")
            .with_cross_references(Some("TM2-SM01"), Some("1D01")),
        TerminologyCode::namaste("AY002", "Pittaja Jwara", TraditionalSystem::Ayurveda)
            .with_category("Jwara"),
        TerminologyCode::namaste("SD001", "Vali Suram", TraditionalSystem::Siddha)
            .with_category("Suram")
            .with_cross_references(Some("TM2-SS01"), None),
        TerminologyCode::namaste("UN001", "Humma Safrawiya", TraditionalSystem::Unani)
            .with_category("Humma"),
    ]
}

pub fn icd11_codes() -> Vec<TerminologyCode> {
    vec![
        TerminologyCode::icd11("TM2-SM01", "Vata pattern fever", Icd11Module::Tm2)
            .with_category("Chapter 26"),
        TerminologyCode::icd11("TM2-SS01", "Siddha fever pattern", Icd11Module::Tm2),
        TerminologyCode::icd11("1D01", "Fever of unknown origin", Icd11Module::Biomedicine),
    ]
}

pub async fn seed_catalogs(state: &AppState) -> anyhow::Result<()> {
    let store = state.terminology.store();
    store.save_all(namaste_codes()).await?;
    store.save_all(icd11_codes()).await?;
    Ok(())
}

//! The drug knowledge base.
//!
//! Every table is built once by [`DrugKnowledgeBase::standard`] and read
//! concurrently afterwards; share it behind an `Arc`. Names are stored in
//! their normalized generic form (lowercase, single spaces).
//!
//! An interaction side may name a therapeutic class as `class:<name>`, so one
//! entry such as `warfarin + class:nsaids` covers every member of the class.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use medsafe_contracts::{
    error::{MedsafeError, MedsafeResult},
    interaction::PairKey,
    severity::InteractionSeverity,
};

/// Prefix for a therapeutic-class side of an interaction entry.
pub const CLASS_PREFIX: &str = "class:";

/// The clinical content of one interaction entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTemplate {
    pub severity: InteractionSeverity,
    pub description: String,
    pub mechanism: String,
    pub management: String,
}

impl InteractionTemplate {
    pub fn new(
        severity: InteractionSeverity,
        description: impl Into<String>,
        mechanism: impl Into<String>,
        management: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            description: description.into(),
            mechanism: mechanism.into(),
            management: management.into(),
        }
    }
}

/// A group of substances that cross-react for allergy purposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllergyClass {
    pub members: Vec<String>,
    /// Classes with partial cross-reactivity.
    pub related: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DrugKnowledgeBase {
    interactions: HashMap<PairKey, InteractionTemplate>,
    classes: BTreeMap<String, Vec<String>>,
    class_of: HashMap<String, Vec<String>>,
    allergy_classes: BTreeMap<String, AllergyClass>,
    brands: HashMap<String, String>,
    codes: HashMap<String, String>,
}

impl DrugKnowledgeBase {
    /// An empty knowledge base. Mostly useful in tests.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in tables.
    pub fn standard() -> Self {
        let mut kb = Self::default();

        for (class, members) in THERAPEUTIC_CLASSES {
            for member in *members {
                kb.insert_class_member(class, member);
            }
        }

        for (a, b, severity, description, mechanism, management) in INTERACTIONS {
            kb.interactions.insert(
                PairKey::new(a, b),
                InteractionTemplate::new(*severity, *description, *mechanism, *management),
            );
        }

        for (class, members, related) in ALLERGY_CLASSES {
            kb.allergy_classes.insert(
                class.to_string(),
                AllergyClass {
                    members: members.iter().map(|m| m.to_string()).collect(),
                    related: related.iter().map(|r| r.to_string()).collect(),
                },
            );
        }

        for (generic, brands) in BRANDS {
            for brand in *brands {
                kb.brands.insert(brand.to_string(), generic.to_string());
            }
        }

        for (code, generic) in RXNORM {
            kb.codes.insert(code.to_string(), generic.to_string());
        }

        kb
    }

    // ── Extension ─────────────────────────────────────────────────────────────

    /// Add or replace an interaction entry. Either side may be `class:<name>`.
    pub fn add_interaction(&mut self, a: &str, b: &str, template: InteractionTemplate) {
        self.interactions.insert(PairKey::new(a, b), template);
    }

    pub fn add_class_member(&mut self, class: &str, drug: &str) {
        self.insert_class_member(class, drug);
    }

    pub fn add_allergy_class(&mut self, class: &str, allergy_class: AllergyClass) {
        self.allergy_classes.insert(class.to_string(), allergy_class);
    }

    /// Map a brand or synonym onto a generic name.
    ///
    /// Rejected when it would make normalization non-idempotent: the generic
    /// must not itself be a brand, and the brand must not already be some
    /// other brand's generic.
    pub fn add_brand(&mut self, brand: &str, generic: &str) -> MedsafeResult<()> {
        if brand == generic {
            return Err(MedsafeError::ConfigError {
                reason: format!("brand '{brand}' maps to itself"),
            });
        }
        if self.brands.contains_key(generic) {
            return Err(MedsafeError::ConfigError {
                reason: format!("generic '{generic}' is itself registered as a brand"),
            });
        }
        if self.brands.values().any(|g| g == brand) {
            return Err(MedsafeError::ConfigError {
                reason: format!("brand '{brand}' is already used as a generic name"),
            });
        }
        self.brands.insert(brand.to_string(), generic.to_string());
        Ok(())
    }

    pub fn add_code(&mut self, code: &str, generic: &str) {
        self.codes.insert(code.to_string(), generic.to_string());
    }

    fn insert_class_member(&mut self, class: &str, drug: &str) {
        let members = self.classes.entry(class.to_string()).or_default();
        if !members.iter().any(|m| m == drug) {
            members.push(drug.to_string());
        }
        let of = self.class_of.entry(drug.to_string()).or_default();
        if !of.iter().any(|c| c == class) {
            of.push(class.to_string());
        }
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    /// The entry for exactly this unordered pair of keys.
    pub fn interaction(&self, a: &str, b: &str) -> Option<&InteractionTemplate> {
        self.interactions.get(&PairKey::new(a, b))
    }

    /// The most severe entry covering two normalized drug names, looking at
    /// the drugs themselves and every class either belongs to.
    pub fn strongest_interaction(&self, a: &str, b: &str) -> Option<&InteractionTemplate> {
        let keys_a = self.lookup_keys(a);
        let keys_b = self.lookup_keys(b);

        let mut best: Option<&InteractionTemplate> = None;
        for ka in &keys_a {
            for kb_key in &keys_b {
                if let Some(found) = self.interaction(ka, kb_key) {
                    match best {
                        Some(current) if current.severity >= found.severity => {}
                        _ => best = Some(found),
                    }
                }
            }
        }
        best
    }

    fn lookup_keys(&self, drug: &str) -> Vec<String> {
        let mut keys = vec![drug.to_string()];
        keys.extend(self.classes_of(drug).iter().map(|c| format!("{CLASS_PREFIX}{c}")));
        keys
    }

    /// Therapeutic classes a normalized drug belongs to.
    pub fn classes_of(&self, drug: &str) -> &[String] {
        self.class_of.get(drug).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn class_members(&self, class: &str) -> Option<&[String]> {
        self.classes.get(class).map(Vec::as_slice)
    }

    /// The first therapeutic class two distinct drugs share.
    pub fn shared_class(&self, a: &str, b: &str) -> Option<&str> {
        let of_b = self.classes_of(b);
        self.classes_of(a)
            .iter()
            .find(|c| of_b.contains(c))
            .map(String::as_str)
    }

    pub fn generic_for_brand(&self, name: &str) -> Option<&str> {
        self.brands.get(name).map(String::as_str)
    }

    pub fn is_brand(&self, name: &str) -> bool {
        self.brands.contains_key(name)
    }

    /// Generic name for an external code (RxNorm CUI).
    pub fn generic_for_code(&self, code: &str) -> Option<&str> {
        self.codes.get(code.trim()).map(String::as_str)
    }

    pub fn allergy_class(&self, class: &str) -> Option<&AllergyClass> {
        self.allergy_classes.get(class)
    }

    /// Allergy classes a substance belongs to, including a class it names
    /// directly ("penicillins", or "penicillin" for the singular).
    pub fn allergy_classes_of(&self, substance: &str) -> Vec<&str> {
        self.allergy_classes
            .iter()
            .filter(|(name, class)| {
                name.as_str() == substance
                    || name.strip_suffix('s') == Some(substance)
                    || class.members.iter().any(|m| m == substance)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }
}

// ── Built-in tables ───────────────────────────────────────────────────────────

const THERAPEUTIC_CLASSES: &[(&str, &[&str])] = &[
    ("ace_inhibitors", &["lisinopril", "enalapril", "ramipril", "captopril", "benazepril", "perindopril"]),
    ("arbs", &["losartan", "valsartan", "irbesartan", "candesartan", "olmesartan", "telmisartan"]),
    ("statins", &["atorvastatin", "simvastatin", "rosuvastatin", "pravastatin", "lovastatin"]),
    ("ppis", &["omeprazole", "esomeprazole", "pantoprazole", "lansoprazole", "rabeprazole"]),
    ("ssris", &["fluoxetine", "sertraline", "citalopram", "escitalopram", "paroxetine"]),
    // Aspirin is an antiplatelet here; its NSAID interactions are listed explicitly.
    ("nsaids", &["ibuprofen", "naproxen", "diclofenac", "celecoxib", "meloxicam", "ketorolac", "indomethacin"]),
    ("anticoagulants", &["warfarin", "apixaban", "rivaroxaban", "dabigatran", "heparin", "enoxaparin"]),
    ("antiplatelets", &["aspirin", "clopidogrel", "prasugrel", "ticagrelor"]),
    ("beta_blockers", &["metoprolol", "atenolol", "propranolol", "carvedilol", "bisoprolol"]),
    ("benzodiazepines", &["diazepam", "lorazepam", "alprazolam", "clonazepam", "midazolam"]),
    ("opioids", &["morphine", "oxycodone", "hydrocodone", "fentanyl", "codeine", "tramadol", "hydromorphone", "methadone"]),
    ("maois", &["phenelzine", "tranylcypromine", "selegiline", "isocarboxazid"]),
    ("macrolides", &["clarithromycin", "erythromycin", "azithromycin"]),
];

type InteractionRow = (
    &'static str,
    &'static str,
    InteractionSeverity,
    &'static str,
    &'static str,
    &'static str,
);

const INTERACTIONS: &[InteractionRow] = &[
    (
        "warfarin",
        "aspirin",
        InteractionSeverity::Major,
        "Increased risk of bleeding",
        "Additive anticoagulant and antiplatelet effects",
        "Avoid the combination unless specifically indicated; monitor INR and signs of bleeding",
    ),
    (
        "warfarin",
        "class:nsaids",
        InteractionSeverity::Major,
        "Increased risk of gastrointestinal bleeding",
        "NSAIDs inhibit platelet function and injure the gastric mucosa",
        "Prefer acetaminophen for analgesia; if unavoidable add gastroprotection and monitor INR",
    ),
    (
        "warfarin",
        "fluconazole",
        InteractionSeverity::Major,
        "Raised INR and bleeding risk",
        "Fluconazole inhibits CYP2C9 metabolism of warfarin",
        "Reduce the warfarin dose and check INR within 3 to 5 days",
    ),
    (
        "warfarin",
        "amiodarone",
        InteractionSeverity::Major,
        "Raised INR and bleeding risk",
        "Amiodarone inhibits CYP2C9 and CYP3A4",
        "Reduce the warfarin dose by about a third and monitor INR weekly",
    ),
    (
        "class:ace_inhibitors",
        "potassium",
        InteractionSeverity::Moderate,
        "Risk of hyperkalemia",
        "ACE inhibitors reduce aldosterone-mediated potassium excretion",
        "Monitor serum potassium",
    ),
    (
        "class:ace_inhibitors",
        "class:arbs",
        InteractionSeverity::Major,
        "Hyperkalemia, hypotension and renal impairment",
        "Dual blockade of the renin-angiotensin system",
        "Avoid combined use",
    ),
    (
        "class:ace_inhibitors",
        "spironolactone",
        InteractionSeverity::Major,
        "Risk of severe hyperkalemia",
        "Additive potassium retention",
        "Monitor potassium and renal function closely",
    ),
    (
        "simvastatin",
        "clarithromycin",
        InteractionSeverity::Contraindicated,
        "Risk of rhabdomyolysis",
        "Clarithromycin strongly inhibits CYP3A4 metabolism of simvastatin",
        "Suspend simvastatin during the macrolide course",
    ),
    (
        "class:ssris",
        "class:maois",
        InteractionSeverity::Contraindicated,
        "Serotonin syndrome",
        "Combined serotonergic activity",
        "Do not combine; observe the washout period when switching",
    ),
    (
        "sildenafil",
        "nitroglycerin",
        InteractionSeverity::Contraindicated,
        "Profound hypotension",
        "Additive cGMP-mediated vasodilation",
        "Do not use nitrates within 24 hours of sildenafil",
    ),
    (
        "metformin",
        "iodinated contrast",
        InteractionSeverity::Major,
        "Risk of lactic acidosis",
        "Contrast-induced nephropathy reduces metformin clearance",
        "Hold metformin before contrast and for 48 hours after; check renal function before restarting",
    ),
    (
        "methotrexate",
        "trimethoprim",
        InteractionSeverity::Major,
        "Bone marrow suppression",
        "Additive antifolate effects and reduced methotrexate clearance",
        "Avoid the combination; monitor blood counts if unavoidable",
    ),
    (
        "clopidogrel",
        "omeprazole",
        InteractionSeverity::Moderate,
        "Reduced antiplatelet effect",
        "Omeprazole inhibits CYP2C19 activation of clopidogrel",
        "Use pantoprazole if a PPI is needed",
    ),
    (
        "lithium",
        "class:nsaids",
        InteractionSeverity::Major,
        "Lithium toxicity",
        "NSAIDs reduce renal lithium clearance",
        "Avoid or monitor lithium levels closely",
    ),
    (
        "digoxin",
        "amiodarone",
        InteractionSeverity::Major,
        "Digoxin toxicity",
        "Amiodarone inhibits P-glycoprotein and renal clearance of digoxin",
        "Halve the digoxin dose and monitor levels",
    ),
    (
        "amoxicillin",
        "ibuprofen",
        InteractionSeverity::Minor,
        "Minimal interaction",
        "No clinically significant mechanism",
        "No action usually required",
    ),
    (
        "tramadol",
        "class:ssris",
        InteractionSeverity::Major,
        "Serotonin syndrome and lowered seizure threshold",
        "Additive serotonergic effects",
        "Avoid or use the lowest tramadol dose with monitoring",
    ),
    (
        "class:opioids",
        "class:benzodiazepines",
        InteractionSeverity::Major,
        "Profound sedation and respiratory depression",
        "Additive CNS depression",
        "Reserve for patients without alternatives; limit doses and duration",
    ),
];

const ALLERGY_CLASSES: &[(&str, &[&str], &[&str])] = &[
    (
        "penicillins",
        &["penicillin", "amoxicillin", "ampicillin", "piperacillin", "dicloxacillin", "nafcillin", "amoxicillin-clavulanate"],
        &["cephalosporins", "carbapenems"],
    ),
    (
        "cephalosporins",
        &["cephalexin", "cefazolin", "ceftriaxone", "cefuroxime", "cefdinir", "cefepime"],
        &["penicillins"],
    ),
    ("carbapenems", &["meropenem", "imipenem", "ertapenem"], &["penicillins"]),
    ("sulfonamides", &["sulfa", "sulfamethoxazole", "sulfasalazine", "sulfadiazine"], &[]),
    (
        "nsaids",
        &["nsaid", "aspirin", "ibuprofen", "naproxen", "diclofenac", "celecoxib", "ketorolac", "meloxicam"],
        &[],
    ),
];

/// Generic name followed by the US, UK, EU, and AU brands and synonyms that
/// fold onto it.
const BRANDS: &[(&str, &[&str])] = &[
    ("warfarin", &["coumadin", "jantoven", "marevan"]),
    ("acetaminophen", &["tylenol", "panadol", "paracetamol", "doliprane", "calpol"]),
    ("ibuprofen", &["advil", "motrin", "nurofen", "brufen"]),
    ("naproxen", &["aleve", "naprosyn"]),
    ("diclofenac", &["voltaren", "voltarol"]),
    ("celecoxib", &["celebrex"]),
    ("aspirin", &["bayer", "disprin", "ecotrin", "acetylsalicylic acid", "asa"]),
    ("simvastatin", &["zocor"]),
    ("atorvastatin", &["lipitor", "sortis"]),
    ("rosuvastatin", &["crestor"]),
    ("lisinopril", &["prinivil", "zestril"]),
    ("enalapril", &["vasotec"]),
    ("ramipril", &["altace", "tritace"]),
    ("losartan", &["cozaar"]),
    ("valsartan", &["diovan"]),
    ("omeprazole", &["prilosec", "losec"]),
    ("esomeprazole", &["nexium"]),
    ("pantoprazole", &["protonix"]),
    ("fluoxetine", &["prozac"]),
    ("sertraline", &["zoloft", "lustral"]),
    ("citalopram", &["celexa", "cipramil"]),
    ("escitalopram", &["lexapro", "cipralex"]),
    ("paroxetine", &["paxil", "seroxat"]),
    ("clopidogrel", &["plavix", "iscover"]),
    ("apixaban", &["eliquis"]),
    ("rivaroxaban", &["xarelto"]),
    ("dabigatran", &["pradaxa"]),
    ("metformin", &["glucophage"]),
    ("furosemide", &["lasix"]),
    ("azithromycin", &["zithromax"]),
    ("clarithromycin", &["biaxin", "klacid"]),
    ("amoxicillin", &["amoxil"]),
    ("amoxicillin-clavulanate", &["augmentin", "co-amoxiclav"]),
    ("cephalexin", &["keflex"]),
    ("ceftriaxone", &["rocephin"]),
    ("promethazine", &["phenergan"]),
    ("loperamide", &["imodium"]),
    ("pseudoephedrine", &["sudafed"]),
    ("diphenhydramine", &["benadryl"]),
    ("digoxin", &["lanoxin"]),
    ("amiodarone", &["cordarone", "pacerone"]),
    ("fluconazole", &["diflucan"]),
    ("sildenafil", &["viagra", "revatio"]),
    ("nitroglycerin", &["nitrostat", "gtn", "glyceryl trinitrate"]),
    ("tramadol", &["ultram"]),
    ("alprazolam", &["xanax"]),
    ("diazepam", &["valium"]),
    ("lorazepam", &["ativan"]),
    ("clonazepam", &["klonopin", "rivotril"]),
    ("oxycodone", &["oxycontin"]),
    ("metoprolol", &["lopressor", "toprol", "betaloc"]),
    ("atenolol", &["tenormin"]),
    ("levothyroxine", &["synthroid", "eltroxin", "eutirox"]),
    ("isotretinoin", &["accutane", "roaccutane"]),
    ("misoprostol", &["cytotec"]),
    ("lithium", &["lithobid", "priadel"]),
    ("phenelzine", &["nardil"]),
    ("tranylcypromine", &["parnate"]),
    ("iodinated contrast", &["contrast", "contrast dye", "contrast-dye", "iodinated contrast media"]),
    ("potassium", &["potassium chloride", "k-dur", "klor-con", "slow-k"]),
];

const RXNORM: &[(&str, &str)] = &[
    ("11289", "warfarin"),
    ("1191", "aspirin"),
    ("5640", "ibuprofen"),
    ("161", "acetaminophen"),
    ("6809", "metformin"),
    ("29046", "lisinopril"),
    ("52175", "losartan"),
    ("36567", "simvastatin"),
    ("83367", "atorvastatin"),
    ("7646", "omeprazole"),
    ("32968", "clopidogrel"),
    ("723", "amoxicillin"),
    ("3407", "digoxin"),
    ("703", "amiodarone"),
    ("6448", "lithium"),
    ("36437", "sertraline"),
    ("10689", "tramadol"),
    ("4450", "fluconazole"),
    ("21212", "clarithromycin"),
    ("136411", "sildenafil"),
    ("4917", "nitroglycerin"),
    ("6851", "methotrexate"),
    ("10829", "trimethoprim"),
    ("4603", "furosemide"),
    ("6918", "metoprolol"),
];

#[cfg(test)]
mod tests {
    use medsafe_contracts::severity::InteractionSeverity;

    use super::{DrugKnowledgeBase, InteractionTemplate};

    #[test]
    fn pair_lookup_ignores_order() {
        let kb = DrugKnowledgeBase::standard();
        let ab = kb.interaction("warfarin", "aspirin").unwrap();
        let ba = kb.interaction("aspirin", "warfarin").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.severity, InteractionSeverity::Major);
    }

    #[test]
    fn class_entries_cover_members() {
        let kb = DrugKnowledgeBase::standard();
        let found = kb.strongest_interaction("naproxen", "warfarin").unwrap();
        assert_eq!(found.severity, InteractionSeverity::Major);

        let found = kb.strongest_interaction("sertraline", "phenelzine").unwrap();
        assert_eq!(found.severity, InteractionSeverity::Contraindicated);

        assert!(kb.strongest_interaction("metoprolol", "acetaminophen").is_none());
    }

    #[test]
    fn strongest_entry_wins_when_several_apply() {
        let mut kb = DrugKnowledgeBase::empty();
        kb.add_class_member("nsaids", "ibuprofen");
        kb.add_interaction(
            "class:nsaids",
            "drug-x",
            InteractionTemplate::new(InteractionSeverity::Moderate, "class", "", ""),
        );
        kb.add_interaction(
            "ibuprofen",
            "drug-x",
            InteractionTemplate::new(InteractionSeverity::Minor, "direct", "", ""),
        );
        let found = kb.strongest_interaction("drug-x", "ibuprofen").unwrap();
        assert_eq!(found.description, "class");
    }

    #[test]
    fn brand_targets_are_never_brands() {
        let kb = DrugKnowledgeBase::standard();
        for generic in kb.brands.values() {
            assert!(!kb.is_brand(generic), "{generic} is both a generic and a brand");
        }
    }

    #[test]
    fn add_brand_rejects_chains() {
        let mut kb = DrugKnowledgeBase::standard();
        assert!(kb.add_brand("warfarin", "something").is_err());
        assert!(kb.add_brand("new-brand", "coumadin").is_err());
        assert!(kb.add_brand("new-brand", "warfarin").is_ok());
        assert_eq!(kb.generic_for_brand("new-brand"), Some("warfarin"));
    }

    #[test]
    fn shared_class_and_allergy_classes() {
        let kb = DrugKnowledgeBase::standard();
        assert_eq!(kb.shared_class("aspirin", "clopidogrel"), Some("antiplatelets"));
        assert_eq!(kb.shared_class("aspirin", "metformin"), None);

        assert_eq!(kb.allergy_classes_of("penicillin"), vec!["penicillins"]);
        assert_eq!(kb.allergy_classes_of("amoxicillin"), vec!["penicillins"]);
        assert_eq!(kb.allergy_classes_of("cephalosporin"), vec!["cephalosporins"]);
        assert!(kb.allergy_classes_of("metformin").is_empty());
    }

    #[test]
    fn codes_map_to_generics() {
        let kb = DrugKnowledgeBase::standard();
        assert_eq!(kb.generic_for_code(" 11289 "), Some("warfarin"));
        assert_eq!(kb.generic_for_code("999999"), None);
    }
}

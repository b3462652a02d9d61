//! Score name resolution
//!
//! Users name scores the way their search engine prints them (`SpecEValue`,
//! `xcorr`, `expect`). The same short name can mean different CV terms for
//! different engines, so short names are translated per analysis software
//! before falling back to a lookup by full CV term name.

/// Analysis software accessions
pub mod software {
    /// SEQUEST
    pub const SEQUEST: &str = "MS:1001208";
    /// Mascot
    pub const MASCOT: &str = "MS:1001207";
    /// OMSSA
    pub const OMSSA: &str = "MS:1001475";
    /// X!Tandem
    pub const X_TANDEM: &str = "MS:1001476";
    /// MyriMatch
    pub const MYRIMATCH: &str = "MS:1001585";
    /// TagRecon
    pub const TAGRECON: &str = "MS:1001587";
    /// Pepitome
    pub const PEPITOME: &str = "MS:1001588";
    /// MS-GF
    pub const MS_GF: &str = "MS:1002047";
    /// MS-GF+
    pub const MS_GF_PLUS: &str = "MS:1002048";
    /// Comet
    pub const COMET: &str = "MS:1002251";
}

/// A score CV term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTerm {
    /// CV accession
    pub accession: &'static str,
    /// Full CV term name
    pub name: &'static str,
}

const fn term(accession: &'static str, name: &'static str) -> ScoreTerm {
    ScoreTerm { accession, name }
}

const SEQUEST_XCORR: ScoreTerm = term("MS:1001155", "SEQUEST:xcorr");
const SEQUEST_DELTACN: ScoreTerm = term("MS:1001156", "SEQUEST:deltacn");
const MASCOT_SCORE: ScoreTerm = term("MS:1001171", "Mascot:score");
const MASCOT_EXPECT: ScoreTerm = term("MS:1001172", "Mascot:expectation value");
const MASCOT_HOMOLOGY: ScoreTerm = term("MS:1001370", "Mascot:homology threshold");
const MASCOT_IDENTITY: ScoreTerm = term("MS:1001371", "Mascot:identity threshold");
const OMSSA_EVALUE: ScoreTerm = term("MS:1001328", "OMSSA:evalue");
const OMSSA_PVALUE: ScoreTerm = term("MS:1001329", "OMSSA:pvalue");
const X_TANDEM_EXPECT: ScoreTerm = term("MS:1001330", "X!Tandem:expect");
const X_TANDEM_HYPERSCORE: ScoreTerm = term("MS:1001331", "X!Tandem:hyperscore");
const MYRIMATCH_MVH: ScoreTerm = term("MS:1001589", "MyriMatch:MVH");
const MYRIMATCH_MZFIDELITY: ScoreTerm = term("MS:1001590", "MyriMatch:mzFidelity");
const MS_GF_RAW: ScoreTerm = term("MS:1002049", "MS-GF:RawScore");
const MS_GF_DENOVO: ScoreTerm = term("MS:1002050", "MS-GF:DeNovoScore");
const MS_GF_ENERGY: ScoreTerm = term("MS:1002051", "MS-GF:Energy");
const MS_GF_SPECEVALUE: ScoreTerm = term("MS:1002052", "MS-GF:SpecEValue");
const MS_GF_EVALUE: ScoreTerm = term("MS:1002053", "MS-GF:EValue");
const MS_GF_QVALUE: ScoreTerm = term("MS:1002054", "MS-GF:QValue");
const MS_GF_PEPQVALUE: ScoreTerm = term("MS:1002055", "MS-GF:PepQValue");
const MS_GF_PEP: ScoreTerm = term("MS:1002056", "MS-GF:PEP");
const COMET_XCORR: ScoreTerm = term("MS:1002252", "Comet:xcorr");
const COMET_DELTACN: ScoreTerm = term("MS:1002253", "Comet:deltacn");
const COMET_DELTACNSTAR: ScoreTerm = term("MS:1002254", "Comet:deltacnstar");
const COMET_SPSCORE: ScoreTerm = term("MS:1002255", "Comet:spscore");
const COMET_SPRANK: ScoreTerm = term("MS:1002256", "Comet:sprank");
const COMET_EXPECT: ScoreTerm = term("MS:1002257", "Comet:expectation value");

/// (software, score, short names)
const TRANSLATIONS: &[(&str, ScoreTerm, &[&str])] = &[
    (software::SEQUEST, SEQUEST_XCORR, &["xcorr"]),
    (software::SEQUEST, SEQUEST_DELTACN, &["deltacn", "deltcn"]),
    (software::MASCOT, MASCOT_SCORE, &["ionscore", "score"]),
    (software::MASCOT, MASCOT_IDENTITY, &["identityscore"]),
    (software::MASCOT, MASCOT_HOMOLOGY, &["homologyscore"]),
    (software::MASCOT, MASCOT_EXPECT, &["expect"]),
    (software::OMSSA, OMSSA_PVALUE, &["pvalue"]),
    (software::OMSSA, OMSSA_EVALUE, &["expect"]),
    (software::MYRIMATCH, MYRIMATCH_MVH, &["mvh"]),
    (software::TAGRECON, MYRIMATCH_MVH, &["mvh"]),
    (software::PEPITOME, MYRIMATCH_MVH, &["mvh"]),
    (software::MYRIMATCH, MYRIMATCH_MZFIDELITY, &["mzFidelity"]),
    (software::TAGRECON, MYRIMATCH_MZFIDELITY, &["mzFidelity"]),
    (software::PEPITOME, MYRIMATCH_MZFIDELITY, &["mzFidelity"]),
    (software::X_TANDEM, X_TANDEM_HYPERSCORE, &["hyperscore"]),
    (software::X_TANDEM, X_TANDEM_EXPECT, &["expect"]),
    (software::MS_GF, MS_GF_RAW, &["raw"]),
    (software::MS_GF, MS_GF_DENOVO, &["denovo"]),
    (software::MS_GF, MS_GF_ENERGY, &["energy"]),
    (software::MS_GF, MS_GF_EVALUE, &["EValue"]),
    (software::MS_GF, MS_GF_QVALUE, &["QValue"]),
    (software::MS_GF, MS_GF_SPECEVALUE, &["SpecEValue"]),
    (software::MS_GF, MS_GF_PEPQVALUE, &["PepQValue"]),
    (software::MS_GF, MS_GF_PEP, &["PEP"]),
    (software::MS_GF_PLUS, MS_GF_RAW, &["raw"]),
    (software::MS_GF_PLUS, MS_GF_DENOVO, &["denovo"]),
    (software::MS_GF_PLUS, MS_GF_ENERGY, &["energy"]),
    (software::MS_GF_PLUS, MS_GF_EVALUE, &["EValue"]),
    (software::MS_GF_PLUS, MS_GF_QVALUE, &["QValue"]),
    (software::MS_GF_PLUS, MS_GF_SPECEVALUE, &["SpecEValue"]),
    (software::MS_GF_PLUS, MS_GF_PEPQVALUE, &["PepQValue"]),
    (software::MS_GF_PLUS, MS_GF_PEP, &["PEP"]),
    (software::COMET, COMET_XCORR, &["xcorr"]),
    (software::COMET, COMET_DELTACN, &["deltacn"]),
    (software::COMET, COMET_DELTACNSTAR, &["deltacnstar"]),
    (software::COMET, COMET_SPRANK, &["sprank"]),
    (software::COMET, COMET_SPSCORE, &["spscore"]),
    (software::COMET, COMET_EXPECT, &["expect"]),
];

/// Every score term known by full name
const KNOWN_SCORES: &[ScoreTerm] = &[
    SEQUEST_XCORR,
    SEQUEST_DELTACN,
    MASCOT_SCORE,
    MASCOT_EXPECT,
    MASCOT_HOMOLOGY,
    MASCOT_IDENTITY,
    OMSSA_EVALUE,
    OMSSA_PVALUE,
    X_TANDEM_EXPECT,
    X_TANDEM_HYPERSCORE,
    MYRIMATCH_MVH,
    MYRIMATCH_MZFIDELITY,
    MS_GF_RAW,
    MS_GF_DENOVO,
    MS_GF_ENERGY,
    MS_GF_SPECEVALUE,
    MS_GF_EVALUE,
    MS_GF_QVALUE,
    MS_GF_PEPQVALUE,
    MS_GF_PEP,
    COMET_XCORR,
    COMET_DELTACN,
    COMET_DELTACNSTAR,
    COMET_SPSCORE,
    COMET_SPRANK,
    COMET_EXPECT,
];

/// Translate a short score name for a given analysis software (case-insensitive)
pub fn translate_score_name(software: &str, short_name: &str) -> Option<ScoreTerm> {
    TRANSLATIONS
        .iter()
        .filter(|(sw, _, _)| *sw == software)
        .find(|(_, _, names)| names.iter().any(|n| n.eq_ignore_ascii_case(short_name)))
        .map(|(_, score, _)| *score)
}

/// Look up a score term by accession or full CV name (case-insensitive)
pub fn find_score_term(name: &str) -> Option<ScoreTerm> {
    KNOWN_SCORES
        .iter()
        .find(|t| t.accession.eq_ignore_ascii_case(name) || t.name.eq_ignore_ascii_case(name))
        .copied()
}

/// Resolve a user-supplied score name to a CV term
///
/// Short names are translated for the reporting software first, then the
/// name is tried as a full CV name or accession. `None` means the caller
/// should match score parameters by name suffix instead.
pub fn resolve_score(software: Option<&str>, name: &str) -> Option<ScoreTerm> {
    software
        .and_then(|sw| translate_score_name(sw, name))
        .or_else(|| find_score_term(name))
}

//! Typed shape of a verb conjugation table: five tenses, five pronoun slots each.

use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronounForms {
    pub yo: String,
    #[serde(rename = "tú", alias = "tu")]
    pub tu: String,
    #[serde(
        rename = "él/ella/usted",
        alias = "el/ella/usted",
        alias = "él/ella/ud.",
        alias = "el/ella/ud."
    )]
    pub el_ella_usted: String,
    pub nosotros: String,
    #[serde(
        rename = "ellos/ellas/ustedes",
        alias = "ellos/ellas/uds.",
        alias = "ellos/ellas/ustedes."
    )]
    pub ellos_ellas_ustedes: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConjugationTable {
    pub present: PronounForms,
    pub subjunctive: PronounForms,
    pub preterite: PronounForms,
    pub imperfect: PronounForms,
    pub future: PronounForms,
}

impl TryFrom<JsonValue> for ConjugationTable {
    type Error = serde_json::Error;

    /// Unknown tenses and pronouns (`vosotros`, for one) are dropped.
    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

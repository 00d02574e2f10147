//! FranceConnect core types
//!
//! Closed string enumerations shared by the client and its configuration:
//! the requestable [`Scope`]s and the eIDAS assurance levels ([`AcrValue`]).
//! Both serialize to the exact strings the provider expects and are sent as
//! space-joined lists (see [`join`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing a string that is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownValue {
    /// Which enumeration was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

/// Scopes accepted by the FranceConnect authorization endpoint.
///
/// Scope/claim correspondence:
/// <https://docs.partenaires.franceconnect.gouv.fr/fs/fs-technique/fs-technique-scope-fc/>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// `openid`
    #[serde(rename = "openid")]
    OpenId,
    /// `gender`
    #[serde(rename = "gender")]
    Gender,
    /// `birthdate`
    #[serde(rename = "birthdate")]
    BirthDate,
    /// `birthcountry`
    #[serde(rename = "birthcountry")]
    BirthCountry,
    /// `birthplace`
    #[serde(rename = "birthplace")]
    BirthPlace,
    /// `given_name`
    #[serde(rename = "given_name")]
    GivenName,
    /// `family_name`
    #[serde(rename = "family_name")]
    FamilyName,
    /// `email`
    #[serde(rename = "email")]
    Email,
    /// `preferred_username`
    #[serde(rename = "preferred_username")]
    PreferredUsername,
    /// `profile`
    #[serde(rename = "profile")]
    Profile,
    /// `birth`
    #[serde(rename = "birth")]
    Birth,
    /// `identite_pivot`
    #[serde(rename = "identite_pivot")]
    IdentitePivot,
    /// `rnipp_given_name`
    #[serde(rename = "rnipp_given_name")]
    RnippGivenName,
    /// `rnipp_family_name`
    #[serde(rename = "rnipp_family_name")]
    RnippFamilyName,
    /// `rnipp_gender`
    #[serde(rename = "rnipp_gender")]
    RnippGender,
    /// `rnipp_birthcountry`
    #[serde(rename = "rnipp_birthcountry")]
    RnippBirthCountry,
    /// `rnipp_birthplace`
    #[serde(rename = "rnipp_birthplace")]
    RnippBirthPlace,
    /// `rnipp_birthdate`
    #[serde(rename = "rnipp_birthdate")]
    RnippBirthDate,
    /// `rnipp_profile`
    #[serde(rename = "rnipp_profile")]
    RnippProfile,
    /// `rnipp_birth`
    #[serde(rename = "rnipp_birth")]
    RnippBirth,
    /// `rnipp_identite_pivot`
    #[serde(rename = "rnipp_identite_pivot")]
    RnippIdentitePivot,
}

impl Scope {
    /// Every scope, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::OpenId,
        Self::Gender,
        Self::BirthDate,
        Self::BirthCountry,
        Self::BirthPlace,
        Self::GivenName,
        Self::FamilyName,
        Self::Email,
        Self::PreferredUsername,
        Self::Profile,
        Self::Birth,
        Self::IdentitePivot,
        Self::RnippGivenName,
        Self::RnippFamilyName,
        Self::RnippGender,
        Self::RnippBirthCountry,
        Self::RnippBirthPlace,
        Self::RnippBirthDate,
        Self::RnippProfile,
        Self::RnippBirth,
        Self::RnippIdentitePivot,
    ];

    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenId => "openid",
            Self::Gender => "gender",
            Self::BirthDate => "birthdate",
            Self::BirthCountry => "birthcountry",
            Self::BirthPlace => "birthplace",
            Self::GivenName => "given_name",
            Self::FamilyName => "family_name",
            Self::Email => "email",
            Self::PreferredUsername => "preferred_username",
            Self::Profile => "profile",
            Self::Birth => "birth",
            Self::IdentitePivot => "identite_pivot",
            Self::RnippGivenName => "rnipp_given_name",
            Self::RnippFamilyName => "rnipp_family_name",
            Self::RnippGender => "rnipp_gender",
            Self::RnippBirthCountry => "rnipp_birthcountry",
            Self::RnippBirthPlace => "rnipp_birthplace",
            Self::RnippBirthDate => "rnipp_birthdate",
            Self::RnippProfile => "rnipp_profile",
            Self::RnippBirth => "rnipp_birth",
            Self::RnippIdentitePivot => "rnipp_identite_pivot",
        }
    }
}

/// Authentication Context Class Reference values (eIDAS assurance levels).
///
/// See <https://docs.partenaires.franceconnect.gouv.fr/fs/fs-technique/fs-technique-eidas-acr/>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcrValue {
    /// eIDAS low
    #[default]
    Eidas1,
    /// eIDAS substantial
    Eidas2,
    /// eIDAS high
    Eidas3,
}

impl AcrValue {
    /// Every ACR value, lowest assurance first.
    pub const ALL: [Self; 3] = [Self::Eidas1, Self::Eidas2, Self::Eidas3];

    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eidas1 => "eidas1",
            Self::Eidas2 => "eidas2",
            Self::Eidas3 => "eidas3",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AcrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "scope",
                value: s.to_string(),
            })
    }
}

impl FromStr for AcrValue {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|acr| acr.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "ACR value",
                value: s.to_string(),
            })
    }
}

/// Join values with a single space, the list encoding used in query strings.
#[must_use]
pub fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_round_trips_through_from_str() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>(), Ok(scope));
        }
    }

    #[test]
    fn scope_serializes_to_wire_string() {
        let json = serde_json::to_string(&[Scope::OpenId, Scope::RnippBirthCountry]).unwrap();
        assert_eq!(json, r#"["openid","rnipp_birthcountry"]"#);
    }

    #[test]
    fn scope_deserializes_from_wire_string() {
        let scopes: Vec<Scope> = serde_json::from_str(r#"["given_name","identite_pivot"]"#).unwrap();
        assert_eq!(scopes, vec![Scope::GivenName, Scope::IdentitePivot]);
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = "address".parse::<Scope>().unwrap_err();
        assert_eq!(err.value, "address");
        assert_eq!(err.to_string(), "unknown scope: address");
    }

    #[test]
    fn acr_values_parse_and_display() {
        assert_eq!("eidas2".parse::<AcrValue>(), Ok(AcrValue::Eidas2));
        assert_eq!(AcrValue::Eidas3.to_string(), "eidas3");
        assert!("EIDAS1".parse::<AcrValue>().is_err());
    }

    #[test]
    fn default_acr_is_eidas1() {
        assert_eq!(AcrValue::default(), AcrValue::Eidas1);
    }

    #[test]
    fn join_uses_single_spaces() {
        assert_eq!(join(&[Scope::OpenId, Scope::Profile]), "openid profile");
        assert_eq!(join(&[AcrValue::Eidas2, AcrValue::Eidas3]), "eidas2 eidas3");
        assert_eq!(join::<AcrValue>(&[]), "");
    }
}

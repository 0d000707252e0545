//! The three fixed research domains

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three fixed topic domains of an ESG report
///
/// The declaration order is the report order: E, S, G.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    /// Environmental (E)
    #[serde(rename = "E")]
    Environmental,
    /// Social (S)
    #[serde(rename = "S")]
    Social,
    /// Governance (G)
    #[serde(rename = "G")]
    Governance,
}

impl Domain {
    /// All domains in report order
    pub const ALL: [Domain; 3] = [Domain::Environmental, Domain::Social, Domain::Governance];

    /// Single-letter code ("E", "S", "G")
    pub const fn code(self) -> &'static str {
        match self {
            Self::Environmental => "E",
            Self::Social => "S",
            Self::Governance => "G",
        }
    }

    /// Chinese display name
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Environmental => "环境",
            Self::Social => "社会",
            Self::Governance => "治理",
        }
    }

    /// Title of this domain's section in the finished report
    pub const fn section_title(self) -> &'static str {
        match self {
            Self::Environmental => "环境（E）动态",
            Self::Social => "社会（S）动态",
            Self::Governance => "公司治理（G）动态",
        }
    }

    /// Example headline used to steer research prompts
    pub const fn example(self) -> &'static str {
        match self {
            Self::Environmental => "欧盟委员会通过《可持续产品生态设计条例》",
            Self::Social => "某公司发布员工多元化发展报告",
            Self::Governance => "某公司发布董事会多元化政策",
        }
    }

    /// Short label for logs and model calls, e.g. `环境(E)`
    pub fn label(self) -> String {
        format!("{}({})", self.display_name(), self.code())
    }

    /// Position in report order
    pub const fn index(self) -> usize {
        match self {
            Self::Environmental => 0,
            Self::Social => 1,
            Self::Governance => 2,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "e" | "env" | "environmental" | "环境" => Ok(Self::Environmental),
            "s" | "social" | "社会" => Ok(Self::Social),
            "g" | "gov" | "governance" | "治理" => Ok(Self::Governance),
            _ => Err(Error::InvalidDomain(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_order() {
        let codes: Vec<_> = Domain::ALL.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec!["E", "S", "G"]);

        for (i, domain) in Domain::ALL.iter().enumerate() {
            assert_eq!(domain.index(), i);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("E".parse::<Domain>().unwrap(), Domain::Environmental);
        assert_eq!("social".parse::<Domain>().unwrap(), Domain::Social);
        assert_eq!("治理".parse::<Domain>().unwrap(), Domain::Governance);
        assert!("X".parse::<Domain>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Domain::Environmental.label(), "环境(E)");
        assert_eq!(Domain::Governance.section_title(), "公司治理（G）动态");
        assert_eq!(Domain::Social.to_string(), "S");
    }

    #[test]
    fn test_serde_codes() {
        let json = serde_json::to_string(&Domain::Governance).unwrap();
        assert_eq!(json, "\"G\"");

        let parsed: Domain = serde_json::from_str("\"E\"").unwrap();
        assert_eq!(parsed, Domain::Environmental);
    }
}

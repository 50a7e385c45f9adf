use serde::{Deserialize, Serialize};

/// One NAV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nav {
    pub nav: f64,
    #[serde(default)]
    pub date: Option<String>,
}

/// Mutual fund details as returned by the NAV API and stored under `nav:<isin>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutualFundNav {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub fund_house: Option<String>,
    #[serde(default)]
    pub fund_name: Option<String>,
    #[serde(default)]
    pub short_code: Option<String>,
    #[serde(default)]
    pub detail_info: Option<String>,
    #[serde(default)]
    pub nav: Option<Nav>,
    #[serde(default)]
    pub last_nav: Option<Nav>,
}

impl MutualFundNav {
    /// Both the current and the previous-period NAV are present.
    pub fn is_complete(&self) -> bool {
        self.nav.is_some() && self.last_nav.is_some()
    }

    pub fn current_nav(&self) -> Option<f64> {
        self.nav.as_ref().map(|n| n.nav)
    }

    pub fn previous_nav(&self) -> Option<f64> {
        self.last_nav.as_ref().map(|n| n.nav)
    }

    /// True when the current or previous-period NAV value changed.
    ///
    /// Descriptive fields and dates are ignored.
    pub fn nav_differs(&self, other: &MutualFundNav) -> bool {
        self.current_nav() != other.current_nav() || self.previous_nav() != other.previous_nav()
    }
}

#[cfg(test)]
pub(crate) fn sample_nav(current: f64, previous: f64) -> MutualFundNav {
    MutualFundNav {
        code: Some("120503".to_string()),
        name: Some("Sample Flexi Cap Fund - Direct Growth".to_string()),
        short_name: None,
        category: Some("Equity".to_string()),
        fund_house: Some("Sample AMC".to_string()),
        fund_name: None,
        short_code: None,
        detail_info: None,
        nav: Some(Nav { nav: current, date: Some("2025-03-11".to_string()) }),
        last_nav: Some(Nav { nav: previous, date: Some("2025-03-10".to_string()) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_differs_only_on_values() {
        let a = sample_nav(100.0, 99.5);
        let mut b = sample_nav(100.0, 99.5);
        b.name = Some("Renamed".to_string());
        b.nav.as_mut().unwrap().date = Some("2025-03-12".to_string());

        assert!(!a.nav_differs(&b));
        assert!(a.nav_differs(&sample_nav(105.0, 99.5)));
        assert!(a.nav_differs(&sample_nav(100.0, 98.0)));
    }

    #[test]
    fn test_partial_payload_is_incomplete() {
        let json = r#"{"code":"1","nav":{"nav":10.5,"date":"2025-03-11"}}"#;
        let parsed: MutualFundNav = serde_json::from_str(json).unwrap();

        assert!(!parsed.is_complete());
        assert_eq!(parsed.current_nav(), Some(10.5));
        assert_eq!(parsed.previous_nav(), None);
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==============================================================================
// IPO listing payload (cached as a single entry)
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpoList {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Vec<IpoData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpoData {
    pub id: Option<String>,
    pub symbol: String,
    pub name: String,
    pub isin: Option<String>,
    pub active: bool,
    pub status: String,
    pub sub_type: Option<String>,
    pub issue_type: Option<String>,
    pub lot_size: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub listing_date: Option<String>,
}

impl IpoList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn with_status(&self, status: &str) -> Vec<IpoData> {
        self.data
            .iter()
            .filter(|ipo| ipo.status.eq_ignore_ascii_case(status))
            .cloned()
            .collect()
    }
}

impl IpoData {
    /// Closing date, taken from the `YYYY-MM-DD` prefix of `end_at`.
    pub fn end_date(&self) -> Option<NaiveDate> {
        let end_at = self.end_at.as_deref()?;
        let prefix = end_at.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }

    pub fn closes_between(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.end_date()
            .map(|end| end >= from && end <= to)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipo(symbol: &str, status: &str, end_at: Option<&str>) -> IpoData {
        IpoData {
            symbol: symbol.to_string(),
            name: format!("{} Ltd", symbol),
            status: status.to_string(),
            end_at: end_at.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserializes_partial_payload() {
        let json = r#"{"status":"success","data":[{"symbol":"ACME","status":"ongoing","end_at":"2025-03-12T17:00:00+05:30","unknown_field":1}]}"#;
        let list: IpoList = serde_json::from_str(json).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.data[0].symbol, "ACME");
        assert_eq!(list.data[0].lot_size, None);
    }

    #[test]
    fn test_status_filter_is_case_insensitive() {
        let list = IpoList {
            status: None,
            data: vec![ipo("A", "ongoing", None), ipo("B", "closed", None), ipo("C", "ONGOING", None)],
        };

        let ongoing = list.with_status("Ongoing");
        assert_eq!(ongoing.len(), 2);
    }

    #[test]
    fn test_closing_window_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();

        assert!(ipo("A", "ongoing", Some("2025-03-12T17:00:00")).closes_between(today, tomorrow));
        assert!(ipo("B", "ongoing", Some("2025-03-13")).closes_between(today, tomorrow));
        assert!(!ipo("C", "ongoing", Some("2025-03-14")).closes_between(today, tomorrow));
        assert!(!ipo("D", "ongoing", Some("garbage")).closes_between(today, tomorrow));
        assert!(!ipo("E", "ongoing", None).closes_between(today, tomorrow));
    }
}

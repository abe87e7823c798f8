//! Yearly emissions data.
//!
//! The dataset is a JSON array of companies, each with reporting periods. For
//! a given year, a company contributes the first period that starts in that
//! year, and its emissions resolve to the calculated total if present, else
//! the stated total, else zero.
//!
//! ```ignore
//! let dataset = EmissionsDataset::load("companies.json", 2022)?;
//! println!("{} companies, {:.0} t CO2", dataset.len(), dataset.total_emissions());
//! ```

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Maximum number of hits returned by [`EmissionsDataset::search`].
pub const SEARCH_LIMIT: usize = 10;

/// A reporting company as it appears in the source data.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Stable identifier, used for placement and color.
    pub wikidata_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description, searched alongside the name.
    #[serde(default)]
    pub description: Option<String>,
    /// Reporting periods, in any order.
    #[serde(default)]
    pub reporting_periods: Vec<ReportingPeriod>,
    /// Free-form labels; carried but not interpreted.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One reporting period of a company.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportingPeriod {
    /// ISO date, `YYYY-MM-DD`.
    pub start_date: String,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: String,
    /// Link to the published report.
    #[serde(default, rename = "reportURL")]
    pub report_url: Option<String>,
    /// Totals for the period, absent when nothing was reported.
    #[serde(default)]
    pub emissions: Option<PeriodEmissions>,
}

impl ReportingPeriod {
    /// Year the period starts in.
    pub fn year(&self) -> Option<i32> {
        self.start_date.split('-').next()?.trim().parse().ok()
    }
}

/// Emission totals of a reporting period.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEmissions {
    /// Total computed from the reported scopes, in tons.
    #[serde(default)]
    pub calculated_total_emissions: Option<f64>,
    /// Total as the company stated it.
    #[serde(default)]
    pub stated_total_emissions: Option<StatedTotal>,
}

/// A total as stated by the company.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatedTotal {
    /// Amount, in tons.
    pub total: f64,
    /// Unit label as reported, e.g. `tCO2e`.
    #[serde(default)]
    pub unit: String,
}

impl PeriodEmissions {
    /// Calculated total, falling back to the stated total, then zero.
    pub fn resolved_total(&self) -> f64 {
        self.calculated_total_emissions
            .or_else(|| self.stated_total_emissions.as_ref().map(|s| s.total))
            .unwrap_or(0.0)
    }
}

/// An entity with a resolved yearly emissions total, ready for the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRecord {
    /// Stable identifier.
    pub id: Arc<str>,
    /// Name shown to users.
    pub display_name: String,
    /// Description from the source data.
    pub description: Option<String>,
    /// Tons of CO2 for the year.
    pub emissions_tons: f64,
    /// Reporting year.
    pub year: i32,
}

impl EntityRecord {
    /// Build a record directly.
    pub fn new(id: &str, display_name: &str, emissions_tons: f64, year: i32) -> Self {
        Self {
            id: Arc::from(id),
            display_name: display_name.to_string(),
            description: None,
            emissions_tons,
            year,
        }
    }
}

/// All entities reporting in one year.
#[derive(Clone, Debug)]
pub struct EmissionsDataset {
    year: i32,
    entities: Vec<EntityRecord>,
    total_emissions: f64,
}

impl EmissionsDataset {
    /// Resolve `companies` for `year`.
    ///
    /// Companies without a period starting in `year` are left out; a period
    /// without any emissions block counts as zero toward the total and is not
    /// turned into an entity.
    pub fn from_companies(companies: &[Company], year: i32) -> Result<Self, DatasetError> {
        let mut reporting = 0;
        let mut entities = Vec::new();

        for company in companies {
            let Some(period) = company
                .reporting_periods
                .iter()
                .find(|p| p.year() == Some(year))
            else {
                continue;
            };
            reporting += 1;

            let Some(emissions) = &period.emissions else {
                continue;
            };
            entities.push(EntityRecord {
                id: Arc::from(company.wikidata_id.as_str()),
                display_name: company.name.clone(),
                description: company.description.clone(),
                emissions_tons: emissions.resolved_total(),
                year,
            });
        }

        if reporting == 0 {
            return Err(DatasetError::NoCompaniesForYear(year));
        }

        let total_emissions = entities.iter().map(|e| e.emissions_tons).sum();
        log::debug!(
            "resolved {} of {} companies for {year}, {total_emissions:.0} t",
            entities.len(),
            companies.len()
        );

        Ok(Self {
            year,
            entities,
            total_emissions,
        })
    }

    /// Parse a JSON array of companies and resolve it for `year`.
    pub fn from_json(json: &str, year: i32) -> Result<Self, DatasetError> {
        let companies = parse_companies(json)?;
        Self::from_companies(&companies, year)
    }

    /// Load a JSON file of companies and resolve it for `year`.
    pub fn load(path: impl AsRef<Path>, year: i32) -> Result<Self, DatasetError> {
        let companies = load_companies(path)?;
        Self::from_companies(&companies, year)
    }

    /// Reporting year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Entities in source order.
    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Sum of all entities' emissions.
    pub fn total_emissions(&self) -> f64 {
        self.total_emissions
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether there are no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity by id.
    pub fn get(&self, id: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| &*e.id == id)
    }

    /// Case-insensitive search over names and descriptions.
    ///
    /// Returns at most [`SEARCH_LIMIT`] matches; a blank term matches nothing.
    pub fn search(&self, term: &str) -> Vec<&EntityRecord> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        self.entities
            .iter()
            .filter(|e| {
                e.display_name.to_lowercase().contains(&term)
                    || e
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            })
            .take(SEARCH_LIMIT)
            .collect()
    }
}

/// Parse a JSON array of companies.
pub fn parse_companies(json: &str) -> Result<Vec<Company>, DatasetError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a JSON file of companies.
pub fn load_companies(path: impl AsRef<Path>) -> Result<Vec<Company>, DatasetError> {
    let json = fs::read_to_string(path)?;
    parse_companies(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "wikidataId": "Q1",
            "name": "Northwind Steel",
            "description": "Steel and iron works",
            "reportingPeriods": [
                {
                    "startDate": "2022-01-01",
                    "endDate": "2022-12-31",
                    "reportURL": null,
                    "emissions": { "calculatedTotalEmissions": 1200000.0 }
                },
                {
                    "startDate": "2021-01-01",
                    "endDate": "2021-12-31",
                    "emissions": {
                        "calculatedTotalEmissions": null,
                        "statedTotalEmissions": { "total": 900000.0, "unit": "tCO2e" }
                    }
                }
            ],
            "tags": ["large-cap"]
        },
        {
            "wikidataId": "Q2",
            "name": "Fjord Shipping",
            "description": null,
            "reportingPeriods": [
                { "startDate": "2022-04-01", "endDate": "2023-03-31", "emissions": {} }
            ]
        },
        {
            "wikidataId": "Q3",
            "name": "Paper Mills",
            "reportingPeriods": [
                { "startDate": "2022-01-01", "endDate": "2022-12-31", "emissions": null }
            ]
        }
    ]"#;

    #[test]
    fn test_resolve_year() {
        let dataset = EmissionsDataset::from_json(SAMPLE, 2022).unwrap();
        assert_eq!(dataset.year(), 2022);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entities()[0].emissions_tons, 1_200_000.0);
        // Empty emissions block resolves to zero
        assert_eq!(dataset.entities()[1].emissions_tons, 0.0);
        assert_eq!(dataset.total_emissions(), 1_200_000.0);
    }

    #[test]
    fn test_stated_total_fallback() {
        let dataset = EmissionsDataset::from_json(SAMPLE, 2021).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.entities()[0].emissions_tons, 900_000.0);
        assert_eq!(dataset.entities()[0].year, 2021);
    }

    #[test]
    fn test_no_companies_for_year() {
        let err = EmissionsDataset::from_json(SAMPLE, 1999).unwrap_err();
        assert!(matches!(err, DatasetError::NoCompaniesForYear(1999)));
    }

    #[test]
    fn test_invalid_format() {
        let err = EmissionsDataset::from_json(r#"{"companies": []}"#, 2022).unwrap_err();
        assert!(matches!(err, DatasetError::Parse(_)));
    }

    #[test]
    fn test_search() {
        let dataset = EmissionsDataset::from_json(SAMPLE, 2022).unwrap();
        assert!(dataset.search("   ").is_empty());

        let hits = dataset.search("STEEL");
        assert_eq!(hits.len(), 1);
        assert_eq!(&*hits[0].id, "Q1");

        // Matches descriptions too
        assert_eq!(dataset.search("iron works").len(), 1);
        assert_eq!(dataset.search("fjord").len(), 1);
        assert!(dataset.get("Q2").is_some());
    }

    #[test]
    fn test_period_year() {
        let period = ReportingPeriod {
            start_date: "2020-07-01".into(),
            end_date: String::new(),
            report_url: None,
            emissions: None,
        };
        assert_eq!(period.year(), Some(2020));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companies.json");
        fs::write(&path, SAMPLE).unwrap();

        let dataset = EmissionsDataset::load(&path, 2022).unwrap();
        assert_eq!(dataset.len(), 2);
    }
}

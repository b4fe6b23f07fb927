//! Client-side filtering of the cached reservation list.

use crate::api::models::reservations::{Reservation, ReservationStatus};
use serde::{Deserialize, Serialize};

/// Active filters. `None` (or an empty string for the text fields) matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub search: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ReservationFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && active(&self.environment).is_none() && active(&self.region).is_none() && active(&self.search).is_none()
    }

    pub fn matches(&self, reservation: &Reservation) -> bool {
        if self.status.is_some_and(|s| s != reservation.status) {
            return false;
        }
        if active(&self.environment).is_some_and(|e| e != reservation.environment) {
            return false;
        }
        if active(&self.region).is_some_and(|r| r != reservation.region) {
            return false;
        }
        match active(&self.search) {
            Some(term) => reservation.searchable_text().contains(&term.to_lowercase()),
            None => true,
        }
    }

    /// Matching reservations, in their original order.
    pub fn apply<'a>(&self, reservations: &'a [Reservation]) -> Vec<&'a Reservation> {
        reservations.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Values offered in the environment and region pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub environments: Vec<String>,
    pub regions: Vec<String>,
}

impl FilterOptions {
    /// Distinct values in order of first appearance.
    pub fn from_reservations(reservations: &[Reservation]) -> Self {
        let mut options = Self::default();
        for r in reservations {
            if !options.environments.contains(&r.environment) {
                options.environments.push(r.environment.clone());
            }
            if !options.regions.contains(&r.region) {
                options.regions.push(r.region.clone());
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn reservation(name: &str, status: ReservationStatus, environment: &str, region: &str) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            server_name: name.to_string(),
            status,
            unit_code: "A1".to_string(),
            kind: "web".to_string(),
            provider: "aws".to_string(),
            region: region.to_string(),
            environment: environment.to_string(),
            function: "api".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Reservation> {
        vec![
            reservation("PRD-WEB-001", ReservationStatus::Committed, "prod", "us-east"),
            reservation("DEV-WEB-002", ReservationStatus::Reserved, "dev", "eu-west"),
            reservation("PRD-DB-003", ReservationStatus::Reserved, "prod", "eu-west"),
            reservation("STG-WEB-004", ReservationStatus::Committed, "staging", "us-east"),
        ]
    }

    fn names(list: &[&Reservation]) -> Vec<String> {
        list.iter().map(|r| r.server_name.clone()).collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let all = sample();
        let filter = ReservationFilter {
            environment: Some(String::new()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&all).len(), all.len());
    }

    #[test]
    fn test_search_is_case_insensitive_over_all_attributes() {
        let all = sample();
        let by_name = ReservationFilter {
            search: Some("prd-web".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&by_name.apply(&all)), vec!["PRD-WEB-001"]);

        let by_region = ReservationFilter {
            search: Some("EU-WEST".to_string()),
            ..Default::default()
        };
        assert_eq!(names(&by_region.apply(&all)), vec!["DEV-WEB-002", "PRD-DB-003"]);
    }

    #[test]
    fn test_filters_compose_and_are_idempotent() {
        let all = sample();
        let filter = ReservationFilter {
            status: Some(ReservationStatus::Reserved),
            environment: Some("prod".to_string()),
            region: Some("eu-west".to_string()),
            search: Some("db".to_string()),
        };
        let once = filter.apply(&all);
        assert_eq!(names(&once), vec!["PRD-DB-003"]);

        let owned: Vec<Reservation> = once.into_iter().cloned().collect();
        assert_eq!(names(&filter.apply(&owned)), vec!["PRD-DB-003"]);

        // Applying one dimension at a time, in any order, gives the same result
        let status_only = ReservationFilter {
            status: filter.status,
            ..Default::default()
        };
        let env_only = ReservationFilter {
            environment: filter.environment.clone(),
            ..Default::default()
        };
        let a: Vec<Reservation> = status_only.apply(&all).into_iter().cloned().collect();
        let b: Vec<Reservation> = env_only.apply(&all).into_iter().cloned().collect();
        assert_eq!(names(&env_only.apply(&a)), names(&status_only.apply(&b)));
    }

    #[test]
    fn test_filter_options_first_occurrence_order() {
        let options = FilterOptions::from_reservations(&sample());
        assert_eq!(options.environments, vec!["prod", "dev", "staging"]);
        assert_eq!(options.regions, vec!["us-east", "eu-west"]);
    }
}

use std::cmp::Reverse;

use serde::Deserialize;

use super::domain::ApplicationStatus;
use super::records::Application;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSort {
    #[default]
    DateDesc,
    DateAsc,
    CompanyAsc,
    CompanyDesc,
}

/// Filters for the application list. Search matches company or role,
/// ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub sort: ApplicationSort,
}

impl ApplicationQuery {
    pub fn matches(&self, application: &Application) -> bool {
        if self.status.is_some_and(|status| status != application.status) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                application.company_name.to_lowercase().contains(&needle)
                    || application.role.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    pub fn apply(&self, applications: Vec<Application>) -> Vec<Application> {
        let mut selected: Vec<Application> = applications
            .into_iter()
            .filter(|application| self.matches(application))
            .collect();

        match self.sort {
            ApplicationSort::DateDesc => {
                selected.sort_by(|a, b| b.applied_date.cmp(&a.applied_date))
            }
            ApplicationSort::DateAsc => selected.sort_by_key(|application| application.applied_date),
            ApplicationSort::CompanyAsc => selected.sort_by_cached_key(|application| {
                application.company_name.to_lowercase()
            }),
            ApplicationSort::CompanyDesc => selected
                .sort_by_cached_key(|application| Reverse(application.company_name.to_lowercase())),
        }
        selected
    }
}

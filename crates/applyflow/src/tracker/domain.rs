use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed enumeration whose wire form is a fixed label.
///
/// Serde and `FromStr` both accept only the listed labels, so unknown values are
/// rejected where records enter the crate instead of flowing into the reports.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let trimmed = raw.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: raw.to_string(),
                    })
            }
        }
    };
}

labeled_enum! {
    /// Pipeline position of an application. Any status may follow any other.
    ApplicationStatus {
        Applied => "Applied",
        OnlineAssessment => "OA",
        Interview => "Interview",
        Offer => "Offer",
        Rejected => "Rejected",
        Ghosted => "Ghosted",
        Withdrawn => "Withdrawn",
    }
}

impl ApplicationStatus {
    /// Anything other than Applied, Ghosted or Withdrawn counts as hearing back.
    pub const fn is_response(self) -> bool {
        !matches!(self, Self::Applied | Self::Ghosted | Self::Withdrawn)
    }

    /// Still in play: not Rejected, Ghosted or Withdrawn.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rejected | Self::Ghosted | Self::Withdrawn)
    }
}

labeled_enum! {
    Priority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

labeled_enum! {
    /// Where the posting was found.
    ApplicationSource {
        LinkedIn => "LinkedIn",
        Naukri => "Naukri",
        Indeed => "Indeed",
        WellFound => "WellFound",
        Instahyre => "Instahyre",
        CompanyPortal => "Company-Portal",
        Referral => "Referral",
        Other => "Other",
    }
}

labeled_enum! {
    /// Coarse company classification used by the tier cohort report.
    CompanyTier {
        Faang => "FAANG",
        Unicorn => "Unicorn",
        MidSize => "Mid-Size",
        Startup => "Startup",
        Unknown => "Unknown",
    }
}

labeled_enum! {
    ReferralStatus {
        Pending => "Pending",
        Agreed => "Agreed",
        Referred => "Referred",
        Declined => "Declined",
    }
}

labeled_enum! {
    InterviewStatus {
        Scheduled => "Scheduled",
        Completed => "Completed",
        Cancelled => "Cancelled",
        Rescheduled => "Rescheduled",
    }
}

labeled_enum! {
    /// Entity family an activity entry refers to.
    ActivityType {
        Application => "application",
        Referral => "referral",
        Resume => "resume",
        Interview => "interview",
    }
}

labeled_enum! {
    ActivityAction {
        Created => "created",
        Updated => "updated",
        Deleted => "deleted",
        StatusChanged => "status_changed",
    }
}

/// Raised when a label does not belong to a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id! {
    /// Opaque identity issued by the hosted auth provider.
    UserId
}
string_id!(ApplicationId);
string_id!(ReferralId);
string_id!(ResumeId);
string_id!(InterviewId);
string_id!(ActivityId);

/// Inclusive date window applied before aggregation. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// First through last day of the given month; `None` for an invalid month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self::between(first, next.pred_opt()?))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Number of days in the month holding `date`.
pub(crate) fn days_in_month(date: NaiveDate) -> u32 {
    DateRange::month(date.year(), date.month())
        .and_then(|range| range.end)
        .map_or(31, |last| last.day())
}

//! Database models
//!
//! Row types for the problem-tag tables plus the closed enumerations stored as
//! text labels. Labels are the exact strings persisted and exchanged with the
//! presentation layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Declares a closed set of text labels with `as_str`/`from_label` and an `ALL` list
macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $variant:ident => $label:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Every member, in display order
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Stored/displayed label
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse an exact label; `None` when it is not a member of the set
            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Parse a label read back from storage
            pub(crate) fn from_stored(label: &str) -> Result<Self> {
                Self::from_label(label).ok_or_else(|| {
                    Error::Internal(format!(
                        "Unexpected {} value in database: {:?}",
                        stringify!($name),
                        label
                    ))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_set! {
    /// Production team that handled the order
    pub enum Team {
        Screenprint => "Screenprint",
        Embroidery => "Embroidery",
        Digital => "Digital",
        Vas => "VAS",
    }
}

closed_set! {
    /// Category of the reported problem
    pub enum ProblemType {
        DamagedInProduction => "Damaged in Production",
        ShortHeavyItems => "Short/ Heavy Items",
        FactoryDamage => "Factory Damage",
    }
}

closed_set! {
    /// Garment size on a problem line
    pub enum Size {
        Toddler2 => "2T",
        Toddler3 => "3T",
        Toddler4 => "4T",
        Toddler5To6 => "5/6T",
        YouthXs => "YXS",
        YouthS => "YS",
        YouthM => "YM",
        YouthL => "YL",
        YouthXl => "YXL",
        Xs => "XS",
        S => "S",
        M => "M",
        L => "L",
        Xl => "XL",
        Xl2 => "2XL",
        Xl3 => "3XL",
        Other => "OTHER",
        Osfa => "OSFA",
    }
}

closed_set! {
    /// Optional short/heavy marker on a line ("" when unset)
    pub enum ShortHeavyTag {
        Unset => "",
        Short => "Short",
        Heavy => "Heavy",
        ShortHeavy => "Short/Heavy",
    }
}

closed_set! {
    /// Whether the vendor packing slip matched what was received
    pub enum PackingSlipMatch {
        Unknown => "Unknown",
        Match => "Match",
        NoMatch => "NoMatch",
    }
}

impl Default for PackingSlipMatch {
    fn default() -> Self {
        PackingSlipMatch::Unknown
    }
}

impl Default for ShortHeavyTag {
    fn default() -> Self {
        ShortHeavyTag::Unset
    }
}

impl ShortHeavyTag {
    /// (short, heavy) line-count contribution of a line carrying this tag
    pub fn line_counts(&self) -> (i64, i64) {
        match self {
            ShortHeavyTag::Short => (1, 0),
            ShortHeavyTag::Heavy => (0, 1),
            ShortHeavyTag::ShortHeavy => (1, 1),
            ShortHeavyTag::Unset => (0, 0),
        }
    }
}

/// Largest quantity or unit count accepted on a line or baseline entry
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Entry in a reference list (customer, employee, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

/// Problem tag header as submitted by the presentation layer
///
/// Enumerated fields arrive as raw labels so that every invalid value can be
/// reported in one validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemTagInput {
    pub date_found: Option<NaiveDate>,
    pub po_number: String,
    pub customer_id: Option<i64>,
    pub job_name: String,
    pub team_name: String,
    pub author_name: String,
    pub problem_type: String,
    pub mistake_employee_id: Option<i64>,
    pub notes: String,
}

/// One SKU-level line as submitted by the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemLineInput {
    pub short_heavy_tag: String,
    pub style_number: String,
    pub item_description: String,
    pub color: String,
    pub size: String,
    pub packing_slip_match: PackingSlipMatch,
    pub qty_short: Option<i64>,
    pub qty_heavy: Option<i64>,
}

/// Stored problem tag header with customer/employee names resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemTagHeader {
    pub id: i64,
    pub date_entered: DateTime<Utc>,
    pub date_found: NaiveDate,
    pub po_number: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub job_name: String,
    pub team_name: Team,
    pub author_name: String,
    pub problem_type: ProblemType,
    pub mistake_employee_id: Option<i64>,
    pub mistake_made_by: Option<String>,
    pub notes: String,
}

/// Stored problem tag line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemTagLine {
    pub id: i64,
    pub tag_id: i64,
    pub short_heavy_tag: ShortHeavyTag,
    pub style_number: String,
    pub item_description: String,
    pub color: String,
    pub size: Size,
    pub packing_slip_match: PackingSlipMatch,
    pub qty_short: Option<i64>,
    pub qty_heavy: Option<i64>,
}

/// Daily received-volume entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActual {
    pub id: i64,
    pub receiving_date: NaiveDate,
    pub orders_received: i64,
    pub estimated_units: i64,
    pub author_name: String,
    pub notes: String,
    pub date_entered: DateTime<Utc>,
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::invalid(format!(
                "Start date {} is after end date {}.",
                start, end
            )));
        }
        Ok(Self { start, end })
    }
}

/// Optional row filters shared by the Query API and the Aggregation Engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    pub team: Option<Team>,
    pub customer_id: Option<i64>,
    pub problem_type: Option<ProblemType>,
}

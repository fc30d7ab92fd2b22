use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::WellsecError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Canonical well identifier.
///
/// Every lookup goes through this type, so a well read as `1001`, `" 1001"`
/// or `1001.0` (spreadsheet float artifact) resolves to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WellId(String);

impl WellId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(stem) = trimmed.strip_suffix(".0") {
            if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
                return Self(stem.to_string());
            }
        }
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for WellId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for WellId {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reporting period encoded as `YYYYMM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Period(u32);

impl Period {
    pub fn new(yyyymm: u32) -> Result<Self, WellsecError> {
        let month = yyyymm % 100;
        if !(100_000..=999_999).contains(&yyyymm) || !(1..=12).contains(&month) {
            return Err(WellsecError::ConfigValidation(format!(
                "invalid period {yyyymm}: expected YYYYMM with month 01-12"
            )));
        }
        Ok(Self(yyyymm))
    }

    pub fn from_year_month(year: i32, month: u32) -> Result<Self, WellsecError> {
        if !(1000..=9999).contains(&year) {
            return Err(WellsecError::ConfigValidation(format!("invalid year {year}")));
        }
        Self::new(year as u32 * 100 + month)
    }

    /// Parse a period cell. Accepts `202409` and the float form `202409.0`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        digits.parse::<u32>().ok().and_then(|v| Self::new(v).ok())
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Four-digit year, used to version registries.
    pub fn year(&self) -> i32 {
        (self.0 / 100) as i32
    }

    pub fn month(&self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Assignment + classification tags
// ---------------------------------------------------------------------------

/// Organizational attribution of a well. Compared with exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitAssignment {
    pub field: String,
    pub unit: String,
}

impl UnitAssignment {
    pub fn new(field: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unit: unit.into(),
        }
    }

    /// Both parts present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.field.trim().is_empty() && !self.unit.trim().is_empty()
    }
}

/// Production type of a registered well.
///
/// Default policy: an empty or absent tag means `Conventional`. This is the
/// only place that policy lives; every filter goes through [`ProductionType::from_tag`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionType {
    #[default]
    Conventional,
    Shale,
}

impl ProductionType {
    /// Resolve a raw tag. `None` for a non-empty tag that names neither type.
    pub fn from_tag(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" | "常规" | "常规油" | "conventional" | "Conventional" => Some(Self::Conventional),
            "页岩油" | "shale" | "Shale" => Some(Self::Shale),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Conventional => "常规",
            Self::Shale => "页岩油",
        }
    }
}

impl fmt::Display for ProductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conventional => write!(f, "conventional"),
            Self::Shale => write!(f, "shale"),
        }
    }
}

/// How a well entered the registry for the current period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Continuing,
    OldAreaNewWell,
    ExpandedBoundary,
    PudToPdp,
    PudToPdnp,
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Continuing => "",
            Self::OldAreaNewWell => "老区新井",
            Self::ExpandedBoundary => "扩边",
            Self::PudToPdp => "PUD转PDP",
            Self::PudToPdnp => "PUD转PDNP",
        }
    }

    pub fn is_expansion(&self) -> bool {
        matches!(self, Self::ExpandedBoundary | Self::PudToPdp | Self::PudToPdnp)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuing => write!(f, "continuing"),
            Self::OldAreaNewWell => write!(f, "old_area_new_well"),
            Self::ExpandedBoundary => write!(f, "expanded_boundary"),
            Self::PudToPdp => write!(f, "pud_to_pdp"),
            Self::PudToPdnp => write!(f, "pud_to_pdnp"),
        }
    }
}

/// Manual classification carried by an overlay row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayClass {
    /// No tag yet.
    Unclassified,
    OldAreaNewWell,
    NonEvaluated,
    Expansion(SourceType),
    /// A tag we do not recognize, kept verbatim for error reporting.
    Other(String),
}

impl OverlayClass {
    pub fn from_tag(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::Unclassified,
            "老区新井" | "old_area_new_well" => Self::OldAreaNewWell,
            "不参评" | "non_evaluated" => Self::NonEvaluated,
            "扩边" | "扩边井" | "expanded_boundary" => Self::Expansion(SourceType::ExpandedBoundary),
            "PUD转PDP" | "pud_to_pdp" => Self::Expansion(SourceType::PudToPdp),
            "PUD转PDNP" | "pud_to_pdnp" => Self::Expansion(SourceType::PudToPdnp),
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Unclassified => "",
            Self::OldAreaNewWell => "老区新井",
            Self::NonEvaluated => "不参评",
            Self::Expansion(source) => source.label(),
            Self::Other(tag) => tag,
        }
    }
}

/// Descriptive columns carried alongside a well. Absent values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WellAttributes {
    pub category: String,
    pub well_type: String,
    pub reservoir_type: String,
    pub start_date: String,
    pub current_zone: String,
    pub closed_zone: String,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub well_id: WellId,
    pub assignment: UnitAssignment,
    pub period: Option<Period>,
    pub attributes: WellAttributes,
}

/// One period's well-to-unit table, at most one row per well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    rows: Vec<SnapshotRow>,
}

impl Snapshot {
    /// Build a snapshot, keeping the first row seen for each well.
    pub fn from_rows(rows: Vec<SnapshotRow>) -> Self {
        let mut seen = HashSet::new();
        let rows = rows
            .into_iter()
            .filter(|r| seen.insert(r.well_id.clone()))
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn well_ids(&self) -> BTreeSet<WellId> {
        self.rows.iter().map(|r| r.well_id.clone()).collect()
    }

    pub fn get(&self, well_id: &WellId) -> Option<&SnapshotRow> {
        self.rows.iter().find(|r| &r.well_id == well_id)
    }

    /// Rows whose well is in `ids`, in snapshot order.
    pub fn select(&self, ids: &BTreeSet<WellId>) -> Vec<SnapshotRow> {
        self.rows
            .iter()
            .filter(|r| ids.contains(&r.well_id))
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub well_id: WellId,
    /// Evaluation (SEC) attribution.
    pub assignment: UnitAssignment,
    /// Organizational attribution the well had when it was registered.
    pub org_assignment: UnitAssignment,
    pub participates: bool,
    pub production_type: ProductionType,
    pub source_type: SourceType,
    pub period: Option<Period>,
    pub attributes: WellAttributes,
}

/// Canonical registry for one period.
///
/// Never edited after it is produced: projection builds a new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    period: Option<Period>,
    entries: BTreeMap<WellId, RegistryEntry>,
}

impl Registry {
    /// Build from entries; a later entry for the same well replaces an earlier one.
    pub fn from_entries(period: Option<Period>, entries: Vec<RegistryEntry>) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            map.insert(entry.well_id.clone(), entry);
        }
        Self {
            period,
            entries: map,
        }
    }

    pub(crate) fn from_map(period: Option<Period>, entries: BTreeMap<WellId, RegistryEntry>) -> Self {
        Self { period, entries }
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn get(&self, well_id: &WellId) -> Option<&RegistryEntry> {
        self.entries.get(well_id)
    }

    pub fn contains(&self, well_id: &WellId) -> bool {
        self.entries.contains_key(well_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub(crate) fn entry_map(&self) -> &BTreeMap<WellId, RegistryEntry> {
        &self.entries
    }

    /// Wells of the given production type (untagged entries count as conventional).
    pub fn wells_of_type(&self, production_type: ProductionType) -> BTreeSet<WellId> {
        self.entries
            .values()
            .filter(|e| e.production_type == production_type)
            .map(|e| e.well_id.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// A manually classified well to merge into the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRow {
    pub well_id: WellId,
    /// Evaluation (SEC) attribution; falls back to `org_assignment` when the
    /// table has no SEC columns.
    pub assignment: UnitAssignment,
    pub org_assignment: UnitAssignment,
    pub class: OverlayClass,
    pub production_type: ProductionType,
    pub attributes: WellAttributes,
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReassignmentRecord {
    pub well_id: WellId,
    pub prior: UnitAssignment,
    pub current: UnitAssignment,
    pub field_changed: bool,
    pub unit_changed: bool,
    /// `"<prior>-,<current>+"` when the field changed, empty otherwise.
    pub field_change: String,
    /// `"<prior>-,<current>+"` when the unit changed, empty otherwise.
    pub unit_change: String,
    pub start_date: String,
    pub reservoir_type: String,
}

impl ReassignmentRecord {
    /// Display string for every changed dimension, field first.
    pub fn description(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.field_change);
        out.push_str(&self.unit_change);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub cancelled: BTreeSet<WellId>,
    pub added: BTreeSet<WellId>,
    pub reassigned: Vec<ReassignmentRecord>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty() && self.added.is_empty() && self.reassigned.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Participation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeRecord {
    pub well_id: WellId,
    pub period: Period,
    pub participates: bool,
    pub base_assignment: UnitAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_assignment: Option<UnitAssignment>,
}

/// Wells per (org unit, registry unit) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrosswalkRow {
    pub org: UnitAssignment,
    pub registry: UnitAssignment,
    pub well_count: usize,
}

// ---------------------------------------------------------------------------
// Measures + evaluation
// ---------------------------------------------------------------------------

/// Production volume as fixed-point thousandths of its unit (t or m3).
///
/// Parsed from the decimal text of the cell and summed as integers, so
/// `0.1 + 0.2` is `0.3` in every output table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Volume(i64);

impl Volume {
    pub const ZERO: Self = Self(0);
    const SCALE: i64 = 1000;
    const DECIMALS: usize = 3;

    pub fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    pub fn milli(&self) -> i64 {
        self.0
    }

    /// Parse a non-negative decimal such as `12`, `0.25` or `.5`.
    ///
    /// Digits past the third decimal are accepted only when they are zeros
    /// (`1.2500`); anything finer, signs and exponents are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits(whole) || !digits(frac) {
            return None;
        }

        let (kept, rest) = frac.split_at(frac.len().min(Self::DECIMALS));
        if rest.bytes().any(|b| b != b'0') {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut milli: i64 = if kept.is_empty() { 0 } else { kept.parse().ok()? };
        for _ in kept.len()..Self::DECIMALS {
            milli *= 10;
        }
        whole.checked_mul(Self::SCALE)?.checked_add(milli).map(Self)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let milli = self.0.unsigned_abs();
        let whole = milli / Self::SCALE as u64;
        let frac = milli % Self::SCALE as u64;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:03}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl std::ops::Add for Volume {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Volume {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Volume {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + v)
    }
}

/// JSON reports carry volumes as plain numbers.
impl Serialize for Volume {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / Self::SCALE as f64)
    }
}

/// One raw monthly production row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureRow {
    pub well_id: WellId,
    pub period: Period,
    pub oil: Volume,
    pub liquid: Volume,
    pub water: Volume,
    pub gas: Volume,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub evaluation_field: String,
    pub evaluation_unit: String,
    pub year: i32,
    pub month: u32,
    pub oil: Volume,
    pub liquid: Volume,
    pub active_well_count: u32,
}

/// Aggregation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupMode {
    /// Group by the registry's evaluation unit.
    Conventional,
    /// Each well is its own evaluation unit.
    Shale,
}

impl RollupMode {
    pub fn production_type(&self) -> ProductionType {
        match self {
            Self::Conventional => ProductionType::Conventional,
            Self::Shale => ProductionType::Shale,
        }
    }
}

impl fmt::Display for RollupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.production_type())
    }
}

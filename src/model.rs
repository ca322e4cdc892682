use crate::calendar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Erreur de lecture d'un jeton textuel (type de garde, type de règle…).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {what}: {value:?}")]
pub struct ParseTokenError {
    pub what: &'static str,
    pub value: String,
}

impl ParseTokenError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_owned(),
        }
    }
}

/// Identifiant fort pour un membre du personnel (clé du registre externe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(i64);

impl StaffId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StaffId {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ParseTokenError::new("staff id", s))
    }
}

/// Membre du personnel tel que fourni par le registre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub full_name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Staff {
    pub fn new<N: Into<String>>(id: i64, full_name: N) -> Self {
        Self {
            id: StaffId::new(id),
            full_name: full_name.into(),
            active: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Type de garde. L'ordre de déclaration est l'ordre de remplissage d'une journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftType {
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "NIGHT")]
    Night,
    #[serde(rename = "D24")]
    D24,
}

impl ShiftType {
    pub const ALL: [ShiftType; 3] = [ShiftType::Day, ShiftType::Night, ShiftType::D24];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftType::Day => "DAY",
            ShiftType::Night => "NIGHT",
            ShiftType::D24 => "D24",
        }
    }

    /// Types de garde autorisés pour un type de jour donné.
    pub fn for_day(kind: DayKind) -> &'static [ShiftType] {
        match kind {
            DayKind::Weekday => &[ShiftType::Day, ShiftType::Night],
            DayKind::Weekend => &[ShiftType::D24],
        }
    }

    pub fn allowed_on(self, kind: DayKind) -> bool {
        Self::for_day(kind).contains(&self)
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftType {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" => Ok(ShiftType::Day),
            "NIGHT" => Ok(ShiftType::Night),
            "D24" => Ok(ShiftType::D24),
            _ => Err(ParseTokenError::new("shift type", s)),
        }
    }
}

/// Semaine ou week-end (les jours fériés restent des jours de semaine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Weekday,
    Weekend,
}

/// Portée d'une règle de transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyDay {
    #[default]
    Any,
    Weekday,
    Weekend,
}

impl ApplyDay {
    pub fn matches(self, kind: DayKind) -> bool {
        match self {
            ApplyDay::Any => true,
            ApplyDay::Weekday => kind == DayKind::Weekday,
            ApplyDay::Weekend => kind == DayKind::Weekend,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplyDay::Any => "ANY",
            ApplyDay::Weekday => "WEEKDAY",
            ApplyDay::Weekend => "WEEKEND",
        }
    }
}

impl FromStr for ApplyDay {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ANY" | "" => Ok(ApplyDay::Any),
            "WEEKDAY" => Ok(ApplyDay::Weekday),
            "WEEKEND" => Ok(ApplyDay::Weekend),
            _ => Err(ParseTokenError::new("apply day", s)),
        }
    }
}

/// Motif d'un blocage dur. Sert aussi d'état « veille » pour les règles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    Rapor,
    YillikIzin,
    OnayliIstekHard,
}

impl BlockReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockReason::Rapor => "rapor",
            BlockReason::YillikIzin => "yillik_izin",
            BlockReason::OnayliIstekHard => "onayli_istek_hard",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// État effectif d'une personne sur une journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    Off,
    Worked(ShiftType),
    Blocked(BlockReason),
}

impl fmt::Display for DayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayState::Off => f.write_str("none"),
            DayState::Worked(shift) => write!(f, "{shift}"),
            DayState::Blocked(reason) => write!(f, "{reason}"),
        }
    }
}

/// Côté « veille » d'une règle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrevKind {
    Day,
    Night,
    D24,
    Rapor,
    YillikIzin,
    Any,
}

impl PrevKind {
    /// `Any` correspond à tout état, y compris une veille libre.
    pub fn matches(self, state: DayState) -> bool {
        match (self, state) {
            (PrevKind::Any, _) => true,
            (PrevKind::Day, DayState::Worked(ShiftType::Day)) => true,
            (PrevKind::Night, DayState::Worked(ShiftType::Night)) => true,
            (PrevKind::D24, DayState::Worked(ShiftType::D24)) => true,
            (PrevKind::Rapor, DayState::Blocked(BlockReason::Rapor)) => true,
            (PrevKind::YillikIzin, DayState::Blocked(BlockReason::YillikIzin)) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrevKind::Day => "DAY",
            PrevKind::Night => "NIGHT",
            PrevKind::D24 => "D24",
            PrevKind::Rapor => "RAPOR",
            PrevKind::YillikIzin => "YILLIK_IZIN",
            PrevKind::Any => "ANY",
        }
    }
}

impl FromStr for PrevKind {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" => Ok(PrevKind::Day),
            "NIGHT" => Ok(PrevKind::Night),
            "D24" => Ok(PrevKind::D24),
            "RAPOR" => Ok(PrevKind::Rapor),
            "YILLIK_IZIN" => Ok(PrevKind::YillikIzin),
            "ANY" => Ok(PrevKind::Any),
            _ => Err(ParseTokenError::new("previous type", s)),
        }
    }
}

/// Côté « lendemain » d'une règle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextKind {
    Day,
    Night,
    D24,
    Any,
}

impl NextKind {
    pub fn matches(self, shift: ShiftType) -> bool {
        match self {
            NextKind::Any => true,
            NextKind::Day => shift == ShiftType::Day,
            NextKind::Night => shift == ShiftType::Night,
            NextKind::D24 => shift == ShiftType::D24,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NextKind::Day => "DAY",
            NextKind::Night => "NIGHT",
            NextKind::D24 => "D24",
            NextKind::Any => "ANY",
        }
    }
}

impl FromStr for NextKind {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" => Ok(NextKind::Day),
            "NIGHT" => Ok(NextKind::Night),
            "D24" => Ok(NextKind::D24),
            "ANY" => Ok(NextKind::Any),
            _ => Err(ParseTokenError::new("next type", s)),
        }
    }
}

/// Transition interdite (état de la veille → garde du jour), pour une même personne.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub prev_type: PrevKind,
    pub next_type: NextKind,
    #[serde(default)]
    pub apply_day: ApplyDay,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl TransitionRule {
    pub fn new(prev_type: PrevKind, next_type: NextKind, apply_day: ApplyDay) -> Self {
        Self {
            prev_type,
            next_type,
            apply_day,
            active: true,
            note: String::new(),
        }
    }

    pub fn with_note<N: Into<String>>(mut self, note: N) -> Self {
        self.note = note.into();
        self
    }

    /// Vrai si la règle interdit `next` le jour `date` après l'état `prev` de la veille.
    pub fn forbids(&self, prev: DayState, next: ShiftType, date: NaiveDate) -> bool {
        self.active
            && self.apply_day.matches(calendar::day_kind(date))
            && self.next_type.matches(next)
            && self.prev_type.matches(prev)
    }

    /// Rejette les règles qui bloquent tout ou qui ne peuvent jamais s'appliquer.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.prev_type == PrevKind::Any
            && self.next_type == NextKind::Any
            && self.apply_day == ApplyDay::Any
        {
            return Err("ANY -> ANY on every day forbids every assignment");
        }
        match (self.next_type, self.apply_day) {
            (NextKind::Day | NextKind::Night, ApplyDay::Weekend) => {
                Err("DAY/NIGHT shifts never occur on weekends")
            }
            (NextKind::D24, ApplyDay::Weekday) => Err("D24 shifts never occur on weekdays"),
            _ => Ok(()),
        }
    }

    /// Clé d'identité (sans l'état actif ni la note).
    pub fn key(&self) -> (PrevKind, NextKind, ApplyDay) {
        (self.prev_type, self.next_type, self.apply_day)
    }
}

impl fmt::Display for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.prev_type.as_str(),
            self.next_type.as_str(),
            self.apply_day.as_str()
        )
    }
}

/// Type d'absence déclarée (rapport médical / congé annuel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveKind {
    Rapor,
    YillikIzin,
}

impl From<LeaveKind> for BlockReason {
    fn from(kind: LeaveKind) -> Self {
        match kind {
            LeaveKind::Rapor => BlockReason::Rapor,
            LeaveKind::YillikIzin => BlockReason::YillikIzin,
        }
    }
}

impl FromStr for LeaveKind {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rapor" => Ok(LeaveKind::Rapor),
            "yillik_izin" => Ok(LeaveKind::YillikIzin),
            _ => Err(ParseTokenError::new("leave kind", s)),
        }
    }
}

/// Jour non travaillable (une ligne par jour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub kind: LeaveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LeaveRecord {
    pub fn new(staff_id: StaffId, date: NaiveDate, kind: LeaveKind) -> Self {
        Self {
            staff_id,
            date,
            kind,
            note: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestKind {
    Hard,
    Soft,
}

impl FromStr for RequestKind {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HARD" => Ok(RequestKind::Hard),
            "SOFT" => Ok(RequestKind::Soft),
            _ => Err(ParseTokenError::new("request kind", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl FromStr for RequestStatus {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(ParseTokenError::new("request status", s)),
        }
    }
}

/// Demande d'un membre du personnel (jour à laisser libre).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRequest {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub kind: RequestKind,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StaffRequest {
    /// Demande déjà approuvée (le cas usuel côté moteur).
    pub fn approved(staff_id: StaffId, date: NaiveDate, kind: RequestKind) -> Self {
        Self {
            staff_id,
            date,
            kind,
            status: RequestStatus::Approved,
            note: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == RequestStatus::Approved
    }
}

/// Besoin en personnel pour un (jour, type de garde).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequiredSlot {
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub headcount: u32,
}

/// Unité de sortie : une personne sur une garde un jour donné.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub staff_id: StaffId,
}

impl Assignment {
    pub fn new(date: NaiveDate, shift: ShiftType, staff_id: StaffId) -> Self {
        Self {
            date,
            shift,
            staff_id,
        }
    }
}

use crate::model::{ApplyDay, NextKind, PrevKind, ShiftType, TransitionRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("headcount {0} must be > 0")]
    ZeroHeadcount(&'static str),
    #[error("duration of {shift} shifts must be within 1..=24h (got {hours})")]
    ShiftHoursOutOfRange { shift: ShiftType, hours: u32 },
    #[error("weekday_credit_hours must be within 1..=24 (got {0})")]
    CreditHoursOutOfRange(u32),
    #[error("max_balance_passes must be > 0")]
    ZeroBalancePasses,
    #[error("malformed rule #{index} ({rule}): {reason}")]
    MalformedRule {
        index: usize,
        rule: String,
        reason: &'static str,
    },
}

/// Une garde ne dépasse jamais une journée.
pub const MAX_SHIFT_HOURS: u32 = 24;

/// Effectifs requis par garde (politique injectable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headcounts {
    pub weekday_day: u32,
    pub weekday_night: u32,
    pub weekend_d24: u32,
}

impl Default for Headcounts {
    fn default() -> Self {
        Self {
            weekday_day: 12,
            weekday_night: 12,
            weekend_d24: 12,
        }
    }
}

impl Headcounts {
    pub fn for_shift(&self, shift: ShiftType) -> u32 {
        match shift {
            ShiftType::Day => self.weekday_day,
            ShiftType::Night => self.weekday_night,
            ShiftType::D24 => self.weekend_d24,
        }
    }

    /// Effectif total d'un jour de semaine (DAY + NIGHT).
    pub fn weekday_total(&self) -> u32 {
        self.weekday_day + self.weekday_night
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.weekday_day == 0 {
            return Err(PolicyError::ZeroHeadcount("weekday_day"));
        }
        if self.weekday_night == 0 {
            return Err(PolicyError::ZeroHeadcount("weekday_night"));
        }
        if self.weekend_d24 == 0 {
            return Err(PolicyError::ZeroHeadcount("weekend_d24"));
        }
        Ok(())
    }
}

/// Durée de chaque type de garde, en heures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftHours {
    pub day: u32,
    pub night: u32,
    pub d24: u32,
}

impl Default for ShiftHours {
    fn default() -> Self {
        Self {
            day: 8,
            night: 16,
            d24: 24,
        }
    }
}

impl ShiftHours {
    pub fn of(&self, shift: ShiftType) -> u32 {
        match shift {
            ShiftType::Day => self.day,
            ShiftType::Night => self.night,
            ShiftType::D24 => self.d24,
        }
    }

    fn validate(&self) -> Result<(), PolicyError> {
        for shift in ShiftType::ALL {
            let hours = self.of(shift);
            if !(1..=MAX_SHIFT_HOURS).contains(&hours) {
                return Err(PolicyError::ShiftHoursOutOfRange { shift, hours });
            }
        }
        Ok(())
    }
}

/// Politique de planification : tout ce qui est configurable pour un service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub headcounts: Headcounts,
    #[serde(default)]
    pub shift_hours: ShiftHours,
    /// Heures créditées par jour de semaine ouvré (base du minimum mensuel).
    #[serde(default = "default_credit_hours")]
    pub weekday_credit_hours: u32,
    #[serde(default = "default_balance_passes")]
    pub max_balance_passes: u32,
    #[serde(default)]
    pub rules: Vec<TransitionRule>,
}

fn default_credit_hours() -> u32 {
    8
}

fn default_balance_passes() -> u32 {
    50
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            headcounts: Headcounts::default(),
            shift_hours: ShiftHours::default(),
            weekday_credit_hours: default_credit_hours(),
            max_balance_passes: default_balance_passes(),
            rules: Vec::new(),
        }
    }
}

impl Policy {
    pub fn from_preset(preset: RulePreset) -> Self {
        Self {
            name: preset.as_str().to_string(),
            rules: preset.rules(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        self.headcounts.validate()?;
        self.shift_hours.validate()?;
        if !(1..=MAX_SHIFT_HOURS).contains(&self.weekday_credit_hours) {
            return Err(PolicyError::CreditHoursOutOfRange(self.weekday_credit_hours));
        }
        if self.max_balance_passes == 0 {
            return Err(PolicyError::ZeroBalancePasses);
        }
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|reason| PolicyError::MalformedRule {
                    index,
                    rule: rule.to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &TransitionRule> {
        self.rules.iter().filter(|r| r.active)
    }
}

pub fn load_policy_from_file<P: AsRef<Path>>(path: P) -> Result<Policy> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading policy {}", path.display()))?;
    let policy: Policy = serde_json::from_slice(&data)
        .with_context(|| format!("parsing policy {}", path.display()))?;
    policy.validate()?;
    Ok(policy)
}

pub fn export_policy_json<P: AsRef<Path>>(path: P, policy: &Policy) -> Result<()> {
    policy.validate()?;
    let json = serde_json::to_string_pretty(policy)?;
    fs::write(path, json)?;
    Ok(())
}

/// Jeux de règles prêts à l'emploi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulePreset {
    Default,
    Strict,
    Flexible,
}

impl RulePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            RulePreset::Default => "default",
            RulePreset::Strict => "strict",
            RulePreset::Flexible => "flexible",
        }
    }

    pub fn rules(self) -> Vec<TransitionRule> {
        let every = ApplyDay::Any;
        let night_day = TransitionRule::new(PrevKind::Night, NextKind::Day, every)
            .with_note("no day shift right after a night shift");
        let rapor = TransitionRule::new(PrevKind::Rapor, NextKind::Any, every)
            .with_note("no work the day after a medical report");
        let izin = TransitionRule::new(PrevKind::YillikIzin, NextKind::Any, every)
            .with_note("no work the day after annual leave");
        let d24_any = TransitionRule::new(PrevKind::D24, NextKind::Any, every)
            .with_note("no work the day after a 24h shift");

        match self {
            RulePreset::Default => vec![night_day, d24_any, rapor, izin],
            RulePreset::Strict => vec![
                night_day,
                d24_any,
                TransitionRule::new(PrevKind::Night, NextKind::Night, every)
                    .with_note("no back-to-back nights"),
                TransitionRule::new(PrevKind::Day, NextKind::Night, every)
                    .with_note("no night shift right after a day shift"),
                rapor,
                izin,
            ],
            RulePreset::Flexible => vec![
                night_day,
                TransitionRule::new(PrevKind::D24, NextKind::Day, every)
                    .with_note("no day shift the day after a 24h shift"),
                rapor,
                izin,
            ],
        }
    }
}

impl fmt::Display for RulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RulePreset {
    type Err = crate::model::ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(RulePreset::Default),
            "strict" => Ok(RulePreset::Strict),
            "flexible" => Ok(RulePreset::Flexible),
            _ => Err(crate::model::ParseTokenError {
                what: "rule preset",
                value: s.to_owned(),
            }),
        }
    }
}

/// Fusionne un preset dans une liste de règles existante.
///
/// Les règles absentes sont ajoutées, les règles inactives du preset sont
/// réactivées ; avec `deactivate_others`, les règles actives hors preset sont
/// désactivées. Retourne le nombre de règles touchées.
pub fn apply_preset(
    rules: &mut Vec<TransitionRule>,
    preset: RulePreset,
    deactivate_others: bool,
) -> usize {
    let wanted = preset.rules();
    let preset_keys: HashSet<_> = wanted.iter().map(TransitionRule::key).collect();
    let mut touched = 0usize;

    for rule in wanted {
        match rules.iter_mut().find(|r| r.key() == rule.key()) {
            Some(existing) => {
                if !existing.active {
                    existing.active = true;
                    touched += 1;
                }
            }
            None => {
                rules.push(rule);
                touched += 1;
            }
        }
    }

    if deactivate_others {
        for rule in rules.iter_mut() {
            if rule.active && !preset_keys.contains(&rule.key()) {
                rule.active = false;
                touched += 1;
            }
        }
    }

    touched
}

//! Lease status conditions
//!
//! Standard condition fields plus set/get helpers. `last_transition_time`
//! advances only when the observable state of the condition (status, reason,
//! severity, message) actually changes; the list is kept sorted by type name
//! so consumers diff it cheaply.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const REASON_LEASE_DELAYED: &str = "LeaseDelayed";
pub const REASON_LEASE_PARTIAL: &str = "LeasePartial";
pub const REASON_NO_AVAILABLE_POOL: &str = "NoAvailablePool";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    /// Only meaningful when status is False.
    #[serde(default, skip_serializing_if = "ConditionSeverity::is_none")]
    pub severity: ConditionSeverity,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionType {
    Delayed,
    Fulfilled,
    Partial,
    Pending,
}

impl ConditionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Delayed => "Delayed",
            ConditionType::Fulfilled => "Fulfilled",
            ConditionType::Partial => "Partial",
            ConditionType::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
    #[default]
    #[serde(rename = "")]
    None,
}

impl ConditionSeverity {
    pub fn is_none(&self) -> bool {
        *self == ConditionSeverity::None
    }
}

impl Condition {
    pub fn true_condition(condition_type: ConditionType) -> Condition {
        Condition {
            condition_type,
            status: ConditionStatus::True,
            severity: ConditionSeverity::None,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
        }
    }

    pub fn false_condition(condition_type: ConditionType) -> Condition {
        Condition {
            condition_type,
            status: ConditionStatus::False,
            severity: ConditionSeverity::None,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
        }
    }

    pub fn false_with_reason(
        condition_type: ConditionType,
        reason: &str,
        severity: ConditionSeverity,
        message: impl Into<String>,
    ) -> Condition {
        Condition {
            condition_type,
            status: ConditionStatus::False,
            severity,
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    pub fn true_with_reason(
        condition_type: ConditionType,
        reason: &str,
        message: impl Into<String>,
    ) -> Condition {
        Condition {
            condition_type,
            status: ConditionStatus::True,
            severity: ConditionSeverity::None,
            reason: reason.to_string(),
            message: message.into(),
            last_transition_time: None,
        }
    }

    /// State comparison excluding the transition timestamp.
    pub fn has_same_state(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.severity == other.severity
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Sets `condition`, preserving the existing transition time when the state
/// is unchanged, and re-sorts the list by type name.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition, now: Time) {
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        Some(existing) => {
            if existing.has_same_state(&condition) {
                condition.last_transition_time = existing.last_transition_time.clone();
            } else {
                condition.last_transition_time = Some(now);
            }
            *existing = condition;
        }
        None => {
            if condition.last_transition_time.is_none() {
                condition.last_transition_time = Some(now);
            }
            conditions.push(condition);
        }
    }
    conditions.sort_by(|a, b| a.condition_type.as_str().cmp(b.condition_type.as_str()));
}

pub fn get_condition(conditions: &[Condition], condition_type: ConditionType) -> Option<&Condition> {
    conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Time {
        Time(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn transition_time_set_on_first_write() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::true_condition(ConditionType::Pending),
            at(100),
        );
        assert_eq!(conditions[0].last_transition_time, Some(at(100)));
    }

    #[test]
    fn transition_time_preserved_when_state_unchanged() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::true_condition(ConditionType::Pending),
            at(100),
        );
        set_condition(
            &mut conditions,
            Condition::true_condition(ConditionType::Pending),
            at(200),
        );
        assert_eq!(conditions[0].last_transition_time, Some(at(100)));
    }

    #[test]
    fn transition_time_advances_on_state_change() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::true_condition(ConditionType::Fulfilled),
            at(100),
        );
        set_condition(
            &mut conditions,
            Condition::false_with_reason(
                ConditionType::Fulfilled,
                REASON_NO_AVAILABLE_POOL,
                ConditionSeverity::Warning,
                "no pool fits",
            ),
            at(200),
        );
        assert_eq!(conditions[0].last_transition_time, Some(at(200)));
    }

    #[test]
    fn message_change_alone_advances_transition_time() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::true_with_reason(ConditionType::Partial, REASON_LEASE_PARTIAL, "1 of 2"),
            at(100),
        );
        set_condition(
            &mut conditions,
            Condition::true_with_reason(ConditionType::Partial, REASON_LEASE_PARTIAL, "2 of 2"),
            at(200),
        );
        assert_eq!(conditions[0].last_transition_time, Some(at(200)));
    }

    #[test]
    fn conditions_sorted_by_type_name() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            Condition::true_condition(ConditionType::Pending),
            at(1),
        );
        set_condition(
            &mut conditions,
            Condition::false_condition(ConditionType::Delayed),
            at(1),
        );
        set_condition(
            &mut conditions,
            Condition::false_condition(ConditionType::Fulfilled),
            at(1),
        );
        set_condition(
            &mut conditions,
            Condition::false_condition(ConditionType::Partial),
            at(1),
        );
        let order: Vec<&str> = conditions.iter().map(|c| c.condition_type.as_str()).collect();
        assert_eq!(order, vec!["Delayed", "Fulfilled", "Partial", "Pending"]);
    }
}

//! Actions: the commands callers submit between ticks.
//!
//! [`Action`] is a closed enum; the resolver matches on it exhaustively.
//! Untyped input (from a network or script front-end) arrives as an
//! [`ActionRequest`] and is turned into an [`Action`] by the syntactic
//! admission check in [`Action::from_request`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::Jobs;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single command against the castle economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Replace the whole job allocation. Must sum to the workforce.
    AssignJobs(Jobs),
    Hire { count: u32 },
    Fire { count: u32 },
    BuyFood { amount: u32 },
    StartUpgrade,
}

/// Discriminant tag for actions, used in logs and rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AssignJobs,
    Hire,
    Fire,
    BuyFood,
    StartUpgrade,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::AssignJobs,
        ActionKind::Hire,
        ActionKind::Fire,
        ActionKind::BuyFood,
        ActionKind::StartUpgrade,
    ];

    /// Wire name, as used in [`ActionRequest::kind`].
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::AssignJobs => "assign_jobs",
            ActionKind::Hire => "hire",
            ActionKind::Fire => "fire",
            ActionKind::BuyFood => "buy_food",
            ActionKind::StartUpgrade => "start_upgrade",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Apply-phase priority class. Lower runs first: workforce changes,
    /// then job assignment, then the upgrade, then food purchases.
    pub fn priority(self) -> u8 {
        match self {
            ActionKind::Hire | ActionKind::Fire => 1,
            ActionKind::AssignJobs => 2,
            ActionKind::StartUpgrade => 3,
            ActionKind::BuyFood => 4,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AssignJobs(_) => ActionKind::AssignJobs,
            Action::Hire { .. } => ActionKind::Hire,
            Action::Fire { .. } => ActionKind::Fire,
            Action::BuyFood { .. } => ActionKind::BuyFood,
            Action::StartUpgrade => ActionKind::StartUpgrade,
        }
    }

    /// Parameters as a JSON object, in the same shape [`Action::from_request`]
    /// accepts.
    pub fn params(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Action::AssignJobs(jobs) => {
                map.insert("miners".into(), jobs.miners.into());
                map.insert("farmers".into(), jobs.farmers.into());
                map.insert("lumberjacks".into(), jobs.lumberjacks.into());
                map.insert("builders".into(), jobs.builders.into());
            }
            Action::Hire { count } | Action::Fire { count } => {
                map.insert("count".into(), (*count).into());
            }
            Action::BuyFood { amount } => {
                map.insert("amount".into(), (*amount).into());
            }
            Action::StartUpgrade => {}
        }
        map
    }

    /// Syntactic admission check. Independent of any engine state.
    pub fn from_request(request: &ActionRequest) -> Result<Self, AdmissionError> {
        let kind = ActionKind::from_name(&request.kind)
            .ok_or_else(|| AdmissionError::UnknownKind(request.kind.clone()))?;
        let p = &request.params;
        let action = match kind {
            ActionKind::AssignJobs => Action::AssignJobs(Jobs {
                miners: count_param(kind, p, "miners")?,
                farmers: count_param(kind, p, "farmers")?,
                lumberjacks: count_param(kind, p, "lumberjacks")?,
                builders: count_param(kind, p, "builders")?,
            }),
            ActionKind::Hire => Action::Hire {
                count: count_param(kind, p, "count")?,
            },
            ActionKind::Fire => Action::Fire {
                count: count_param(kind, p, "count")?,
            },
            ActionKind::BuyFood => Action::BuyFood {
                amount: count_param(kind, p, "amount")?,
            },
            ActionKind::StartUpgrade => Action::StartUpgrade,
        };
        Ok(action)
    }
}

fn count_param(
    kind: ActionKind,
    params: &Map<String, Value>,
    name: &'static str,
) -> Result<u32, AdmissionError> {
    let value = params
        .get(name)
        .ok_or(AdmissionError::MissingParam { kind, param: name })?;
    let Value::Number(n) = value else {
        return Err(AdmissionError::NotAnInteger {
            kind,
            param: name,
            value: value.to_string(),
        });
    };
    if let Some(v) = n.as_u64() {
        return u32::try_from(v).map_err(|_| AdmissionError::OutOfRange {
            kind,
            param: name,
            value: v,
        });
    }
    if let Some(v) = n.as_i64() {
        return Err(AdmissionError::Negative {
            kind,
            param: name,
            value: v,
        });
    }
    // Floats. A whole-valued float like 3.0 is still not an integer on the wire.
    Err(AdmissionError::NotAnInteger {
        kind,
        param: name,
        value: n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Provenance and queued actions
// ---------------------------------------------------------------------------

/// Submitter metadata. Carried through to logs, never read by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub submitter_id: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// An admitted action waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action: Action,
    #[serde(default)]
    pub provenance: Provenance,
}

impl QueuedAction {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            provenance: Provenance::default(),
        }
    }

    pub fn with_submitter(mut self, submitter_id: impl Into<String>) -> Self {
        self.provenance.submitter_id = Some(submitter_id.into());
        self
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.provenance.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

impl From<Action> for QueuedAction {
    fn from(action: Action) -> Self {
        Self::new(action)
    }
}

/// Untyped action as received from an external front-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Run the admission check and attach provenance.
    pub fn into_queued(self) -> Result<QueuedAction, AdmissionError> {
        let action = Action::from_request(&self)?;
        Ok(QueuedAction {
            action,
            provenance: Provenance {
                submitter_id: self.submitter_id,
                correlation_id: self.correlation_id,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed input, reported synchronously by `enqueue`. The action is never
/// queued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("unknown action kind '{0}'")]
    UnknownKind(String),
    #[error("{kind}: missing parameter '{param}'")]
    MissingParam {
        kind: ActionKind,
        param: &'static str,
    },
    #[error("{kind}: parameter '{param}' must be a non-negative integer, got {value}")]
    Negative {
        kind: ActionKind,
        param: &'static str,
        value: i64,
    },
    #[error("{kind}: parameter '{param}' must be an integer, got {value}")]
    NotAnInteger {
        kind: ActionKind,
        param: &'static str,
        value: String,
    },
    #[error("{kind}: parameter '{param}' is too large ({value})")]
    OutOfRange {
        kind: ActionKind,
        param: &'static str,
        value: u64,
    },
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(kind: &str, params: Value) -> ActionRequest {
        ActionRequest {
            kind: kind.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
            ..ActionRequest::default()
        }
    }

    #[test]
    fn parses_every_kind() {
        let cases = [
            (
                request(
                    "assign_jobs",
                    json!({"miners": 1, "farmers": 2, "lumberjacks": 3, "builders": 4}),
                ),
                Action::AssignJobs(Jobs::new(1, 2, 3, 4)),
            ),
            (request("hire", json!({"count": 2})), Action::Hire { count: 2 }),
            (request("fire", json!({"count": 1})), Action::Fire { count: 1 }),
            (request("buy_food", json!({"amount": 7})), Action::BuyFood { amount: 7 }),
            (request("start_upgrade", json!({})), Action::StartUpgrade),
        ];
        for (req, expected) in cases {
            assert_eq!(Action::from_request(&req).unwrap(), expected);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Action::from_request(&request("demolish", json!({}))).unwrap_err();
        assert_eq!(err, AdmissionError::UnknownKind("demolish".into()));
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = Action::from_request(&request("hire", json!({"count": -1}))).unwrap_err();
        assert!(matches!(err, AdmissionError::Negative { value: -1, .. }));
    }

    #[test]
    fn fractional_count_is_rejected() {
        let err = Action::from_request(&request("buy_food", json!({"amount": 1.5}))).unwrap_err();
        assert!(matches!(err, AdmissionError::NotAnInteger { .. }));
    }

    #[test]
    fn string_count_is_rejected() {
        let err = Action::from_request(&request("fire", json!({"count": "2"}))).unwrap_err();
        assert!(matches!(err, AdmissionError::NotAnInteger { .. }));
    }

    #[test]
    fn assign_jobs_requires_all_four_counts() {
        let err = Action::from_request(&request(
            "assign_jobs",
            json!({"miners": 1, "farmers": 2, "lumberjacks": 3}),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            AdmissionError::MissingParam {
                kind: ActionKind::AssignJobs,
                param: "builders"
            }
        );
    }

    #[test]
    fn assign_jobs_has_no_upper_bound_at_admission() {
        let action = Action::from_request(&request(
            "assign_jobs",
            json!({"miners": 1000, "farmers": 0, "lumberjacks": 0, "builders": 0}),
        ))
        .unwrap();
        assert_eq!(action, Action::AssignJobs(Jobs::new(1000, 0, 0, 0)));
    }

    #[test]
    fn oversized_count_is_rejected() {
        let err =
            Action::from_request(&request("hire", json!({"count": 1u64 << 40}))).unwrap_err();
        assert!(matches!(err, AdmissionError::OutOfRange { .. }));
    }

    #[test]
    fn zero_is_admitted() {
        let action = Action::from_request(&request("hire", json!({"count": 0}))).unwrap();
        assert_eq!(action, Action::Hire { count: 0 });
    }

    #[test]
    fn params_parse_back_to_the_same_action() {
        let action = Action::AssignJobs(Jobs::new(4, 3, 2, 1));
        let req = ActionRequest {
            kind: action.kind().as_str().to_string(),
            params: action.params(),
            ..ActionRequest::default()
        };
        assert_eq!(Action::from_request(&req).unwrap(), action);
    }

    #[test]
    fn priority_orders_workforce_first() {
        assert!(ActionKind::Hire.priority() < ActionKind::AssignJobs.priority());
        assert_eq!(ActionKind::Hire.priority(), ActionKind::Fire.priority());
        assert!(ActionKind::AssignJobs.priority() < ActionKind::StartUpgrade.priority());
        assert!(ActionKind::StartUpgrade.priority() < ActionKind::BuyFood.priority());
    }

    #[test]
    fn into_queued_carries_provenance() {
        let mut req = request("hire", json!({"count": 1}));
        req.submitter_id = Some("agent-7".into());
        req.correlation_id = Some("c-1".into());
        let queued = req.into_queued().unwrap();
        assert_eq!(queued.provenance.submitter_id.as_deref(), Some("agent-7"));
        assert_eq!(queued.provenance.correlation_id.as_deref(), Some("c-1"));
    }
}

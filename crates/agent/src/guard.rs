use std::collections::HashMap;

use serde_json::Value;

/// Hard ceiling on tool executions in one turn.
pub const MAX_CALLS_PER_TURN: usize = 2;
/// Hard ceiling on executions of any single tool in one turn.
pub const MAX_CALLS_PER_TOOL: usize = 2;

/// Why a requested tool call was not executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Execute,
    SkipTurnBudgetExhausted,
    SkipDuplicateArguments,
    SkipToolBudgetExhausted,
}

impl GuardVerdict {
    pub fn is_execute(&self) -> bool {
        matches!(self, Self::Execute)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::SkipTurnBudgetExhausted => "turn_budget_exhausted",
            Self::SkipDuplicateArguments => "duplicate_arguments",
            Self::SkipToolBudgetExhausted => "tool_budget_exhausted",
        }
    }
}

#[derive(Debug)]
struct ToolUsage {
    count: usize,
    last_fingerprint: String,
}

/// Per-turn tracker bounding a misbehaving model's tool usage.
///
/// Scoped to one inbound message: construct fresh for every turn, never
/// share across turns or threads. Rules are checked strictly in order
/// (turn budget, duplicate arguments, per-tool budget) and a skip is final,
/// not a retry signal.
#[derive(Debug, Default)]
pub struct LoopGuard {
    executed_total: usize,
    usage: HashMap<String, ToolUsage>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a requested call may execute, recording it when
    /// admitted. The fingerprint is the serialized argument object, so two
    /// calls agree exactly when their arguments agree.
    pub fn admit(&mut self, tool_name: &str, arguments: &Value) -> GuardVerdict {
        if self.executed_total >= MAX_CALLS_PER_TURN {
            return GuardVerdict::SkipTurnBudgetExhausted;
        }

        let fingerprint = arguments.to_string();
        if let Some(usage) = self.usage.get(tool_name) {
            if usage.last_fingerprint == fingerprint {
                return GuardVerdict::SkipDuplicateArguments;
            }
            if usage.count >= MAX_CALLS_PER_TOOL {
                return GuardVerdict::SkipToolBudgetExhausted;
            }
        }

        let usage = self
            .usage
            .entry(tool_name.to_string())
            .or_insert_with(|| ToolUsage { count: 0, last_fingerprint: String::new() });
        usage.count += 1;
        usage.last_fingerprint = fingerprint;
        self.executed_total += 1;

        GuardVerdict::Execute
    }

    pub fn executed_total(&self) -> usize {
        self.executed_total
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GuardVerdict, LoopGuard};

    #[test]
    fn identical_repeated_calls_execute_once() {
        let mut guard = LoopGuard::new();
        let args = json!({"phone": "+14165550100"});

        assert_eq!(guard.admit("lookup_customer", &args), GuardVerdict::Execute);
        for _ in 0..4 {
            assert_eq!(
                guard.admit("lookup_customer", &args),
                GuardVerdict::SkipDuplicateArguments
            );
        }
        assert_eq!(guard.executed_total(), 1);
    }

    #[test]
    fn turn_budget_caps_total_executions() {
        let mut guard = LoopGuard::new();
        assert!(guard.admit("lookup_customer", &json!({"phone": "1"})).is_execute());
        assert!(guard.admit("list_services", &json!({})).is_execute());
        assert_eq!(
            guard.admit("list_availability", &json!({"date": "2025-06-02"})),
            GuardVerdict::SkipTurnBudgetExhausted
        );
        assert_eq!(guard.executed_total(), 2);
    }

    #[test]
    fn same_tool_different_arguments_consumes_turn_budget() {
        let mut guard = LoopGuard::new();
        // Per-tool ceiling equals the turn ceiling, so exercising rule 3
        // requires the duplicate check to fire first on a fresh guard.
        assert!(guard.admit("lookup_customer", &json!({"phone": "1"})).is_execute());
        assert_eq!(
            guard.admit("lookup_customer", &json!({"phone": "1"})),
            GuardVerdict::SkipDuplicateArguments
        );
        assert!(guard.admit("lookup_customer", &json!({"phone": "2"})).is_execute());
        assert_eq!(
            guard.admit("lookup_customer", &json!({"phone": "3"})),
            GuardVerdict::SkipTurnBudgetExhausted
        );
    }

    #[test]
    fn turn_budget_outranks_later_rules_once_spent() {
        let mut guard = LoopGuard::new();
        assert!(guard.admit("list_services", &json!({"service_type": "all"})).is_execute());
        assert!(guard.admit("list_services", &json!({"service_type": "express"})).is_execute());
        // Rules 2 and 3 would also reject this call, but rule 1 is checked
        // first and the turn budget is already spent.
        assert_eq!(
            guard.admit("list_services", &json!({"service_type": "express"})),
            GuardVerdict::SkipTurnBudgetExhausted
        );
    }

    #[test]
    fn fingerprints_are_argument_sensitive() {
        let mut guard = LoopGuard::new();
        assert!(guard.admit("validate_address", &json!({"address": "123 Main St"})).is_execute());
        assert!(guard
            .admit("validate_address", &json!({"address": "45 Queen St"}))
            .is_execute());
        assert_eq!(guard.executed_total(), 2);
    }
}

//! Record filters: a flat predicate list, optional infix logic over it, and AND/OR groups.

use tablefill_model::Value;

use crate::logic::LogicExpression;
use crate::predicate::FieldPredicate;
use crate::LogicError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupLogic {
    #[default]
    And,
    Or,
}

impl GroupLogic {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "and" | "&" | "&&" => Some(GroupLogic::And),
            "or" | "|" | "||" => Some(GroupLogic::Or),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGroup {
    pub logic: GroupLogic,
    pub predicates: Vec<FieldPredicate>,
}

impl FilterGroup {
    pub fn new(logic: GroupLogic, predicates: Vec<FieldPredicate>) -> Self {
        Self { logic, predicates }
    }

    /// An empty group accepts every record.
    pub fn matches(&self, record: &Value) -> bool {
        if self.predicates.is_empty() {
            return true;
        }
        match self.logic {
            GroupLogic::And => self.predicates.iter().all(|p| p.matches(record)),
            GroupLogic::Or => self.predicates.iter().any(|p| p.matches(record)),
        }
    }
}

/// Everything that decides whether a record is included in a table.
///
/// The flat predicate list is ANDed unless `logic` is set, in which case `logic` combines the
/// list by 1-based position. Groups are ANDed on top of that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub predicates: Vec<FieldPredicate>,
    pub groups: Vec<FilterGroup>,
    pub logic: Option<LogicExpression>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.groups.is_empty() && self.logic.is_none()
    }

    pub fn evaluate(&self, record: &Value) -> Result<bool, LogicError> {
        let flat = match &self.logic {
            Some(logic) => {
                let outcomes: Vec<bool> = self.predicates.iter().map(|p| p.matches(record)).collect();
                logic.evaluate(&outcomes)?
            }
            None => self.predicates.iter().all(|p| p.matches(record)),
        };
        Ok(flat && self.groups.iter().all(|g| g.matches(record)))
    }
}

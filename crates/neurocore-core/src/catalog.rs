use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::action::OptimizationAction;
use crate::error::{CoreError, Result};

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*$").unwrap())
}

/// Fixed, ordered set of optimization actions.
///
/// Built once at startup and never mutated. Lookup by id is a hash probe into
/// the declaration-ordered list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actions: Vec<Arc<OptimizationAction>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(actions: Vec<OptimizationAction>) -> Result<Self> {
        let mut index = HashMap::with_capacity(actions.len());
        let mut list = Vec::with_capacity(actions.len());

        for (pos, action) in actions.into_iter().enumerate() {
            if action.id.len() > 64 || !id_re().is_match(&action.id) {
                return Err(CoreError::InvalidAction {
                    id: action.id,
                    reason: "id must be a lowercase slug".into(),
                });
            }
            if action.estimated_duration_secs == 0 {
                return Err(CoreError::InvalidAction {
                    id: action.id,
                    reason: "estimated duration must be positive".into(),
                });
            }
            if index.insert(action.id.clone(), pos).is_some() {
                return Err(CoreError::DuplicateAction(action.id));
            }
            list.push(Arc::new(action));
        }

        Ok(Self {
            actions: list,
            index,
        })
    }

    /// All actions in declaration order.
    pub fn list(&self) -> &[Arc<OptimizationAction>] {
        &self.actions
    }

    pub fn get(&self, id: &str) -> Option<&Arc<OptimizationAction>> {
        self.index.get(id).map(|&i| &self.actions[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.id.as_str())
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for action in &self.actions {
            if !seen.contains(&action.category.as_str()) {
                seen.push(&action.category);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

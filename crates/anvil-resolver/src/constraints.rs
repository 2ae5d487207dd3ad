use anvil_core::{PackageIdentity, VersionRange};

use crate::error::ResolveError;
use crate::types::Constraint;

/// Every range that has reached one package, plus their running intersection.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    intersection: VersionRange,
}

impl ConstraintSet {
    pub fn new(first: Constraint) -> Self {
        Self {
            intersection: first.range.clone(),
            constraints: vec![first],
        }
    }

    pub fn range(&self) -> &VersionRange {
        &self.intersection
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Records `constraint` and narrows the intersection. The constraint is
    /// kept even when it empties the intersection so the error can name it.
    pub fn add(
        &mut self,
        identity: &PackageIdentity,
        constraint: Constraint,
    ) -> Result<VersionRange, ResolveError> {
        let narrowed = self.intersection.intersect(&constraint.range);
        self.constraints.push(constraint);
        match narrowed {
            Some(range) => {
                self.intersection = range.clone();
                Ok(range)
            }
            None => Err(ResolveError::Unsatisfiable {
                identity: identity.clone(),
                constraints: self.constraints.clone(),
            }),
        }
    }
}

use tracing::debug;

use crate::{Condition, Criteria, RuleError, RuleRegistry};

pub(crate) fn apply<R, Q>(
    registry: &RuleRegistry<R, Q>,
    criteria: &Criteria<Condition>,
    resource: &R,
) -> Result<bool, RuleError> {
    criteria
        .try_evaluate(|condition| {
            registry
                .resolve(condition.rule())?
                .apply(resource, condition.params())
        })
        .inspect_err(|err| debug!(error = %err, "criteria evaluation aborted"))
}

pub(crate) fn to_query<R, Q>(
    registry: &RuleRegistry<R, Q>,
    criteria: &Criteria<Condition>,
) -> Result<Criteria<Q>, RuleError> {
    criteria
        .try_map(|condition| {
            registry
                .resolve(condition.rule())?
                .to_query(condition.params())
        })
        .inspect_err(|err| debug!(error = %err, "criteria lowering aborted"))
}

pub(crate) fn validate<R, Q>(
    registry: &RuleRegistry<R, Q>,
    criteria: &Criteria<Condition>,
) -> Result<(), RuleError> {
    for condition in criteria.leaves() {
        registry
            .resolve(condition.rule())?
            .check_params(condition.params())?;
    }
    Ok(())
}

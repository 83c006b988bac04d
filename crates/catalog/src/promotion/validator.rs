use super::types::PromotionPlan;

/// External check run on the prospective target-space content before
/// anything is written. Returning `Err(reason)` aborts the promotion.
pub trait PromotionValidator: Send + Sync {
    fn validate(&self, plan: &PromotionPlan) -> Result<(), String>;
}

/// Accepts every plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl PromotionValidator for NoopValidator {
    fn validate(&self, _plan: &PromotionPlan) -> Result<(), String> {
        Ok(())
    }
}

impl<F> PromotionValidator for F
where
    F: Fn(&PromotionPlan) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, plan: &PromotionPlan) -> Result<(), String> {
        self(plan)
    }
}

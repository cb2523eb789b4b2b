use crate::{
    debug::{ApplyService, Error},
    entity::Entity,
};

/// Whether the application described by `entities` is deployed, which is the
/// precondition for debugging it.
///
/// Every controller is checked, so each one missing from the cluster gets its
/// own warning.
///
/// # Errors
///
/// Returns an error if the cluster cannot be asked about a controller.
pub async fn is_debug_applicable<A>(entities: &[Entity], apply_service: &A) -> Result<bool, Error>
where
    A: ApplyService,
{
    if entities.is_empty() {
        return Ok(false);
    }

    let mut applicable = true;
    for entity in entities.iter().filter(|entity| entity.is_controller()) {
        if !apply_service.is_already_applied(entity).await? {
            tracing::warn!(
                "{} {} not applied, did you forget to deploy your application?",
                entity.kind(),
                entity.name()
            );
            applicable = false;
        }
    }
    Ok(applicable)
}

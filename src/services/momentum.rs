// Temperature momentum service.

use std::collections::BTreeMap;

use crate::signals::momentum::{
    all_velocities, build_dashboard, velocity, TemperatureVelocity,
    TemperatureVelocityDashboard, DETAIL_WINDOW,
};
use crate::store::EventStore;

use super::or_default;

/// Heating/cooling buckets across active relationships.
pub async fn get_temperature_velocity_dashboard(
    store: &dyn EventStore,
) -> TemperatureVelocityDashboard {
    let histories = store.active_relationship_histories().await;
    or_default(
        "Temperature velocity dashboard",
        histories.map(|h| build_dashboard(&h)),
    )
}

/// Momentum for one relationship; `None` when it does not exist or the store
/// is unavailable.
pub async fn get_temperature_velocity(
    store: &dyn EventStore,
    relationship_id: &str,
) -> Option<TemperatureVelocity> {
    match store.relationship_history(relationship_id).await {
        Ok(history) => history.map(|h| velocity(&h, DETAIL_WINDOW)),
        Err(e) => {
            log::error!("Temperature velocity for {} failed: {}", relationship_id, e);
            None
        }
    }
}

pub async fn get_all_temperature_velocities(
    store: &dyn EventStore,
) -> BTreeMap<String, TemperatureVelocity> {
    let histories = store.active_relationship_histories().await;
    or_default(
        "Temperature velocities",
        histories.map(|h| all_velocities(&h)),
    )
}

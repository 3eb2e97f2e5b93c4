pub mod batch_manager;
pub mod bom_aggregator;
pub mod error;
pub mod market_estimator;
pub mod market_profile;
pub mod pagination;
pub mod route_builder;
pub mod supply_planner;

#[cfg(test)]
pub mod test_objects;

pub fn format_duration_hh_mm_ss(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

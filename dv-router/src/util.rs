use std::cmp::min;

/// Adds two costs, saturating at `inf`
///
/// # Arguments
///
/// * `cost_a`: First cost, typically the link latency
/// * `cost_b`: Second cost, typically what the neighbour advertised
/// * `inf`: The metric that represents unreachability
///
/// returns: u16
///
/// # Examples
///
/// ```
/// assert_eq!(dv_router::util::sum_inf(1, 2, 16), 3);
/// assert_eq!(dv_router::util::sum_inf(10, 10, 16), 16);
/// assert_eq!(dv_router::util::sum_inf(u16::MAX, 1, 16), 16);
/// ```
pub fn sum_inf(cost_a: u16, cost_b: u16, inf: u16) -> u16 {
    min(inf as u32, cost_a as u32 + cost_b as u32) as u16
}

/// Brings an untrusted cost into `[0, inf]`
///
/// ```
/// assert_eq!(dv_router::util::clamp_cost(-3, 16), 0);
/// assert_eq!(dv_router::util::clamp_cost(7, 16), 7);
/// assert_eq!(dv_router::util::clamp_cost(200, 16), 16);
/// ```
pub fn clamp_cost(cost: i32, inf: u16) -> u16 {
    cost.clamp(0, inf as i32) as u16
}

/// Whether `cost` can be clamped losslessly
pub fn cost_in_range(cost: i32, inf: u16) -> bool {
    (0..=inf as i32).contains(&cost)
}

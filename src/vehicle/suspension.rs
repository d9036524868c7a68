// ==============================================================================
// suspension.rs — SPRING-DAMPER SUSPENSION FORCE
// ------------------------------------------------------------------------------
// spring  = k · (rest − length)
// rate    = (length − previous) / dt         (< 0 while compressing)
// damping = c_compression if rate < 0 else c_relaxation
// force   = (spring − damping · rate) · chassis_mass, clamped to [0, max]
//
// k and c are per unit of chassis mass. The suspension only ever pushes.
// ==============================================================================

use rapier3d::prelude::Real;

use super::types::WheelConfig;

pub fn compute_suspension_force(
    config: &WheelConfig,
    suspension_length: Real,
    previous_length: Real,
    dt: Real,
    chassis_mass: Real,
) -> Real {
    let spring = config.suspension_stiffness * (config.suspension_rest_length - suspension_length);

    let rate = (suspension_length - previous_length) / dt;
    let damping = if rate < 0.0 {
        config.damping_compression
    } else {
        config.damping_relaxation
    };

    let force = (spring - damping * rate) * chassis_mass;
    force.clamp(0.0, config.max_suspension_force)
}

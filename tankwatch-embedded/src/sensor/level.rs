use crate::types::WaterLevel;

/// Converts the distance to the water surface into a fill percentage of a
/// tank `tank_height_cm` deep. Distances outside the tank clamp to 0 or 100.
pub fn to_level(distance_cm: f32, tank_height_cm: f32) -> WaterLevel {
    if !(tank_height_cm > 0.0) {
        return WaterLevel {
            percentage: 0,
            distance_cm,
        };
    }

    let water_cm = (tank_height_cm - distance_cm).clamp(0.0, tank_height_cm);
    let percentage = libm::floorf(water_cm * 100.0 / tank_height_cm) as u8;

    WaterLevel {
        percentage: percentage.min(100),
        distance_cm,
    }
}

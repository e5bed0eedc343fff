// mx-core/src/units.rs

use uom::si::f64::{
    AvailableEnergy as UomAvailableEnergy, MassDensity as UomMassDensity,
    Pressure as UomPressure, SpecificHeatCapacity as UomSpecificHeatCapacity,
    SpecificVolume as UomSpecificVolume,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Public canonical unit types (SI, f64)
pub type Density = UomMassDensity;
pub type Pressure = UomPressure;
pub type SpecificEnergy = UomAvailableEnergy;
pub type SpecificHeat = UomSpecificHeatCapacity;
pub type SpecificVolume = UomSpecificVolume;
pub type Temperature = UomThermodynamicTemperature;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kg_per_m3(v: f64) -> Density {
    use uom::si::mass_density::kilogram_per_cubic_meter;
    Density::new::<kilogram_per_cubic_meter>(v)
}

#[inline]
pub fn m3_per_kg(v: f64) -> SpecificVolume {
    use uom::si::specific_volume::cubic_meter_per_kilogram;
    SpecificVolume::new::<cubic_meter_per_kilogram>(v)
}

#[inline]
pub fn j_per_kg(v: f64) -> SpecificEnergy {
    use uom::si::available_energy::joule_per_kilogram;
    SpecificEnergy::new::<joule_per_kilogram>(v)
}

#[inline]
pub fn j_per_kg_k(v: f64) -> SpecificHeat {
    use uom::si::specific_heat_capacity::joule_per_kilogram_kelvin;
    SpecificHeat::new::<joule_per_kilogram_kelvin>(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = pa(101_325.0);
        let _t = k(300.0);
        let _rho = kg_per_m3(1.2);
        let _v = m3_per_kg(0.8);
        let _e = j_per_kg(2.1e5);
        let _cv = j_per_kg_k(718.0);
    }
}

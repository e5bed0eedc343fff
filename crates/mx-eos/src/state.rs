//! Fully evaluated single-material thermodynamic state.

use mx_core::units::{
    Density, Pressure, SpecificEnergy, SpecificHeat, SpecificVolume, Temperature, j_per_kg,
    j_per_kg_k, k, kg_per_m3, m3_per_kg, pa,
};
use mx_core::Real;

/// One material's state with every derived quantity the batch outputs need.
///
/// Raw fields are plain `f64` in the model's unit system; the typed accessors
/// assume SI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    pub density: Real,
    pub sie: Real,
    pub pressure: Real,
    pub temperature: Real,
    /// Isentropic bulk modulus
    pub bulk_modulus: Real,
    /// ∂P/∂e at constant density
    pub dpde: Real,
    /// Isochoric specific heat
    pub cv: Real,
}

impl MaterialState {
    pub fn density_q(&self) -> Density {
        kg_per_m3(self.density)
    }

    pub fn specific_volume_q(&self) -> SpecificVolume {
        m3_per_kg(1.0 / self.density)
    }

    pub fn sie_q(&self) -> SpecificEnergy {
        j_per_kg(self.sie)
    }

    pub fn pressure_q(&self) -> Pressure {
        pa(self.pressure)
    }

    pub fn temperature_q(&self) -> Temperature {
        k(self.temperature)
    }

    pub fn bulk_modulus_q(&self) -> Pressure {
        pa(self.bulk_modulus)
    }

    pub fn cv_q(&self) -> SpecificHeat {
        j_per_kg_k(self.cv)
    }

    /// Grüneisen parameter Γ = (∂P/∂e|ρ) / ρ.
    pub fn gruneisen(&self) -> Real {
        self.dpde / self.density
    }

    /// Return a summary string of all contained properties (for debugging).
    pub fn summary(&self) -> String {
        format!(
            "State(ρ={:.4e},e={:.4e},P={:.4e},T={:.2},B={:.4e},dP/de={:.4e},cv={:.4e})",
            self.density,
            self.sie,
            self.pressure,
            self.temperature,
            self.bulk_modulus,
            self.dpde,
            self.cv
        )
    }
}

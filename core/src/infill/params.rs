use super::{BodyType, InfillError, InfillStyle};
use crate::units::LengthUnit;
use serde::{Deserialize, Serialize};

/// Generation parameters. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfillParams {
    pub style: InfillStyle,
    pub body_type: BodyType,
    /// Characteristic cell diameter.
    pub size: f64,
    /// Wall thickness kept in Create Shell mode.
    pub shell_thickness: f64,
    /// Wall width left between neighbouring cells.
    pub rib_thickness: f64,
}

impl Default for InfillParams {
    fn default() -> Self {
        let inch = LengthUnit::Inch;
        Self {
            style: InfillStyle::Hex,
            body_type: BodyType::CreateShell,
            size: inch.to_mm(0.5),
            shell_thickness: inch.to_mm(0.3),
            rib_thickness: inch.to_mm(0.1),
        }
    }
}

impl InfillParams {
    /// Reject parameters that cannot produce a lattice, before any kernel work.
    pub fn validate(&self) -> Result<(), InfillError> {
        positive("size", self.size)?;
        positive("rib_thickness", self.rib_thickness)?;
        if self.body_type == BodyType::CreateShell {
            positive("shell_thickness", self.shell_thickness)?;
        }

        let radius = self.style.profile_radius(self.size, self.rib_thickness);
        if !(radius > 0.0) {
            return Err(InfillError::InvalidParameter(format!(
                "rib_thickness {} leaves no {} cell inside size {}",
                self.rib_thickness, self.style, self.size
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), InfillError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InfillError::InvalidParameter(format!(
            "{} must be a positive length, got {}",
            name, value
        )))
    }
}

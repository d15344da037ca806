//! Capsule geometry deriver.
//!
//! Treats the cell as a cylinder capped by two hemispheres of diameter
//! `width`. Given `volume`, solves for `length` (tip to tip) and the
//! resulting `surface_area`. Nothing grows `volume`, so daughters inherit
//! the mother's value unchanged.

use std::f64::consts::PI;

use inclusion_compose::schema::schema;
use inclusion_compose::{PortSchema, Process, Schema, StepContext, Update, Variable};
use inclusion_core::{tree, ProcessError, Value};

/// Default cell volume (fL).
pub const DEFAULT_VOLUME: f64 = 1.0;
/// Default cell width (µm).
pub const DEFAULT_WIDTH: f64 = 1.0;

/// Derives `length` and `surface_area` on the `global` port.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcoliShape;

/// Tip-to-tip length of a capsule with this volume and width.
///
/// Never shorter than `width` (a sphere).
pub fn length_from_volume(volume: f64, width: f64) -> f64 {
    let caps = PI * width.powi(3) / 6.0;
    let cross_section = PI * width.powi(2) / 4.0;
    ((volume - caps) / cross_section + width).max(width)
}

/// Surface area of a capsule.
pub fn surface_area(length: f64, width: f64) -> f64 {
    PI * width * length
}

impl Process for EcoliShape {
    fn name(&self) -> &str {
        "EcoliShape"
    }

    fn ports_schema(&self) -> Schema {
        schema([(
            "global",
            PortSchema::branch([
                ("volume", Variable::new(DEFAULT_VOLUME).set()),
                ("width", Variable::new(DEFAULT_WIDTH).set()),
                (
                    "length",
                    Variable::new(length_from_volume(DEFAULT_VOLUME, DEFAULT_WIDTH)).set(),
                ),
                (
                    "surface_area",
                    Variable::new(surface_area(
                        length_from_volume(DEFAULT_VOLUME, DEFAULT_WIDTH),
                        DEFAULT_WIDTH,
                    ))
                    .set(),
                ),
            ]),
        )])
    }

    fn is_deriver(&self) -> bool {
        true
    }

    fn next_update(&self, ctx: &StepContext<'_>) -> Result<Update, ProcessError> {
        let volume = ctx.float("global", "volume")?;
        let width = ctx.float("global", "width")?;
        let length = length_from_volume(volume, width);
        Ok(Update::new().with(
            "global",
            tree([
                ("length", Value::from(length)),
                ("surface_area", Value::from(surface_area(length, width))),
            ]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inclusion_compose::schema::Divider;
    use inclusion_test_utils::{branch_delta, ports, run_once};

    #[test]
    fn sphere_volume_gives_width_length() {
        let w = 2.0;
        let sphere = PI * w * w * w / 6.0;
        assert!((length_from_volume(sphere, w) - w).abs() < 1e-12);
        assert_eq!(length_from_volume(0.0, w), w);
    }

    #[test]
    fn derives_length_and_area() {
        let view = ports([(
            "global",
            Value::Map(tree([("volume", 1.0_f64.into()), ("width", 1.0_f64.into())])),
        )]);
        let u = run_once(&EcoliShape, &view, 1.0).unwrap();
        let length = branch_delta(&u, "global", "length").unwrap();
        assert!((length - 1.6066).abs() < 1e-3);
        let area = branch_delta(&u, "global", "surface_area").unwrap();
        assert!((area - PI * length).abs() < 1e-12);
        assert!(EcoliShape.is_deriver());
    }

    #[test]
    fn daughters_keep_the_mother_volume() {
        let Some(PortSchema::Branch(global)) = EcoliShape.ports_schema().shift_remove("global")
        else {
            panic!("global is not a branch");
        };
        let volume = &global["volume"];
        assert_eq!(volume.divider, Divider::Set);
        let daughter = volume.divider.apply(&Value::from(DEFAULT_VOLUME));
        assert_eq!(daughter, Value::from(DEFAULT_VOLUME));
    }
}

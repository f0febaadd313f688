//! Light sources and their shader uniform layout
//!
//! Lights own no GPU resources. Each frame the renderer assigns every light a
//! slot in the shader's fixed-size `lights[]` array and calls
//! [`Light::send_uniforms`], which writes `lights[slot].<field>` names.

use cgmath::Vector3;
use log::warn;

use crate::gfx::context::UniformSink;

/// Shader-side tag written to `lights[i].type`.
pub const LIGHT_POINT: i32 = 0;
pub const LIGHT_DIRECTIONAL: i32 = 1;
pub const LIGHT_SPOT: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely far away, like the sun.
    Directional { direction: Vector3<f32> },
    Point {
        position: Vector3<f32>,
        attenuation: f32,
    },
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        /// Full cone angle in degrees.
        cone_angle: f32,
        attenuation: f32,
    },
}

impl LightKind {
    pub fn type_tag(&self) -> i32 {
        match self {
            LightKind::Point { .. } => LIGHT_POINT,
            LightKind::Directional { .. } => LIGHT_DIRECTIONAL,
            LightKind::Spot { .. } => LIGHT_SPOT,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LightKind::Point { .. } => "point",
            LightKind::Directional { .. } => "directional",
            LightKind::Spot { .. } => "spot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadow: bool,
    pub kind: LightKind,
}

impl Light {
    pub fn directional(direction: Vector3<f32>, color: [f32; 3], intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadow: false,
            kind: LightKind::Directional { direction },
        }
    }

    pub fn point(position: Vector3<f32>, color: [f32; 3], intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadow: false,
            kind: LightKind::Point {
                position,
                attenuation: 1.0,
            },
        }
    }

    pub fn spot(
        position: Vector3<f32>,
        direction: Vector3<f32>,
        cone_angle: f32,
        color: [f32; 3],
        intensity: f32,
    ) -> Self {
        Self {
            color,
            intensity,
            cast_shadow: false,
            kind: LightKind::Spot {
                position,
                direction,
                cone_angle,
                attenuation: 1.0,
            },
        }
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.color = color;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn set_cast_shadow(&mut self, cast_shadow: bool) {
        self.cast_shadow = cast_shadow;
    }

    pub fn set_position(&mut self, value: Vector3<f32>) {
        match &mut self.kind {
            LightKind::Point { position, .. } | LightKind::Spot { position, .. } => {
                *position = value
            }
            kind => warn!("{} light has no position", kind.label()),
        }
    }

    pub fn set_direction(&mut self, value: Vector3<f32>) {
        match &mut self.kind {
            LightKind::Directional { direction } | LightKind::Spot { direction, .. } => {
                *direction = value
            }
            kind => warn!("{} light has no direction", kind.label()),
        }
    }

    pub fn set_attenuation(&mut self, value: f32) {
        match &mut self.kind {
            LightKind::Point { attenuation, .. } | LightKind::Spot { attenuation, .. } => {
                *attenuation = value
            }
            kind => warn!("{} light has no attenuation", kind.label()),
        }
    }

    pub fn set_cone_angle(&mut self, value: f32) {
        match &mut self.kind {
            LightKind::Spot { cone_angle, .. } => *cone_angle = value,
            kind => warn!("{} light has no cone angle", kind.label()),
        }
    }

    /// Writes this light into shader slot `slot`.
    pub fn send_uniforms(&self, sink: &mut dyn UniformSink, slot: usize) {
        let name = |field: &str| format!("lights[{slot}].{field}");

        sink.set_uniform(&name("type"), self.kind.type_tag().into());
        sink.set_uniform(&name("color"), self.color.into());
        sink.set_uniform(&name("intensity"), self.intensity.into());

        match self.kind {
            LightKind::Directional { direction } => {
                sink.set_uniform(&name("direction"), direction.into());
            }
            LightKind::Point {
                position,
                attenuation,
            } => {
                sink.set_uniform(&name("position"), position.into());
                sink.set_uniform(&name("attenuation"), attenuation.into());
            }
            LightKind::Spot {
                position,
                direction,
                cone_angle,
                attenuation,
            } => {
                sink.set_uniform(&name("position"), position.into());
                sink.set_uniform(&name("direction"), direction.into());
                sink.set_uniform(&name("coneAngle"), cone_angle.into());
                sink.set_uniform(&name("attenuation"), attenuation.into());
            }
        }

        self.send_shadow_uniforms(sink, slot);
    }

    // Shared by every kind.
    fn send_shadow_uniforms(&self, sink: &mut dyn UniformSink, slot: usize) {
        sink.set_uniform(&format!("lights[{slot}].castShadow"), self.cast_shadow.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::context::UniformValue;
    use cgmath::vec3;

    #[derive(Default)]
    struct Sink(Vec<(String, UniformValue)>);

    impl UniformSink for Sink {
        fn set_uniform(&mut self, name: &str, value: UniformValue) {
            self.0.push((name.to_string(), value));
        }
    }

    impl Sink {
        fn names(&self) -> Vec<&str> {
            self.0.iter().map(|(name, _)| name.as_str()).collect()
        }
    }

    #[test]
    fn test_directional_at_slot_2() {
        let light = Light::directional(vec3(0.0, -1.0, 0.0), [1.0, 1.0, 1.0], 0.8);
        let mut sink = Sink::default();
        light.send_uniforms(&mut sink, 2);

        assert_eq!(
            sink.names(),
            vec![
                "lights[2].type",
                "lights[2].color",
                "lights[2].intensity",
                "lights[2].direction",
                "lights[2].castShadow",
            ]
        );
        assert_eq!(sink.0[0].1, UniformValue::Int(LIGHT_DIRECTIONAL));
        assert_eq!(sink.0[3].1, UniformValue::Vec3([0.0, -1.0, 0.0]));
    }

    #[test]
    fn test_point_at_slot_2() {
        let mut light = Light::point(vec3(1.0, 2.0, 3.0), [1.0, 0.5, 0.0], 2.0);
        light.set_attenuation(0.25);
        let mut sink = Sink::default();
        light.send_uniforms(&mut sink, 2);

        assert!(sink.names().iter().all(|n| n.starts_with("lights[2].")));
        assert_eq!(sink.0[0].1, UniformValue::Int(LIGHT_POINT));
        assert!(sink
            .0
            .contains(&("lights[2].attenuation".to_string(), UniformValue::Float(0.25))));
        assert!(!sink.names().contains(&"lights[2].direction"));
    }

    #[test]
    fn test_spot_at_slot_2() {
        let mut light = Light::spot(
            vec3(0.0, 5.0, 0.0),
            vec3(0.0, -1.0, 0.0),
            30.0,
            [1.0, 1.0, 1.0],
            1.0,
        );
        light.set_cast_shadow(true);
        let mut sink = Sink::default();
        light.send_uniforms(&mut sink, 2);

        assert!(sink.names().iter().all(|n| n.starts_with("lights[2].")));
        assert_eq!(sink.0[0].1, UniformValue::Int(LIGHT_SPOT));
        assert!(sink
            .0
            .contains(&("lights[2].coneAngle".to_string(), UniformValue::Float(30.0))));
        assert_eq!(
            sink.0.last(),
            Some(&("lights[2].castShadow".to_string(), UniformValue::Int(1)))
        );
    }

    #[test]
    fn test_spot_vectors_reach_the_sink() {
        let light = Light::spot(
            vec3(1.0, 4.0, -2.0),
            vec3(0.0, -1.0, 0.5),
            20.0,
            [1.0, 1.0, 1.0],
            1.0,
        );
        let mut sink = Sink::default();
        light.send_uniforms(&mut sink, 0);

        assert!(sink
            .0
            .contains(&("lights[0].position".to_string(), UniformValue::Vec3([1.0, 4.0, -2.0]))));
        assert!(sink
            .0
            .contains(&("lights[0].direction".to_string(), UniformValue::Vec3([0.0, -1.0, 0.5]))));
    }

    #[test]
    fn test_setter_on_missing_field_is_noop() {
        let mut light = Light::directional(vec3(0.0, -1.0, 0.0), [1.0, 1.0, 1.0], 1.0);
        let before = light.clone();
        light.set_position(vec3(9.0, 9.0, 9.0));
        light.set_cone_angle(45.0);
        assert_eq!(light, before);
    }
}

//! Functions for loading renderer settings.

use std::io::Read;

use crate::errors::*;

/// Configuration of a `Renderer`. Every field falls back to its default when it is
/// missing from a serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub window: WindowParams,
    /// The viewport applied at creation, `None` covers the whole window.
    pub viewport: Option<ViewportParams>,
    /// Upper bound of texture units tracked by binding slots. The device could lower it.
    pub max_texture_units: usize,
}

impl Default for RendererSettings {
    fn default() -> Self {
        RendererSettings {
            window: WindowParams::default(),
            viewport: None,
            max_texture_units: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowParams {
    /// The size in pixels of the client area of the window.
    pub width: u32,
    pub height: u32,
    /// The depth range mapped to the window.
    pub near: f32,
    pub far: f32,
}

impl Default for WindowParams {
    fn default() -> Self {
        WindowParams {
            width: 640,
            height: 320,
            near: 0.0,
            far: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportParams {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RendererSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: RendererSettings = serde_json::from_str(json)
            .map_err(|err| Error::InvalidState(format!("malformed settings ({})", err)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let settings: RendererSettings = serde_json::from_reader(reader)
            .map_err(|err| Error::InvalidState(format!("malformed settings ({})", err)))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| Error::Backend(format!("{}", err)))
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.window;
        if w.width == 0 || w.height == 0 {
            return Err(Error::InvalidSize(format!(
                "window of {}x{} pixels",
                w.width, w.height
            )));
        }

        if !(w.near < w.far) {
            return Err(Error::InvalidState(format!(
                "depth range [{}, {}] is empty",
                w.near, w.far
            )));
        }

        if self.max_texture_units == 0 {
            return Err(Error::InvalidSize("zero texture units".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RendererSettings::from_json("{}").unwrap();
        assert_eq!(settings, RendererSettings::default());
        assert_eq!(settings.window.width, 640);
        assert_eq!(settings.window.height, 320);
    }

    #[test]
    fn partial() {
        let json = r#"{ "window": { "width": 1024 }, "viewport": { "x": 0, "y": 0, "width": 512, "height": 320 } }"#;
        let settings = RendererSettings::from_json(json).unwrap();

        assert_eq!(settings.window.width, 1024);
        assert_eq!(settings.window.height, 320);
        assert_eq!(settings.viewport.unwrap().width, 512);
        assert_eq!(settings.max_texture_units, 8);

        let copy = RendererSettings::from_reader(settings.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(copy, settings);
    }

    #[test]
    fn invalid() {
        assert!(RendererSettings::from_json("{ \"window\": 1 }").is_err());
        assert!(RendererSettings::from_json("{ \"max_texture_units\": 0 }").is_err());

        let mut settings = RendererSettings::default();
        settings.window.height = 0;
        assert!(settings.validate().is_err());

        settings.window.height = 1;
        settings.window.near = 1.0;
        assert!(settings.validate().is_err());
    }
}

use cgmath::BaseFloat;

/// A RGBA `Color`. Each color component is a floating point value
/// with a range from 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color<S> {
    pub r: S,
    pub g: S,
    pub b: S,
    pub a: S,
}

impl<S: BaseFloat> Color<S> {
    pub fn new(r: S, g: S, b: S, a: S) -> Self {
        Color { r, g, b, a }
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Self {
        let f = |v: S| v.max(S::zero()).min(S::one());
        Color::new(f(self.r), f(self.g), f(self.b), f(self.a))
    }

    pub fn rgba(&self) -> [S; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn white() -> Self {
        Color::new(S::one(), S::one(), S::one(), S::one())
    }

    pub fn black() -> Self {
        Color::new(S::zero(), S::zero(), S::zero(), S::one())
    }

    pub fn transparent() -> Self {
        Color::new(S::zero(), S::zero(), S::zero(), S::zero())
    }
}

impl<S: BaseFloat> From<[S; 4]> for Color<S> {
    fn from(v: [S; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

impl From<[u8; 4]> for Color<f32> {
    fn from(v: [u8; 4]) -> Self {
        let max = 255.0;
        Color::new(
            f32::from(v[0]) / max,
            f32::from(v[1]) / max,
            f32::from(v[2]) / max,
            f32::from(v[3]) / max,
        )
    }
}

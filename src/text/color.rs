use super::node::{ArrayNode, Node, TaggedNode, ValueNode};
use crate::ScalarError;

/// The color space named by a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// `rgb { 255 128 0 }`
    Rgb,

    /// `hsv { 0.5 0.2 0.8 }`, components within [0, 1]
    Hsv,

    /// `hsv360 { 180 20 80 }`, hue in degrees
    Hsv360,

    /// `hex { 0xff8000 }`, decoded into rgb(a) components
    Hex,

    /// `cylindrical { 0.5 0.2 0.8 }`
    Cylindrical,
}

impl ColorSpace {
    /// Returns the color space for a tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "rgb" => Some(ColorSpace::Rgb),
            "hsv" => Some(ColorSpace::Hsv),
            "hsv360" => Some(ColorSpace::Hsv360),
            "hex" => Some(ColorSpace::Hex),
            "cylindrical" => Some(ColorSpace::Cylindrical),
            _ => None,
        }
    }

    /// The tag that introduces this color space
    pub fn tag(&self) -> &'static str {
        match self {
            ColorSpace::Rgb => "rgb",
            ColorSpace::Hsv => "hsv",
            ColorSpace::Hsv360 => "hsv360",
            ColorSpace::Hex => "hex",
            ColorSpace::Cylindrical => "cylindrical",
        }
    }
}

/// A color with 3 or 4 components (the optional fourth is alpha)
///
/// ```
/// use clausewitz_save::text::{parse, ColorSpace};
/// let root = parse(b"color = hex { 0xff800040 }")?;
/// let color = root.get_first("color").unwrap().as_tagged().unwrap().color()?;
/// assert_eq!(color.space(), ColorSpace::Hex);
/// assert_eq!(color.components(), &[255.0, 128.0, 0.0, 64.0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GameColor {
    space: ColorSpace,
    components: Vec<f64>,
}

impl GameColor {
    /// Creates a color, failing unless there are 3 or 4 components
    pub fn new(space: ColorSpace, components: Vec<f64>) -> Result<Self, ScalarError> {
        if !(3..=4).contains(&components.len()) {
            return Err(ScalarError::InvalidColor(format!(
                "{} components",
                components.len()
            )));
        }

        Ok(GameColor { space, components })
    }

    /// The color space
    pub fn space(&self) -> ColorSpace {
        self.space
    }

    /// The components
    pub fn components(&self) -> &[f64] {
        &self.components
    }

    /// The alpha component, if present
    pub fn alpha(&self) -> Option<f64> {
        self.components.get(3).copied()
    }

    /// Converts the color back into a tagged node
    pub fn to_node(&self) -> TaggedNode {
        let mut array = ArrayNode::with_capacity(self.components.len());
        match self.space {
            ColorSpace::Hex => {
                let hex: String = self
                    .components
                    .iter()
                    .map(|&x| format!("{:02x}", x.clamp(0.0, 255.0) as u8))
                    .collect();
                array.push(Node::Value(ValueNode::unquoted(format!("0x{}", hex))));
            }
            _ => {
                for &x in &self.components {
                    let value = if x.fract() == 0.0 && x.abs() < 1e15 {
                        ValueNode::from_i64(x as i64)
                    } else {
                        ValueNode::from_f64(x)
                    };
                    array.push(Node::Value(value));
                }
            }
        }

        TaggedNode::new(self.space.tag(), array)
    }
}

impl TaggedNode {
    /// Interprets the tagged node as a color
    pub fn color(&self) -> Result<GameColor, ScalarError> {
        let space = ColorSpace::from_tag(self.tag())
            .ok_or_else(|| ScalarError::InvalidColor(format!("unknown tag {}", self.tag())))?;

        let components = match space {
            ColorSpace::Hex => {
                let value = match self.array().entries() {
                    [entry] if entry.key.is_none() => entry.node.value()?,
                    _ => return Err(ScalarError::InvalidColor(String::from("expected one hex value"))),
                };
                decode_hex(value.as_bytes())?
            }
            _ => self
                .array()
                .values()
                .map(|x| x.to_f64())
                .collect::<Result<Vec<_>, _>>()?,
        };

        GameColor::new(space, components)
    }
}

fn decode_hex(data: &[u8]) -> Result<Vec<f64>, ScalarError> {
    let invalid = || ScalarError::InvalidColor(String::from_utf8_lossy(data).into_owned());
    let digits = data
        .strip_prefix(b"0x")
        .or_else(|| data.strip_prefix(b"0X"))
        .unwrap_or(data);

    if digits.len() != 6 && digits.len() != 8 {
        return Err(invalid());
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|_| invalid())?;
            u8::from_str_radix(text, 16)
                .map(f64::from)
                .map_err(|_| invalid())
        })
        .collect()
}

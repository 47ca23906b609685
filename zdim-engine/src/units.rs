use std::fmt;

use crate::errors::ComposeError;

/// 图纸线性单位。标注样式的默认值以毫米给出，写入变量表前先换算到当前单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Micron,
    Mil,
    Millimeter,
    Centimeter,
    Inch,
    Foot,
    Yard,
    Meter,
    Kilometer,
}

impl Unit {
    /// 每单位对应的毫米数。
    #[inline]
    fn millimeters(self) -> f64 {
        match self {
            Unit::Micron => 0.001,
            Unit::Mil => 0.0254,
            Unit::Millimeter => 1.0,
            Unit::Centimeter => 10.0,
            Unit::Inch => 25.4,
            Unit::Foot => 304.8,
            Unit::Yard => 914.4,
            Unit::Meter => 1_000.0,
            Unit::Kilometer => 1_000_000.0,
        }
    }

    /// 按 DXF `$INSUNITS` 代码解析单位。
    pub fn try_from_code(code: i32) -> Result<Unit, ComposeError> {
        match code {
            1 => Ok(Unit::Inch),
            2 => Ok(Unit::Foot),
            4 => Ok(Unit::Millimeter),
            5 => Ok(Unit::Centimeter),
            6 => Ok(Unit::Meter),
            7 => Ok(Unit::Kilometer),
            9 => Ok(Unit::Mil),
            10 => Ok(Unit::Yard),
            13 => Ok(Unit::Micron),
            _ => Err(ComposeError::UnknownUnit(code)),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abbreviation = match self {
            Unit::Micron => "µm",
            Unit::Mil => "mil",
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Inch => "in",
            Unit::Foot => "ft",
            Unit::Yard => "yd",
            Unit::Meter => "m",
            Unit::Kilometer => "km",
        };
        write!(f, "{abbreviation}")
    }
}

/// 在两个线性单位之间换算长度。
#[inline]
pub fn convert(value: f64, from: Unit, to: Unit) -> f64 {
    value * from.millimeters() / to.millimeters()
}

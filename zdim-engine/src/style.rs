use std::collections::HashMap;

use crate::units::{self, Unit};

/// DXF 组码 40：浮点型标注变量。
pub const CODE_NUMBER: i32 = 40;
/// DXF 组码 70：整型开关变量。
pub const CODE_FLAG: i32 = 70;

/// 低于该哨兵值视为“未设置”，触发默认值写入。
pub const UNSET_SENTINEL: f64 = -1.0e10;

const DIMSCALE: &str = "$DIMSCALE";
const DIMLFAC: &str = "$DIMLFAC";
const DIMTXT: &str = "$DIMTXT";
const DIMASZ: &str = "$DIMASZ";
const DIMTSZ: &str = "$DIMTSZ";
const DIMEXE: &str = "$DIMEXE";
const DIMEXO: &str = "$DIMEXO";
const DIMGAP: &str = "$DIMGAP";
const DIMTIH: &str = "$DIMTIH";

/// 图形变量表的注入式接口，由宿主文档模型提供共享实现。
/// 变量值一律以图纸当前线性单位存储，`code` 为外部序列化使用的类型标签。
pub trait VariableStore {
    fn number(&self, key: &str) -> Option<f64>;
    fn integer(&self, key: &str) -> Option<i64>;
    fn set_number(&mut self, key: &str, value: f64, code: i32);
    fn set_integer(&mut self, key: &str, value: i64, code: i32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Variable {
    Number(f64),
    Integer(i64),
}

/// 内存变量表，同一键只保存一个值。测试中亦作为替身使用。
#[derive(Debug, Default, Clone)]
pub struct DrawingVariables {
    values: HashMap<String, (Variable, i32)>,
}

impl DrawingVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// 变量携带的类型标签。
    pub fn code(&self, key: &str) -> Option<i32> {
        self.values.get(key).map(|(_, code)| *code)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableStore for DrawingVariables {
    fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some((Variable::Number(value), _)) => Some(*value),
            _ => None,
        }
    }

    fn integer(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some((Variable::Integer(value), _)) => Some(*value),
            _ => None,
        }
    }

    fn set_number(&mut self, key: &str, value: f64, code: i32) {
        self.values
            .insert(key.to_string(), (Variable::Number(value), code));
    }

    fn set_integer(&mut self, key: &str, value: i64, code: i32) {
        self.values
            .insert(key.to_string(), (Variable::Integer(value), code));
    }
}

/// 标注样式解析器：按需读取变量表，缺省值在首次使用时写回。
#[derive(Debug)]
pub struct DimStyle<'a, S: VariableStore> {
    store: &'a mut S,
    unit: Unit,
}

impl<'a, S: VariableStore> DimStyle<'a, S> {
    pub fn new(store: &'a mut S, unit: Unit) -> Self {
        Self { store, unit }
    }

    /// 读取浮点变量。缺失或不高于哨兵值时，把毫米默认值换算成图纸单位
    /// 写回变量表后再读取，保证变量表自举且重复调用不再写入。
    pub fn variable(&mut self, key: &str, default_mm: f64, code: i32) -> f64 {
        let value = self.store.number(key).unwrap_or(UNSET_SENTINEL);
        if value <= UNSET_SENTINEL {
            let converted = units::convert(default_mm, Unit::Millimeter, self.unit);
            self.store.set_number(key, converted, code);
            self.store.number(key).unwrap_or(1.0)
        } else {
            value
        }
    }

    /// 标注整体比例（$DIMSCALE）。
    pub fn general_scale(&mut self) -> f64 {
        self.variable(DIMSCALE, 1.0, CODE_NUMBER)
    }

    /// 线性测量值的放大系数（$DIMLFAC）。
    pub fn general_factor(&mut self) -> f64 {
        self.variable(DIMLFAC, 1.0, CODE_NUMBER)
    }

    /// 标注文字高度（$DIMTXT）。
    pub fn text_height(&mut self) -> f64 {
        self.variable(DIMTXT, 2.5, CODE_NUMBER)
    }

    /// 箭头长度（$DIMASZ）。
    pub fn arrow_size(&mut self) -> f64 {
        self.variable(DIMASZ, 2.5, CODE_NUMBER)
    }

    /// 斜线终结符半长（$DIMTSZ），0 表示使用箭头。
    pub fn tick_size(&mut self) -> f64 {
        self.variable(DIMTSZ, 0.0, CODE_NUMBER)
    }

    /// 尺寸界线超出标注线的长度（$DIMEXE）。
    pub fn extension_line_extension(&mut self) -> f64 {
        self.variable(DIMEXE, 1.25, CODE_NUMBER)
    }

    /// 尺寸界线与被测实体的偏移（$DIMEXO）。
    pub fn extension_line_offset(&mut self) -> f64 {
        self.variable(DIMEXO, 0.625, CODE_NUMBER)
    }

    /// 标注线与文字的间隙（$DIMGAP）。
    pub fn line_gap(&mut self) -> f64 {
        self.variable(DIMGAP, 0.625, CODE_NUMBER)
    }

    /// 文字是否强制水平（$DIMTIH）。`{0, 1}` 之外的历史值先修复为 0
    /// 并写回，再按修复后的值判读。
    pub fn horizontal_text(&mut self) -> bool {
        let stored = self.store.integer(DIMTIH).unwrap_or(2);
        let value = if stored == 0 || stored == 1 {
            stored
        } else {
            self.store.set_integer(DIMTIH, 0, CODE_FLAG);
            self.store.integer(DIMTIH).unwrap_or(0)
        };
        value != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn missing_variable_is_inserted_once() {
        let mut vars = DrawingVariables::new();
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        let first = style.text_height();
        let second = style.text_height();
        assert!((first - 2.5).abs() < EPS);
        assert_eq!(first, second);

        assert_eq!(vars.number("$DIMTXT"), Some(2.5));
        assert_eq!(vars.code("$DIMTXT"), Some(CODE_NUMBER));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn existing_variable_wins_over_the_default() {
        let mut vars = DrawingVariables::new();
        vars.set_number("$DIMASZ", 7.0, CODE_NUMBER);
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        assert!((style.arrow_size() - 7.0).abs() < EPS);
        assert_eq!(vars.number("$DIMASZ"), Some(7.0));
    }

    #[test]
    fn defaults_are_converted_into_the_drawing_unit() {
        let mut vars = DrawingVariables::new();
        let mut style = DimStyle::new(&mut vars, Unit::Inch);

        let gap = style.line_gap();
        assert!((gap - 0.625 / 25.4).abs() < EPS);
        assert_eq!(vars.number("$DIMGAP"), Some(gap));
    }

    #[test]
    fn every_numeric_parameter_has_its_documented_default() {
        let mut vars = DrawingVariables::new();
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        assert!((style.general_scale() - 1.0).abs() < EPS);
        assert!((style.general_factor() - 1.0).abs() < EPS);
        assert!((style.text_height() - 2.5).abs() < EPS);
        assert!((style.arrow_size() - 2.5).abs() < EPS);
        assert!(style.tick_size().abs() < EPS);
        assert!((style.extension_line_extension() - 1.25).abs() < EPS);
        assert!((style.extension_line_offset() - 0.625).abs() < EPS);
        assert!((style.line_gap() - 0.625).abs() < EPS);
        assert_eq!(vars.len(), 8);
    }

    #[test]
    fn sentinel_values_are_treated_as_unset() {
        let mut vars = DrawingVariables::new();
        vars.set_number("$DIMSCALE", UNSET_SENTINEL, CODE_NUMBER);
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        assert!((style.general_scale() - 1.0).abs() < EPS);
        assert_eq!(vars.number("$DIMSCALE"), Some(1.0));
    }

    #[test]
    fn text_orientation_defaults_to_aligned() {
        let mut vars = DrawingVariables::new();
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        assert!(!style.horizontal_text());
        assert_eq!(vars.integer("$DIMTIH"), Some(0));
        assert_eq!(vars.code("$DIMTIH"), Some(CODE_FLAG));
    }

    #[test]
    fn malformed_flag_is_healed_before_interpretation() {
        let mut vars = DrawingVariables::new();
        vars.set_integer("$DIMTIH", 5, CODE_FLAG);
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        // the healed value decides the answer, not the stored garbage
        assert!(!style.horizontal_text());
        assert_eq!(vars.integer("$DIMTIH"), Some(0));
    }

    #[test]
    fn valid_flag_values_pass_through() {
        let mut vars = DrawingVariables::new();
        vars.set_integer("$DIMTIH", 1, CODE_FLAG);
        let mut style = DimStyle::new(&mut vars, Unit::Millimeter);

        assert!(style.horizontal_text());
        assert_eq!(vars.integer("$DIMTIH"), Some(1));
    }
}

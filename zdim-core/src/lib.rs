pub mod geometry {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，保证标注计算全程双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn middle(self, other: Point2) -> Self {
            Self((self.0 + other.0) * 0.5)
        }

        /// 绕 `center` 旋转 `angle` 弧度。
        pub fn rotate_about(self, center: Point2, angle: f64) -> Self {
            let (sin, cos) = angle.sin_cos();
            let rel = self.0 - center.0;
            Self(center.0 + DVec2::new(rel.x * cos - rel.y * sin, rel.x * sin + rel.y * cos))
        }

        /// 以 `center` 为基准做分量缩放，`factor` 允许非等比。
        pub fn scale_about(self, center: Point2, factor: Vector2) -> Self {
            Self(center.0 + (self.0 - center.0) * factor.0)
        }

        /// 沿两点确定的轴线镜像。轴线退化为一个点时原样返回。
        pub fn mirror(self, axis_p1: Point2, axis_p2: Point2) -> Self {
            let direction = axis_p2.0 - axis_p1.0;
            let len_sq = direction.length_squared();
            if len_sq <= f64::EPSILON {
                return self;
            }
            let t = (self.0 - axis_p1.0).dot(direction) / len_sq;
            let foot = axis_p1.0 + direction * t;
            Self(foot * 2.0 - self.0)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        /// 由模长与方向角构造（极坐标形式）。
        #[inline]
        pub fn from_polar(magnitude: f64, angle: f64) -> Self {
            Self(DVec2::new(magnitude * angle.cos(), magnitude * angle.sin()))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        /// 方向角，零向量返回 0。
        #[inline]
        pub fn angle(self) -> f64 {
            self.0.y.atan2(self.0.x)
        }

        #[inline]
        pub fn negated(self) -> Self {
            Self(-self.0)
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算标注图元范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }
    }

    /// 角度归一化到 `[0, 2π)`。
    pub fn correct_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    /// 该角度下的文字是否可以从下方或右侧正常阅读。
    /// 阈值沿用 DXF 生态的惯例，上下边界各放宽 0.001 弧度。
    pub fn is_angle_readable(angle: f64) -> bool {
        angle < FRAC_PI_2 + 0.001 || angle > 3.0 * FRAC_PI_2 + 0.001
    }

    /// 把角度调整到可读区间，返回 (显示角度, 是否做过 180 度翻转)。
    /// 翻转标记决定文字偏移落在标注线的哪一侧。
    pub fn make_angle_readable(angle: f64) -> (f64, bool) {
        let normalized = correct_angle(angle);
        if is_angle_readable(normalized) {
            (normalized, false)
        } else {
            (correct_angle(normalized + PI), true)
        }
    }

    #[cfg(test)]
    mod tests {
        use std::f64::consts::{FRAC_PI_2, PI};

        use super::*;

        const EPS: f64 = 1e-9;

        #[test]
        fn rotate_about_quarter_turn() {
            let point = Point2::new(2.0, 0.0);
            let rotated = point.rotate_about(Point2::new(1.0, 0.0), FRAC_PI_2);
            assert!((rotated.x() - 1.0).abs() < EPS);
            assert!((rotated.y() - 1.0).abs() < EPS);
        }

        #[test]
        fn mirror_across_x_axis() {
            let point = Point2::new(3.0, 4.0);
            let mirrored = point.mirror(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
            assert!((mirrored.x() - 3.0).abs() < EPS);
            assert!((mirrored.y() + 4.0).abs() < EPS);

            // degenerate axis leaves the point untouched
            let same = point.mirror(Point2::new(5.0, 5.0), Point2::new(5.0, 5.0));
            assert_eq!(same, point);
        }

        #[test]
        fn scale_about_supports_non_uniform_factors() {
            let point = Point2::new(3.0, 5.0);
            let scaled = point.scale_about(Point2::new(1.0, 1.0), Vector2::new(2.0, 0.5));
            assert!((scaled.x() - 5.0).abs() < EPS);
            assert!((scaled.y() - 3.0).abs() < EPS);
        }

        #[test]
        fn polar_vectors_carry_magnitude_and_direction() {
            let vector = Vector2::from_polar(2.0, FRAC_PI_2);
            assert!(vector.x().abs() < EPS);
            assert!((vector.y() - 2.0).abs() < EPS);
            assert!((vector.length() - 2.0).abs() < EPS);
            assert!((vector.angle() - FRAC_PI_2).abs() < EPS);

            let between = Vector2::from_points(Point2::new(1.0, 1.0), Point2::new(4.0, 5.0));
            assert!((between.length() - 5.0).abs() < EPS);
        }

        #[test]
        fn correct_angle_wraps_negative_values() {
            assert!((correct_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < EPS);
            assert!((correct_angle(2.0 * PI)).abs() < EPS);
        }

        #[test]
        fn readable_angles_stay_unchanged() {
            let (angle, corrected) = make_angle_readable(0.25);
            assert!((angle - 0.25).abs() < EPS);
            assert!(!corrected);

            // slightly past the quarter turn is still inside the tolerance band
            let (angle, corrected) = make_angle_readable(FRAC_PI_2 + 0.0005);
            assert!((angle - (FRAC_PI_2 + 0.0005)).abs() < EPS);
            assert!(!corrected);
        }

        #[test]
        fn upper_half_plane_angles_are_flipped() {
            let (angle, corrected) = make_angle_readable(PI);
            assert!(angle.abs() < EPS);
            assert!(corrected);

            // the lower boundary itself is still flipped
            let (angle, corrected) = make_angle_readable(3.0 * FRAC_PI_2);
            assert!((angle - FRAC_PI_2).abs() < EPS);
            assert!(corrected);
        }
    }
}

pub mod entities {
    use std::f64::consts::PI;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2, correct_angle};

    /// 箭头两翼偏离中轴的半张角（弧度）。
    const ARROW_WING_ANGLE: f64 = 0.165;

    /// 标注线段。作为标注的子图元使用，图层与画笔继承所属标注，自身不携带。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
    }

    impl Line {
        #[inline]
        pub fn new(start: Point2, end: Point2) -> Self {
            Self { start, end }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance_to(self.end)
        }

        #[inline]
        pub fn middle(&self) -> Point2 {
            self.start.middle(self.end)
        }

        /// 起点指向终点的方向角，归一化到 `[0, 2π)`。
        #[inline]
        pub fn angle(&self) -> f64 {
            correct_angle(self.start.vector_to(self.end).angle())
        }

        /// 终点指向起点的方向角。
        #[inline]
        pub fn angle_reversed(&self) -> f64 {
            correct_angle(self.angle() + PI)
        }

        /// 严格线段求交：交点必须同时落在两条线段上才返回。
        /// 平行（含共线重叠）一律视为无交点。
        pub fn intersection_strict(&self, other: &Line) -> Option<Point2> {
            const TOLERANCE: f64 = 1e-9;
            let d1 = self.start.vector_to(self.end).as_vec2();
            let d2 = other.start.vector_to(other.end).as_vec2();
            let denom = d1.perp_dot(d2);
            if denom.abs() <= TOLERANCE {
                return None;
            }
            let rel = other.start.as_vec2() - self.start.as_vec2();
            let t = rel.perp_dot(d2) / denom;
            let u = rel.perp_dot(d1) / denom;
            let range = -TOLERANCE..=1.0 + TOLERANCE;
            if range.contains(&t) && range.contains(&u) {
                Some(Point2::from_vec(self.start.as_vec2() + d1 * t))
            } else {
                None
            }
        }
    }

    /// 实心三角箭头终结符。尖端位于 `tip`，朝向 `angle`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Arrowhead {
        pub tip: Point2,
        pub angle: f64,
        pub size: f64,
    }

    impl Arrowhead {
        #[inline]
        pub fn new(tip: Point2, angle: f64, size: f64) -> Self {
            Self { tip, angle, size }
        }

        /// 三角形顶点：两翼沿 `angle ± 0.165` 弧度向尖端后方展开，
        /// 斜边长取 `size / cos(0.165)`，箭头在中轴上的投影长即为 `size`。
        pub fn vertices(&self) -> [Point2; 3] {
            let side = self.size / ARROW_WING_ANGLE.cos();
            let wing1 = Vector2::from_polar(side, self.angle + ARROW_WING_ANGLE);
            let wing2 = Vector2::from_polar(side, self.angle - ARROW_WING_ANGLE);
            [
                self.tip,
                self.tip.translate(wing1.negated()),
                self.tip.translate(wing2.negated()),
            ]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum VAlign {
        Top,
        Middle,
        Bottom,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum HAlign {
        Left,
        Center,
        Right,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum TextDirection {
        LeftToRight,
        TopToBottom,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LineSpacingStyle {
        AtLeast,
        Exact,
    }

    /// 每字符步进相对字高的系数，宽度估算使用。
    const CHAR_ADVANCE_FACTOR: f64 = 0.8;

    /// 标注文字实体。宽高按确定性的字形模型估算，供布局阶段查询。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Label {
        pub anchor: Point2,
        pub height: f64,
        pub width_hint: f64,
        pub valign: VAlign,
        pub halign: HAlign,
        pub direction: TextDirection,
        pub spacing_style: LineSpacingStyle,
        pub spacing_factor: f64,
        pub content: String,
        pub style: String,
        pub angle: f64,
    }

    impl Label {
        #[allow(clippy::too_many_arguments)]
        pub fn new(
            anchor: Point2,
            height: f64,
            width_hint: f64,
            valign: VAlign,
            halign: HAlign,
            direction: TextDirection,
            spacing_style: LineSpacingStyle,
            spacing_factor: f64,
            content: impl Into<String>,
            style: impl Into<String>,
            angle: f64,
        ) -> Self {
            Self {
                anchor,
                height,
                width_hint,
                valign,
                halign,
                direction,
                spacing_style,
                spacing_factor,
                content: content.into(),
                style: style.into(),
                angle,
            }
        }

        /// 实际占用宽度：取最宽一行，每字符步进按字高的 0.8 估算。
        pub fn used_width(&self) -> f64 {
            let chars = self
                .content
                .lines()
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            chars as f64 * self.height * CHAR_ADVANCE_FACTOR
        }

        /// 实际占用高度：首行取字高，后续行按行距样式推进。
        pub fn used_height(&self) -> f64 {
            let lines = self.content.lines().count().max(1);
            let line_height = match self.spacing_style {
                LineSpacingStyle::Exact => self.height * self.spacing_factor,
                LineSpacingStyle::AtLeast => self.height * (5.0 / 3.0) * self.spacing_factor,
            };
            self.height + (lines - 1) as f64 * line_height
        }

        #[inline]
        pub fn translate(&mut self, offset: Vector2) {
            self.anchor = self.anchor.translate(offset);
        }
    }

    /// 一次布局产出的子图元。整组由所属标注独占，重建时整体替换。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Part {
        Line(Line),
        Arrowhead(Arrowhead),
        Label(Label),
    }

    impl Part {
        /// 子图元的 2D 范围，文字退化为插入点。
        pub fn bounds(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            match self {
                Part::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Part::Arrowhead(arrow) => {
                    for vertex in arrow.vertices() {
                        bounds.include_point(vertex);
                    }
                }
                Part::Label(label) => {
                    bounds.include_point(label.anchor);
                }
            }
            bounds
        }
    }

}

pub mod dimension {
    use serde::{Deserialize, Serialize};

    use crate::entities::{HAlign, LineSpacingStyle, VAlign};
    use crate::geometry::Point2;

    /// 标注的持久化数据。几何子图元不在此列，由布局阶段重建。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DimensionData {
        /// 驱动测量的主定义点。
        pub definition_point: Point2,
        /// 文字中心。`None` 表示尚未计算；一经计算或被用户指定即写回，
        /// 后续重建沿用，除非显式要求重算。
        pub label_anchor: Option<Point2>,
        pub valign: VAlign,
        pub halign: HAlign,
        pub line_spacing_style: LineSpacingStyle,
        pub line_spacing_factor: f64,
        /// 文字模板：空串显示实测值，单个空格抑制文字，`<>` 被实测值替换。
        pub text: String,
        /// 标注样式名。
        pub style: String,
        /// 文字与标注线方向的累计旋转角，仅旋转操作会更新。
        pub angle: f64,
    }

    impl DimensionData {
        pub fn new(definition_point: Point2) -> Self {
            Self {
                definition_point,
                label_anchor: None,
                valign: VAlign::Bottom,
                halign: HAlign::Left,
                line_spacing_style: LineSpacingStyle::Exact,
                line_spacing_factor: 0.0,
                text: String::new(),
                style: String::new(),
                angle: 0.0,
            }
        }
    }

    impl Default for DimensionData {
        fn default() -> Self {
            Self::new(Point2::new(0.0, 0.0))
        }
    }

}

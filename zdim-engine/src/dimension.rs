use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use tracing::debug;
use zdim_core::dimension::DimensionData;
use zdim_core::entities::{Arrowhead, HAlign, Label, Line, Part, TextDirection, VAlign};
use zdim_core::geometry::{self, Bounds2D, Point2, Vector2};

use crate::style::{DimStyle, VariableStore};

/// 线长低于箭头长度的该倍数时，箭头移到标注线外侧。
const OUTSIDE_ARROW_RATIO: f64 = 2.5;
/// 斜线终结符生效阈值，低于该值按箭头绘制。
const TICK_MIN: f64 = 0.01;
/// 文字实体的默认参考宽度。
const LABEL_WIDTH_HINT: f64 = 30.0;
/// 文字实体使用的固定样式名。
const LABEL_STYLE: &str = "standard";

/// 线性标注实体：持久化数据加上最近一次布局产出的子图元。
/// 子图元归标注独占，每次重建整体丢弃并替换。
#[derive(Debug, Clone)]
pub struct Dimension {
    data: DimensionData,
    parts: Vec<Part>,
}

impl Dimension {
    pub fn new(data: DimensionData) -> Self {
        Self {
            data,
            parts: Vec::new(),
        }
    }

    #[inline]
    pub fn data(&self) -> &DimensionData {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut DimensionData {
        &mut self.data
    }

    #[inline]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// 未解析的文字模板。
    #[inline]
    pub fn template(&self) -> &str {
        &self.data.text
    }

    /// 设置文字模板。
    #[inline]
    pub fn set_label(&mut self, text: impl Into<String>) {
        self.data.text = text.into();
    }

    /// 解析最终显示文字：单个空格抑制文字，空串显示实测值，
    /// 其余内容中的 `<>` 被实测值替换。
    pub fn label(&self, measured: &str) -> String {
        if self.data.text == " " {
            String::new()
        } else if self.data.text.is_empty() {
            measured.to_string()
        } else {
            self.data.text.replace("<>", measured)
        }
    }

    /// 所有子图元的 2D 范围。
    pub fn bounds(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        for part in &self.parts {
            bounds.include_bounds(&part.bounds());
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// 重建标注线、终结符与文字。
    ///
    /// `measured` 为外部测量源给出的已格式化实测值；
    /// `force_auto_text` 为 true 时忽略已存的文字位置，重新按线段计算。
    pub fn update_dimension_line<S: VariableStore>(
        &mut self,
        style: &mut DimStyle<'_, S>,
        p1: Point2,
        p2: Point2,
        arrow1: bool,
        arrow2: bool,
        measured: &str,
        force_auto_text: bool,
    ) {
        let dimscale = style.general_scale();
        let dimtxt = style.text_height() * dimscale;
        let dimgap = style.line_gap() * dimscale;
        let arrow_size = style.arrow_size() * dimscale;

        let distance = p1.distance_to(p2);
        let outside_arrows = distance < arrow_size * OUTSIDE_ARROW_RATIO;

        self.parts.clear();

        let mut dimension_line = Line::new(p1, p2);
        let dim_angle = dimension_line.angle();
        let dim_angle_reversed = geometry::correct_angle(dim_angle + PI);

        let (arrow_angle1, arrow_angle2) = if outside_arrows {
            // 外置箭头：线段向两端延长，两端方向角互换，尖端仍指向原端点。
            let out = Vector2::from_polar(arrow_size * 2.0, dim_angle_reversed);
            dimension_line.start = p1.translate(out);
            dimension_line.end = p2.translate(out.negated());
            (dim_angle, dim_angle_reversed)
        } else {
            (dim_angle_reversed, dim_angle)
        };

        let mut terminators: Vec<Part> = Vec::new();
        let dimtsz = style.tick_size() * dimscale;
        if dimtsz < TICK_MIN {
            if arrow1 {
                terminators.push(Part::Arrowhead(Arrowhead::new(p1, arrow_angle1, arrow_size)));
            }
            if arrow2 {
                terminators.push(Part::Arrowhead(Arrowhead::new(p2, arrow_angle2, arrow_size)));
            }
        } else {
            // 斜线与终结符方向呈 45 度，以端点为中心向两侧伸出。
            let tick = Vector2::from_polar(dimtsz, arrow_angle1 + FRAC_PI_4);
            if arrow1 {
                terminators.push(Part::Line(Line::new(
                    p1.translate(tick.negated()),
                    p1.translate(tick),
                )));
            }
            if arrow2 {
                terminators.push(Part::Line(Line::new(
                    p2.translate(tick.negated()),
                    p2.translate(tick),
                )));
            }
        }

        let horizontal = style.horizontal_text();
        let (text_angle, corrected) = if horizontal {
            (0.0, false)
        } else {
            geometry::make_angle_readable(dim_angle)
        };

        let text_pos = match (self.data.label_anchor, force_auto_text) {
            (Some(anchor), false) => anchor,
            _ => {
                let mut pos = dimension_line.middle();
                if !horizontal {
                    // 文字沿法线离开标注线；翻转过的角度取另一侧法线。
                    let side = if corrected {
                        dim_angle - FRAC_PI_2
                    } else {
                        dim_angle + FRAC_PI_2
                    };
                    pos = pos.translate(Vector2::from_polar(dimgap + dimtxt / 2.0, side));
                }
                self.data.label_anchor = Some(pos);
                pos
            }
        };

        let mut label = Label::new(
            text_pos,
            dimtxt,
            LABEL_WIDTH_HINT,
            VAlign::Middle,
            HAlign::Center,
            TextDirection::LeftToRight,
            self.data.line_spacing_style,
            self.data.line_spacing_factor,
            self.label(measured),
            LABEL_STYLE,
            text_angle,
        );

        // 文字比线段还宽时，沿文字方向移出线段端点之外。
        if label.used_width() > distance {
            label.translate(Vector2::from_polar(
                label.used_width() / 2.0 + distance / 2.0 + dimgap,
                text_angle,
            ));
        }

        // 水平文字会压在标注线上，尝试在文字包络处断开线段。
        let second_line = if horizontal {
            split_at_label(&mut dimension_line, text_pos, &label, dimgap, p1)
        } else {
            None
        };

        self.parts.push(Part::Line(dimension_line));
        self.parts.extend(terminators);
        if let Some(line) = second_line {
            self.parts.push(Part::Line(line));
        }
        self.parts.push(Part::Label(label));

        debug!(
            distance,
            outside_arrows,
            horizontal,
            parts = self.parts.len(),
            "重建标注图元"
        );
    }

    /// 平移定义点与文字中心。
    pub fn translate(&mut self, offset: Vector2) {
        self.data.definition_point = self.data.definition_point.translate(offset);
        self.data.label_anchor = self.data.label_anchor.map(|anchor| anchor.translate(offset));
    }

    /// 绕 `center` 旋转两个锚点，累计角度归一化后写回。
    pub fn rotate(&mut self, center: Point2, angle: f64) {
        self.data.definition_point = self.data.definition_point.rotate_about(center, angle);
        self.data.label_anchor = self
            .data
            .label_anchor
            .map(|anchor| anchor.rotate_about(center, angle));
        self.data.angle = geometry::correct_angle(self.data.angle + angle);
    }

    /// 以方向向量的形式旋转，向量退化时不做任何事。
    pub fn rotate_by(&mut self, center: Point2, direction: Vector2) {
        if direction.length_squared() <= f64::EPSILON {
            return;
        }
        self.rotate(center, direction.angle());
    }

    /// 分量缩放两个锚点。非等比缩放下方向角不再有意义，保持原值。
    pub fn scale(&mut self, center: Point2, factor: Vector2) {
        self.data.definition_point = self.data.definition_point.scale_about(center, factor);
        self.data.label_anchor = self
            .data
            .label_anchor
            .map(|anchor| anchor.scale_about(center, factor));
    }

    /// 沿轴线镜像两个锚点；角度留待下次重建按新几何得出。
    pub fn mirror(&mut self, axis_p1: Point2, axis_p2: Point2) {
        self.data.definition_point = self.data.definition_point.mirror(axis_p1, axis_p2);
        self.data.label_anchor = self
            .data
            .label_anchor
            .map(|anchor| anchor.mirror(axis_p1, axis_p2));
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::new(DimensionData::default())
    }
}

/// 在文字包络矩形处断开标注线，返回断开产生的第二段。
///
/// 矩形以自动计算出的文字中心为基准；过长文字被移出线外后，
/// 包络仍保持在原位置。交点不足两个时不断开。
fn split_at_label(
    dimension_line: &mut Line,
    text_pos: Point2,
    label: &Label,
    gap: f64,
    p1: Point2,
) -> Option<Line> {
    let w = label.used_width() / 2.0 + gap;
    let h = label.used_height() / 2.0 + gap;
    let v1 = Point2::new(text_pos.x() - w, text_pos.y() - h);
    let v2 = Point2::new(text_pos.x() + w, text_pos.y() + h);
    let edges = [
        Line::new(v1, Point2::new(v2.x(), v1.y())),
        Line::new(Point2::new(v2.x(), v1.y()), v2),
        Line::new(v2, Point2::new(v1.x(), v2.y())),
        Line::new(Point2::new(v1.x(), v2.y()), v1),
    ];
    let (sol1, sol2) = first_two_intersections(dimension_line, &edges);
    let (Some(sol1), Some(sol2)) = (sol1, sol2) else {
        return None;
    };

    let mut second = *dimension_line;
    // 距 p1 较近的交点成为第一段的新终点，较远者作为第二段的起点。
    if p1.distance_to(sol1) < p1.distance_to(sol2) {
        dimension_line.end = sol1;
        second.start = sol2;
    } else {
        dimension_line.end = sol2;
        second.start = sol1;
    }
    Some(second)
}

/// 按固定顺序扫描矩形四边，收集最多两个有效交点。
/// 第二个交点从第一个命中的下一条边继续找起。
fn first_two_intersections(line: &Line, edges: &[Line; 4]) -> (Option<Point2>, Option<Point2>) {
    let mut first = None;
    let mut index = 0;
    while index < edges.len() && first.is_none() {
        first = line.intersection_strict(&edges[index]);
        index += 1;
    }
    let mut second = None;
    while index < edges.len() && second.is_none() {
        second = line.intersection_strict(&edges[index]);
        index += 1;
    }
    (first, second)
}
